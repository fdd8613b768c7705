use std::{
    collections::BTreeMap,
    io::{BufRead, Seek},
};

use pulseq_types::{DiagnosticSink, MessageLevel, SeqError, SeqResult};

use crate::{
    format::{DEF_NUM_BLOCKS, DEF_SCAN_ID, SECTION_DEFINITIONS},
    text::LineReader,
    SectionIndex,
};

/// Свободные метаданные последовательности из `[DEFINITIONS]`.
///
/// Каждая строка: ключ и числа через пробел. Значения читаются, пока
/// разбираются как числа; остаток строки игнорируется.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Definitions {
    values: BTreeMap<String, Vec<f64>>,
}

impl Definitions {
    /// Секция необязательна: без неё определения пусты.
    pub fn parse<R: BufRead + Seek>(
        reader: &mut LineReader<R>,
        index: &SectionIndex,
        sink: &dyn DiagnosticSink,
    ) -> SeqResult<Self> {
        let mut values = BTreeMap::new();

        if !index.seek(reader, SECTION_DEFINITIONS)? {
            return Ok(Self { values });
        }

        while let Some(line) = reader.read_record()? {
            let mut tokens = line.split_whitespace();
            let Some(key) = tokens.next() else {
                continue;
            };

            let nums: Vec<f64> = tokens.map_while(|t| t.parse().ok()).collect();
            values.insert(key.to_string(), nums);
        }

        let defs = Self { values };

        sink.emit(
            MessageLevel::DebugHigh,
            &format!("-- DEFINITIONS READ: {} : {}", defs.len(), defs.summary()),
        );

        Ok(defs)
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<&[f64]> {
        self.values.get(key).map(Vec::as_slice)
    }

    pub fn insert<K: Into<String>>(
        &mut self,
        key: K,
        values: Vec<f64>,
    ) {
        self.values.insert(key.into(), values);
    }

    /// Первое значение `Scan_ID`, 0 при отсутствии.
    pub fn scan_id(&self) -> i64 {
        self.first(DEF_SCAN_ID).map_or(0, |v| v as i64)
    }

    /// Объявленное число блоков (`Num_Blocks`), если ключ задан.
    ///
    /// Ключ без значения, отрицательное или дробное значение считаются
    /// ошибкой формата.
    pub fn num_blocks(&self) -> SeqResult<Option<usize>> {
        let Some(values) = self.get(DEF_NUM_BLOCKS) else {
            return Ok(None);
        };

        let error = |message: &str| {
            let line = std::iter::once(DEF_NUM_BLOCKS.to_string())
                .chain(values.iter().map(|v| v.to_string()))
                .collect::<Vec<_>>()
                .join(" ");
            SeqError::format(SECTION_DEFINITIONS, line, message)
        };

        match values.first().copied() {
            None => Err(error("Num_Blocks has no value")),
            Some(v) if v < 0.0 || v.fract() != 0.0 || !v.is_finite() => {
                Err(error("Num_Blocks must be a non-negative integer"))
            }
            Some(v) => Ok(Some(v as usize)),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    fn first(
        &self,
        key: &str,
    ) -> Option<f64> {
        self.get(key).and_then(|v| v.first().copied())
    }

    fn summary(&self) -> String {
        let mut out = String::new();
        for (key, values) in self.iter() {
            out.push_str(key);
            for v in values {
                out.push_str(&format!(" {v}"));
            }
            out.push(' ');
        }
        out.trim_end().to_string()
    }
}
