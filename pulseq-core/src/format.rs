//! Текстовый формат внешней последовательности.
//!
//! Файл состоит из секций; тег секции это строка в квадратных скобках:
//!
//! ```text
//! [VERSION]       major / minor / revision (необязательна)
//! [DEFINITIONS]   ключ и список чисел
//! [BLOCKS]        idx delay rf gx gy gz adc ctrl
//! [RF]            id amp mag phase [delay] freq phase
//! [GRADIENTS]     id amp shape [delay]
//! [TRAP]          id amp rise flat fall [delay]
//! [ADC]           id num dwell delay freq phase
//! [DELAYS]        id delay
//! [TRIGGERS]      id type duration
//! [ROTATIONS]     id m00 m01 m02 m10 m11 m12 m20 m21 m22
//! [SHAPES]        shape <id> / num_samples <n> / упакованные выборки
//! ```
//!
//! Секции могут идти в любом порядке: сначала строится индекс смещений
//! тегов, затем каждая секция читается переходом по смещению.

use std::{
    collections::HashMap,
    io::{self, BufRead, Seek},
};

use crate::text::{is_section_tag, LineReader};

pub const SECTION_VERSION: &str = "[VERSION]";
pub const SECTION_DEFINITIONS: &str = "[DEFINITIONS]";
pub const SECTION_BLOCKS: &str = "[BLOCKS]";
pub const SECTION_RF: &str = "[RF]";
pub const SECTION_GRADIENTS: &str = "[GRADIENTS]";
pub const SECTION_TRAP: &str = "[TRAP]";
pub const SECTION_ADC: &str = "[ADC]";
pub const SECTION_DELAYS: &str = "[DELAYS]";
pub const SECTION_TRIGGERS: &str = "[TRIGGERS]";
pub const SECTION_ROTATIONS: &str = "[ROTATIONS]";
pub const SECTION_SHAPES: &str = "[SHAPES]";

/// Ключ определения с ожидаемым числом блоков.
pub const DEF_NUM_BLOCKS: &str = "Num_Blocks";

/// Ключ определения с идентификатором скана.
pub const DEF_SCAN_ID: &str = "Scan_ID";

/// Смещения тегов секций одного физического файла.
///
/// Смещение указывает на байт сразу после строки тега. Повторный тег
/// перезаписывает предыдущее смещение.
#[derive(Debug, Clone, Default)]
pub struct SectionIndex {
    offsets: HashMap<String, u64>,
}

impl SectionIndex {
    /// Сканирует поток с начала и запоминает позиции всех тегов.
    ///
    /// По завершении позиция чтения возвращается в начало потока.
    pub fn build<R: BufRead + Seek>(reader: &mut LineReader<R>) -> io::Result<Self> {
        let mut offsets = HashMap::new();

        reader.rewind()?;

        while let Some(line) = reader.read_line()? {
            if is_section_tag(&line) {
                let pos = reader.position()?;
                offsets.insert(line, pos);
            }
        }

        reader.rewind()?;

        Ok(Self { offsets })
    }

    pub fn offset(
        &self,
        tag: &str,
    ) -> Option<u64> {
        self.offsets.get(tag).copied()
    }

    pub fn contains(
        &self,
        tag: &str,
    ) -> bool {
        self.offsets.contains_key(tag)
    }

    /// Переходит к началу секции. `false`, если тега нет.
    pub fn seek<R: BufRead + Seek>(
        &self,
        reader: &mut LineReader<R>,
        tag: &str,
    ) -> io::Result<bool> {
        match self.offset(tag) {
            Some(off) => {
                reader.seek_to(off)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Теги в порядке их расположения в файле.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<(&str, u64)> = self
            .offsets
            .iter()
            .map(|(tag, &off)| (tag.as_str(), off))
            .collect();
        tags.sort_by_key(|&(_, off)| off);
        tags.into_iter().map(|(tag, _)| tag).collect()
    }
}
