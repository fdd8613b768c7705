use std::{
    collections::BTreeMap,
    io::{BufRead, Seek},
};

use pulseq_types::{CompressedShape, DiagnosticSink, MessageLevel, SeqError, SeqResult};

use crate::{
    format::SECTION_SHAPES,
    text::{Fields, LineReader},
    SectionIndex,
};

/// Распаковка сжатой формы.
pub trait CompressedShapeExt {
    /// Восстанавливает `num_samples` выборок из упакованной производной.
    fn decompress(
        &self,
        id: u32,
    ) -> SeqResult<Vec<f32>>;
}

/// Библиотека форм: id → сжатая форма. Id 0 означает «формы нет».
#[derive(Debug, Clone, Default)]
pub struct ShapeLibrary {
    shapes: BTreeMap<u32, CompressedShape>,
}

impl CompressedShapeExt for CompressedShape {
    /// Поток состоит из литералов и серий: два равных значения подряд
    /// открывают серию, третье задаёт число дополнительных повторов. Результат
    /// интегрируется накопленной суммой.
    ///
    /// Первый проход только проверяет поток против объявленной длины, память
    /// под выборки выделяется после него.
    fn decompress(
        &self,
        id: u32,
    ) -> SeqResult<Vec<f32>> {
        let len = self.num_samples;

        let decoded = for_each_run(&self.packed, id, len, |_, _| {})?;
        if decoded != len {
            return Err(SeqError::shape(
                id,
                format!("decoded {decoded} samples, declared {len}"),
            ));
        }

        let mut out = Vec::new();
        out.try_reserve_exact(len)
            .map_err(|_| SeqError::shape(id, format!("cannot allocate {len} samples")))?;

        let mut acc = 0.0f32;
        for_each_run(&self.packed, id, len, |value, rep| {
            for _ in 0..rep {
                acc += value;
                out.push(acc);
            }
        })?;

        Ok(out)
    }
}

/// Обходит упакованный поток, вызывая `emit(значение, повторы)` для каждого
/// литерала и серии. Возвращает число выборок; больше `limit` не допускается.
fn for_each_run<F>(
    packed: &[f32],
    id: u32,
    limit: usize,
    mut emit: F,
) -> SeqResult<usize>
where
    F: FnMut(f32, usize),
{
    let n = packed.len();
    let mut p = 0usize;
    let mut o = 0usize;

    while p < n {
        let value = packed[p];

        if p + 1 == n || value != packed[p + 1] {
            if o >= limit {
                return Err(overflow(id, limit));
            }
            emit(value, 1);
            p += 1;
            o += 1;
            continue;
        }

        let count = *packed.get(p + 2).ok_or_else(|| {
            SeqError::shape(id, format!("run at packed index {p} has no repeat count"))
        })?;

        if count < 0.0 || count.fract() != 0.0 {
            return Err(SeqError::shape(
                id,
                format!("invalid repeat count {count} at packed index {}", p + 2),
            ));
        }

        let room = limit - o;
        if count > room as f32 {
            return Err(overflow(id, limit));
        }

        let end = (count as usize)
            .checked_add(2)
            .and_then(|rep| o.checked_add(rep))
            .filter(|&end| end <= limit)
            .ok_or_else(|| overflow(id, limit))?;

        emit(value, end - o);
        p += 3;
        o = end;
    }

    Ok(o)
}

fn overflow(
    id: u32,
    len: usize,
) -> SeqError {
    SeqError::shape(id, format!("packed data expands beyond {len} declared samples"))
}

impl ShapeLibrary {
    /// Читает секцию `[SHAPES]` (обязательная).
    ///
    /// Формат записи: строка `shape <id>`, строка `num_samples <n>`, затем
    /// по одной упакованной выборке в строке до пустой строки, следующего
    /// заголовка формы или тега секции.
    pub fn parse<R: BufRead + Seek>(
        reader: &mut LineReader<R>,
        index: &SectionIndex,
        sink: &dyn DiagnosticSink,
    ) -> SeqResult<Self> {
        if !index.seek(reader, SECTION_SHAPES)? {
            return Err(SeqError::MissingSection(SECTION_SHAPES.to_string()));
        }

        let mut shapes = BTreeMap::new();
        let mut next = reader.skip_comments()?;

        while let Some(header) = next.take() {
            if !header.starts_with('s') {
                break;
            }

            let fields = Fields::split(SECTION_SHAPES, &header);
            fields.expect_exact(2)?;
            let id = fields.id(1, "shape id")?;
            if id == 0 {
                return Err(fields.error("shape id 0 is reserved"));
            }

            let count_line = reader
                .read_line()?
                .ok_or_else(|| fields.error("unexpected end of file before 'num_samples'"))?;
            let count_fields = Fields::split(SECTION_SHAPES, &count_line);
            count_fields.expect_exact(2)?;
            let num_samples: usize = count_fields.parse(1, "num_samples")?;

            sink.emit(MessageLevel::DebugLow, &format!("Reading shape {id}"));

            let mut packed = Vec::new();
            loop {
                match reader.read_line()? {
                    None => break,
                    Some(line) if line.is_empty() => {
                        next = reader.skip_comments()?;
                        break;
                    }
                    Some(line) if line.starts_with('s') || line.starts_with('[') => {
                        next = Some(line);
                        break;
                    }
                    Some(line) => {
                        let sample = Fields::split(SECTION_SHAPES, &line);
                        sample.expect_exact(1)?;
                        packed.push(sample.float(0, "sample")?);
                    }
                }
            }

            sink.emit(
                MessageLevel::DebugLow,
                &format!(
                    "Shape index {id} has {} compressed and {num_samples} uncompressed samples",
                    packed.len()
                ),
            );

            shapes.insert(id, CompressedShape::new(packed, num_samples));
        }

        sink.emit(
            MessageLevel::DebugHigh,
            &format!("-- SHAPES READ numShapes: {}", shapes.len()),
        );

        Ok(Self { shapes })
    }

    pub fn get(
        &self,
        id: u32,
    ) -> Option<&CompressedShape> {
        self.shapes.get(&id)
    }

    pub fn contains(
        &self,
        id: u32,
    ) -> bool {
        self.shapes.contains_key(&id)
    }

    pub fn insert(
        &mut self,
        id: u32,
        shape: CompressedShape,
    ) {
        self.shapes.insert(id, shape);
    }

    /// Объявленная длина формы без распаковки. Для id 0 возвращает 0.
    pub fn num_samples(
        &self,
        id: u32,
    ) -> SeqResult<usize> {
        if id == 0 {
            return Ok(0);
        }

        self.shapes
            .get(&id)
            .map(|s| s.num_samples)
            .ok_or(SeqError::MissingShape(id))
    }

    /// Распаковывает форму. Для id 0 возвращает пустой вектор.
    pub fn decompress(
        &self,
        id: u32,
    ) -> SeqResult<Vec<f32>> {
        if id == 0 {
            return Ok(Vec::new());
        }

        self.shapes
            .get(&id)
            .ok_or(SeqError::MissingShape(id))?
            .decompress(id)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &CompressedShape)> {
        self.shapes.iter().map(|(&id, s)| (id, s))
    }
}
