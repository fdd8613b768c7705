use std::io::{BufRead, Seek};

use pulseq_types::{
    DiagnosticSink, EventIds, EventSlot, MessageLevel, SeqError, SeqResult, NUM_EVENTS,
};

use crate::{
    format::SECTION_BLOCKS,
    library::EventLibraries,
    text::{Fields, LineReader},
    SectionIndex,
};

/// Минимальное число полей строки блока: номер и 7 слотов.
pub const BLOCK_FIELDS: usize = NUM_EVENTS + 1;

/// Таблица блоков в порядке чтения.
///
/// Номер блока из файла сохраняется, но место в таблице определяется
/// только физическим порядком строк.
#[derive(Debug, Clone, Default)]
pub struct BlockTable {
    rows: Vec<EventIds>,
    declared: Vec<i64>,
}

impl BlockTable {
    /// Читает `[BLOCKS]` и проверяет каждую ненулевую ссылку по библиотекам.
    ///
    /// Первая висячая ссылка прерывает разбор: частичная таблица не
    /// возвращается.
    pub fn parse<R: BufRead + Seek>(
        reader: &mut LineReader<R>,
        index: &SectionIndex,
        libs: &EventLibraries,
        warn_on_index_mismatch: bool,
        sink: &dyn DiagnosticSink,
    ) -> SeqResult<Self> {
        if !index.seek(reader, SECTION_BLOCKS)? {
            return Err(SeqError::MissingSection(SECTION_BLOCKS.to_string()));
        }

        let mut table = Self::default();

        while let Some(line) = reader.read_record()? {
            let fields = Fields::split(SECTION_BLOCKS, &line);
            fields.expect_at_least(BLOCK_FIELDS)?;

            let declared = fields.int(0, "block index")?;

            let mut ids = [0u32; NUM_EVENTS];
            for (i, (slot, id)) in EventSlot::ALL.iter().zip(ids.iter_mut()).enumerate() {
                *id = fields.id(i + 1, &slot.to_string())?;
            }
            let ids = EventIds::from_array(ids);

            let position = table.rows.len();

            if fields.len() > BLOCK_FIELDS {
                sink.emit(
                    MessageLevel::DebugLow,
                    &format!(
                        "block {declared}: ignoring {} extra fields",
                        fields.len() - BLOCK_FIELDS
                    ),
                );
            }

            if warn_on_index_mismatch && declared != position as i64 + 1 {
                sink.emit(
                    MessageLevel::Warning,
                    &format!(
                        "block at position {} declares index {declared}; using read order",
                        position + 1
                    ),
                );
            }

            if let Some((slot, id)) = ids.present().find(|&(slot, id)| !libs.contains(slot, id)) {
                return Err(SeqError::Reference {
                    block: position,
                    declared_index: declared,
                    slot,
                    id,
                });
            }

            table.rows.push(ids);
            table.declared.push(declared);
        }

        sink.emit(
            MessageLevel::DebugHigh,
            &format!("-- BLOCKS READ: {}", table.len()),
        );

        Ok(table)
    }

    pub fn get(
        &self,
        index: usize,
    ) -> Option<&EventIds> {
        self.rows.get(index)
    }

    /// Номер блока, записанный в файле.
    pub fn declared_index(
        &self,
        index: usize,
    ) -> Option<i64> {
        self.declared.get(index).copied()
    }

    pub fn push(
        &mut self,
        declared: i64,
        ids: EventIds,
    ) {
        self.rows.push(ids);
        self.declared.push(declared);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventIds> {
        self.rows.iter()
    }
}
