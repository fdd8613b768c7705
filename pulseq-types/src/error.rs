use std::path::PathBuf;

use thiserror::Error;

use crate::EventSlot;

/// Результат для операций загрузки и декодирования последовательности.
pub type SeqResult<T> = std::result::Result<T, SeqError>;

/// Классы ошибок: по ним вызывающая сторона решает, что делать дальше.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Файл отсутствует или не читается
    Io,
    /// Нарушен формат: нет секции, запись не разбирается, неизвестный ключ
    Format,
    /// Блок ссылается на несуществующее событие
    Reference,
    /// Данные противоречат друг другу (счётчики, длины форм, индексы)
    Consistency,
}

/// Ошибки загрузки последовательности.
#[derive(Debug, Error)]
pub enum SeqError {
    /// Ошибки ввода/вывода (автоконвертируются из std::io::Error)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Не удалось открыть файл последовательности
    #[error("Failed to read file {path:?}: {source}")]
    FileOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Обязательная секция отсутствует
    #[error("Required: {0} section")]
    MissingSection(String),

    /// Запись секции не соответствует ожидаемому формату
    #[error("Failed to decode {section} record: {message}\n{line}")]
    Format {
        section: String,
        line: String,
        message: String,
    },

    /// Ошибка в секции [VERSION]
    #[error("Failed to decode [VERSION]: {message}\n{line}")]
    Version { line: String, message: String },

    /// Отрицательный идентификатор события
    #[error("Negative event id in {section}\n{line}")]
    NegativeId { section: String, line: String },

    /// Блок ссылается на неопределённое событие
    #[error("Block {block} (declared #{declared_index}) references undefined {slot} event {id}")]
    Reference {
        block: usize,
        declared_index: i64,
        slot: EventSlot,
        id: u32,
    },

    /// Num_Blocks не совпадает с числом прочитанных блоков
    #[error("Expected {expected} blocks but read {found} blocks")]
    BlockCount { expected: usize, found: usize },

    /// Событие ссылается на форму, которой нет в библиотеке
    #[error("Undefined shape {0}")]
    MissingShape(u32),

    /// Упакованный поток формы не даёт объявленного числа выборок
    #[error("Shape {id}: {message}")]
    Shape { id: u32, message: String },

    /// Длительность блока или последовательности не помещается в `i64`
    #[error("Duration of block {block} overflows")]
    DurationOverflow { block: usize },

    /// Запрошен блок за пределами таблицы
    #[error("Block index {index} out of range ({len} blocks)")]
    BlockIndexOutOfRange { index: usize, len: usize },
}

impl SeqError {
    /// Удобные конструкторы
    pub fn format<S, L, M>(
        section: S,
        line: L,
        message: M,
    ) -> Self
    where
        S: Into<String>,
        L: Into<String>,
        M: Into<String>,
    {
        Self::Format {
            section: section.into(),
            line: line.into(),
            message: message.into(),
        }
    }

    pub fn version<L: Into<String>, M: Into<String>>(
        line: L,
        message: M,
    ) -> Self {
        Self::Version {
            line: line.into(),
            message: message.into(),
        }
    }

    pub fn shape<M: Into<String>>(
        id: u32,
        message: M,
    ) -> Self {
        Self::Shape {
            id,
            message: message.into(),
        }
    }

    /// Класс ошибки.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SeqError::Io(_) | SeqError::FileOpen { .. } => ErrorKind::Io,
            SeqError::MissingSection(_)
            | SeqError::Format { .. }
            | SeqError::Version { .. }
            | SeqError::NegativeId { .. } => ErrorKind::Format,
            SeqError::Reference { .. } => ErrorKind::Reference,
            SeqError::BlockCount { .. }
            | SeqError::MissingShape(_)
            | SeqError::Shape { .. }
            | SeqError::DurationOverflow { .. }
            | SeqError::BlockIndexOutOfRange { .. } => ErrorKind::Consistency,
        }
    }
}
