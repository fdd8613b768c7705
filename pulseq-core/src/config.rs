use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::text::{COMMENT_CHAR, MAX_LINE_SIZE};

/// Параметры загрузки последовательности.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Максимальная длина строки (байт), остаток обрезается
    pub max_line_len: usize,
    /// Символ комментария в заголовочных полях
    pub comment_char: char,
    /// Имя единого файла внутри каталога
    pub single_file_name: String,
    /// Имена файлов раздельной раскладки
    pub shapes_file_name: String,
    pub events_file_name: String,
    pub blocks_file_name: String,
    /// Предупреждать, если объявленный номер блока не равен позиции + 1
    pub warn_on_block_index_mismatch: bool,
}

/// Откуда читать последовательность.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceSource {
    /// Все секции в одном файле
    Single(PathBuf),
    /// Формы, события и блоки в трёх файлах
    Split {
        shapes: PathBuf,
        events: PathBuf,
        blocks: PathBuf,
    },
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl SequenceSource {
    /// Определяет раскладку по пути.
    ///
    /// Путь с расширением `.seq` означает единый файл. Иначе путь считается
    /// каталогом: сначала ищется `single_file_name`, при его отсутствии
    /// используется тройка раздельных файлов.
    pub fn resolve<P: AsRef<Path>>(
        path: P,
        config: &LoadConfig,
    ) -> Self {
        let path = path.as_ref();

        if path.extension().is_some_and(|ext| ext == "seq") {
            return SequenceSource::Single(path.to_path_buf());
        }

        let single = path.join(&config.single_file_name);
        if single.is_file() {
            return SequenceSource::Single(single);
        }

        SequenceSource::Split {
            shapes: path.join(&config.shapes_file_name),
            events: path.join(&config.events_file_name),
            blocks: path.join(&config.blocks_file_name),
        }
    }

    pub fn is_single_file(&self) -> bool {
        matches!(self, SequenceSource::Single(_))
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            max_line_len: MAX_LINE_SIZE,
            comment_char: COMMENT_CHAR,
            single_file_name: "external.seq".to_string(),
            shapes_file_name: "shapes.seq".to_string(),
            events_file_name: "events.seq".to_string(),
            blocks_file_name: "blocks.seq".to_string(),
            warn_on_block_index_mismatch: true,
        }
    }
}

impl std::fmt::Display for SequenceSource {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            SequenceSource::Single(p) => write!(f, "{}", p.display()),
            SequenceSource::Split {
                shapes,
                events,
                blocks,
            } => write!(
                f,
                "{} + {} + {}",
                shapes.display(),
                events.display(),
                blocks.display()
            ),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
