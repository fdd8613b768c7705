use thiserror::Error;

pub type InspectResult<T> = std::result::Result<T, InspectError>;

#[derive(Debug, Error)]
pub enum InspectError {
    /// Ошибка загрузки или декодирования последовательности
    #[error("Sequence error: {0}")]
    Seq(#[from] pulseq_types::SeqError),

    /// Ошибка сериализации отчёта
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Ошибка вывода
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
