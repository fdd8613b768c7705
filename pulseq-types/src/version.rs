use serde::{Deserialize, Serialize};

/// Начиная с этой версии RF-событие несёт задержку, а задержка блока
/// перекрывается с остальными каналами вместо сложения.
pub const VERSION_RF_DELAY: i64 = 1_002_000;

/// Начиная с этой версии градиенты (форма и трапеция) несут задержку.
pub const VERSION_GRAD_DELAY: i64 = 1_001_001;

/// Версия формата из секции `[VERSION]`.
///
/// При отсутствии секции все поля равны нулю, что выбирает самые старые
/// раскладки записей.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeqVersion {
    pub major: i32,
    pub minor: i32,
    pub revision: i32,
}

impl SeqVersion {
    pub fn new(
        major: i32,
        minor: i32,
        revision: i32,
    ) -> Self {
        Self {
            major,
            minor,
            revision,
        }
    }

    /// `major * 1_000_000 + minor * 1_000 + revision`
    pub fn combined(&self) -> i64 {
        self.major as i64 * 1_000_000 + self.minor as i64 * 1_000 + self.revision as i64
    }

    /// RF-записи содержат поле задержки.
    pub fn has_rf_delay(&self) -> bool {
        self.combined() >= VERSION_RF_DELAY
    }

    /// Записи градиентов содержат поле задержки.
    pub fn has_grad_delay(&self) -> bool {
        self.combined() >= VERSION_GRAD_DELAY
    }

    /// Задержка блока перекрывается с событиями (а не добавляется после них).
    pub fn delay_overlaps(&self) -> bool {
        self.combined() >= VERSION_RF_DELAY
    }
}

impl std::fmt::Display for SeqVersion {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.revision)
    }
}
