/// Уровень диагностического сообщения, от самого подробного к ошибке.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MessageLevel {
    DebugLow,
    DebugMedium,
    DebugHigh,
    Normal,
    Warning,
    Error,
}

/// Приёмник диагностики загрузчика.
///
/// Передаётся загрузчику явно; реализации должны быть потокобезопасны,
/// так как декодирование блоков может идти из нескольких потоков.
pub trait DiagnosticSink: Send + Sync {
    fn emit(
        &self,
        level: MessageLevel,
        message: &str,
    );
}

impl MessageLevel {
    /// Отступ в пробелах: вложенные отладочные сообщения сдвигаются вправо.
    pub fn indent(&self) -> usize {
        match self {
            MessageLevel::DebugMedium => 2,
            MessageLevel::DebugLow => 4,
            _ => 0,
        }
    }
}

impl std::fmt::Display for MessageLevel {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let s = match self {
            MessageLevel::DebugLow => "debug-low",
            MessageLevel::DebugMedium => "debug-medium",
            MessageLevel::DebugHigh => "debug-high",
            MessageLevel::Normal => "normal",
            MessageLevel::Warning => "warning",
            MessageLevel::Error => "error",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for MessageLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug-low" | "low" => Ok(MessageLevel::DebugLow),
            "debug-medium" | "medium" => Ok(MessageLevel::DebugMedium),
            "debug-high" | "debug" | "high" => Ok(MessageLevel::DebugHigh),
            "normal" | "info" => Ok(MessageLevel::Normal),
            "warning" | "warn" => Ok(MessageLevel::Warning),
            "error" => Ok(MessageLevel::Error),
            _ => Err(format!(
                "Unknown message level: '{s}'. Use: low, medium, high, normal, warning, error"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_ordered_by_severity() {
        assert!(MessageLevel::DebugLow < MessageLevel::DebugMedium);
        assert!(MessageLevel::DebugHigh < MessageLevel::Normal);
        assert!(MessageLevel::Warning < MessageLevel::Error);
    }

    #[test]
    fn test_level_fromstr() {
        assert_eq!("warn".parse::<MessageLevel>().unwrap(), MessageLevel::Warning);
        assert_eq!("Error".parse::<MessageLevel>().unwrap(), MessageLevel::Error);
        assert!("loud".parse::<MessageLevel>().is_err());
    }
}
