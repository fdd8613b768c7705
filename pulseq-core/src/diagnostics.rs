use log::{debug, error, info, trace, warn};
use parking_lot::Mutex;
use pulseq_types::{DiagnosticSink, MessageLevel};

/// Приёмник, перенаправляющий сообщения в фасад `log`.
#[derive(Debug, Clone, Copy)]
pub struct LogSink {
    min_level: MessageLevel,
}

/// Приёмник, отбрасывающий всё.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

/// Приёмник, накапливающий сообщения в памяти (для тестов и отчётов).
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<(MessageLevel, String)>>,
}

impl LogSink {
    pub fn new(min_level: MessageLevel) -> Self {
        Self { min_level }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new(MessageLevel::DebugLow)
    }
}

impl DiagnosticSink for LogSink {
    fn emit(
        &self,
        level: MessageLevel,
        message: &str,
    ) {
        if level < self.min_level {
            return;
        }

        let pad = level.indent();

        match level {
            MessageLevel::Error => error!("{message}"),
            MessageLevel::Warning => warn!("{message}"),
            MessageLevel::Normal => info!("{message}"),
            MessageLevel::DebugHigh => debug!("{message}"),
            MessageLevel::DebugMedium | MessageLevel::DebugLow => {
                trace!("{:pad$}{message}", "")
            }
        }
    }
}

impl DiagnosticSink for NullSink {
    fn emit(
        &self,
        _level: MessageLevel,
        _message: &str,
    ) {
    }
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Копия всех накопленных сообщений.
    pub fn messages(&self) -> Vec<(MessageLevel, String)> {
        self.messages.lock().clone()
    }

    /// Число сообщений уровня `level`.
    pub fn count(
        &self,
        level: MessageLevel,
    ) -> usize {
        self.messages
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .count()
    }

    /// Есть ли сообщение уровня `level`, содержащее `needle`.
    pub fn contains(
        &self,
        level: MessageLevel,
        needle: &str,
    ) -> bool {
        self.messages
            .lock()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(
        &self,
        level: MessageLevel,
        message: &str,
    ) {
        self.messages.lock().push((level, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_memory_sink_collects() {
        let sink = MemorySink::new();
        sink.emit(MessageLevel::Warning, "block index mismatch");
        sink.emit(MessageLevel::DebugLow, "reading shape 1");
        sink.emit(MessageLevel::Warning, "another");

        assert_eq!(sink.count(MessageLevel::Warning), 2);
        assert!(sink.contains(MessageLevel::DebugLow, "shape 1"));
        assert!(!sink.contains(MessageLevel::Error, "shape"));

        sink.clear();
        assert!(sink.messages().is_empty());
    }

    #[test]
    fn test_memory_sink_shared_across_threads() {
        let sink = Arc::new(MemorySink::new());

        std::thread::scope(|s| {
            for i in 0..4 {
                let sink = sink.clone();
                s.spawn(move || sink.emit(MessageLevel::Normal, &format!("thread {i}")));
            }
        });

        assert_eq!(sink.count(MessageLevel::Normal), 4);
    }

    #[test]
    fn test_log_and_null_sinks_accept_all_levels() {
        let log_sink = LogSink::new(MessageLevel::Warning);
        let null = NullSink;
        for level in [
            MessageLevel::DebugLow,
            MessageLevel::DebugMedium,
            MessageLevel::DebugHigh,
            MessageLevel::Normal,
            MessageLevel::Warning,
            MessageLevel::Error,
        ] {
            log_sink.emit(level, "message");
            null.emit(level, "message");
        }
    }
}
