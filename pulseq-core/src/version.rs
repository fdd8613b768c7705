use std::io::{BufRead, Seek};

use pulseq_types::{DiagnosticSink, MessageLevel, SeqError, SeqResult, SeqVersion};

use crate::{format::SECTION_VERSION, text::LineReader, SectionIndex};

/// Читает секцию `[VERSION]`.
///
/// Секция необязательна: без неё возвращается версия 0.0.0. Неизвестный ключ
/// или нечисловое значение дают ошибку формата. Повторный ключ перезаписывает
/// предыдущее значение.
pub fn read_version<R: BufRead + Seek>(
    reader: &mut LineReader<R>,
    index: &SectionIndex,
    sink: &dyn DiagnosticSink,
) -> SeqResult<SeqVersion> {
    let mut version = SeqVersion::default();

    if !index.seek(reader, SECTION_VERSION)? {
        sink.emit(MessageLevel::DebugMedium, "no VERSION section, assuming 0.0.0");
        return Ok(version);
    }

    sink.emit(MessageLevel::DebugMedium, "decoding VERSION section");

    while let Some(line) = reader.skip_comments()? {
        if line.starts_with('[') {
            break;
        }

        let mut tokens = line.split_whitespace();
        let key = tokens.next().unwrap_or_default();

        let slot = match key {
            "major" => &mut version.major,
            "minor" => &mut version.minor,
            "revision" => &mut version.revision,
            _ => {
                return Err(SeqError::version(
                    line.as_str(),
                    format!("unknown field '{key}'"),
                ))
            }
        };

        *slot = tokens
            .next()
            .and_then(|v| v.parse::<i32>().ok())
            .ok_or_else(|| SeqError::version(line.as_str(), format!("failed to decode {key}")))?;

        sink.emit(MessageLevel::DebugMedium, &format!("{key}={}", *slot));
    }

    Ok(version)
}
