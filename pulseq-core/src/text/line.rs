use std::io::{self, BufRead, Seek, SeekFrom};

/// Максимальная длина строки по умолчанию (байт).
pub const MAX_LINE_SIZE: usize = 256;

/// Символ комментария по умолчанию.
pub const COMMENT_CHAR: char = '#';

/// Построчный читатель с возвратом к произвольной позиции.
///
/// Принимает окончания строк `\n` и `\r\n`. Строки длиннее `max_line_len`
/// обрезаются, остаток физической строки отбрасывается.
pub struct LineReader<R> {
    inner: R,
    max_line_len: usize,
    comment_char: char,
    raw: Vec<u8>,
    truncated: u64,
}

impl<R: BufRead + Seek> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_limits(inner, MAX_LINE_SIZE, COMMENT_CHAR)
    }

    pub fn with_limits(
        inner: R,
        max_line_len: usize,
        comment_char: char,
    ) -> Self {
        Self {
            inner,
            max_line_len: max_line_len.max(1),
            comment_char,
            raw: Vec::with_capacity(max_line_len),
            truncated: 0,
        }
    }

    /// Читает следующую строку без терминатора.
    ///
    /// `None` только если поток исчерпан и не осталось ни одного байта:
    /// последняя строка без перевода строки возвращается один раз.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        self.raw.clear();

        let n = self.inner.read_until(b'\n', &mut self.raw)?;
        if n == 0 {
            return Ok(None);
        }

        if self.raw.last() == Some(&b'\n') {
            self.raw.pop();
        }
        if self.raw.last() == Some(&b'\r') {
            self.raw.pop();
        }

        if self.raw.len() > self.max_line_len {
            self.raw.truncate(self.max_line_len);
            self.truncated += 1;
        }

        Ok(Some(String::from_utf8_lossy(&self.raw).into_owned()))
    }

    /// Пропускает пустые строки и комментарии, возвращает первую значимую.
    ///
    /// Используется только перед полями заголовков (`[VERSION]`, между
    /// формами), но не внутри циклов записей.
    pub fn skip_comments(&mut self) -> io::Result<Option<String>> {
        while let Some(line) = self.read_line()? {
            if !line.is_empty() && !line.starts_with(self.comment_char) {
                return Ok(Some(line));
            }
        }

        Ok(None)
    }

    /// Следующая запись секции: пустая строка или `[` завершают секцию.
    pub fn read_record(&mut self) -> io::Result<Option<String>> {
        match self.read_line()? {
            Some(line) if !is_section_end(&line) => Ok(Some(line)),
            _ => Ok(None),
        }
    }

    /// Текущая позиция в потоке (байт от начала).
    pub fn position(&mut self) -> io::Result<u64> {
        self.inner.stream_position()
    }

    pub fn seek_to(
        &mut self,
        offset: u64,
    ) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(offset)).map(|_| ())
    }

    pub fn rewind(&mut self) -> io::Result<()> {
        self.seek_to(0)
    }

    /// Сколько строк было обрезано по длине.
    pub fn truncated_lines(&self) -> u64 {
        self.truncated
    }

    pub fn comment_char(&self) -> char {
        self.comment_char
    }
}

/// Строка является тегом секции: начинается с `[` и заканчивается `]`.
/// Пробелы после `]` делают строку обычной.
pub fn is_section_tag(line: &str) -> bool {
    line.len() >= 2 && line.starts_with('[') && line.ends_with(']')
}

/// Строка завершает цикл записей секции.
pub fn is_section_end(line: &str) -> bool {
    line.is_empty() || line.starts_with('[')
}
