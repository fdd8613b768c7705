use std::str::FromStr;

use pulseq_types::{SeqError, SeqResult};

/// Поля одной записи, разделённые пробелами.
///
/// Каждая ошибка разбора указывает секцию и исходную строку.
pub struct Fields<'a> {
    section: &'a str,
    line: &'a str,
    tokens: Vec<&'a str>,
}

impl<'a> Fields<'a> {
    pub fn split(
        section: &'a str,
        line: &'a str,
    ) -> Self {
        Self {
            section,
            line,
            tokens: line.split_whitespace().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn line(&self) -> &'a str {
        self.line
    }

    pub fn get(
        &self,
        i: usize,
    ) -> Option<&'a str> {
        self.tokens.get(i).copied()
    }

    /// Запись должна содержать ровно `n` полей.
    pub fn expect_exact(
        &self,
        n: usize,
    ) -> SeqResult<()> {
        if self.tokens.len() != n {
            return Err(self.error(format!(
                "expected {n} fields, found {}",
                self.tokens.len()
            )));
        }

        Ok(())
    }

    /// Запись должна содержать не менее `n` полей.
    pub fn expect_at_least(
        &self,
        n: usize,
    ) -> SeqResult<()> {
        if self.tokens.len() < n {
            return Err(self.error(format!(
                "expected at least {n} fields, found {}",
                self.tokens.len()
            )));
        }

        Ok(())
    }

    pub fn parse<T: FromStr>(
        &self,
        i: usize,
        what: &str,
    ) -> SeqResult<T> {
        let token = self
            .get(i)
            .ok_or_else(|| self.error(format!("missing field '{what}'")))?;

        token
            .parse::<T>()
            .map_err(|_| self.error(format!("failed to decode '{what}' from '{token}'")))
    }

    pub fn int(
        &self,
        i: usize,
        what: &str,
    ) -> SeqResult<i64> {
        self.parse::<i64>(i, what)
    }

    pub fn float(
        &self,
        i: usize,
        what: &str,
    ) -> SeqResult<f32> {
        self.parse::<f32>(i, what)
    }

    pub fn double(
        &self,
        i: usize,
        what: &str,
    ) -> SeqResult<f64> {
        self.parse::<f64>(i, what)
    }

    /// Идентификатор события или формы: целое, не отрицательное.
    pub fn id(
        &self,
        i: usize,
        what: &str,
    ) -> SeqResult<u32> {
        let value = self.int(i, what)?;

        if value < 0 {
            return Err(SeqError::NegativeId {
                section: self.section.to_string(),
                line: self.line.to_string(),
            });
        }

        u32::try_from(value).map_err(|_| self.error(format!("'{what}' {value} is out of range")))
    }

    pub fn error<M: Into<String>>(
        &self,
        message: M,
    ) -> SeqError {
        SeqError::format(self.section, self.line, message)
    }
}
