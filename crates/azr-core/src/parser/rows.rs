/// A whitespace-tokenized document row that remembers where each token sits,
/// so individual tokens can be replaced without reformatting the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRow {
    raw: String,
    spans: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("expected at least {expected} tokens, found {found}")]
    TooFewTokens { expected: usize, found: usize },
    #[error("token {index} does not exist")]
    MissingToken { index: usize },
    #[error("token {index} ('{token}') is not a valid {kind}")]
    InvalidToken {
        index: usize,
        token: String,
        kind: &'static str,
    },
}

impl TokenRow {
    pub fn parse(raw: &str) -> Self {
        let mut spans = Vec::new();
        let mut start = None;
        for (offset, ch) in raw.char_indices() {
            match (ch.is_whitespace(), start) {
                (true, Some(begin)) => {
                    spans.push((begin, offset));
                    start = None;
                }
                (false, None) => start = Some(offset),
                _ => {}
            }
        }
        if let Some(begin) = start {
            spans.push((begin, raw.len()));
        }

        Self {
            raw: raw.to_string(),
            spans,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn require_len(&self, expected: usize) -> Result<(), RowError> {
        if self.len() < expected {
            return Err(RowError::TooFewTokens {
                expected,
                found: self.len(),
            });
        }
        Ok(())
    }

    pub fn token(&self, index: usize) -> Option<&str> {
        self.spans
            .get(index)
            .map(|&(start, end)| &self.raw[start..end])
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.spans.iter().map(|&(start, end)| &self.raw[start..end])
    }

    pub fn replace(&mut self, index: usize, value: &str) -> Result<(), RowError> {
        let &(start, end) = self
            .spans
            .get(index)
            .ok_or(RowError::MissingToken { index })?;
        if &self.raw[start..end] == value {
            return Ok(());
        }

        self.raw.replace_range(start..end, value);
        let new_end = start + value.len();
        self.spans[index] = (start, new_end);
        for span in self.spans.iter_mut().skip(index + 1) {
            span.0 = span.0 + new_end - end;
            span.1 = span.1 + new_end - end;
        }
        Ok(())
    }

    pub fn parse_f64(&self, index: usize) -> Result<f64, RowError> {
        let token = self.require_token(index)?;
        token
            .parse::<f64>()
            .map_err(|_| invalid_token(index, token, "floating-point number"))
    }

    pub fn parse_i32(&self, index: usize) -> Result<i32, RowError> {
        let token = self.require_token(index)?;
        token
            .parse::<i32>()
            .map_err(|_| invalid_token(index, token, "integer"))
    }

    /// Integer flag; only the value `1` counts as set.
    pub fn parse_flag(&self, index: usize) -> Result<bool, RowError> {
        let token = self.require_token(index)?;
        token
            .parse::<i64>()
            .map(|value| value == 1)
            .map_err(|_| invalid_token(index, token, "integer flag"))
    }

    fn require_token(&self, index: usize) -> Result<&str, RowError> {
        self.token(index).ok_or(RowError::MissingToken { index })
    }
}

fn invalid_token(index: usize, token: &str, kind: &'static str) -> RowError {
    RowError::InvalidToken {
        index,
        token: token.to_string(),
        kind,
    }
}

pub fn flag_token(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

/// Shortest round-trip exponent form; parsed back to the identical `f64`.
pub fn number_token(value: f64) -> String {
    format!("{:e}", value)
}
