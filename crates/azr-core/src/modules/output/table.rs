use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// A whitespace-separated numeric matrix, one row per non-blank line.
///
/// Lines starting with `#` are comments. Every row must have the same width.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NumericTable {
    rows: Vec<Vec<f64>>,
}

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("line {line}: '{token}' is not a number")]
    InvalidNumber { line: usize, token: String },
    #[error("line {line}: expected {expected} columns, found {found}")]
    Ragged {
        line: usize,
        expected: usize,
        found: usize,
    },
}

impl NumericTable {
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        Self { rows }
    }

    pub fn parse(source: &str) -> Result<Self, TableError> {
        let mut rows: Vec<Vec<f64>> = Vec::new();
        for (index, line) in source.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let row = trimmed
                .split_whitespace()
                .map(|token| {
                    token.parse::<f64>().map_err(|_| TableError::InvalidNumber {
                        line: index + 1,
                        token: token.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            if let Some(first) = rows.first()
                && first.len() != row.len()
            {
                return Err(TableError::Ragged {
                    line: index + 1,
                    expected: first.len(),
                    found: row.len(),
                });
            }
            rows.push(row);
        }
        Ok(Self { rows })
    }

    pub fn read(path: &Path) -> Result<Self, TableError> {
        let source = fs::read_to_string(path).map_err(|source| TableError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&source)
    }

    pub fn write(&self, path: &Path) -> Result<(), TableError> {
        fs::write(path, self.to_text()).map_err(|source| TableError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Space-separated, 18-digit exponent notation; one line per row.
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for row in &self.rows {
            let line = row
                .iter()
                .map(|value| format!("{:.18e}", value))
                .collect::<Vec<_>>()
                .join(" ");
            text.push_str(&line);
            text.push('\n');
        }
        text
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn column(&self, index: usize) -> Option<Vec<f64>> {
        if index >= self.column_count() {
            return None;
        }
        Some(self.rows.iter().map(|row| row[index]).collect())
    }

    /// Copy of `self` whose column `index` is `baseline`'s column plus `shift`.
    pub(crate) fn with_column_offset(baseline: &Self, index: usize, shift: f64) -> Self {
        let rows = baseline
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                if let Some(value) = row.get_mut(index) {
                    *value += shift;
                }
                row
            })
            .collect();
        Self { rows }
    }
}
