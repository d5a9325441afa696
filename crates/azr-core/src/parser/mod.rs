mod rows;

pub use rows::{RowError, TokenRow, flag_token, number_token};

use crate::common::constants::{
    CONFIG_CHECKS_DIR_OFFSET, CONFIG_CLOSE, CONFIG_OPEN, CONFIG_OUTPUT_DIR_OFFSET,
};
use crate::domain::{AzrError, AzrResult};
use std::fs;
use std::ops::Range;
use std::path::Path;

/// The solver input document as an ordered list of lines.
///
/// Splitting keeps a trailing empty line when the source ends with a newline,
/// so `to_string()` reproduces the source exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDocument {
    lines: Vec<String>,
}

impl ConfigDocument {
    pub fn parse(source: &str) -> Self {
        Self {
            lines: source.split('\n').map(str::to_string).collect(),
        }
    }

    pub fn read(path: &Path) -> AzrResult<Self> {
        let source = fs::read_to_string(path)
            .map_err(|source| AzrError::io_path("IO.DOCUMENT_READ", "read document", path, source))?;
        Ok(Self::parse(&source))
    }

    pub fn write(&self, path: &Path) -> AzrResult<()> {
        fs::write(path, self.to_string())
            .map_err(|source| AzrError::io_path("IO.DOCUMENT_WRITE", "write document", path, source))
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn has_section(&self, open: &str) -> bool {
        self.marker_index(open, 0).is_some()
    }

    /// Content lines strictly between the first `open` marker and the
    /// following `close` marker.
    pub fn section(&self, open: &str, close: &str) -> AzrResult<Range<usize>> {
        let open_index = self.marker_index(open, 0).ok_or_else(|| {
            AzrError::document_format(
                "DOCUMENT.MISSING_SECTION",
                format!("section marker '{}' was not found", open),
            )
        })?;
        let close_index = self.marker_index(close, open_index + 1).ok_or_else(|| {
            AzrError::document_format(
                "DOCUMENT.UNTERMINATED_SECTION",
                format!(
                    "section '{}' opened at line {} has no closing '{}'",
                    open,
                    open_index + 1,
                    close
                ),
            )
        })?;
        Ok(open_index + 1..close_index)
    }

    pub fn section_lines(&self, open: &str, close: &str) -> AzrResult<&[String]> {
        let range = self.section(open, close)?;
        Ok(&self.lines[range])
    }

    /// Rewrites a contiguous run of lines; the replacement must have the same
    /// length, so the document never grows or shrinks.
    pub fn replace_range(&mut self, range: Range<usize>, replacement: Vec<String>) -> AzrResult<()> {
        if range.end > self.lines.len() || range.start > range.end {
            return Err(AzrError::internal(
                "SYS.DOCUMENT_RANGE",
                format!(
                    "line range {}..{} is outside a document of {} lines",
                    range.start,
                    range.end,
                    self.lines.len()
                ),
            ));
        }
        if replacement.len() != range.len() {
            return Err(AzrError::internal(
                "SYS.DOCUMENT_RANGE",
                format!(
                    "replacement of {} lines does not fit range {}..{}",
                    replacement.len(),
                    range.start,
                    range.end
                ),
            ));
        }
        self.lines.splice(range, replacement);
        Ok(())
    }

    pub fn replace_line(&mut self, index: usize, line: impl Into<String>) -> AzrResult<()> {
        let slot = self.lines.get_mut(index).ok_or_else(|| {
            AzrError::internal(
                "SYS.DOCUMENT_RANGE",
                format!("line {} does not exist", index + 1),
            )
        })?;
        *slot = line.into();
        Ok(())
    }

    /// Points the solver's output and checks directories at `output_dir`.
    pub fn set_output_directory(&mut self, output_dir: &Path) -> AzrResult<()> {
        let range = self.section(CONFIG_OPEN, CONFIG_CLOSE)?;
        let config_index = range.start - 1;
        for offset in [CONFIG_OUTPUT_DIR_OFFSET, CONFIG_CHECKS_DIR_OFFSET] {
            let index = config_index + offset;
            if index >= range.end {
                return Err(AzrError::document_format(
                    "DOCUMENT.CONFIG_ARITY",
                    format!(
                        "'{}' section needs at least {} lines, found {}",
                        CONFIG_OPEN,
                        CONFIG_CHECKS_DIR_OFFSET,
                        range.len()
                    ),
                ));
            }
            self.replace_line(index, directory_line(output_dir))?;
        }
        Ok(())
    }

    pub fn output_directory(&self) -> AzrResult<&str> {
        let range = self.section(CONFIG_OPEN, CONFIG_CLOSE)?;
        let index = range.start - 1 + CONFIG_OUTPUT_DIR_OFFSET;
        if index >= range.end {
            return Err(AzrError::document_format(
                "DOCUMENT.CONFIG_ARITY",
                format!("'{}' section has no output directory line", CONFIG_OPEN),
            ));
        }
        Ok(self.lines[index].trim())
    }

    fn marker_index(&self, marker: &str, from: usize) -> Option<usize> {
        self.lines
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, line)| line.trim() == marker)
            .map(|(index, _)| index)
    }
}

impl std::fmt::Display for ConfigDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}

fn directory_line(dir: &Path) -> String {
    let mut line = dir.to_string_lossy().into_owned();
    if !line.ends_with('/') {
        line.push('/');
    }
    line
}

/// Maps a row failure inside a section to a document error naming the line.
pub(crate) fn row_error(placeholder: &'static str, line_index: usize, error: RowError) -> AzrError {
    AzrError::document_format(placeholder, format!("line {}: {}", line_index + 1, error))
}
