use super::{rewrite_segment_lines, segment_index_error, segment_lines, unique_in_order};
use crate::common::constants::{
    EXTRAP_OUTPUT_EXTENSION, SEGMENTS_TEST_CLOSE, SEGMENTS_TEST_OPEN, TEST_IN_CHANNEL,
    TEST_INCLUDE, TEST_MIN_TOKENS, TEST_OUT_CHANNEL, output_filename,
};
use crate::domain::{AzrError, AzrResult};
use crate::parser::{ConfigDocument, RowError, TokenRow, flag_token, row_error};
use std::collections::BTreeSet;

/// One row of `<segmentsTest>`: a prediction target with no measurements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtrapolationSegment {
    row: TokenRow,
    include: bool,
    in_channel: i32,
    out_channel: i32,
}

impl ExtrapolationSegment {
    pub fn parse(line: &str) -> Result<Self, RowError> {
        let row = TokenRow::parse(line);
        row.require_len(TEST_MIN_TOKENS)?;
        Ok(Self {
            include: row.parse_flag(TEST_INCLUDE)?,
            in_channel: row.parse_i32(TEST_IN_CHANNEL)?,
            out_channel: row.parse_i32(TEST_OUT_CHANNEL)?,
            row,
        })
    }

    pub fn include(&self) -> bool {
        self.include
    }

    pub fn in_channel(&self) -> i32 {
        self.in_channel
    }

    pub fn out_channel(&self) -> i32 {
        self.out_channel
    }

    pub fn output_filename(&self) -> String {
        output_filename(self.in_channel, self.out_channel, EXTRAP_OUTPUT_EXTENSION)
    }

    pub fn render(&self) -> Result<String, RowError> {
        let mut row = self.row.clone();
        row.replace(TEST_INCLUDE, flag_token(self.include))?;
        Ok(row.as_str().to_string())
    }
}

/// Every `<segmentsTest>` row in document order. A document without the
/// section yields an empty registry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtrapolationRegistry {
    segments: Vec<ExtrapolationSegment>,
}

impl ExtrapolationRegistry {
    pub fn from_document(document: &ConfigDocument) -> AzrResult<Self> {
        if !document.has_section(SEGMENTS_TEST_OPEN) {
            return Ok(Self::default());
        }

        let indices = segment_lines(document, SEGMENTS_TEST_OPEN, SEGMENTS_TEST_CLOSE)?;
        let segments = indices
            .into_iter()
            .map(|index| {
                ExtrapolationSegment::parse(&document.lines()[index])
                    .map_err(|error| row_error("DOCUMENT.TEST_ROW", index, error))
            })
            .collect::<AzrResult<Vec<_>>>()?;
        Ok(Self { segments })
    }

    pub fn all_segments(&self) -> &[ExtrapolationSegment] {
        &self.segments
    }

    pub fn segments(&self) -> impl Iterator<Item = &ExtrapolationSegment> {
        self.segments.iter().filter(|segment| segment.include)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn output_files(&self) -> Vec<String> {
        unique_in_order(self.segments().map(ExtrapolationSegment::output_filename))
    }

    /// Includes exactly the segments at `indices`, by position.
    pub fn set_included(&mut self, indices: &BTreeSet<usize>) -> AzrResult<()> {
        if let Some(&index) = indices.iter().find(|&&index| index >= self.segments.len()) {
            return Err(segment_index_error(index, self.segments.len()));
        }
        for (position, segment) in self.segments.iter_mut().enumerate() {
            segment.include = indices.contains(&position);
        }
        Ok(())
    }

    /// A copy with `set_included` applied, or an unchanged copy for `None`.
    pub fn with_included(&self, indices: Option<&BTreeSet<usize>>) -> AzrResult<Self> {
        let mut registry = self.clone();
        if let Some(indices) = indices {
            registry.set_included(indices)?;
        }
        Ok(registry)
    }

    pub fn write_segments(&self, document: &mut ConfigDocument) -> AzrResult<()> {
        if self.segments.is_empty() && !document.has_section(SEGMENTS_TEST_OPEN) {
            return Ok(());
        }
        let rows = self
            .segments
            .iter()
            .enumerate()
            .map(|(index, segment)| {
                segment.render().map_err(|error| {
                    AzrError::document_format(
                        "DOCUMENT.TEST_ROW",
                        format!("extrapolation segment {}: {}", index, error),
                    )
                })
            })
            .collect::<AzrResult<Vec<_>>>()?;
        rewrite_segment_lines(document, SEGMENTS_TEST_OPEN, SEGMENTS_TEST_CLOSE, rows)
    }
}
