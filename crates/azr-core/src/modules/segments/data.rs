use super::{rewrite_segment_lines, segment_index_error, segment_lines, unique_in_order};
use crate::common::constants::{
    DATA_FILENAME, DATA_IN_CHANNEL, DATA_INCLUDE, DATA_MIN_TOKENS, DATA_NORM_FACTOR,
    DATA_OUT_CHANNEL, DATA_OUTPUT_EXTENSION, DATA_VARY_NORM, SEGMENTS_DATA_CLOSE,
    SEGMENTS_DATA_OPEN, output_filename,
};
use crate::domain::{AzrError, AzrResult};
use crate::modules::output::{NumericTable, TableError};
use crate::parser::{ConfigDocument, RowError, TokenRow, flag_token, number_token};
use std::fs;
use std::path::{Path, PathBuf};

/// One row of `<segmentsData>` together with the measurements it points at.
///
/// `values` always derives from the values loaded at construction; shifting
/// energies twice applies only the second shift.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSegment {
    row: TokenRow,
    include: bool,
    in_channel: i32,
    out_channel: i32,
    norm_factor: f64,
    vary_norm: bool,
    filename: String,
    values_original: NumericTable,
    values: NumericTable,
}

impl DataSegment {
    /// Parses a row and loads its data file. Relative filenames resolve
    /// against `base_dir`.
    pub fn load(line: &str, base_dir: &Path) -> AzrResult<Self> {
        let row = TokenRow::parse(line);
        let fields = parse_data_row(&row)
            .map_err(|error| AzrError::document_format("DOCUMENT.DATA_ROW", error.to_string()))?;

        let path = resolve_data_path(base_dir, &fields.filename);
        let values = NumericTable::read(&path).map_err(|error| data_file_error(&path, error))?;

        Ok(Self {
            row,
            include: fields.include,
            in_channel: fields.in_channel,
            out_channel: fields.out_channel,
            norm_factor: fields.norm_factor,
            vary_norm: fields.vary_norm,
            filename: fields.filename,
            values_original: values.clone(),
            values,
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

    pub fn norm_factor(&self) -> f64 {
        self.norm_factor
    }

    pub fn vary_norm(&self) -> bool {
        self.vary_norm
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn values(&self) -> &NumericTable {
        &self.values
    }

    pub fn values_original(&self) -> &NumericTable {
        &self.values_original
    }

    pub fn output_filename(&self) -> String {
        output_filename(self.in_channel, self.out_channel, DATA_OUTPUT_EXTENSION)
    }

    /// Sets column 0 to the loaded energies plus `shift`.
    pub fn shift_energies(&mut self, shift: f64) {
        self.values = NumericTable::with_column_offset(&self.values_original, 0, shift);
    }

    pub fn is_modified(&self) -> bool {
        self.values != self.values_original
    }

    /// Moves the backing file to `new_dir/<position>_<file name>` and writes
    /// the current values there. `position` keeps segments that share a file
    /// name apart. A bare filename is left where it is.
    pub fn update_dir(&mut self, new_dir: &Path, position: usize) -> AzrResult<()> {
        let Some(relocated) = relocate(&self.filename, new_dir, position) else {
            return Ok(());
        };
        if let Some(parent) = relocated.parent() {
            fs::create_dir_all(parent).map_err(|source| {
                AzrError::io_path("IO.DATA_DIR", "create data directory", parent, source)
            })?;
        }
        self.values
            .write(&relocated)
            .map_err(|error| data_file_error(&relocated, error))?;
        self.filename = relocated.to_string_lossy().into_owned();
        Ok(())
    }

    /// The row as the solver should see it, with every other token untouched.
    pub fn render(&self) -> Result<String, RowError> {
        self.render_row(None)
    }

    fn render_row(&self, norm_factor: Option<f64>) -> Result<String, RowError> {
        let mut row = self.row.clone();
        row.replace(DATA_INCLUDE, flag_token(self.include))?;
        row.replace(DATA_FILENAME, &self.filename)?;
        if let Some(norm_factor) = norm_factor {
            row.replace(DATA_NORM_FACTOR, &number_token(norm_factor))?;
        }
        Ok(row.as_str().to_string())
    }
}

struct DataRowFields {
    include: bool,
    in_channel: i32,
    out_channel: i32,
    norm_factor: f64,
    vary_norm: bool,
    filename: String,
}

fn parse_data_row(row: &TokenRow) -> Result<DataRowFields, RowError> {
    row.require_len(DATA_MIN_TOKENS)?;
    Ok(DataRowFields {
        include: row.parse_flag(DATA_INCLUDE)?,
        in_channel: row.parse_i32(DATA_IN_CHANNEL)?,
        out_channel: row.parse_i32(DATA_OUT_CHANNEL)?,
        norm_factor: row.parse_f64(DATA_NORM_FACTOR)?,
        vary_norm: row.parse_flag(DATA_VARY_NORM)?,
        filename: row
            .token(DATA_FILENAME)
            .ok_or(RowError::MissingToken {
                index: DATA_FILENAME,
            })?
            .to_string(),
    })
}

fn resolve_data_path(base_dir: &Path, filename: &str) -> PathBuf {
    let path = Path::new(filename);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn relocate(filename: &str, new_dir: &Path, position: usize) -> Option<PathBuf> {
    let path = Path::new(filename);
    if path.components().nth(1).is_none() {
        return None;
    }
    let name = path.file_name()?.to_string_lossy();
    Some(new_dir.join(format!("{}_{}", position, name)))
}

fn data_file_error(path: &Path, error: TableError) -> AzrError {
    match error {
        TableError::Read { source, .. } => {
            AzrError::io_path("IO.SEGMENT_DATA", "read segment data", path, source)
        }
        TableError::Write { source, .. } => {
            AzrError::io_path("IO.SEGMENT_DATA", "write segment data", path, source)
        }
        other => AzrError::document_format(
            "DOCUMENT.SEGMENT_DATA",
            format!("segment data '{}': {}", path.display(), other),
        ),
    }
}

fn render_error(position: usize, error: RowError) -> AzrError {
    AzrError::document_format(
        "DOCUMENT.DATA_ROW",
        format!("data segment {}: {}", position, error),
    )
}

/// Every `<segmentsData>` row in document order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataRegistry {
    segments: Vec<DataSegment>,
}

impl DataRegistry {
    pub fn from_document(document: &ConfigDocument, base_dir: &Path) -> AzrResult<Self> {
        let indices = segment_lines(document, SEGMENTS_DATA_OPEN, SEGMENTS_DATA_CLOSE)?;
        let mut segments = Vec::with_capacity(indices.len());
        for index in indices {
            let line = &document.lines()[index];
            let segment = DataSegment::load(line, base_dir).map_err(|error| {
                error.with_context(format!("{} line {}", SEGMENTS_DATA_OPEN, index + 1))
            })?;
            segments.push(segment);
        }
        Ok(Self { segments })
    }

    pub fn all_segments(&self) -> &[DataSegment] {
        &self.segments
    }

    pub fn segments(&self) -> impl Iterator<Item = &DataSegment> {
        self.segments.iter().filter(|segment| segment.include)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn output_files(&self) -> Vec<String> {
        unique_in_order(self.segments().map(DataSegment::output_filename))
    }

    /// Indices into `all_segments` of included segments with a free
    /// normalization factor.
    pub fn norm_segment_indices(&self) -> Vec<usize> {
        self.segments
            .iter()
            .enumerate()
            .filter(|(_, segment)| segment.include && segment.vary_norm)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn norm_factors(&self) -> Vec<f64> {
        self.norm_segment_indices()
            .into_iter()
            .map(|index| self.segments[index].norm_factor)
            .collect()
    }

    pub fn shift_energies(&mut self, index: usize, shift: f64) -> AzrResult<()> {
        let len = self.segments.len();
        let segment = self
            .segments
            .get_mut(index)
            .ok_or_else(|| segment_index_error(index, len))?;
        segment.shift_energies(shift);
        Ok(())
    }

    pub fn is_modified(&self) -> bool {
        self.segments.iter().any(DataSegment::is_modified)
    }

    pub fn update_all_dir(&mut self, new_dir: &Path) -> AzrResult<()> {
        for (position, segment) in self.segments.iter_mut().enumerate() {
            segment.update_dir(new_dir, position)?;
        }
        Ok(())
    }

    pub fn write_segments(&self, document: &mut ConfigDocument) -> AzrResult<()> {
        let rows = self
            .segments
            .iter()
            .enumerate()
            .map(|(index, segment)| {
                segment
                    .render()
                    .map_err(|error| render_error(index, error))
            })
            .collect::<AzrResult<Vec<_>>>()?;
        rewrite_segment_lines(document, SEGMENTS_DATA_OPEN, SEGMENTS_DATA_CLOSE, rows)
    }

    /// Like `write_segments`, with `norms[k]` written into the row of
    /// `norm_segment_indices()[k]`.
    pub fn write_segments_with_norms(
        &self,
        document: &mut ConfigDocument,
        norms: &[f64],
    ) -> AzrResult<()> {
        let indices = self.norm_segment_indices();
        if norms.len() != indices.len() {
            return Err(AzrError::shape_mismatch(
                "SHAPE.NORM_FACTORS",
                format!(
                    "expected {} normalization factor(s), got {}",
                    indices.len(),
                    norms.len()
                ),
            ));
        }

        let rows = self
            .segments
            .iter()
            .enumerate()
            .map(|(index, segment)| {
                let norm = indices
                    .iter()
                    .position(|&candidate| candidate == index)
                    .map(|position| norms[position]);
                segment
                    .render_row(norm)
                    .map_err(|error| render_error(index, error))
            })
            .collect::<AzrResult<Vec<_>>>()?;
        rewrite_segment_lines(document, SEGMENTS_DATA_OPEN, SEGMENTS_DATA_CLOSE, rows)
    }
}
