mod data;
mod extrapolation;

pub use data::{DataRegistry, DataSegment};
pub use extrapolation::{ExtrapolationRegistry, ExtrapolationSegment};

#[cfg(test)]
pub(crate) use data::fixtures as data_fixtures;

use crate::domain::{AzrError, AzrResult};
use crate::parser::ConfigDocument;

/// Indices of the non-blank lines between `open` and `close`.
fn segment_lines(document: &ConfigDocument, open: &str, close: &str) -> AzrResult<Vec<usize>> {
    let range = document.section(open, close)?;
    Ok(range
        .filter(|&index| !document.lines()[index].trim().is_empty())
        .collect())
}

/// Writes `rows` onto the segment lines of `open`, one row per line.
fn rewrite_segment_lines(
    document: &mut ConfigDocument,
    open: &str,
    close: &str,
    rows: Vec<String>,
) -> AzrResult<()> {
    let indices = segment_lines(document, open, close)?;
    if indices.len() != rows.len() {
        return Err(AzrError::shape_mismatch(
            "SHAPE.SEGMENT_ROWS",
            format!(
                "'{}' has {} segment rows but the registry holds {}",
                open,
                indices.len(),
                rows.len()
            ),
        ));
    }
    for (index, row) in indices.into_iter().zip(rows) {
        document.replace_line(index, row)?;
    }
    Ok(())
}

/// Stable-order deduplication.
fn unique_in_order(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for name in names {
        if !unique.contains(&name) {
            unique.push(name);
        }
    }
    unique
}

fn segment_index_error(index: usize, len: usize) -> AzrError {
    AzrError::address_out_of_bounds(
        "ADDRESS.SEGMENT_INDEX",
        format!("segment index {} is out of range for {} segment(s)", index, len),
    )
}
