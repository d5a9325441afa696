mod parser;
mod table;

pub use parser::ReducedWidthAmplitude;
pub use table::{NumericTable, TableError};

use crate::common::constants::{EXTRAP_OUTPUT_COLUMNS, OUTPUT_COLUMNS, PARAMETERS_OUTPUT_FILE};
use crate::domain::{AzrError, AzrResult};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// A solver result file read back from a workspace output directory.
pub trait OutputFile: Sized {
    fn from_table(path: &Path, table: NumericTable) -> AzrResult<Self>;

    fn read(path: &Path) -> AzrResult<Self> {
        if !path.is_file() {
            return Err(AzrError::solver_invocation(
                "SOLVER.MISSING_OUTPUT",
                format!("solver produced no output file '{}'", path.display()),
            ));
        }
        let table = NumericTable::read(path).map_err(|error| {
            AzrError::output_parse("OUTPUT.TABLE", error.to_string())
                .with_context(path.display().to_string())
        })?;
        Self::from_table(path, table)
    }
}

impl OutputFile for NumericTable {
    fn from_table(_path: &Path, table: NumericTable) -> AzrResult<Self> {
        Ok(table)
    }
}

/// Calculated observables next to the measured data they were computed for.
///
/// Energies in MeV (center of mass), angles in degrees (center of mass).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Output {
    pub e_com: Vec<f64>,
    pub e_x: Vec<f64>,
    pub angle_com: Vec<f64>,
    pub xs_com_fit: Vec<f64>,
    pub sf_com_fit: Vec<f64>,
    pub xs_com_data: Vec<f64>,
    pub xs_err_com_data: Vec<f64>,
    pub sf_com_data: Vec<f64>,
    pub sf_err_com_data: Vec<f64>,
}

impl OutputFile for Output {
    fn from_table(path: &Path, table: NumericTable) -> AzrResult<Self> {
        let mut columns = named_columns(path, &table, OUTPUT_COLUMNS)?.into_iter();
        let mut next = || columns.next().unwrap_or_default();
        Ok(Self {
            e_com: next(),
            e_x: next(),
            angle_com: next(),
            xs_com_fit: next(),
            sf_com_fit: next(),
            xs_com_data: next(),
            xs_err_com_data: next(),
            sf_com_data: next(),
            sf_err_com_data: next(),
        })
    }
}

/// Calculated observables at solver-chosen points; there is no data to compare.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtrapolationOutput {
    pub e_com: Vec<f64>,
    pub e_x: Vec<f64>,
    pub angle_com: Vec<f64>,
    pub xs_com_fit: Vec<f64>,
    pub sf_com_fit: Vec<f64>,
}

impl OutputFile for ExtrapolationOutput {
    fn from_table(path: &Path, table: NumericTable) -> AzrResult<Self> {
        let mut columns = named_columns(path, &table, EXTRAP_OUTPUT_COLUMNS)?.into_iter();
        let mut next = || columns.next().unwrap_or_default();
        Ok(Self {
            e_com: next(),
            e_x: next(),
            angle_com: next(),
            xs_com_fit: next(),
            sf_com_fit: next(),
        })
    }
}

fn named_columns(path: &Path, table: &NumericTable, required: usize) -> AzrResult<Vec<Vec<f64>>> {
    if table.row_count() == 0 {
        return Err(AzrError::output_parse(
            "OUTPUT.EMPTY",
            format!("output file '{}' contains no rows", path.display()),
        ));
    }
    if table.column_count() < required {
        return Err(AzrError::output_parse(
            "OUTPUT.COLUMNS",
            format!(
                "output file '{}' has {} columns, expected at least {}",
                path.display(),
                table.column_count(),
                required
            ),
        ));
    }
    Ok((0..required).filter_map(|index| table.column(index)).collect())
}

/// Reads the reduced width amplitudes from an output directory.
pub fn read_reduced_width_amplitudes(output_dir: &Path) -> AzrResult<Vec<ReducedWidthAmplitude>> {
    let path = output_dir.join(PARAMETERS_OUTPUT_FILE);
    let source = fs::read_to_string(&path).map_err(|source| {
        AzrError::solver_invocation(
            "SOLVER.MISSING_OUTPUT",
            format!("failed to read parameter report '{}': {}", path.display(), source),
        )
    })?;
    parser::parse_reduced_width_amplitudes(&source)
}
