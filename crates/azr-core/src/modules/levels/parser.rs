use super::model::{Level, LevelGroup, LevelTemplate};
use crate::common::constants::{
    LEVEL_CHANNEL, LEVEL_CHANNEL_RADIUS, LEVEL_ENERGY, LEVEL_ENERGY_FIXED, LEVEL_MIN_TOKENS,
    LEVEL_PARITY, LEVEL_SEPARATION_ENERGY, LEVEL_SPIN, LEVEL_WIDTH, LEVEL_WIDTH_FIXED,
    LEVELS_CLOSE, LEVELS_OPEN,
};
use crate::domain::{AzrError, AzrResult};
use crate::parser::{ConfigDocument, RowError, TokenRow, number_token, row_error};

pub(super) fn parse_level_row(row: &TokenRow) -> Result<Level, RowError> {
    row.require_len(LEVEL_MIN_TOKENS)?;
    let parity = row.parse_i32(LEVEL_PARITY)?;
    if parity != 1 && parity != -1 {
        return Err(RowError::InvalidToken {
            index: LEVEL_PARITY,
            token: parity.to_string(),
            kind: "parity (+1 or -1)",
        });
    }

    Ok(Level {
        spin: row.parse_f64(LEVEL_SPIN)?,
        parity,
        energy: row.parse_f64(LEVEL_ENERGY)?,
        energy_fixed: row.parse_flag(LEVEL_ENERGY_FIXED)?,
        width: row.parse_f64(LEVEL_WIDTH)?,
        width_fixed: row.parse_flag(LEVEL_WIDTH_FIXED)?,
        channel_radius: row.parse_f64(LEVEL_CHANNEL_RADIUS)?,
        channel: row.parse_i32(LEVEL_CHANNEL)?,
        separation_energy: row.parse_f64(LEVEL_SEPARATION_ENERGY)?,
    })
}

/// Blank lines inside `<levels>` close a group.
pub(super) fn read_levels(document: &ConfigDocument) -> AzrResult<LevelTemplate> {
    let range = document.section(LEVELS_OPEN, LEVELS_CLOSE)?;
    let mut groups = Vec::new();
    let mut current = Vec::new();

    for index in range {
        let line = document.lines()[index].as_str();
        if line.trim().is_empty() {
            if let Some(group) = LevelGroup::new(std::mem::take(&mut current)) {
                groups.push(group);
            }
            continue;
        }

        let level = parse_level_row(&TokenRow::parse(line))
            .map_err(|error| row_error("DOCUMENT.LEVEL_ROW", index, error))?;
        current.push(level);
    }
    if let Some(group) = LevelGroup::new(current) {
        groups.push(group);
    }

    if groups.is_empty() {
        return Err(AzrError::document_format(
            "DOCUMENT.NO_LEVELS",
            format!("'{}' section contains no level rows", LEVELS_OPEN),
        ));
    }
    Ok(LevelTemplate::new(groups))
}

/// Writes energies and widths of `levels` onto the level rows, in order.
pub(super) fn write_levels(document: &mut ConfigDocument, levels: &[Level]) -> AzrResult<()> {
    let range = document.section(LEVELS_OPEN, LEVELS_CLOSE)?;
    let row_indices: Vec<usize> = range
        .clone()
        .filter(|&index| !document.lines()[index].trim().is_empty())
        .collect();

    if row_indices.len() != levels.len() {
        return Err(AzrError::shape_mismatch(
            "SHAPE.LEVEL_ROWS",
            format!(
                "document has {} level rows but {} levels were supplied",
                row_indices.len(),
                levels.len()
            ),
        ));
    }

    let mut rows: Vec<String> = document.lines()[range.clone()].to_vec();
    for (index, level) in row_indices.into_iter().zip(levels) {
        let mut row = TokenRow::parse(&document.lines()[index]);
        row.replace(LEVEL_ENERGY, &number_token(level.energy))
            .and_then(|_| row.replace(LEVEL_WIDTH, &number_token(level.width)))
            .map_err(|error| row_error("DOCUMENT.LEVEL_ROW", index, error))?;
        rows[index - range.start] = row.as_str().to_string();
    }
    document.replace_range(range, rows)
}
