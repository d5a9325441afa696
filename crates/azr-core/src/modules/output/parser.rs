use crate::domain::{AzrError, AzrResult, SpinParity};
use serde::Serialize;

/// Reduced width amplitude of one channel of one level, as reported by the
/// solver after a calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReducedWidthAmplitude {
    pub spin_parity: SpinParity,
    pub value: f64,
}

/// Parses the parameter report: a `J = <spin><sign>` line opens a level and
/// every following `g_int = <value>` adds one amplitude to it.
pub(super) fn parse_reduced_width_amplitudes(source: &str) -> AzrResult<Vec<ReducedWidthAmplitude>> {
    let mut current: Option<SpinParity> = None;
    let mut amplitudes = Vec::new();

    for (index, line) in source.lines().enumerate() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("J =") {
            let label = rest.split_whitespace().next().unwrap_or_default();
            current = Some(SpinParity::parse_label(label).ok_or_else(|| {
                AzrError::output_parse(
                    "OUTPUT.RWA_SPIN_PARITY",
                    format!("line {}: '{}' is not a spin-parity label", index + 1, label),
                )
            })?);
            continue;
        }

        let Some((_, rest)) = trimmed.split_once("g_int =") else {
            continue;
        };
        let token = rest.split_whitespace().next().unwrap_or_default();
        let value = token.parse::<f64>().map_err(|_| {
            AzrError::output_parse(
                "OUTPUT.RWA_VALUE",
                format!("line {}: '{}' is not a reduced width amplitude", index + 1, token),
            )
        })?;
        let spin_parity = current.ok_or_else(|| {
            AzrError::output_parse(
                "OUTPUT.RWA_ORPHAN",
                format!("line {}: amplitude appears before any 'J =' line", index + 1),
            )
        })?;
        amplitudes.push(ReducedWidthAmplitude { spin_parity, value });
    }

    Ok(amplitudes)
}
