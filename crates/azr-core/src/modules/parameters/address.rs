use super::{Parameter, ParameterKind, infer_parameters};
use crate::domain::{AzrError, AzrResult};
use crate::modules::levels::{Level, LevelTemplate};
use serde::Serialize;

/// Position of a parameter inside the level template.
///
/// For `Energy` the address covers every channel row of group `group`;
/// for `Width` it is the single row `channel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Address {
    pub group: usize,
    pub channel: usize,
    pub kind: ParameterKind,
}

/// Resolves every parameter to an address, in order.
///
/// `rank` counts groups with the parameter's spin-parity in document order,
/// so rank 1 is the first matching group.
pub fn resolve(parameters: &[Parameter], template: &LevelTemplate) -> AzrResult<Vec<Address>> {
    parameters
        .iter()
        .enumerate()
        .map(|(index, parameter)| resolve_one(index, parameter, template))
        .collect()
}

fn resolve_one(index: usize, parameter: &Parameter, template: &LevelTemplate) -> AzrResult<Address> {
    let spin_parity = parameter.spin_parity();
    let matching = template.groups_matching(&spin_parity);
    if matching.is_empty() {
        return Err(AzrError::address_resolution(
            "ADDRESS.UNKNOWN_SPIN_PARITY",
            format!(
                "parameter {} ({}) refers to J^pi {} which has no level group in the document",
                index,
                parameter.label(),
                spin_parity
            ),
        ));
    }

    let group = parameter
        .rank
        .checked_sub(1)
        .and_then(|offset| matching.get(offset).copied())
        .ok_or_else(|| {
            AzrError::address_out_of_bounds(
                "ADDRESS.RANK",
                format!(
                    "parameter {} ({}) has rank {} but the document has {} level group(s) with J^pi {}",
                    index,
                    parameter.label(),
                    parameter.rank,
                    matching.len(),
                    spin_parity
                ),
            )
        })?;

    let channel_count = template.group(group).map_or(0, |group| group.len());
    let channel = parameter
        .channel
        .checked_sub(1)
        .filter(|&channel| channel < channel_count)
        .ok_or_else(|| {
            AzrError::address_out_of_bounds(
                "ADDRESS.CHANNEL",
                format!(
                    "parameter {} ({}) names channel {} but level group {} has {} channel(s)",
                    index,
                    parameter.label(),
                    parameter.channel,
                    group,
                    channel_count
                ),
            )
        })?;

    Ok(Address {
        group,
        channel,
        kind: parameter.kind,
    })
}

/// The immutable part of an evaluation: template levels, the sampled
/// parameters, and their addresses resolved once at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterModel {
    template: LevelTemplate,
    parameters: Vec<Parameter>,
    addresses: Vec<Address>,
}

impl ParameterModel {
    pub fn new(template: LevelTemplate, parameters: Vec<Parameter>) -> AzrResult<Self> {
        let addresses = resolve(&parameters, &template)?;
        Ok(Self {
            template,
            parameters,
            addresses,
        })
    }

    pub fn inferred(template: LevelTemplate) -> AzrResult<Self> {
        let parameters = infer_parameters(&template);
        Self::new(template, parameters)
    }

    pub fn template(&self) -> &LevelTemplate {
        &self.template
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Template values at every address; a `theta` that reproduces the document.
    pub fn template_values(&self) -> Vec<f64> {
        self.addresses
            .iter()
            .map(|address| {
                let group = &self.template.groups()[address.group];
                address.kind.get(&group.levels()[address.channel])
            })
            .collect()
    }

    /// Applies `theta` to a copy of the template and returns the flattened
    /// levels in document order.
    pub fn generate_levels(&self, theta: &[f64]) -> AzrResult<Vec<Level>> {
        if theta.len() != self.parameters.len() {
            return Err(AzrError::shape_mismatch(
                "SHAPE.THETA",
                format!(
                    "expected {} level parameter value(s), got {}",
                    self.parameters.len(),
                    theta.len()
                ),
            ));
        }

        let mut groups = self.template.groups().to_vec();
        for (&value, address) in theta.iter().zip(&self.addresses) {
            let levels = groups[address.group].levels_mut();
            match address.kind {
                ParameterKind::Energy => {
                    for level in levels.iter_mut() {
                        ParameterKind::Energy.set(level, value);
                    }
                }
                ParameterKind::Width => ParameterKind::Width.set(&mut levels[address.channel], value),
            }
        }

        Ok(groups
            .into_iter()
            .flat_map(|group| group.levels().to_vec())
            .collect())
    }
}
