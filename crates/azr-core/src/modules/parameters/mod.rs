mod address;

pub use address::{Address, ParameterModel, resolve};

use crate::domain::SpinParity;
use crate::modules::levels::{Level, LevelTemplate};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Which field of a level a parameter drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Energy,
    Width,
}

impl ParameterKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Energy => "energy",
            Self::Width => "width",
        }
    }

    pub fn get(self, level: &Level) -> f64 {
        match self {
            Self::Energy => level.energy,
            Self::Width => level.width,
        }
    }

    pub fn set(self, level: &mut Level, value: f64) {
        match self {
            Self::Energy => level.energy = value,
            Self::Width => level.width = value,
        }
    }
}

impl Display for ParameterKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// A sampled level quantity, addressed by physics rather than by position.
///
/// `channel` and `rank` are one-based. `rank` picks among repeated level
/// groups with the same spin-parity, in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub spin: f64,
    pub parity: i32,
    pub kind: ParameterKind,
    pub channel: usize,
    #[serde(default = "default_rank")]
    pub rank: usize,
    #[serde(default)]
    pub is_anc: bool,
}

fn default_rank() -> usize {
    1
}

impl Parameter {
    pub fn new(spin: f64, parity: i32, kind: ParameterKind, channel: usize) -> Self {
        Self {
            spin,
            parity,
            kind,
            channel,
            rank: 1,
            is_anc: false,
        }
    }

    pub fn with_rank(mut self, rank: usize) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_anc(mut self, is_anc: bool) -> Self {
        self.is_anc = is_anc;
        self
    }

    pub fn spin_parity(&self) -> SpinParity {
        SpinParity::new(self.spin, self.parity)
    }

    pub fn label(&self) -> String {
        let rank = if self.rank > 1 {
            format!("#{}", self.rank)
        } else {
            String::new()
        };
        match (self.kind, self.is_anc) {
            (ParameterKind::Energy, _) => format!("E_{{{}{}}}", self.spin_parity(), rank),
            (ParameterKind::Width, true) => {
                format!("ANC_{{{}{},{}}}", self.spin_parity(), rank, self.channel)
            }
            (ParameterKind::Width, false) => {
                format!("Γ_{{{}{},{}}}", self.spin_parity(), rank, self.channel)
            }
        }
    }
}

/// Derives the free parameters from the fixed flags of the template levels.
///
/// The first row of a group carries the level energy; every row carries its
/// own width. A width below the separation energy is tagged as an ANC.
pub fn infer_parameters(template: &LevelTemplate) -> Vec<Parameter> {
    let mut parameters = Vec::new();
    let mut seen: Vec<SpinParity> = Vec::new();

    for group in template.groups() {
        let spin_parity = group.spin_parity();
        seen.push(spin_parity);
        let rank = seen
            .iter()
            .filter(|candidate| candidate.matches(&spin_parity))
            .count();

        for (position, level) in group.levels().iter().enumerate() {
            let channel = position + 1;
            if position == 0 && !level.energy_fixed {
                parameters.push(
                    Parameter::new(level.spin, level.parity, ParameterKind::Energy, channel)
                        .with_rank(rank),
                );
            }
            if !level.width_fixed {
                parameters.push(
                    Parameter::new(level.spin, level.parity, ParameterKind::Width, channel)
                        .with_rank(rank)
                        .with_anc(level.is_below_separation()),
                );
            }
        }
    }

    parameters
}

#[cfg(test)]
mod tests {
    use super::{Parameter, ParameterKind, infer_parameters};
    use crate::modules::levels::fixtures::{level, template};

    #[test]
    fn kinds_route_to_their_own_field() {
        let mut target = level(0.5, 1, 2.0, 10.0, 1);
        ParameterKind::Energy.set(&mut target, 2.37);
        ParameterKind::Width.set(&mut target, 33600.0);
        assert_eq!(ParameterKind::Energy.get(&target), 2.37);
        assert_eq!(ParameterKind::Width.get(&target), 33600.0);
    }

    #[test]
    fn labels_distinguish_kind_anc_and_rank() {
        let energy = Parameter::new(0.5, 1, ParameterKind::Energy, 1);
        let width = Parameter::new(0.5, 1, ParameterKind::Width, 2);
        let anc = Parameter::new(0.5, -1, ParameterKind::Width, 1).with_anc(true);
        let ranked = Parameter::new(1.5, 1, ParameterKind::Energy, 1).with_rank(3);

        assert_eq!(energy.label(), "E_{1/2+}");
        assert_eq!(width.label(), "Γ_{1/2+,2}");
        assert_eq!(anc.label(), "ANC_{1/2-,1}");
        assert_eq!(ranked.label(), "E_{3/2+#3}");
    }

    #[test]
    fn inference_follows_fixed_flags_and_tags_ancs() {
        let mut bound = level(0.5, -1, -0.6, 1.8, 1);
        bound.energy_fixed = true;
        let mut capture = level(0.5, 1, 2.37, -0.6, 2);
        capture.energy_fixed = true;
        let mut fixed_width = level(2.5, 1, 3.55, 45200.0, 1);
        fixed_width.width_fixed = true;

        let template = template(vec![
            vec![bound],
            vec![level(0.5, 1, 2.37, 33600.0, 1), capture],
            vec![fixed_width],
        ]);
        let parameters = infer_parameters(&template);

        assert_eq!(
            parameters,
            vec![
                Parameter::new(0.5, -1, ParameterKind::Width, 1).with_anc(true),
                Parameter::new(0.5, 1, ParameterKind::Energy, 1),
                Parameter::new(0.5, 1, ParameterKind::Width, 1),
                Parameter::new(0.5, 1, ParameterKind::Width, 2),
                Parameter::new(2.5, 1, ParameterKind::Energy, 1),
            ]
        );
    }

    #[test]
    fn inference_counts_repeated_spin_parity_groups_as_ranks() {
        let template = template(vec![
            vec![level(1.5, 1, 3.0, 10.0, 1)],
            vec![level(1.5, 1, 7.2, 313791.0, 1)],
            vec![level(1.5, -1, 8.0, 10.0, 1)],
            vec![level(1.5, 1, 9.0, 10.0, 1)],
        ]);
        let ranks: Vec<(i32, usize)> = infer_parameters(&template)
            .into_iter()
            .filter(|parameter| parameter.kind == ParameterKind::Energy)
            .map(|parameter| (parameter.parity, parameter.rank))
            .collect();
        assert_eq!(ranks, vec![(1, 1), (1, 2), (-1, 1), (1, 3)]);
    }

    #[test]
    fn parameters_deserialize_with_default_rank() {
        let parameter: Parameter =
            serde_json::from_str(r#"{"spin":0.5,"parity":1,"kind":"width","channel":2}"#)
                .expect("parameter json");
        assert_eq!(parameter, Parameter::new(0.5, 1, ParameterKind::Width, 2));
    }
}
