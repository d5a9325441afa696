use crate::domain::SpinParity;
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// One spin-parity sub-state of a level in one reaction channel.
///
/// `width` is a partial width in eV, or an asymptotic normalization
/// coefficient when the level lies below the channel's separation energy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Level {
    pub spin: f64,
    pub parity: i32,
    pub energy: f64,
    pub energy_fixed: bool,
    pub width: f64,
    pub width_fixed: bool,
    pub channel_radius: f64,
    pub channel: i32,
    pub separation_energy: f64,
}

impl Level {
    pub fn spin_parity(&self) -> SpinParity {
        SpinParity::new(self.spin, self.parity)
    }

    pub fn is_below_separation(&self) -> bool {
        self.energy < self.separation_energy
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} | {} MeV | {} eV | channel {}",
            self.spin_parity(),
            self.energy,
            self.width,
            self.channel
        )
    }
}

/// The channel rows of one physical level; they share a single energy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelGroup {
    levels: Vec<Level>,
}

impl LevelGroup {
    pub(crate) fn new(levels: Vec<Level>) -> Option<Self> {
        (!levels.is_empty()).then_some(Self { levels })
    }

    pub fn spin_parity(&self) -> SpinParity {
        self.levels[0].spin_parity()
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub(crate) fn levels_mut(&mut self) -> &mut [Level] {
        &mut self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Levels exactly as loaded from the document, grouped in document order.
///
/// Evaluations work on clones; the template itself is never mutated after
/// loading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelTemplate {
    groups: Vec<LevelGroup>,
}

impl LevelTemplate {
    pub fn new(groups: Vec<LevelGroup>) -> Self {
        Self { groups }
    }

    pub fn groups(&self) -> &[LevelGroup] {
        &self.groups
    }

    pub fn group(&self, index: usize) -> Option<&LevelGroup> {
        self.groups.get(index)
    }

    pub fn level_count(&self) -> usize {
        self.groups.iter().map(LevelGroup::len).sum()
    }

    /// Group-major, then channel order; matches the row order of the document.
    pub fn flatten(&self) -> Vec<Level> {
        self.groups
            .iter()
            .flat_map(|group| group.levels.iter().cloned())
            .collect()
    }

    /// Indices of every group with the given spin-parity, in document order.
    pub fn groups_matching(&self, spin_parity: &SpinParity) -> Vec<usize> {
        self.groups
            .iter()
            .enumerate()
            .filter(|(_, group)| group.spin_parity().matches(spin_parity))
            .map(|(index, _)| index)
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::LevelGroup;
    use super::fixtures::{level, template};
    use crate::domain::SpinParity;

    #[test]
    fn empty_groups_are_not_constructed() {
        assert!(LevelGroup::new(Vec::new()).is_none());
    }

    #[test]
    fn flatten_is_group_major() {
        let template = template(vec![
            vec![level(0.5, 1, 2.37, 33600.0, 1), level(0.5, 1, 2.37, -0.6, 2)],
            vec![level(0.5, -1, -0.6, 1.8, 1)],
        ]);
        let flat = template.flatten();
        assert_eq!(flat.len(), 3);
        assert_eq!(template.level_count(), 3);
        assert_eq!(flat[1].channel, 2);
        assert_eq!(flat[2].parity, -1);
    }

    #[test]
    fn groups_matching_respects_parity() {
        let template = template(vec![
            vec![level(0.5, 1, 2.37, 1.0, 1)],
            vec![level(0.5, -1, -0.6, 1.0, 1)],
            vec![level(0.5, 1, 5.0, 1.0, 1)],
        ]);
        assert_eq!(template.groups_matching(&SpinParity::new(0.5, 1)), vec![0, 2]);
        assert_eq!(template.groups_matching(&SpinParity::new(0.5, -1)), vec![1]);
        assert!(template.groups_matching(&SpinParity::new(2.5, 1)).is_empty());
    }

    #[test]
    fn level_description_names_spin_parity_and_channel() {
        let description = level(1.5, -1, 3.5, 57500.0, 2).to_string();
        assert_eq!(description, "3/2- | 3.5 MeV | 57500 eV | channel 2");
        assert!(level(0.5, -1, -0.6, 1.8, 1).is_below_separation());
    }
}
