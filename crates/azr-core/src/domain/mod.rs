pub mod errors;

pub use errors::{AzrError, AzrErrorCategory, AzrResult};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Total angular momentum and parity of a level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpinParity {
    pub spin: f64,
    pub parity: i32,
}

impl SpinParity {
    pub const fn new(spin: f64, parity: i32) -> Self {
        Self { spin, parity }
    }

    /// The signed `spin * parity` product.
    pub fn signed(&self) -> f64 {
        self.spin * f64::from(self.parity)
    }

    /// Same spin (to within rounding of decimal input) and same parity.
    pub fn matches(&self, other: &SpinParity) -> bool {
        self.parity == other.parity && (self.spin - other.spin).abs() < 1.0e-9
    }

    /// Parses `1/2+`, `0.5-`, `3+` style labels.
    pub fn parse_label(label: &str) -> Option<Self> {
        let label = label.trim();
        let (magnitude, parity) = if let Some(rest) = label.strip_suffix('+') {
            (rest, 1)
        } else if let Some(rest) = label.strip_suffix('-') {
            (rest, -1)
        } else {
            return None;
        };

        let spin = match magnitude.split_once('/') {
            Some((numerator, denominator)) => {
                let numerator = numerator.trim().parse::<f64>().ok()?;
                let denominator = denominator.trim().parse::<f64>().ok()?;
                if denominator == 0.0 {
                    return None;
                }
                numerator / denominator
            }
            None => magnitude.trim().parse::<f64>().ok()?,
        };

        (spin >= 0.0).then_some(Self { spin, parity })
    }
}

impl Display for SpinParity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let sign = if self.parity > 0 { '+' } else { '-' };
        let twice = (self.spin * 2.0).round();
        if (twice - self.spin * 2.0).abs() > 1.0e-9 {
            write!(f, "{}{}", self.spin, sign)
        } else if twice as i64 % 2 == 0 {
            write!(f, "{}{}", twice as i64 / 2, sign)
        } else {
            write!(f, "{}/2{}", twice as i64, sign)
        }
    }
}

/// Menu choice answered on the solver's standard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunMode {
    CalculateWithData,
    CalculateWithoutData,
}

impl RunMode {
    pub const fn choice(self) -> u8 {
        match self {
            Self::CalculateWithData => 1,
            Self::CalculateWithoutData => 3,
        }
    }
}

impl Display for RunMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CalculateWithData => f.write_str("calculate-with-data"),
            Self::CalculateWithoutData => f.write_str("calculate-without-data"),
        }
    }
}

/// Public evaluation entry points; used to label spans and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Predict,
    Extrapolate,
    Rwas,
    CaptureIntegrals,
}

impl Operation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Predict => "predict",
            Self::Extrapolate => "extrapolate",
            Self::Rwas => "rwas",
            Self::CaptureIntegrals => "capture_integrals",
        }
    }

    pub const fn run_mode(self) -> RunMode {
        match self {
            Self::Extrapolate => RunMode::CalculateWithoutData,
            Self::Predict | Self::Rwas | Self::CaptureIntegrals => RunMode::CalculateWithData,
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{Operation, RunMode, SpinParity};

    #[test]
    fn spin_parity_labels_render_as_fractions() {
        assert_eq!(SpinParity::new(0.5, 1).to_string(), "1/2+");
        assert_eq!(SpinParity::new(1.5, -1).to_string(), "3/2-");
        assert_eq!(SpinParity::new(2.0, 1).to_string(), "2+");
        assert_eq!(SpinParity::new(0.0, -1).to_string(), "0-");
    }

    #[test]
    fn spin_parity_labels_parse_decimal_and_fraction_forms() {
        assert_eq!(SpinParity::parse_label("1/2+"), Some(SpinParity::new(0.5, 1)));
        assert_eq!(SpinParity::parse_label("1.5-"), Some(SpinParity::new(1.5, -1)));
        assert_eq!(SpinParity::parse_label("3+"), Some(SpinParity::new(3.0, 1)));
        assert_eq!(SpinParity::parse_label("1/2"), None);
        assert_eq!(SpinParity::parse_label("1/0+"), None);
    }

    #[test]
    fn signed_product_distinguishes_parity() {
        assert_eq!(SpinParity::new(0.5, -1).signed(), -0.5);
        assert_eq!(SpinParity::new(2.5, 1).signed(), 2.5);
    }

    #[test]
    fn matching_keeps_zero_spin_parities_apart() {
        assert!(SpinParity::new(0.5, 1).matches(&SpinParity::new(1.0 / 2.0, 1)));
        assert!(!SpinParity::new(0.0, 1).matches(&SpinParity::new(0.0, -1)));
        assert_eq!(
            SpinParity::new(0.0, 1).signed(),
            SpinParity::new(0.0, -1).signed()
        );
    }

    #[test]
    fn operations_select_solver_menu_choices() {
        assert_eq!(Operation::Predict.run_mode().choice(), 1);
        assert_eq!(Operation::Rwas.run_mode(), RunMode::CalculateWithData);
        assert_eq!(Operation::Extrapolate.run_mode().choice(), 3);
        assert_eq!(Operation::CaptureIntegrals.as_str(), "capture_integrals");
    }
}
