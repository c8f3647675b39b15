pub mod errors;

pub use errors::{SweepError, SweepErrorCategory, SweepResult};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

const DIGEST_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const DIGEST_PRIME: u64 = 0x00000100000001B3;

/// A perturbable deck field. Declaration order is the order in which the
/// materializer applies patches to a deck.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    OilSaturation,
    InitialPressure,
    Bhp,
    InjectionRate,
    Skin,
    OilRate,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Self::OilSaturation,
        Self::InitialPressure,
        Self::Bhp,
        Self::InjectionRate,
        Self::Skin,
        Self::OilRate,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OilSaturation => "SO",
            Self::InitialPressure => "P",
            Self::Bhp => "BHP",
            Self::InjectionRate => "QINJ",
            Self::Skin => "SKIN",
            Self::OilRate => "ORAT",
        }
    }

    pub const fn is_integral(self) -> bool {
        matches!(self, Self::Bhp | Self::OilRate)
    }

    pub fn field_value(self, value: f64) -> FieldValue {
        match self {
            Self::OilSaturation => FieldValue::Saturation(value),
            Self::Bhp | Self::OilRate => FieldValue::Integer(value.round() as i64),
            Self::InitialPressure | Self::InjectionRate | Self::Skin => {
                FieldValue::Decimal(value)
            }
        }
    }
}

impl Display for Dimension {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Replacement text for a located field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    /// Rendered without a decimal point.
    Integer(i64),
    /// Rendered with exactly two decimals.
    Saturation(f64),
    /// Rendered in the shortest form that round-trips (`40`, `79.5`, `-2`).
    Decimal(f64),
}

impl FieldValue {
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{}", value),
            Self::Saturation(value) => write!(f, "{:.2}", value),
            Self::Decimal(value) => write!(f, "{}", value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchCount {
    Zero,
    One,
}

impl MatchCount {
    pub const fn from_found(found: bool) -> Self {
        if found { Self::One } else { Self::Zero }
    }

    pub const fn is_zero(self) -> bool {
        matches!(self, Self::Zero)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterValue {
    pub dimension: Dimension,
    pub value: f64,
}

/// One concrete point of a sweep design, in design dimension order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct ParameterSet {
    values: Vec<ParameterValue>,
}

impl ParameterSet {
    pub fn new(values: impl IntoIterator<Item = (Dimension, f64)>) -> Self {
        Self {
            values: values
                .into_iter()
                .map(|(dimension, value)| ParameterValue { dimension, value })
                .collect(),
        }
    }

    pub fn get(&self, dimension: Dimension) -> Option<f64> {
        self.values
            .iter()
            .find(|entry| entry.dimension == dimension)
            .map(|entry| entry.value)
    }

    pub fn values(&self) -> &[ParameterValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of positions at which `self` and `other` hold different values.
    pub fn differing_positions(&self, other: &ParameterSet) -> usize {
        self.values
            .iter()
            .zip(&other.values)
            .filter(|(left, right)| left.dimension != right.dimension || left.value != right.value)
            .count()
            + self.values.len().abs_diff(other.values.len())
    }

    pub fn label(&self) -> String {
        self.values
            .iter()
            .map(|entry| {
                format!(
                    "{}={}",
                    entry.dimension,
                    entry.dimension.field_value(entry.value)
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// FNV-1a digest of the rendered parameter values.
    pub fn digest(&self) -> u64 {
        self.label().bytes().fold(DIGEST_OFFSET_BASIS, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(DIGEST_PRIME)
        })
    }
}

/// Two consecutive TSTEP durations summing to a fixed total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeStepSplit {
    pub first: i64,
    pub second: i64,
}

#[cfg(test)]
mod tests {
    use super::{Dimension, FieldValue, MatchCount, ParameterSet};

    #[test]
    fn field_values_render_with_dimension_formatting() {
        assert_eq!(Dimension::OilSaturation.field_value(0.8).render(), "0.80");
        assert_eq!(Dimension::Bhp.field_value(395.0).render(), "395");
        assert_eq!(Dimension::InjectionRate.field_value(79.5).render(), "79.5");
        assert_eq!(Dimension::InjectionRate.field_value(40.0).render(), "40");
        assert_eq!(Dimension::Skin.field_value(-2.0).render(), "-2");
        assert_eq!(FieldValue::Saturation(1.0 - 0.84).render(), "0.16");
    }

    #[test]
    fn dimension_order_is_patch_order() {
        let mut dimensions = vec![Dimension::Skin, Dimension::Bhp, Dimension::OilSaturation];
        dimensions.sort();
        assert_eq!(
            dimensions,
            vec![Dimension::OilSaturation, Dimension::Bhp, Dimension::Skin]
        );
    }

    #[test]
    fn parameter_set_label_and_digest_are_deterministic() {
        let first = ParameterSet::new([(Dimension::Bhp, 350.0), (Dimension::Skin, -2.0)]);
        let second = ParameterSet::new([(Dimension::Bhp, 350.0), (Dimension::Skin, -2.0)]);
        let other = ParameterSet::new([(Dimension::Bhp, 350.0), (Dimension::Skin, 2.0)]);

        assert_eq!(first.label(), "BHP=350, SKIN=-2");
        assert_eq!(first.digest(), second.digest());
        assert_ne!(first.digest(), other.digest());
        assert_eq!(first.differing_positions(&other), 1);
        assert_eq!(first.get(Dimension::Skin), Some(-2.0));
        assert_eq!(first.get(Dimension::OilRate), None);
    }

    #[test]
    fn match_count_tracks_whether_a_field_was_found() {
        assert!(MatchCount::from_found(false).is_zero());
        assert!(!MatchCount::from_found(true).is_zero());
    }
}
