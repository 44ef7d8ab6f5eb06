//! Relaxed numeric comparison.
//!
//! A [`Tolerance`] carries the host's settings; [`Tolerance::strategy`] picks
//! the single strategy that applies. Every strategy reduces to a "near" test,
//! which [`Comparison::fuzzy`] combines with the exact ordering of the
//! operands.

use std::hash::{Hash, Hasher};

use num_traits::Float;

use crate::operator::Comparison;
use crate::value::{compare_numbers, Number};

/// Host-supplied tolerance settings.
///
/// More than one field may be set, but only one strategy is ever active:
/// integer range wins over float range, which wins over the proportional
/// value.
#[derive(Clone, Copy, Debug, Default)]
pub struct Tolerance {
    integer_range: Option<u64>,
    float_range: Option<f64>,
    proportion: Option<f64>,
}

impl Tolerance {
    pub fn none() -> Self {
        Self::default()
    }

    /// Operands within `range` of each other compare equal.
    pub fn with_integer_range(mut self, range: u64) -> Self {
        self.integer_range = Some(range);
        self
    }

    /// Operands within `range` of each other compare equal.
    pub fn with_float_range(mut self, range: f64) -> Self {
        self.float_range = Some(range);
        self
    }

    /// Above `1.0` this is a ratio: `1.1` accepts operands whose magnitudes
    /// differ by at most a factor of 1.1. Between `0.0` and `1.0` it is a
    /// fraction of the larger magnitude: `0.05` accepts a 5% difference.
    pub fn with_proportion(mut self, proportion: f64) -> Self {
        self.proportion = Some(proportion);
        self
    }

    pub fn integer_range(&self) -> Option<u64> {
        self.integer_range
    }

    pub fn float_range(&self) -> Option<f64> {
        self.float_range
    }

    pub fn proportion(&self) -> Option<f64> {
        self.proportion
    }

    /// The one strategy these settings select, if any.
    pub fn strategy(&self) -> Option<Strategy> {
        if let Some(range) = self.integer_range {
            return Some(Strategy::IntegerRange(range));
        }
        if let Some(range) = self.float_range {
            // NaN and negative ranges degrade to an exact comparison.
            return Some(Strategy::FloatRange(range.max(0.0)));
        }
        match self.proportion {
            // Exactly 1.0 is a ratio with no slack at all.
            Some(p) if p >= 1.0 => Some(Strategy::Ratio(p)),
            Some(p) if p > 0.0 => Some(Strategy::Percentage(p)),
            _ => None,
        }
    }

    fn key(&self) -> (Option<u64>, Option<u64>, Option<u64>) {
        (
            self.integer_range,
            self.float_range.map(f64::to_bits),
            self.proportion.map(f64::to_bits),
        )
    }
}

impl PartialEq for Tolerance {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Tolerance {}

impl Hash for Tolerance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// The active relaxation of a tolerant comparison.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Strategy {
    IntegerRange(u64),
    FloatRange(f64),
    Ratio(f64),
    Percentage(f64),
}

impl Strategy {
    /// Whether `lhs` and `rhs` are close enough to be treated as equal.
    pub fn near(self, lhs: Number, rhs: Number) -> bool {
        match self {
            Self::IntegerRange(range) => match (lhs, rhs) {
                (Number::Float(_), _) | (_, Number::Float(_)) => {
                    near_range(lhs.to_f64(), rhs.to_f64(), range as f64)
                }
                _ => match (lhs.to_i64(), rhs.to_i64()) {
                    (Ok(l), Ok(r)) => near_integer_range(l, r, range),
                    _ => false,
                },
            },
            Self::FloatRange(range) => near_range(lhs.to_f64(), rhs.to_f64(), range),
            Self::Ratio(ratio) => near_ratio(lhs.to_f64(), rhs.to_f64(), ratio),
            Self::Percentage(fraction) => near_percentage(lhs.to_f64(), rhs.to_f64(), fraction),
        }
    }

    pub fn compare(self, op: Comparison, lhs: Number, rhs: Number) -> bool {
        op.fuzzy(compare_numbers(lhs, rhs), self.near(lhs, rhs))
    }
}

pub fn near_integer_range(lhs: i64, rhs: i64, range: u64) -> bool {
    lhs.abs_diff(rhs) <= range
}

pub fn near_range<T: Float>(lhs: T, rhs: T, range: T) -> bool {
    lhs == rhs || (lhs - rhs).abs() <= range
}

/// `ratio` is at least one; the slack is the excess over one, scaled by the
/// smaller magnitude.
pub fn near_ratio<T: Float>(lhs: T, rhs: T, ratio: T) -> bool {
    lhs == rhs || (lhs - rhs).abs() <= (ratio - T::one()) * lhs.abs().min(rhs.abs())
}

pub fn near_percentage<T: Float>(lhs: T, rhs: T, fraction: T) -> bool {
    lhs == rhs || (lhs - rhs).abs() <= fraction * lhs.abs().max(rhs.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_range_takes_precedence() {
        let tolerance = Tolerance::none()
            .with_proportion(0.5)
            .with_float_range(3.0)
            .with_integer_range(2);
        assert_eq!(tolerance.strategy(), Some(Strategy::IntegerRange(2)));

        let tolerance = Tolerance::none().with_proportion(0.5).with_float_range(3.0);
        assert_eq!(tolerance.strategy(), Some(Strategy::FloatRange(3.0)));
    }

    #[test]
    fn proportion_splits_on_value() {
        let strategy = |p| Tolerance::none().with_proportion(p).strategy();
        assert_eq!(strategy(1.5), Some(Strategy::Ratio(1.5)));
        assert_eq!(strategy(0.1), Some(Strategy::Percentage(0.1)));
        assert_eq!(strategy(1.0), Some(Strategy::Ratio(1.0)));
        assert_eq!(strategy(0.0), None);
        assert_eq!(strategy(-2.0), None);
        assert_eq!(strategy(f64::NAN), None);
        assert_eq!(Tolerance::none().strategy(), None);
    }

    #[test]
    fn zero_tolerance_is_exact() {
        let pairs = [(1.0, 2.0), (2.0, 2.0), (3.0, 2.0), (f64::INFINITY, f64::INFINITY)];
        let strategies = [
            Strategy::IntegerRange(0),
            Strategy::FloatRange(0.0),
            Strategy::Ratio(1.0),
            Strategy::Percentage(0.0),
        ];
        for strategy in strategies {
            for (l, r) in pairs {
                let (l, r) = (Number::Float(l), Number::Float(r));
                for op in Comparison::ALL {
                    let exact = op.holds(compare_numbers(l, r));
                    assert_eq!(strategy.compare(op, l, r), exact, "{strategy:?} {op:?} {l} {r}");
                }
            }
        }
    }

    #[test]
    fn ranges() {
        assert!(near_integer_range(10, 12, 2));
        assert!(!near_integer_range(10, 13, 2));
        assert!(near_integer_range(i64::MIN, i64::MAX, u64::MAX));
        assert!(near_range(1.0, 1.05, 0.1));
        assert!(!near_range(1.0, 1.2, 0.1));
    }

    #[test]
    fn proportional() {
        assert!(near_ratio(100.0, 110.0, 1.1));
        assert!(!near_ratio(100.0, 111.0, 1.1));
        assert!(near_percentage(100.0, 104.0, 0.05));
        assert!(!near_percentage(100.0, 94.0, 0.05));
    }

    #[test]
    fn less_than_is_monotonic_in_range() {
        let (l, r) = (Number::Int32(10), Number::Int32(13));
        let results: Vec<bool> = (0..6)
            .map(|range| Strategy::IntegerRange(range).compare(Comparison::LessThan, l, r))
            .collect();
        // Widening the range only ever turns `<` from true to false.
        assert_eq!(results, [true, true, true, false, false, false]);

        let results: Vec<bool> = (0..6)
            .map(|range| Strategy::IntegerRange(range).compare(Comparison::LessThanOrEqual, r, l))
            .collect();
        assert_eq!(results, [false, false, false, true, true, true]);
    }

    /// `results` starts at `from` and flips exactly once.
    fn flips_once(name: &str, results: &[bool], from: bool) {
        assert_eq!(results.first(), Some(&from), "{name}: {results:?}");
        assert_eq!(results.last(), Some(&!from), "{name}: {results:?}");
        let flips = results.windows(2).filter(|w| w[0] != w[1]).count();
        assert_eq!(flips, 1, "{name}: {results:?}");
    }

    #[test]
    fn proportional_and_float_strategies_are_monotonic() {
        let sweeps: [(&str, Vec<Strategy>); 3] = [
            (
                "float range",
                (0..40).map(|i| Strategy::FloatRange(f64::from(i) * 0.25)).collect(),
            ),
            (
                "ratio",
                (0..40).map(|i| Strategy::Ratio(1.0 + f64::from(i) * 0.025)).collect(),
            ),
            (
                "percentage",
                (0..40).map(|i| Strategy::Percentage(f64::from(i) * 0.02)).collect(),
            ),
        ];
        let (low, high) = (Number::Float(10.0), Number::Int32(13));
        for (name, strategies) in sweeps {
            let sweep = |op: Comparison, l: Number, r: Number| -> Vec<bool> {
                strategies.iter().map(|s| s.compare(op, l, r)).collect()
            };
            flips_once(name, &sweep(Comparison::LessThan, low, high), true);
            flips_once(name, &sweep(Comparison::GreaterThan, high, low), true);
            flips_once(name, &sweep(Comparison::LessThanOrEqual, high, low), false);
            flips_once(name, &sweep(Comparison::GreaterThanOrEqual, low, high), false);
            flips_once(name, &sweep(Comparison::Equals, low, high), false);
            flips_once(name, &sweep(Comparison::NotEquals, low, high), true);
        }
    }

    #[test]
    fn integer_range_on_floats() {
        let near = Strategy::IntegerRange(1).near(Number::Float(1.0), Number::Float(1.9));
        assert!(near);
    }
}
