use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use num_traits::ToPrimitive;

use crate::error::{EvalError, EvalResult};

/// The broad category of a node or value. Every coercion decision starts here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Numeric,
    Boolean,
    String,
    ByteArray,
}

/// Machine representation of a numeric value.
///
/// Variants are declared in widening order, so `max` picks the representation
/// two operands are reconciled to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NumericType {
    Int32,
    Int64,
    Float,
}

impl NumericType {
    /// The shared representation for a binary operation over `self` and `other`.
    pub fn widen(self, other: Self) -> Self {
        self.max(other)
    }

    pub fn is_integer(self) -> bool {
        !matches!(self, Self::Float)
    }
}

/// A [`ValueKind`] refined with the numeric representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    Numeric(NumericType),
    Boolean,
    String,
    ByteArray,
}

impl ValueType {
    pub const INT32: Self = Self::Numeric(NumericType::Int32);
    pub const INT64: Self = Self::Numeric(NumericType::Int64);
    pub const FLOAT: Self = Self::Numeric(NumericType::Float);

    pub fn kind(self) -> ValueKind {
        match self {
            Self::Numeric(_) => ValueKind::Numeric,
            Self::Boolean => ValueKind::Boolean,
            Self::String => ValueKind::String,
            Self::ByteArray => ValueKind::ByteArray,
        }
    }
}

impl fmt::Display for NumericType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::Float => "Float",
        };
        f.write_str(name)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => n.fmt(f),
            Self::Boolean => f.write_str("Boolean"),
            Self::String => f.write_str("String"),
            Self::ByteArray => f.write_str("ByteArray"),
        }
    }
}

/// A numeric value in one of the supported representations.
///
/// `PartialEq` is structural: `Int32(6)` and `Float(6.0)` are different
/// values. Use [`compare_numbers`] for numeric comparison.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    Int32(i32),
    Int64(i64),
    Float(f64),
}

impl Number {
    pub fn numeric_type(self) -> NumericType {
        match self {
            Self::Int32(_) => NumericType::Int32,
            Self::Int64(_) => NumericType::Int64,
            Self::Float(_) => NumericType::Float,
        }
    }

    pub fn to_f64(self) -> f64 {
        match self {
            Self::Int32(v) => f64::from(v),
            Self::Int64(v) => v as f64,
            Self::Float(v) => v,
        }
    }

    /// Lossless conversion to `i64`. Fractional or out of range floats fail.
    pub fn to_i64(self) -> EvalResult<i64> {
        match self {
            Self::Int32(v) => Ok(i64::from(v)),
            Self::Int64(v) => Ok(v),
            Self::Float(v) if v.fract() == 0.0 => v
                .to_i64()
                .ok_or_else(|| self.conversion_error(NumericType::Int64)),
            Self::Float(_) => Err(self.conversion_error(NumericType::Int64)),
        }
    }

    /// Lossless conversion to `i32`.
    pub fn to_i32(self) -> EvalResult<i32> {
        self.to_i64()
            .ok()
            .and_then(|v| v.to_i32())
            .ok_or_else(|| self.conversion_error(NumericType::Int32))
    }

    /// Converts to `target`. Widening always succeeds; narrowing must be
    /// lossless.
    pub fn convert(self, target: NumericType) -> EvalResult<Number> {
        if self.numeric_type() == target {
            return Ok(self);
        }
        Ok(match target {
            NumericType::Int32 => Self::Int32(self.to_i32()?),
            NumericType::Int64 => Self::Int64(self.to_i64()?),
            NumericType::Float => Self::Float(self.to_f64()),
        })
    }

    fn conversion_error(self, target: NumericType) -> EvalError {
        EvalError::NumericConversion {
            value: self.to_string(),
            target,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int32(v) => v.fmt(f),
            Self::Int64(v) => v.fmt(f),
            Self::Float(v) => v.fmt(f),
        }
    }
}

/// Orders two numbers after widening them to a common representation.
///
/// Returns `None` when either side is NaN.
pub fn compare_numbers(lhs: Number, rhs: Number) -> Option<Ordering> {
    match (lhs, rhs) {
        (Number::Int32(l), Number::Int32(r)) => Some(l.cmp(&r)),
        (Number::Float(_), _) | (_, Number::Float(_)) => lhs.to_f64().partial_cmp(&rhs.to_f64()),
        // Both integers, at least one `Int64`.
        (l, r) => match (l.to_i64(), r.to_i64()) {
            (Ok(l), Ok(r)) => Some(l.cmp(&r)),
            _ => None,
        },
    }
}

/// A runtime value. String and byte-array payloads are shared, so cloning is
/// cheap.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Numeric(Number),
    Boolean(bool),
    String(Arc<str>),
    ByteArray(Arc<[u8]>),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Numeric(n) => ValueType::Numeric(n.numeric_type()),
            Self::Boolean(_) => ValueType::Boolean,
            Self::String(_) => ValueType::String,
            Self::ByteArray(_) => ValueType::ByteArray,
        }
    }

    pub fn kind(&self) -> ValueKind {
        self.value_type().kind()
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Self::Numeric(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::ByteArray(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => n.fmt(f),
            Self::Boolean(b) => b.fmt(f),
            Self::String(s) => s.fmt(f),
            Self::ByteArray(bytes) => {
                f.write_str("0x")?;
                bytes.iter().try_for_each(|b| write!(f, "{b:02x}"))
            }
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Numeric(Number::Int32(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Numeric(Number::Int64(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Numeric(Number::Float(v))
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Self::Numeric(n)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v.into())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::ByteArray(v.into())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Self::ByteArray(v.into())
    }
}

/// Orders byte arrays as unsigned magnitudes stored most significant byte
/// first. Leading zero bytes do not count, so `[0, 1]` equals `[1]`.
pub fn compare_bytes_msb_first(lhs: &[u8], rhs: &[u8]) -> Ordering {
    let lhs = magnitude(lhs);
    let rhs = magnitude(rhs);
    lhs.len().cmp(&rhs.len()).then_with(|| lhs.cmp(rhs))
}

fn magnitude(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

/// Culture-aware string ordering: letters compare case-insensitively first,
/// then lowercase sorts before uppercase. Used for ordering only; equality is
/// ordinal.
pub fn compare_culture(lhs: &str, rhs: &str) -> Ordering {
    let folded = lhs
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(rhs.chars().flat_map(char::to_lowercase));
    folded
        .then_with(|| {
            lhs.chars()
                .zip(rhs.chars())
                .map(|(l, r)| l.is_uppercase().cmp(&r.is_uppercase()))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| lhs.cmp(rhs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_order() {
        use NumericType::*;
        assert_eq!(Int32.widen(Int64), Int64);
        assert_eq!(Int64.widen(Float), Float);
        assert_eq!(Int32.widen(Int32), Int32);
    }

    #[test]
    fn narrowing_must_be_lossless() {
        assert_eq!(Number::Float(4.0).convert(NumericType::Int32), Ok(Number::Int32(4)));
        assert!(Number::Float(4.5).convert(NumericType::Int64).is_err());
        assert!(Number::Int64(i64::MAX).convert(NumericType::Int32).is_err());
        assert_eq!(Number::Int64(-7).convert(NumericType::Int32), Ok(Number::Int32(-7)));
        assert!(Number::Float(f64::NAN).to_i64().is_err());
    }

    #[test]
    fn mixed_number_ordering() {
        assert_eq!(
            compare_numbers(Number::Int32(2), Number::Int64(3)),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare_numbers(Number::Int64(3), Number::Float(3.0)),
            Some(Ordering::Equal)
        );
        assert_eq!(compare_numbers(Number::Float(f64::NAN), Number::Int32(0)), None);
    }

    #[test]
    fn msb_first_byte_order() {
        assert_eq!(compare_bytes_msb_first(&[1, 2], &[1, 2]), Ordering::Equal);
        assert_eq!(compare_bytes_msb_first(&[2, 1], &[1, 2]), Ordering::Greater);
        assert_eq!(compare_bytes_msb_first(&[0, 1], &[1]), Ordering::Equal);
        assert_eq!(compare_bytes_msb_first(&[1, 0], &[0xff]), Ordering::Greater);
        assert_eq!(compare_bytes_msb_first(&[], &[0]), Ordering::Equal);
    }

    #[test]
    fn culture_ordering_ignores_case_first() {
        assert_eq!(compare_culture("apple", "Banana"), Ordering::Less);
        assert_eq!(compare_culture("a", "A"), Ordering::Less);
        assert_eq!(compare_culture("B", "a"), Ordering::Greater);
        assert_eq!(compare_culture("same", "same"), Ordering::Equal);
        // Ordinal order disagrees with both of the above.
        assert!("Banana" < "apple");
    }

    #[test]
    fn display_byte_array() {
        let v = Value::from(vec![0x0a, 0xff]);
        assert_eq!(v.to_string(), "0x0aff");
    }
}
