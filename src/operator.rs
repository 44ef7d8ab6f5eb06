//! Operator semantics shared by constant folding and code generation.
//!
//! Binary operators are grouped into families. Each family has one [`Rule`]
//! holding its fold, exact and tolerant code generation. The primitives at the
//! bottom of this module are what both folding and generated code call, so a
//! folded constant always equals what the unfolded node would evaluate to.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::error::{CompileError, EvalError, EvalResult};
use crate::generate::{widen, Generated, Thunk};
use crate::tolerance::Strategy;
use crate::value::{
    compare_bytes_msb_first, compare_culture, compare_numbers, Number, NumericType, Value,
    ValueKind, ValueType,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Arithmetic.
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,

    // Comparison.
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,

    // Logic.
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    Arithmetic(Arithmetic),
    Comparison(Comparison),
    Logical(Logical),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Arithmetic {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Comparison {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Logical {
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Negate,
    Not,
}

impl BinaryOp {
    pub fn family(self) -> Family {
        match self {
            Self::Add => Family::Arithmetic(Arithmetic::Add),
            Self::Subtract => Family::Arithmetic(Arithmetic::Subtract),
            Self::Multiply => Family::Arithmetic(Arithmetic::Multiply),
            Self::Divide => Family::Arithmetic(Arithmetic::Divide),
            Self::Modulo => Family::Arithmetic(Arithmetic::Modulo),
            Self::Power => Family::Arithmetic(Arithmetic::Power),
            Self::Equals => Family::Comparison(Comparison::Equals),
            Self::NotEquals => Family::Comparison(Comparison::NotEquals),
            Self::LessThan => Family::Comparison(Comparison::LessThan),
            Self::LessThanOrEqual => Family::Comparison(Comparison::LessThanOrEqual),
            Self::GreaterThan => Family::Comparison(Comparison::GreaterThan),
            Self::GreaterThanOrEqual => Family::Comparison(Comparison::GreaterThanOrEqual),
            Self::And => Family::Logical(Logical::And),
            Self::Or => Family::Logical(Logical::Or),
        }
    }

    pub fn comparison(self) -> Option<Comparison> {
        match self.family() {
            Family::Comparison(c) => Some(c),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Power => "^",
            Self::Equals => "==",
            Self::NotEquals => "!=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }

    /// The kind of node built from operands of kinds `left` and `right`.
    /// `+` with a string on either side concatenates.
    ///
    /// This never fails: operand compatibility is only checked during code
    /// generation.
    pub fn result_kind(self, left: ValueKind, right: ValueKind) -> ValueKind {
        match self.family() {
            Family::Arithmetic(Arithmetic::Add)
                if left == ValueKind::String || right == ValueKind::String =>
            {
                ValueKind::String
            }
            Family::Arithmetic(_) => ValueKind::Numeric,
            Family::Comparison(_) | Family::Logical(_) => ValueKind::Boolean,
        }
    }

    pub(crate) fn rule(self) -> &'static Rule {
        match self.family() {
            Family::Arithmetic(_) => &ARITHMETIC,
            Family::Comparison(_) => &COMPARISON,
            Family::Logical(_) => &LOGICAL,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl UnaryOp {
    pub fn result_kind(self) -> ValueKind {
        match self {
            Self::Negate => ValueKind::Numeric,
            Self::Not => ValueKind::Boolean,
        }
    }

    pub(crate) fn fold(self, operand: &Value) -> Option<Value> {
        match (self, operand) {
            (Self::Negate, Value::Numeric(n)) => Some(Value::Numeric(negate(*n))),
            (Self::Not, Value::Boolean(b)) => Some(Value::Boolean(!b)),
            _ => None,
        }
    }

    pub(crate) fn generate(self, operand: Generated) -> Result<Generated, CompileError> {
        match (self, operand) {
            (Self::Negate, Generated::Numeric(ty, inner)) => Ok(Generated::Numeric(
                ty,
                Arc::new(move |args| Ok(negate(inner(args)?))),
            )),
            (Self::Not, Generated::Boolean(inner)) => {
                Ok(Generated::Boolean(Arc::new(move |args| Ok(!inner(args)?))))
            }
            (op, operand) => Err(CompileError::UnaryTypeMismatch {
                op,
                operand: operand.value_type(),
            }),
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Negate => f.write_str("-"),
            Self::Not => f.write_str("!"),
        }
    }
}

impl Arithmetic {
    /// Representation of the result for operands already widened to `operands`.
    pub fn result_type(self, operands: NumericType) -> NumericType {
        match self {
            Self::Power => NumericType::Float,
            _ => operands,
        }
    }

    /// Integer arithmetic wraps on overflow; integer division and remainder by
    /// zero fail. Power is always computed in floating point.
    pub fn apply(self, lhs: Number, rhs: Number) -> EvalResult<Number> {
        match lhs.numeric_type().widen(rhs.numeric_type()) {
            NumericType::Int32 => {
                let (l, r) = (lhs.to_i32()?, rhs.to_i32()?);
                let value = match self {
                    Self::Add => l.wrapping_add(r),
                    Self::Subtract => l.wrapping_sub(r),
                    Self::Multiply => l.wrapping_mul(r),
                    Self::Divide => l.wrapping_div(nonzero(r)?),
                    Self::Modulo => l.wrapping_rem(nonzero(r)?),
                    Self::Power => return Ok(Number::Float(f64::from(l).powf(f64::from(r)))),
                };
                Ok(Number::Int32(value))
            }
            NumericType::Int64 => {
                let (l, r) = (lhs.to_i64()?, rhs.to_i64()?);
                let value = match self {
                    Self::Add => l.wrapping_add(r),
                    Self::Subtract => l.wrapping_sub(r),
                    Self::Multiply => l.wrapping_mul(r),
                    Self::Divide => l.wrapping_div(nonzero(r)?),
                    Self::Modulo => l.wrapping_rem(nonzero(r)?),
                    Self::Power => return Ok(Number::Float((l as f64).powf(r as f64))),
                };
                Ok(Number::Int64(value))
            }
            NumericType::Float => {
                let (l, r) = (lhs.to_f64(), rhs.to_f64());
                let value = match self {
                    Self::Add => l + r,
                    Self::Subtract => l - r,
                    Self::Multiply => l * r,
                    Self::Divide => l / r,
                    Self::Modulo => l % r,
                    Self::Power => l.powf(r),
                };
                Ok(Number::Float(value))
            }
        }
    }
}

fn nonzero<T: PartialEq + Default>(divisor: T) -> EvalResult<T> {
    if divisor == T::default() {
        Err(EvalError::DivisionByZero)
    } else {
        Ok(divisor)
    }
}

fn negate(n: Number) -> Number {
    match n {
        Number::Int32(v) => Number::Int32(v.wrapping_neg()),
        Number::Int64(v) => Number::Int64(v.wrapping_neg()),
        Number::Float(v) => Number::Float(-v),
    }
}

impl Comparison {
    pub const ALL: [Self; 6] = [
        Self::Equals,
        Self::NotEquals,
        Self::LessThan,
        Self::LessThanOrEqual,
        Self::GreaterThan,
        Self::GreaterThanOrEqual,
    ];

    /// Exact comparison given the ordering of the operands. `None` means
    /// unordered (NaN), for which only `NotEquals` holds.
    pub fn holds(self, ordering: Option<Ordering>) -> bool {
        let Some(ordering) = ordering else {
            return self == Self::NotEquals;
        };
        match self {
            Self::Equals => ordering.is_eq(),
            Self::NotEquals => ordering.is_ne(),
            Self::LessThan => ordering.is_lt(),
            Self::LessThanOrEqual => ordering.is_le(),
            Self::GreaterThan => ordering.is_gt(),
            Self::GreaterThanOrEqual => ordering.is_ge(),
        }
    }

    /// Tolerant comparison: operands that are `near` each other are equal,
    /// and only operands that are not near can be strictly ordered.
    pub fn fuzzy(self, ordering: Option<Ordering>, near: bool) -> bool {
        match self {
            Self::Equals => near,
            Self::NotEquals => !near,
            Self::LessThan => !near && ordering == Some(Ordering::Less),
            Self::LessThanOrEqual => near || ordering == Some(Ordering::Less),
            Self::GreaterThan => !near && ordering == Some(Ordering::Greater),
            Self::GreaterThanOrEqual => near || ordering == Some(Ordering::Greater),
        }
    }

    /// `false < true` does not hold here: less-than is the conjunction of the
    /// operands and greater-than swaps them. The inclusive forms also hold
    /// for equal operands.
    pub fn booleans(self, lhs: bool, rhs: bool) -> bool {
        let equal = select(lhs, rhs, !rhs);
        match self {
            Self::Equals => equal,
            Self::NotEquals => !equal,
            Self::LessThan => select(lhs, rhs, false),
            Self::GreaterThan => select(rhs, lhs, false),
            Self::LessThanOrEqual => select(equal, true, select(lhs, rhs, false)),
            Self::GreaterThanOrEqual => select(equal, true, select(rhs, lhs, false)),
        }
    }

    /// Equality is ordinal; ordering is culture-aware.
    pub fn strings(self, lhs: &str, rhs: &str) -> bool {
        match self {
            Self::Equals => lhs == rhs,
            Self::NotEquals => lhs != rhs,
            _ => self.holds(Some(compare_culture(lhs, rhs))),
        }
    }

    pub fn byte_arrays(self, lhs: &[u8], rhs: &[u8]) -> bool {
        self.holds(Some(compare_bytes_msb_first(lhs, rhs)))
    }

    pub fn numbers(self, lhs: Number, rhs: Number) -> bool {
        self.holds(compare_numbers(lhs, rhs))
    }
}

impl Logical {
    pub fn apply(self, lhs: bool, rhs: bool) -> bool {
        match self {
            Self::And => select(lhs, rhs, false),
            Self::Or => select(lhs, true, rhs),
        }
    }
}

/// Conditional select. Boolean operators lower to this instead of native
/// comparison.
pub fn select<T>(condition: bool, then: T, otherwise: T) -> T {
    if condition {
        then
    } else {
        otherwise
    }
}

fn concat(lhs: &str, rhs: &str) -> Arc<str> {
    let mut joined = String::with_capacity(lhs.len() + rhs.len());
    joined.push_str(lhs);
    joined.push_str(rhs);
    joined.into()
}

/// Per-family behavior of binary nodes.
pub(crate) struct Rule {
    /// Folds two constant operands, or `None` when they cannot be folded.
    pub fold: fn(BinaryOp, &Value, &Value) -> Option<Value>,
    pub exact: fn(BinaryOp, Generated, Generated) -> Result<Generated, CompileError>,
    pub tolerant: fn(BinaryOp, Generated, Generated, Strategy) -> Result<Generated, CompileError>,
}

static ARITHMETIC: Rule = Rule {
    fold: fold_arithmetic,
    exact: generate_arithmetic,
    // Tolerance only changes comparisons; operands were already generated
    // with it.
    tolerant: |op, lhs, rhs, _| generate_arithmetic(op, lhs, rhs),
};

static COMPARISON: Rule = Rule {
    fold: fold_comparison,
    exact: |op, lhs, rhs| generate_comparison(op, lhs, rhs, None),
    tolerant: |op, lhs, rhs, strategy| generate_comparison(op, lhs, rhs, Some(strategy)),
};

static LOGICAL: Rule = Rule {
    fold: fold_logical,
    exact: generate_logical,
    tolerant: |op, lhs, rhs, _| generate_logical(op, lhs, rhs),
};

fn fold_arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Option<Value> {
    let Family::Arithmetic(arithmetic) = op.family() else {
        return None;
    };
    match (lhs, rhs) {
        (Value::Numeric(l), Value::Numeric(r)) => arithmetic.apply(*l, *r).ok().map(Value::Numeric),
        (Value::String(_), _) | (_, Value::String(_)) if arithmetic == Arithmetic::Add => {
            Some(Value::String(concat(&lhs.to_string(), &rhs.to_string())))
        }
        _ => None,
    }
}

fn fold_comparison(op: BinaryOp, lhs: &Value, rhs: &Value) -> Option<Value> {
    let comparison = op.comparison()?;
    let result = match (lhs, rhs) {
        (Value::Numeric(l), Value::Numeric(r)) => comparison.numbers(*l, *r),
        (Value::Boolean(l), Value::Boolean(r)) => comparison.booleans(*l, *r),
        (Value::String(l), Value::String(r)) => comparison.strings(l, r),
        (Value::ByteArray(l), Value::ByteArray(r)) => comparison.byte_arrays(l, r),
        _ => return None,
    };
    Some(Value::Boolean(result))
}

fn fold_logical(op: BinaryOp, lhs: &Value, rhs: &Value) -> Option<Value> {
    let Family::Logical(logical) = op.family() else {
        return None;
    };
    match (lhs, rhs) {
        (Value::Boolean(l), Value::Boolean(r)) => Some(Value::Boolean(logical.apply(*l, *r))),
        _ => None,
    }
}

/// Generated operands reconciled to one representation.
enum Operands {
    Numeric(NumericType, Thunk<Number>, Thunk<Number>),
    Boolean(Thunk<bool>, Thunk<bool>),
    String(Thunk<Arc<str>>, Thunk<Arc<str>>),
    ByteArray(Thunk<Arc<[u8]>>, Thunk<Arc<[u8]>>),
}

fn reconcile(op: BinaryOp, lhs: Generated, rhs: Generated) -> Result<Operands, CompileError> {
    let mismatch = CompileError::TypeMismatch {
        op,
        left: lhs.value_type(),
        right: rhs.value_type(),
    };
    Ok(match (lhs, rhs) {
        (Generated::Numeric(lt, l), Generated::Numeric(rt, r)) => {
            let ty = lt.widen(rt);
            Operands::Numeric(ty, widen(l, lt, ty), widen(r, rt, ty))
        }
        (Generated::Boolean(l), Generated::Boolean(r)) => Operands::Boolean(l, r),
        (Generated::String(l), Generated::String(r)) => Operands::String(l, r),
        (Generated::ByteArray(l), Generated::ByteArray(r)) => Operands::ByteArray(l, r),
        _ => return Err(mismatch),
    })
}

fn type_mismatch(op: BinaryOp, lhs: &Generated, rhs: &Generated) -> CompileError {
    CompileError::TypeMismatch {
        op,
        left: lhs.value_type(),
        right: rhs.value_type(),
    }
}

fn generate_arithmetic(
    op: BinaryOp,
    lhs: Generated,
    rhs: Generated,
) -> Result<Generated, CompileError> {
    let mismatch = type_mismatch(op, &lhs, &rhs);
    let Family::Arithmetic(arithmetic) = op.family() else {
        return Err(mismatch);
    };
    let concatenates = arithmetic == Arithmetic::Add
        && (lhs.value_type() == ValueType::String || rhs.value_type() == ValueType::String);
    if concatenates {
        let (l, r) = (text(lhs), text(rhs));
        return Ok(Generated::String(Arc::new(move |args| {
            Ok(concat(&l(args)?, &r(args)?))
        })));
    }
    match reconcile(op, lhs, rhs)? {
        Operands::Numeric(ty, l, r) => Ok(Generated::Numeric(
            arithmetic.result_type(ty),
            Arc::new(move |args| arithmetic.apply(l(args)?, r(args)?)),
        )),
        _ => Err(mismatch),
    }
}

/// The operand as text, formatted like [`Value`]'s `Display`.
fn text(operand: Generated) -> Thunk<Arc<str>> {
    match operand {
        Generated::String(f) => f,
        other => {
            let value = other.into_value();
            Arc::new(move |args| Ok(value(args)?.to_string().into()))
        }
    }
}

fn generate_comparison(
    op: BinaryOp,
    lhs: Generated,
    rhs: Generated,
    strategy: Option<Strategy>,
) -> Result<Generated, CompileError> {
    let mismatch = type_mismatch(op, &lhs, &rhs);
    let Some(comparison) = op.comparison() else {
        return Err(mismatch);
    };
    let compare: Thunk<bool> = match reconcile(op, lhs, rhs)? {
        Operands::Numeric(_, l, r) => match strategy {
            Some(strategy) => {
                Arc::new(move |args| Ok(strategy.compare(comparison, l(args)?, r(args)?)))
            }
            None => Arc::new(move |args| Ok(comparison.numbers(l(args)?, r(args)?))),
        },
        Operands::Boolean(l, r) => {
            Arc::new(move |args| Ok(comparison.booleans(l(args)?, r(args)?)))
        }
        Operands::String(l, r) => {
            Arc::new(move |args| Ok(comparison.strings(&l(args)?, &r(args)?)))
        }
        Operands::ByteArray(l, r) => {
            Arc::new(move |args| Ok(comparison.byte_arrays(&l(args)?, &r(args)?)))
        }
    };
    Ok(Generated::Boolean(compare))
}

fn generate_logical(
    op: BinaryOp,
    lhs: Generated,
    rhs: Generated,
) -> Result<Generated, CompileError> {
    let mismatch = type_mismatch(op, &lhs, &rhs);
    let (Family::Logical(logical), Generated::Boolean(l), Generated::Boolean(r)) =
        (op.family(), lhs, rhs)
    else {
        return Err(mismatch);
    };
    // Short-circuit: the right operand only runs when it decides the result.
    Ok(Generated::Boolean(match logical {
        Logical::And => Arc::new(move |args| Ok(l(args)? && r(args)?)),
        Logical::Or => Arc::new(move |args| Ok(l(args)? || r(args)?)),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold(op: BinaryOp, lhs: impl Into<Value>, rhs: impl Into<Value>) -> Option<Value> {
        (op.rule().fold)(op, &lhs.into(), &rhs.into())
    }

    #[test]
    fn fold_widens_numbers() {
        assert_eq!(fold(BinaryOp::Multiply, 2, 3), Some(Value::from(6)));
        assert_eq!(fold(BinaryOp::Add, 2, 3_i64), Some(Value::from(5_i64)));
        assert_eq!(fold(BinaryOp::Add, 2, 0.5), Some(Value::from(2.5)));
        assert_eq!(fold(BinaryOp::Power, 2, 10), Some(Value::from(1024.0)));
        assert_eq!(fold(BinaryOp::Divide, 7, 2), Some(Value::from(3)));
        assert_eq!(fold(BinaryOp::Modulo, 7.5, 2), Some(Value::from(1.5)));
    }

    #[test]
    fn integer_division_by_zero_is_not_folded() {
        assert_eq!(fold(BinaryOp::Divide, 1, 0), None);
        assert_eq!(fold(BinaryOp::Modulo, 1_i64, 0), None);
        assert_eq!(fold(BinaryOp::Divide, 1.0, 0), Some(Value::from(f64::INFINITY)));
    }

    #[test]
    fn integer_overflow_wraps() {
        assert_eq!(fold(BinaryOp::Add, i32::MAX, 1), Some(Value::from(i32::MIN)));
        assert_eq!(fold(BinaryOp::Divide, i32::MIN, -1), Some(Value::from(i32::MIN)));
    }

    #[test]
    fn mismatched_constants_are_not_folded() {
        assert_eq!(fold(BinaryOp::Equals, true, 1), None);
        assert_eq!(fold(BinaryOp::Subtract, "a", "b"), None);
        assert_eq!(fold(BinaryOp::And, 1, 1), None);
    }

    #[test]
    fn string_semantics() {
        assert_eq!(fold(BinaryOp::Equals, "a", "a"), Some(Value::from(true)));
        assert_eq!(fold(BinaryOp::Equals, "a", "A"), Some(Value::from(false)));
        assert_eq!(fold(BinaryOp::LessThan, "apple", "Banana"), Some(Value::from(true)));
        assert_eq!(fold(BinaryOp::Add, "ab", "cd"), Some(Value::from("abcd")));
    }

    #[test]
    fn byte_array_semantics() {
        let eq = |l: &[u8], r: &[u8]| fold(BinaryOp::Equals, l, r);
        assert_eq!(eq(&[1, 2], &[1, 2]), Some(Value::from(true)));
        assert_eq!(eq(&[2, 1], &[1, 2]), Some(Value::from(false)));
        assert_eq!(eq(&[0, 7], &[7]), Some(Value::from(true)));
        assert_eq!(
            fold(BinaryOp::GreaterThan, &[2u8, 1][..], &[1u8, 2][..]),
            Some(Value::from(true))
        );
    }

    #[test]
    fn boolean_less_than_is_conjunction() {
        for (l, r) in [(false, false), (false, true), (true, false), (true, true)] {
            assert_eq!(fold(BinaryOp::LessThan, l, r), Some(Value::from(l && r)));
        }
        assert_eq!(fold(BinaryOp::Equals, true, true), Some(Value::from(true)));
        assert_eq!(fold(BinaryOp::NotEquals, true, false), Some(Value::from(true)));
    }

    #[test]
    fn inclusive_boolean_orderings_are_reflexive() {
        use Comparison::*;
        for v in [false, true] {
            assert!(LessThanOrEqual.booleans(v, v));
            assert!(GreaterThanOrEqual.booleans(v, v));
            assert_eq!(LessThan.booleans(v, v), v);
        }
        assert!(!LessThanOrEqual.booleans(false, true));
        assert!(!GreaterThanOrEqual.booleans(true, false));
        assert!(GreaterThan.booleans(true, true));
        assert_eq!(fold(BinaryOp::LessThanOrEqual, true, true), Some(Value::from(true)));
        assert_eq!(fold(BinaryOp::GreaterThanOrEqual, true, true), Some(Value::from(true)));
    }

    #[test]
    fn string_plus_anything_concatenates() {
        assert_eq!(fold(BinaryOp::Add, "a", 1), Some(Value::from("a1")));
        assert_eq!(fold(BinaryOp::Add, 2.5, "x"), Some(Value::from("2.5x")));
        assert_eq!(fold(BinaryOp::Add, "is ", true), Some(Value::from("is true")));
        assert_eq!(fold(BinaryOp::Add, &[0xabu8][..], "!"), Some(Value::from("0xab!")));
        assert_eq!(fold(BinaryOp::Subtract, "a", 1), None);

        let lhs = Generated::constant(&Value::from("n="));
        let rhs = Generated::constant(&Value::from(42_i64));
        let Ok(Generated::String(joined)) = generate_arithmetic(BinaryOp::Add, lhs, rhs) else {
            panic!("expected a string");
        };
        assert_eq!(&*joined(&[]).unwrap(), "n=42");
    }

    #[test]
    fn nan_is_only_not_equal() {
        let nan = f64::NAN;
        for op in Comparison::ALL {
            assert_eq!(
                op.numbers(Number::Float(nan), Number::Float(nan)),
                op == Comparison::NotEquals
            );
        }
    }

    #[test]
    fn result_kinds() {
        use ValueKind::*;
        assert_eq!(BinaryOp::Add.result_kind(String, Numeric), String);
        assert_eq!(BinaryOp::Add.result_kind(Numeric, Numeric), Numeric);
        assert_eq!(BinaryOp::Multiply.result_kind(String, String), Numeric);
        assert_eq!(BinaryOp::LessThan.result_kind(ByteArray, ByteArray), Boolean);
        assert_eq!(BinaryOp::Or.result_kind(Boolean, Boolean), Boolean);
    }

    #[test]
    fn unary_folding() {
        assert_eq!(UnaryOp::Negate.fold(&Value::from(3)), Some(Value::from(-3)));
        assert_eq!(UnaryOp::Not.fold(&Value::from(true)), Some(Value::from(false)));
        assert_eq!(UnaryOp::Not.fold(&Value::from(1)), None);
    }
}
