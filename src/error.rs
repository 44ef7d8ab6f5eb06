use crate::ast::NodeId;
use crate::operator::{BinaryOp, UnaryOp};
use crate::parse::ParseError;
use crate::value::{NumericType, ValueKind, ValueType};

pub type EvalResult<T> = Result<T, EvalError>;

/// Any failure surfaced by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to parse formula: {0}")]
    Parse(Box<ParseError>),
    #[error(transparent)]
    Construction(#[from] ConstructionError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::Parse(Box::new(e))
    }
}

/// A node was built from operands it can never accept.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConstructionError {
    #[error("node {0:?} does not belong to this tree")]
    UnknownNode(NodeId),
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),
    #[error("parameter '{name}' is declared as {expected} by the new source but {found} in the tree")]
    ParameterTypeChanged {
        name: String,
        expected: ValueType,
        found: ValueType,
    },
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("function '{function}' does not accept a {argument:?} argument")]
    IncompatibleArgument {
        function: String,
        argument: ValueKind,
    },
}

/// Code generation failed for a (sub)tree.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("function '{name}' has no overload accepting {argument} or any fallback type")]
    FunctionNotFound { name: String, argument: NumericType },
    #[error("operator '{op}' cannot be applied to {left} and {right}")]
    TypeMismatch {
        op: BinaryOp,
        left: ValueType,
        right: ValueType,
    },
    #[error("operator '{op}' cannot be applied to {operand}")]
    UnaryTypeMismatch { op: UnaryOp, operand: ValueType },
    #[error("function '{name}' cannot be applied to {argument}")]
    NonNumericArgument { name: String, argument: ValueType },
}

/// Evaluating a compiled formula failed.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("no value supplied for parameter '{name}' (binding {binding})")]
    MissingParameter { name: String, binding: usize },
    #[error("parameter '{name}' expects {expected} but got {found}")]
    ParameterType {
        name: String,
        expected: ValueType,
        found: ValueType,
    },
    #[error("integer division by zero")]
    DivisionByZero,
    #[error("{value} cannot be converted to {target} without loss")]
    NumericConversion { value: String, target: NumericType },
}
