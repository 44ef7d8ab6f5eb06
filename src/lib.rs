//! Typed formula trees with constant folding and tolerance-aware compilation.
//!
//! A formula is parsed into an arena of typed nodes, constant subtrees are
//! folded as the tree is built, and the tree is then generated into a
//! [`Compiled`] closure that can be evaluated many times against different
//! parameter values. Numeric comparisons can optionally be generated with a
//! [`Tolerance`], which makes `=`, `<` and friends treat nearby values as
//! equal.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use formula_expr::*;
//!
//! let parameters = Arc::new(ParameterSource::new([
//!     ("price", ValueType::FLOAT),
//!     ("quantity", ValueType::INT32),
//! ]));
//! let formula = Formula::parse(
//!     "price * quantity >= 100",
//!     parameters,
//!     &FunctionRegistry::builtin(),
//! )
//! .unwrap();
//!
//! let exact = formula.generate().unwrap();
//! let args = [Value::from(12.4), Value::from(8)];
//! assert_eq!(exact.evaluate(&args).unwrap(), Value::from(false));
//!
//! let tolerance = Tolerance::none().with_float_range(1.0);
//! let fuzzy = formula.generate_with_tolerance(&tolerance).unwrap();
//! assert_eq!(fuzzy.evaluate(&args).unwrap(), Value::from(true));
//! ```

mod ast;
mod engine;
mod error;
mod function;
mod generate;
mod operator;
mod parse;
mod tolerance;
mod value;

/// Uses the [`pest`] parsing expression grammar language.
///
/// ```text
#[doc = include_str!("grammar.pest")]
/// ```
pub mod grammar_doc {}

pub use ast::{Ast, BindingId, CloneContext, Formula, Node, NodeId, Parameter, ParameterSource};
pub use engine::Engine;
pub use error::{CompileError, ConstructionError, Error, EvalError, EvalResult};
pub use function::{
    resolve, FunctionRegistry, NativeFunction, Overload, UnaryFunction, FALLBACK_ORDER,
};
pub use generate::Compiled;
pub use operator::{select, Arithmetic, BinaryOp, Comparison, Family, Logical, UnaryOp};
pub use parse::ParseError;
pub use tolerance::{Strategy, Tolerance};
pub use value::{
    compare_bytes_msb_first, compare_culture, compare_numbers, Number, NumericType, Value,
    ValueKind, ValueType,
};
