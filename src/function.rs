//! Unary functions callable from formulas.
//!
//! A function exposes a small table of native overloads keyed by parameter
//! type. [`resolve`] picks one for a given argument type: the exact type if an
//! overload exists, otherwise the first of [`FALLBACK_ORDER`] that does.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::error::{CompileError, ConstructionError, EvalResult};
use crate::value::{Number, NumericType, ValueKind};

/// Types tried, in order, after the argument's own type.
pub const FALLBACK_ORDER: [NumericType; 3] =
    [NumericType::Float, NumericType::Int64, NumericType::Int32];

/// A native implementation for one parameter type. The result has the same
/// type as the parameter.
#[derive(Clone, Copy, Debug)]
pub enum Overload {
    Int32(fn(i32) -> i32),
    Int64(fn(i64) -> i64),
    Float(fn(f64) -> f64),
}

impl Overload {
    pub fn parameter_type(self) -> NumericType {
        match self {
            Self::Int32(_) => NumericType::Int32,
            Self::Int64(_) => NumericType::Int64,
            Self::Float(_) => NumericType::Float,
        }
    }

    /// Converts `argument` to the parameter type and calls the native function.
    /// Narrowing conversions must be lossless.
    pub fn invoke(self, argument: Number) -> EvalResult<Number> {
        Ok(match self {
            Self::Int32(f) => Number::Int32(f(argument.to_i32()?)),
            Self::Int64(f) => Number::Int64(f(argument.to_i64()?)),
            Self::Float(f) => Number::Float(f(argument.to_f64())),
        })
    }
}

pub trait UnaryFunction: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Called when a node is built, with the kind of its simplified argument.
    fn check_argument(&self, argument: ValueKind) -> Result<(), ConstructionError> {
        if argument == ValueKind::Numeric {
            Ok(())
        } else {
            Err(ConstructionError::IncompatibleArgument {
                function: self.name().to_string(),
                argument,
            })
        }
    }

    /// The overload taking exactly `parameter`, if any.
    fn overload(&self, parameter: NumericType) -> Option<Overload>;
}

/// Finds the overload of `function` to call with an argument of type `exact`.
pub fn resolve(function: &dyn UnaryFunction, exact: NumericType) -> Result<Overload, CompileError> {
    let found = std::iter::once(exact)
        .chain(FALLBACK_ORDER)
        .find_map(|candidate| {
            tracing::trace!(function = function.name(), %candidate, "trying overload");
            function.overload(candidate)
        });
    match found {
        Some(overload) => {
            tracing::debug!(
                function = function.name(),
                argument = %exact,
                parameter = %overload.parameter_type(),
                "resolved overload"
            );
            Ok(overload)
        }
        None => Err(CompileError::FunctionNotFound {
            name: function.name().to_string(),
            argument: exact,
        }),
    }
}

/// Evaluates `function` on a constant, or `None` if that would fail.
pub(crate) fn fold(function: &dyn UnaryFunction, argument: Number) -> Option<Number> {
    resolve(function, argument.numeric_type())
        .ok()?
        .invoke(argument)
        .ok()
}

/// A function backed by a static table of overloads.
#[derive(Clone, Debug)]
pub struct NativeFunction {
    name: Arc<str>,
    overloads: HashMap<NumericType, Overload>,
}

impl NativeFunction {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            overloads: HashMap::new(),
        }
    }

    /// Adds `overload`, replacing any previous one with the same parameter type.
    pub fn with(mut self, overload: Overload) -> Self {
        self.overloads.insert(overload.parameter_type(), overload);
        self
    }
}

impl UnaryFunction for NativeFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn overload(&self, parameter: NumericType) -> Option<Overload> {
        self.overloads.get(&parameter).copied()
    }
}

/// Maps the names usable in formulas to functions. Lookup is
/// case-insensitive.
#[derive(Clone, Debug, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn UnaryFunction>>,
}

impl FunctionRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry holding the built-in math functions.
    pub fn builtin() -> Self {
        BUILTINS.clone()
    }

    /// Registers `function` under each of `names`.
    pub fn register(&mut self, names: &[&str], function: Arc<dyn UnaryFunction>) -> &mut Self {
        for name in names {
            self.functions
                .insert(name.to_lowercase(), Arc::clone(&function));
        }
        self
    }

    /// Registers a native function under its own name and `aliases`.
    pub fn register_native(&mut self, function: NativeFunction, aliases: &[&str]) -> &mut Self {
        let name = function.name.clone();
        let function: Arc<dyn UnaryFunction> = Arc::new(function);
        self.register(&[&*name], Arc::clone(&function));
        self.register(aliases, function)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn UnaryFunction>> {
        self.functions.get(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

static BUILTINS: Lazy<FunctionRegistry> = Lazy::new(|| {
    use Overload::*;

    let mut registry = FunctionRegistry::empty();
    registry
        .register_native(
            NativeFunction::new("abs")
                .with(Int32(i32::wrapping_abs))
                .with(Int64(i64::wrapping_abs))
                .with(Float(f64::abs)),
            &[],
        )
        .register_native(
            NativeFunction::new("sign")
                .with(Int32(i32::signum))
                .with(Int64(i64::signum))
                .with(Float(f64::signum)),
            &[],
        )
        .register_native(NativeFunction::new("sqrt").with(Float(f64::sqrt)), &[])
        .register_native(NativeFunction::new("exp").with(Float(f64::exp)), &[])
        .register_native(NativeFunction::new("ln").with(Float(f64::ln)), &["log"])
        .register_native(NativeFunction::new("log10").with(Float(f64::log10)), &[])
        .register_native(NativeFunction::new("floor").with(Float(f64::floor)), &[])
        .register_native(NativeFunction::new("ceiling").with(Float(f64::ceil)), &["ceil"])
        .register_native(NativeFunction::new("round").with(Float(f64::round)), &[])
        .register_native(NativeFunction::new("truncate").with(Float(f64::trunc)), &["trunc"])
        .register_native(NativeFunction::new("sin").with(Float(f64::sin)), &[])
        .register_native(NativeFunction::new("cos").with(Float(f64::cos)), &[])
        .register_native(NativeFunction::new("tan").with(Float(f64::tan)), &[]);
    registry
});
