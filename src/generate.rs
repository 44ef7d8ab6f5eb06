use std::fmt;
use std::sync::Arc;

use crate::ast::{Ast, Node, NodeId, Parameter, ParameterSource};
use crate::error::{CompileError, Error, EvalError, EvalResult};
use crate::function::resolve;
use crate::tolerance::{Strategy, Tolerance};
use crate::value::{Number, NumericType, Value, ValueType};

#[cfg(feature = "rayon")]
use rayon::prelude::{IntoParallelRefIterator, ParallelIterator};

/// One step of generated code: reads the caller's arguments, produces a `T`.
pub(crate) type Thunk<T> = Arc<dyn Fn(&[Value]) -> EvalResult<T> + Send + Sync>;

/// Generated code for a subtree, typed by its representation.
#[derive(Clone)]
pub(crate) enum Generated {
    Numeric(NumericType, Thunk<Number>),
    Boolean(Thunk<bool>),
    String(Thunk<Arc<str>>),
    ByteArray(Thunk<Arc<[u8]>>),
}

impl Generated {
    pub(crate) fn value_type(&self) -> ValueType {
        match self {
            Self::Numeric(ty, _) => ValueType::Numeric(*ty),
            Self::Boolean(_) => ValueType::Boolean,
            Self::String(_) => ValueType::String,
            Self::ByteArray(_) => ValueType::ByteArray,
        }
    }

    pub(crate) fn constant(value: &Value) -> Self {
        match value.clone() {
            Value::Numeric(n) => Self::Numeric(n.numeric_type(), Arc::new(move |_| Ok(n))),
            Value::Boolean(b) => Self::Boolean(Arc::new(move |_| Ok(b))),
            Value::String(s) => Self::String(Arc::new(move |_| Ok(s.clone()))),
            Value::ByteArray(b) => Self::ByteArray(Arc::new(move |_| Ok(b.clone()))),
        }
    }

    fn parameter(parameter: &Parameter) -> Self {
        let binding = parameter.binding;
        let expected = parameter.ty;
        let name = parameter.name.clone();
        match expected {
            ValueType::Numeric(ty) => Self::Numeric(
                ty,
                Arc::new(move |args| match fetch(args, binding, &name)? {
                    Value::Numeric(n) => n.convert(ty),
                    other => Err(wrong_type(&name, expected, other)),
                }),
            ),
            ValueType::Boolean => Self::Boolean(Arc::new(move |args| {
                match fetch(args, binding, &name)? {
                    Value::Boolean(b) => Ok(*b),
                    other => Err(wrong_type(&name, expected, other)),
                }
            })),
            ValueType::String => Self::String(Arc::new(move |args| {
                match fetch(args, binding, &name)? {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(wrong_type(&name, expected, other)),
                }
            })),
            ValueType::ByteArray => Self::ByteArray(Arc::new(move |args| {
                match fetch(args, binding, &name)? {
                    Value::ByteArray(b) => Ok(b.clone()),
                    other => Err(wrong_type(&name, expected, other)),
                }
            })),
        }
    }

    pub(crate) fn into_value(self) -> Thunk<Value> {
        match self {
            Self::Numeric(_, f) => Arc::new(move |args| f(args).map(Value::Numeric)),
            Self::Boolean(f) => Arc::new(move |args| f(args).map(Value::Boolean)),
            Self::String(f) => Arc::new(move |args| f(args).map(Value::String)),
            Self::ByteArray(f) => Arc::new(move |args| f(args).map(Value::ByteArray)),
        }
    }
}

fn fetch<'a>(args: &'a [Value], binding: usize, name: &str) -> EvalResult<&'a Value> {
    args.get(binding).ok_or_else(|| EvalError::MissingParameter {
        name: name.to_string(),
        binding,
    })
}

fn wrong_type(name: &str, expected: ValueType, found: &Value) -> EvalError {
    EvalError::ParameterType {
        name: name.to_string(),
        expected,
        found: found.value_type(),
    }
}

/// Converts `thunk`'s output from `from` to `to`. Returns `thunk` itself when
/// no conversion is needed.
pub(crate) fn widen(thunk: Thunk<Number>, from: NumericType, to: NumericType) -> Thunk<Number> {
    if from == to {
        thunk
    } else {
        Arc::new(move |args| thunk(args)?.convert(to))
    }
}

/// An executable formula.
///
/// Holds no reference to the tree it was generated from. Cloning is cheap and
/// a `Compiled` can be shared across threads.
#[derive(Clone)]
pub struct Compiled {
    value_type: ValueType,
    parameters: Arc<ParameterSource>,
    eval: Thunk<Value>,
}

impl fmt::Debug for Compiled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiled")
            .field("value_type", &self.value_type)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

impl Compiled {
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// The parameters `evaluate` expects, in binding order.
    pub fn parameters(&self) -> &ParameterSource {
        &self.parameters
    }

    /// Evaluates the formula. `arguments[i]` is the value of the parameter
    /// with binding `i`.
    pub fn evaluate(&self, arguments: &[Value]) -> EvalResult<Value> {
        (self.eval)(arguments)
    }

    pub fn evaluate_without_parameters(&self) -> EvalResult<Value> {
        self.evaluate(&[])
    }

    /// Evaluates the formula once per row of arguments.
    pub fn evaluate_batch<A: AsRef<[Value]> + Sync>(&self, rows: &[A]) -> Vec<EvalResult<Value>> {
        #[cfg(feature = "rayon")]
        {
            rows.par_iter()
                .map(|row| self.evaluate(row.as_ref()))
                .collect()
        }
        #[cfg(not(feature = "rayon"))]
        {
            rows.iter().map(|row| self.evaluate(row.as_ref())).collect()
        }
    }
}

impl Ast {
    /// Generates exact code for the subtree at `root`.
    pub fn generate(&self, root: NodeId) -> Result<Compiled, Error> {
        Generator {
            ast: self,
            strategy: None,
        }
        .compile(root)
    }

    /// Generates code for the subtree at `root` whose numeric comparisons use
    /// `tolerance`. Falls back to exact code when the tolerance selects no
    /// strategy or the subtree has no numeric comparison.
    pub fn generate_with_tolerance(
        &self,
        root: NodeId,
        tolerance: &Tolerance,
    ) -> Result<Compiled, Error> {
        let strategy = match tolerance.strategy() {
            Some(strategy) if self.is_tolerant(root)? => strategy,
            _ => return self.generate(root),
        };
        tracing::debug!(?strategy, "generating tolerant code");
        Generator {
            ast: self,
            strategy: Some(strategy),
        }
        .compile(root)
    }
}

struct Generator<'a> {
    ast: &'a Ast,
    strategy: Option<Strategy>,
}

impl Generator<'_> {
    fn compile(&self, root: NodeId) -> Result<Compiled, Error> {
        let generated = self.node(root)?;
        Ok(Compiled {
            value_type: generated.value_type(),
            parameters: self.ast.parameters().clone(),
            eval: generated.into_value(),
        })
    }

    fn node(&self, id: NodeId) -> Result<Generated, Error> {
        Ok(match self.ast.node(id)? {
            Node::Constant(value) => Generated::constant(value),
            Node::Parameter(parameter) => Generated::parameter(parameter),
            Node::Binary { op, left, right } => {
                let (lhs, rhs) = (self.node(*left)?, self.node(*right)?);
                let rule = op.rule();
                match self.strategy {
                    Some(strategy) => (rule.tolerant)(*op, lhs, rhs, strategy)?,
                    None => (rule.exact)(*op, lhs, rhs)?,
                }
            }
            Node::Unary { op, operand } => op.generate(self.node(*operand)?)?,
            Node::Function { function, argument } => {
                let generated = self.node(*argument)?;
                let argument_type = generated.value_type();
                let Generated::Numeric(ty, input) = generated else {
                    return Err(CompileError::NonNumericArgument {
                        name: function.name().to_string(),
                        argument: argument_type,
                    }
                    .into());
                };
                let overload = resolve(function.as_ref(), ty)?;
                Generated::Numeric(
                    overload.parameter_type(),
                    Arc::new(move |args| overload.invoke(input(args)?)),
                )
            }
        })
    }
}
