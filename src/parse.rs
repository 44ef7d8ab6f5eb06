use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::Arc;

use crate::ast::{Ast, Formula, NodeId, ParameterSource};
use crate::error::{ConstructionError, Error};
use crate::function::FunctionRegistry;
use crate::operator::{BinaryOp, UnaryOp};
use crate::value::Value;

use once_cell::sync::Lazy;
use pest::error::ErrorVariant;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::{Parser, Position, Span};
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "grammar.pest"] // relative to project `src`
struct FormulaParser;

pub type ParseError = pest::error::Error<Rule>;

impl Formula {
    /// Names of all parameters referenced by `input`.
    pub fn parameter_names(input: &str) -> Result<HashSet<String>, ParseError> {
        Ok(FormulaParser::parse(Rule::formula, input)?
            .flatten()
            .filter(|p| p.as_rule() == Rule::variable)
            .map(|p| variable_name(&p).to_string())
            .collect())
    }

    /// Parses and simplifies `input`.
    ///
    /// Parameters are bound to `parameters` by name and function calls are
    /// looked up in `functions`. Operand types are not checked here; a formula
    /// like `'a' * 2` parses and fails once it is generated.
    pub fn parse(
        input: &str,
        parameters: Arc<ParameterSource>,
        functions: &FunctionRegistry,
    ) -> Result<Self, Error> {
        let formula = first_inner(FormulaParser::parse(Rule::formula, input)?, input)?;
        let expr = first_inner(formula.into_inner(), input)?;
        let builder = Builder {
            ast: RefCell::new(Ast::new(parameters)),
            functions,
        };
        let root = builder.build(expr.into_inner())?;
        Ok(Formula::new(builder.ast.into_inner(), root)?.simplify()?)
    }
}

static PRATT_PARSER: Lazy<PrattParser<Rule>> = Lazy::new(|| {
    use Assoc::*;
    use Rule::*;

    PrattParser::new()
        .op(Op::infix(or, Left))
        .op(Op::infix(and, Left))
        .op(Op::infix(eq, Left)
            | Op::infix(neq, Left)
            | Op::infix(lt, Left)
            | Op::infix(le, Left)
            | Op::infix(gt, Left)
            | Op::infix(ge, Left))
        .op(Op::infix(add, Left) | Op::infix(subtract, Left))
        .op(Op::infix(multiply, Left) | Op::infix(divide, Left) | Op::infix(modulo, Left))
        .op(Op::prefix(neg) | Op::prefix(not))
        .op(Op::infix(power, Right))
});

struct Builder<'a> {
    ast: RefCell<Ast>,
    functions: &'a FunctionRegistry,
}

impl Builder<'_> {
    fn build(&self, pairs: Pairs<Rule>) -> Result<NodeId, Error> {
        PRATT_PARSER
            .map_primary(|primary| self.primary(primary))
            .map_prefix(|op, operand| {
                let operand = operand?;
                let op = match op.as_rule() {
                    Rule::neg => UnaryOp::Negate,
                    Rule::not => UnaryOp::Not,
                    _ => return Err(unexpected(&op)),
                };
                Ok(self.ast.borrow_mut().unary(op, operand)?)
            })
            .map_infix(|lhs, op, rhs| {
                let (lhs, rhs) = (lhs?, rhs?);
                let op = binary_op(&op)?;
                Ok(self.ast.borrow_mut().binary(op, lhs, rhs)?)
            })
            .parse(pairs)
    }

    fn primary(&self, pair: Pair<Rule>) -> Result<NodeId, Error> {
        let value = match pair.as_rule() {
            Rule::expr => return self.build(pair.into_inner()),
            Rule::variable => {
                return Ok(self.ast.borrow_mut().parameter(variable_name(&pair))?);
            }
            Rule::call => return self.call(pair),
            Rule::number => number(pair.as_str())
                .ok_or_else(|| invalid(pair.as_span(), "invalid number"))?,
            Rule::boolean => Value::Boolean(pair.as_str().eq_ignore_ascii_case("true")),
            Rule::bytes => {
                let digits = pair.as_str().trim_start_matches("0x");
                Value::from(
                    hex_bytes(digits).ok_or_else(|| invalid(pair.as_span(), "invalid bytes"))?,
                )
            }
            Rule::string => {
                let span = pair.as_span();
                let inner = first_inner(pair.into_inner(), span.as_str())?;
                let text = match inner.as_rule() {
                    Rule::single_quoted => inner.as_str().replace("''", "'"),
                    _ => inner.as_str().replace("\"\"", "\""),
                };
                Value::from(text)
            }
            _ => return Err(unexpected(&pair)),
        };
        Ok(self.ast.borrow_mut().constant(value))
    }

    fn call(&self, pair: Pair<Rule>) -> Result<NodeId, Error> {
        let span = pair.as_span();
        let mut inner = pair.into_inner();
        let (Some(name), Some(argument)) = (inner.next(), inner.next()) else {
            return Err(invalid(span, "malformed function call"));
        };
        let function = self
            .functions
            .get(name.as_str())
            .cloned()
            .ok_or_else(|| ConstructionError::UnknownFunction(name.as_str().to_string()))?;
        let argument = self.build(argument.into_inner())?;
        Ok(self.ast.borrow_mut().function(function, argument)?)
    }
}

fn binary_op(pair: &Pair<Rule>) -> Result<BinaryOp, Error> {
    Ok(match pair.as_rule() {
        Rule::add => BinaryOp::Add,
        Rule::subtract => BinaryOp::Subtract,
        Rule::multiply => BinaryOp::Multiply,
        Rule::divide => BinaryOp::Divide,
        Rule::modulo => BinaryOp::Modulo,
        Rule::power => BinaryOp::Power,
        Rule::eq => BinaryOp::Equals,
        Rule::neq => BinaryOp::NotEquals,
        Rule::lt => BinaryOp::LessThan,
        Rule::le => BinaryOp::LessThanOrEqual,
        Rule::gt => BinaryOp::GreaterThan,
        Rule::ge => BinaryOp::GreaterThanOrEqual,
        Rule::and => BinaryOp::And,
        Rule::or => BinaryOp::Or,
        _ => return Err(unexpected(pair)),
    })
}

/// `name` or `[any name]`.
fn variable_name<'i>(pair: &Pair<'i, Rule>) -> &'i str {
    pair.clone()
        .into_inner()
        .next()
        .map_or(pair.as_str(), |inner| inner.as_str())
}

/// Integers become `Int32` when they fit, else `Int64`. Anything with a
/// fraction or exponent is a `Float`.
fn number(text: &str) -> Option<Value> {
    if text.contains(['.', 'e', 'E']) {
        return text.parse::<f64>().ok().map(Value::from);
    }
    if let Ok(v) = text.parse::<i32>() {
        return Some(v.into());
    }
    if let Ok(v) = text.parse::<i64>() {
        return Some(v.into());
    }
    text.parse::<f64>().ok().map(Value::from)
}

/// Most significant byte first. An odd digit count is padded on the left.
fn hex_bytes(digits: &str) -> Option<Vec<u8>> {
    let padded = if digits.len() % 2 == 1 {
        format!("0{digits}")
    } else {
        digits.to_string()
    };
    (0..padded.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(padded.get(i..i + 2)?, 16).ok())
        .collect()
}

fn first_inner<'i>(mut pairs: Pairs<'i, Rule>, input: &'i str) -> Result<Pair<'i, Rule>, Error> {
    pairs.next().ok_or_else(|| {
        Error::from(ParseError::new_from_pos(
            ErrorVariant::CustomError {
                message: "empty parse tree".to_string(),
            },
            Position::from_start(input),
        ))
    })
}

fn unexpected(pair: &Pair<Rule>) -> Error {
    invalid(pair.as_span(), format!("unexpected {:?}", pair.as_rule()))
}

fn invalid(span: Span, message: impl Into<String>) -> Error {
    Error::from(ParseError::new_from_span(
        ErrorVariant::CustomError {
            message: message.into(),
        },
        span,
    ))
}
