//! The typed node tree.
//!
//! Nodes of one tree live in an [`Ast`] arena and refer to their children by
//! [`NodeId`]. Building a node simplifies its operands first, so once the
//! root is simplified the whole tree is.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ConstructionError, Error};
use crate::function::{self, UnaryFunction};
use crate::generate::Compiled;
use crate::operator::{BinaryOp, UnaryOp};
use crate::tolerance::Tolerance;
use crate::value::{Value, ValueKind, ValueType};

/// Index into the argument slice passed to [`Compiled::evaluate`].
pub type BindingId = usize;

/// Handle to a node inside one [`Ast`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// The parameters a formula may read, with their types.
#[derive(Debug, Default)]
pub struct ParameterSource {
    declarations: Vec<(Arc<str>, ValueType)>,
    by_name: HashMap<Arc<str>, BindingId>,
}

impl ParameterSource {
    /// Binding ids follow declaration order. When a name repeats, the first
    /// declaration wins.
    pub fn new<N: Into<Arc<str>>>(declarations: impl IntoIterator<Item = (N, ValueType)>) -> Self {
        let mut source = Self::default();
        for (name, ty) in declarations {
            let name: Arc<str> = name.into();
            if source.by_name.contains_key(&name) {
                continue;
            }
            source.by_name.insert(name.clone(), source.declarations.len());
            source.declarations.push((name, ty));
        }
        source
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn lookup(&self, name: &str) -> Option<(BindingId, ValueType)> {
        let binding = *self.by_name.get(name)?;
        Some((binding, self.declarations[binding].1))
    }

    pub fn name(&self, binding: BindingId) -> Option<&str> {
        self.declarations.get(binding).map(|(name, _)| &**name)
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ValueType)> {
        self.declarations.iter().map(|(name, ty)| (&**name, *ty))
    }
}

/// A read of one runtime parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    pub name: Arc<str>,
    pub binding: BindingId,
    pub ty: ValueType,
}

#[derive(Clone, Debug)]
pub enum Node {
    Constant(Value),
    Parameter(Parameter),
    Binary {
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    },
    Unary {
        op: UnaryOp,
        operand: NodeId,
    },
    Function {
        function: Arc<dyn UnaryFunction>,
        argument: NodeId,
    },
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Constant(l), Self::Constant(r)) => l == r,
            (Self::Parameter(l), Self::Parameter(r)) => l == r,
            (
                Self::Binary { op, left, right },
                Self::Binary {
                    op: o,
                    left: l,
                    right: r,
                },
            ) => op == o && left == l && right == r,
            (Self::Unary { op, operand }, Self::Unary { op: o, operand: x }) => {
                op == o && operand == x
            }
            (
                Self::Function { function, argument },
                Self::Function {
                    function: f,
                    argument: a,
                },
            ) => function.name() == f.name() && argument == a,
            _ => false,
        }
    }
}

#[derive(Clone, Debug)]
struct Slot {
    node: Node,
    kind: ValueKind,
    tolerant: bool,
}

/// Arena of nodes bound to one [`ParameterSource`].
#[derive(Clone, Debug)]
pub struct Ast {
    slots: Vec<Slot>,
    parameters: Arc<ParameterSource>,
}

impl Ast {
    pub fn new(parameters: Arc<ParameterSource>) -> Self {
        Self {
            slots: vec![],
            parameters,
        }
    }

    pub fn parameters(&self) -> &Arc<ParameterSource> {
        &self.parameters
    }

    /// Number of nodes, including ones no longer reachable after folding.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot(&self, id: NodeId) -> Result<&Slot, ConstructionError> {
        self.slots
            .get(id.0)
            .ok_or(ConstructionError::UnknownNode(id))
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, ConstructionError> {
        self.slot(id).map(|s| &s.node)
    }

    pub fn value_kind(&self, id: NodeId) -> Result<ValueKind, ConstructionError> {
        self.slot(id).map(|s| s.kind)
    }

    /// Whether the subtree contains a comparison a tolerance could relax.
    pub fn is_tolerant(&self, id: NodeId) -> Result<bool, ConstructionError> {
        self.slot(id).map(|s| s.tolerant)
    }

    fn push(&mut self, node: Node, kind: ValueKind, tolerant: bool) -> NodeId {
        self.slots.push(Slot {
            node,
            kind,
            tolerant,
        });
        NodeId(self.slots.len() - 1)
    }

    pub fn constant(&mut self, value: impl Into<Value>) -> NodeId {
        let value = value.into();
        let kind = value.kind();
        self.push(Node::Constant(value), kind, false)
    }

    pub fn parameter(&mut self, name: &str) -> Result<NodeId, ConstructionError> {
        let (binding, ty) = self
            .parameters
            .lookup(name)
            .ok_or_else(|| ConstructionError::UnknownParameter(name.to_string()))?;
        let parameter = Parameter {
            name: name.into(),
            binding,
            ty,
        };
        Ok(self.push(Node::Parameter(parameter), ty.kind(), false))
    }

    /// Builds `left op right` from the simplified operands.
    pub fn binary(
        &mut self,
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    ) -> Result<NodeId, ConstructionError> {
        let left = self.simplify(left)?;
        let right = self.simplify(right)?;
        let (left_kind, right_kind) = (self.value_kind(left)?, self.value_kind(right)?);
        let compares_numbers = op.comparison().is_some()
            && left_kind == ValueKind::Numeric
            && right_kind == ValueKind::Numeric;
        let tolerant = compares_numbers || self.is_tolerant(left)? || self.is_tolerant(right)?;
        Ok(self.push(
            Node::Binary { op, left, right },
            op.result_kind(left_kind, right_kind),
            tolerant,
        ))
    }

    pub fn unary(&mut self, op: UnaryOp, operand: NodeId) -> Result<NodeId, ConstructionError> {
        let operand = self.simplify(operand)?;
        let tolerant = self.is_tolerant(operand)?;
        Ok(self.push(Node::Unary { op, operand }, op.result_kind(), tolerant))
    }

    /// Builds a call of `function`. The function vets the kind of the
    /// simplified argument.
    pub fn function(
        &mut self,
        function: Arc<dyn UnaryFunction>,
        argument: NodeId,
    ) -> Result<NodeId, ConstructionError> {
        let argument = self.simplify(argument)?;
        function.check_argument(self.value_kind(argument)?)?;
        let tolerant = self.is_tolerant(argument)?;
        Ok(self.push(
            Node::Function { function, argument },
            ValueKind::Numeric,
            tolerant,
        ))
    }

    /// Folds `id` when every operand is a constant that can be folded. The
    /// constant replaces the node in its own slot, so `id` stays valid and
    /// repeated calls do not grow the arena. Children are left in place.
    pub fn simplify(&mut self, id: NodeId) -> Result<NodeId, ConstructionError> {
        let folded = match self.node(id)? {
            Node::Constant(_) | Node::Parameter(_) => None,
            Node::Binary { op, left, right } => {
                match (self.node(*left)?, self.node(*right)?) {
                    (Node::Constant(l), Node::Constant(r)) => (op.rule().fold)(*op, l, r),
                    _ => None,
                }
            }
            Node::Unary { op, operand } => match self.node(*operand)? {
                Node::Constant(value) => op.fold(value),
                _ => None,
            },
            Node::Function { function, argument } => match self.node(*argument)? {
                Node::Constant(Value::Numeric(n)) => {
                    function::fold(function.as_ref(), *n).map(Value::Numeric)
                }
                _ => None,
            },
        };
        let Some(value) = folded else {
            return Ok(id);
        };
        tracing::debug!(node = id.0, %value, "folded constant");
        let kind = value.kind();
        if let Some(slot) = self.slots.get_mut(id.0) {
            *slot = Slot {
                node: Node::Constant(value),
                kind,
                tolerant: false,
            };
        }
        Ok(id)
    }

    /// Copies the tree and binds its parameters to `context`'s source by name.
    ///
    /// Constants and functions are immutable and shared with the original;
    /// everything else is copied.
    pub fn deep_clone(&self, context: &CloneContext) -> Result<Ast, ConstructionError> {
        let slots = self
            .slots
            .iter()
            .map(|slot| {
                let node = match &slot.node {
                    Node::Parameter(parameter) => Node::Parameter(context.rebind(parameter)?),
                    other => other.clone(),
                };
                Ok(Slot {
                    node,
                    kind: slot.kind,
                    tolerant: slot.tolerant,
                })
            })
            .collect::<Result<Vec<_>, ConstructionError>>()?;
        Ok(Ast {
            slots,
            parameters: context.parameters.clone(),
        })
    }
}

/// Target of [`Ast::deep_clone`].
#[derive(Clone, Debug)]
pub struct CloneContext {
    parameters: Arc<ParameterSource>,
}

impl CloneContext {
    pub fn new(parameters: Arc<ParameterSource>) -> Self {
        Self { parameters }
    }

    pub fn parameters(&self) -> &Arc<ParameterSource> {
        &self.parameters
    }

    fn rebind(&self, parameter: &Parameter) -> Result<Parameter, ConstructionError> {
        let (binding, ty) = self
            .parameters
            .lookup(&parameter.name)
            .ok_or_else(|| ConstructionError::UnknownParameter(parameter.name.to_string()))?;
        if ty != parameter.ty {
            return Err(ConstructionError::ParameterTypeChanged {
                name: parameter.name.to_string(),
                expected: ty,
                found: parameter.ty,
            });
        }
        Ok(Parameter {
            name: parameter.name.clone(),
            binding,
            ty,
        })
    }
}

/// An [`Ast`] together with its root.
#[derive(Clone, Debug)]
pub struct Formula {
    ast: Ast,
    root: NodeId,
}

impl Formula {
    pub fn new(ast: Ast, root: NodeId) -> Result<Self, ConstructionError> {
        ast.slot(root)?;
        Ok(Self { ast, root })
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn root_slot(&self) -> &Slot {
        &self.ast.slots[self.root.0]
    }

    pub fn root_node(&self) -> &Node {
        &self.root_slot().node
    }

    pub fn value_kind(&self) -> ValueKind {
        self.root_slot().kind
    }

    pub fn is_tolerant(&self) -> bool {
        self.root_slot().tolerant
    }

    pub fn parameters(&self) -> &Arc<ParameterSource> {
        self.ast.parameters()
    }

    /// The constant this formula reduces to, if it does not read any
    /// parameter.
    pub fn as_constant(&self) -> Option<&Value> {
        match self.root_node() {
            Node::Constant(value) => Some(value),
            _ => None,
        }
    }

    pub fn simplify(mut self) -> Result<Self, ConstructionError> {
        self.root = self.ast.simplify(self.root)?;
        Ok(self)
    }

    pub fn deep_clone(&self, context: &CloneContext) -> Result<Self, ConstructionError> {
        Ok(Self {
            ast: self.ast.deep_clone(context)?,
            root: self.root,
        })
    }

    pub fn generate(&self) -> Result<Compiled, Error> {
        self.ast.generate(self.root)
    }

    pub fn generate_with_tolerance(&self, tolerance: &Tolerance) -> Result<Compiled, Error> {
        self.ast.generate_with_tolerance(self.root, tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::{NativeFunction, Overload};

    fn source() -> Arc<ParameterSource> {
        Arc::new(ParameterSource::new([
            ("price", ValueType::FLOAT),
            ("qty", ValueType::INT32),
        ]))
    }

    fn negate_i32(v: i32) -> i32 {
        -v
    }

    #[test]
    fn multiply_constants_folds() {
        let mut ast = Ast::new(source());
        let two = ast.constant(2);
        let three = ast.constant(3);
        let product = ast.binary(BinaryOp::Multiply, two, three).unwrap();
        let folded = ast.simplify(product).unwrap();
        assert_eq!(folded, product);
        assert_eq!(ast.node(folded).unwrap(), &Node::Constant(Value::from(6)));
    }

    #[test]
    fn repeated_simplify_reuses_the_slot() {
        let mut ast = Ast::new(source());
        let (one, two) = (ast.constant(1), ast.constant(2));
        let sum = ast.binary(BinaryOp::Add, one, two).unwrap();
        let len = ast.len();
        for _ in 0..3 {
            assert_eq!(ast.simplify(sum).unwrap(), sum);
            let scaled = ast.binary(BinaryOp::Multiply, sum, sum).unwrap();
            assert_eq!(ast.simplify(scaled).unwrap(), scaled);
            assert_eq!(ast.node(scaled).unwrap(), &Node::Constant(Value::from(9)));
        }
        // Only the three products were added.
        assert_eq!(ast.len(), len + 3);
        assert_eq!(ast.node(one).unwrap(), &Node::Constant(Value::from(1)));
        assert_eq!(ast.value_kind(sum).unwrap(), ValueKind::Numeric);
    }

    #[test]
    fn formula_simplify_keeps_the_root() {
        let mut ast = Ast::new(source());
        let (two, three) = (ast.constant(2), ast.constant(3));
        let product = ast.binary(BinaryOp::Multiply, two, three).unwrap();
        let formula = Formula::new(ast, product).unwrap().simplify().unwrap();
        assert_eq!(formula.root(), product);
        assert_eq!(formula.as_constant(), Some(&Value::from(6)));
    }

    #[test]
    fn simplify_is_idempotent() {
        let mut ast = Ast::new(source());
        let price = ast.parameter("price").unwrap();
        let one = ast.constant(1);
        let two = ast.constant(2);
        let sum = ast.binary(BinaryOp::Add, one, two).unwrap();
        let scaled = ast.binary(BinaryOp::Multiply, price, sum).unwrap();
        let neg = ast.unary(UnaryOp::Negate, sum).unwrap();
        let not = ast.unary(UnaryOp::Not, neg).unwrap();
        let func = Arc::new(NativeFunction::new("neg").with(Overload::Int32(negate_i32)));
        let call = ast.function(func, sum).unwrap();
        let equal = ast.binary(BinaryOp::Equals, one, one).unwrap();

        for id in [one, price, sum, scaled, neg, not, call, equal] {
            let once = ast.simplify(id).unwrap();
            let twice = ast.simplify(once).unwrap();
            assert_eq!(once, twice);
            assert_eq!(ast.node(once).unwrap(), ast.node(twice).unwrap());
            assert_eq!(ast.value_kind(once).unwrap(), ast.value_kind(id).unwrap());
        }
    }

    #[test]
    fn construction_simplifies_operands() {
        let mut ast = Ast::new(source());
        let price = ast.parameter("price").unwrap();
        let one = ast.constant(1);
        let two = ast.constant(2);
        let sum = ast.binary(BinaryOp::Add, one, two).unwrap();
        let scaled = ast.binary(BinaryOp::Multiply, price, sum).unwrap();

        let Node::Binary { right, .. } = ast.node(scaled).unwrap() else {
            panic!("expected a binary node");
        };
        assert_eq!(ast.node(*right).unwrap(), &Node::Constant(Value::from(3)));
        // Nothing to fold at the root: it reads a parameter.
        assert_eq!(ast.simplify(scaled).unwrap(), scaled);
    }

    #[test]
    fn constant_equality_folds() {
        let mut ast = Ast::new(source());
        let a = ast.constant("a");
        let a2 = ast.constant("a");
        let eq = ast.binary(BinaryOp::Equals, a, a2).unwrap();
        let folded = ast.simplify(eq).unwrap();
        assert_eq!(ast.node(folded).unwrap(), &Node::Constant(Value::from(true)));

        let l = ast.constant(vec![1u8, 2]);
        let r = ast.constant(vec![1u8, 2]);
        let eq = ast.binary(BinaryOp::Equals, l, r).unwrap();
        let folded = ast.simplify(eq).unwrap();
        assert_eq!(ast.node(folded).unwrap(), &Node::Constant(Value::from(true)));

        let l = ast.constant(vec![2u8, 1]);
        let eq = ast.binary(BinaryOp::Equals, l, r).unwrap();
        let folded = ast.simplify(eq).unwrap();
        assert_eq!(ast.node(folded).unwrap(), &Node::Constant(Value::from(false)));
    }

    #[test]
    fn tolerance_flag_propagates() {
        let mut ast = Ast::new(source());
        let price = ast.parameter("price").unwrap();
        let qty = ast.parameter("qty").unwrap();
        let less = ast.binary(BinaryOp::LessThan, price, qty).unwrap();
        assert!(ast.is_tolerant(less).unwrap());
        let not = ast.unary(UnaryOp::Not, less).unwrap();
        assert!(ast.is_tolerant(not).unwrap());
        let t = ast.constant(true);
        let and = ast.binary(BinaryOp::And, t, not).unwrap();
        assert!(ast.is_tolerant(and).unwrap());
        let sum = ast.binary(BinaryOp::Add, price, qty).unwrap();
        assert!(!ast.is_tolerant(sum).unwrap());
    }

    #[test]
    fn function_checks_argument() {
        let mut ast = Ast::new(source());
        let text = ast.constant("x");
        let func = Arc::new(NativeFunction::new("neg").with(Overload::Int32(negate_i32)));
        let err = ast.function(func, text).unwrap_err();
        assert_eq!(
            err,
            ConstructionError::IncompatibleArgument {
                function: "neg".into(),
                argument: ValueKind::String
            }
        );
    }

    #[test]
    fn unknown_ids_and_parameters() {
        let mut ast = Ast::new(source());
        assert_eq!(
            ast.parameter("missing"),
            Err(ConstructionError::UnknownParameter("missing".into()))
        );
        let bogus = NodeId(99);
        assert_eq!(ast.simplify(bogus), Err(ConstructionError::UnknownNode(bogus)));
        assert!(Formula::new(ast, bogus).is_err());
    }

    #[test]
    fn deep_clone_rebinds_by_name() {
        let mut ast = Ast::new(source());
        let price = ast.parameter("price").unwrap();
        let qty = ast.parameter("qty").unwrap();
        let total = ast.binary(BinaryOp::Multiply, price, qty).unwrap();
        let formula = Formula::new(ast, total).unwrap();
        let original = formula.generate().unwrap();

        // Same names, different binding order.
        let reordered = Arc::new(ParameterSource::new([
            ("qty", ValueType::INT32),
            ("discount", ValueType::FLOAT),
            ("price", ValueType::FLOAT),
        ]));
        let clone = formula.deep_clone(&CloneContext::new(reordered)).unwrap();
        let rebound = clone.generate().unwrap();

        assert_eq!(
            original.evaluate(&[Value::from(2.5), Value::from(4)]),
            Ok(Value::from(10.0))
        );
        assert_eq!(
            rebound.evaluate(&[Value::from(4), Value::from(0.0), Value::from(2.5)]),
            Ok(Value::from(10.0))
        );

        // The original tree is untouched.
        let Node::Parameter(p) = formula.ast().node(price).unwrap() else {
            panic!("expected a parameter");
        };
        assert_eq!(p.binding, 0);
        assert_eq!(formula.value_kind(), ValueKind::Numeric);
        assert!(!Arc::ptr_eq(formula.parameters(), clone.parameters()));
    }

    #[test]
    fn deep_clone_rejects_incompatible_sources() {
        let mut ast = Ast::new(source());
        let qty = ast.parameter("qty").unwrap();
        let formula = Formula::new(ast, qty).unwrap();

        let missing = Arc::new(ParameterSource::new([("price", ValueType::FLOAT)]));
        assert_eq!(
            formula.deep_clone(&CloneContext::new(missing)).unwrap_err(),
            ConstructionError::UnknownParameter("qty".into())
        );

        let retyped = Arc::new(ParameterSource::new([("qty", ValueType::String)]));
        assert_eq!(
            formula.deep_clone(&CloneContext::new(retyped)).unwrap_err(),
            ConstructionError::ParameterTypeChanged {
                name: "qty".into(),
                expected: ValueType::String,
                found: ValueType::INT32,
            }
        );
    }

    #[test]
    fn parameter_source_keeps_first_declaration() {
        let source = ParameterSource::new([
            ("a", ValueType::INT32),
            ("a", ValueType::String),
            ("b", ValueType::Boolean),
        ]);
        assert_eq!(source.len(), 2);
        assert_eq!(source.lookup("a"), Some((0, ValueType::INT32)));
        assert_eq!(source.lookup("b"), Some((1, ValueType::Boolean)));
        assert_eq!(source.name(1), Some("b"));
    }
}
