//! Bound expressions and their evaluation
//!
//! Correlated bounds are expressions over outer variables. The block binds
//! the variables from the current outer row's registers and evaluates the
//! expression through an `ExpressionEvaluator`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::index::lookup_path;

/// Plan-assigned variable identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VariableId(pub u32);

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named query variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    /// Identifier
    pub id: VariableId,
    /// Name as written in the query
    pub name: String,
}

impl Variable {
    /// Creates a variable
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id: VariableId(id),
            name: name.into(),
        }
    }
}

/// Position of a value within a row
pub type RegisterId = usize;

/// Expression producing a bound value
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal value
    Constant(Value),
    /// Value of a bound variable
    Variable(VariableId),
    /// Attribute path inside another expression's value
    Attribute {
        /// Expression producing the document
        base: Box<Expression>,
        /// Dot-separated path
        path: String,
    },
    /// Array of sub-expressions
    Array(Vec<Expression>),
}

impl Expression {
    /// A literal
    pub fn constant(value: impl Into<Value>) -> Self {
        Expression::Constant(value.into())
    }

    /// A variable reference
    pub fn variable(id: VariableId) -> Self {
        Expression::Variable(id)
    }

    /// `base.path`
    pub fn attribute(base: Expression, path: impl Into<String>) -> Self {
        Expression::Attribute {
            base: Box::new(base),
            path: path.into(),
        }
    }

    /// An array literal
    pub fn array(items: Vec<Expression>) -> Self {
        Expression::Array(items)
    }

    /// Variables read by the expression
    pub fn variables(&self) -> BTreeSet<VariableId> {
        let mut out = BTreeSet::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut BTreeSet<VariableId>) {
        match self {
            Expression::Constant(_) => {}
            Expression::Variable(id) => {
                out.insert(*id);
            }
            Expression::Attribute { base, .. } => base.collect_variables(out),
            Expression::Array(items) => {
                for item in items {
                    item.collect_variables(out);
                }
            }
        }
    }

    /// True when the expression reads no variables
    pub fn is_constant(&self) -> bool {
        self.variables().is_empty()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(value) => write!(f, "{}", value),
            Expression::Variable(id) => write!(f, "{}", id),
            Expression::Attribute { base, path } => write!(f, "{}.{}", base, path),
            Expression::Array(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

/// Variable values for one evaluation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableBindings {
    values: BTreeMap<VariableId, Value>,
}

impl VariableBindings {
    /// Creates empty bindings
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a variable, replacing any previous value
    pub fn bind(&mut self, id: VariableId, value: Value) {
        self.values.insert(id, value);
    }

    /// Value bound to a variable
    pub fn get(&self, id: VariableId) -> Option<&Value> {
        self.values.get(&id)
    }

    /// Number of bound variables
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when nothing is bound
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Expression evaluation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    /// Expression reads a variable with no binding
    #[error("variable {0} is not bound")]
    UnboundVariable(VariableId),

    /// Evaluator cannot handle the expression
    #[error("unsupported expression: {0}")]
    Unsupported(String),
}

/// Evaluates bound expressions
pub trait ExpressionEvaluator {
    /// Evaluates `expression` against `bindings`
    fn evaluate(
        &self,
        expression: &Expression,
        bindings: &VariableBindings,
    ) -> Result<Value, EvaluationError>;
}

/// Evaluator for the built-in expression forms.
///
/// Attribute access on a missing attribute or a non-object yields null.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardEvaluator;

impl ExpressionEvaluator for StandardEvaluator {
    fn evaluate(
        &self,
        expression: &Expression,
        bindings: &VariableBindings,
    ) -> Result<Value, EvaluationError> {
        match expression {
            Expression::Constant(value) => Ok(value.clone()),
            Expression::Variable(id) => bindings
                .get(*id)
                .cloned()
                .ok_or(EvaluationError::UnboundVariable(*id)),
            Expression::Attribute { base, path } => {
                let document = self.evaluate(base, bindings)?;
                Ok(lookup_path(&document, path).cloned().unwrap_or(Value::Null))
            }
            Expression::Array(items) => items
                .iter()
                .map(|item| self.evaluate(item, bindings))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
        }
    }
}
