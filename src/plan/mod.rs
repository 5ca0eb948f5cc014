//! Plan fragments consumed by the executor
//!
//! The executor does not plan. It receives an `IndexNode` whose indexes,
//! condition and correlated bounds are already decided, and an evaluator for
//! the bound expressions.

mod explain;
mod expression;
mod node;

pub use explain::ExplainIndexNode;
pub use expression::{
    EvaluationError, Expression, ExpressionEvaluator, RegisterId, StandardEvaluator, Variable,
    VariableBindings, VariableId,
};
pub use node::{BoundSource, BoundTarget, CostEstimate, IndexNode, VariableSlot};
