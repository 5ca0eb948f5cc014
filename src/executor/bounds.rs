//! Correlated bound resolution
//!
//! Builds the OR-condition for one outer row: every correlated bound is
//! evaluated against the row, turned into range constraints and combined
//! with its branch's constant constraints. An array-valued equality bound is
//! a membership test and expands its branch into one alternative per
//! element.

use serde_json::Value;

use crate::condition::{cartesian_expand, AndCondition, OrCondition, RangeInfo};
use crate::index::IndexKey;
use crate::plan::{BoundSource, BoundTarget, ExpressionEvaluator, IndexNode, VariableBindings};

use super::errors::{ExecutorError, ExecutorResult};

/// Resolves a node's correlated bounds per outer row
#[derive(Debug)]
pub struct BoundResolver<'a> {
    node: &'a IndexNode,
    by_branch: Vec<Vec<&'a BoundSource>>,
}

impl<'a> BoundResolver<'a> {
    /// Groups the node's bound sources by branch.
    ///
    /// Fails if a source names a branch the condition does not have.
    pub fn new(node: &'a IndexNode) -> ExecutorResult<Self> {
        let mut by_branch = vec![Vec::new(); node.condition.len()];
        for source in &node.bound_sources {
            match by_branch.get_mut(source.branch) {
                Some(sources) => sources.push(source),
                None => {
                    return Err(ExecutorError::execution_failed(format!(
                        "bound on {} refers to branch {} but the condition has {} branches",
                        source.attribute,
                        source.branch,
                        node.condition.len()
                    )))
                }
            }
        }
        Ok(Self { node, by_branch })
    }

    /// Builds the condition for `row`
    pub fn resolve(
        &self,
        row: &[Value],
        evaluator: &dyn ExpressionEvaluator,
    ) -> ExecutorResult<OrCondition> {
        let mut condition = OrCondition::new();
        for (branch, sources) in self.node.condition.branches().iter().zip(&self.by_branch) {
            let mut clauses = Vec::with_capacity(sources.len() + 1);
            clauses.push(vec![branch.clone()]);
            for source in sources {
                let value = self.evaluate(source, row, evaluator)?;
                clauses.push(alternatives(branch, source, &value)?);
            }
            condition.extend(cartesian_expand(&clauses));
        }
        Ok(condition)
    }

    fn evaluate(
        &self,
        source: &BoundSource,
        row: &[Value],
        evaluator: &dyn ExpressionEvaluator,
    ) -> ExecutorResult<Value> {
        let mut bindings = VariableBindings::new();
        for slot in &source.inputs {
            let value = row.get(slot.register).ok_or_else(|| {
                ExecutorError::execution_failed(format!(
                    "register {} for variable {} is outside the input row ({} registers)",
                    slot.register,
                    slot.variable.name,
                    row.len()
                ))
            })?;
            bindings.bind(slot.variable.id, value.clone());
        }
        Ok(evaluator.evaluate(&source.expression, &bindings)?)
    }
}

/// Range constraints one evaluated bound expands into
fn alternatives(
    branch: &AndCondition,
    source: &BoundSource,
    value: &Value,
) -> ExecutorResult<Vec<AndCondition>> {
    let constrain = |range: RangeInfo| AndCondition::new(branch.index().clone()).with_range(range);

    match (source.target, value) {
        (BoundTarget::Equality, Value::Array(items)) => {
            let mut keys = items
                .iter()
                .map(|item| scalar_key(source, item))
                .collect::<ExecutorResult<Vec<_>>>()?;
            keys.sort();
            keys.dedup();
            Ok(keys
                .into_iter()
                .map(|key| constrain(RangeInfo::equality(source.attribute.as_str(), key)))
                .collect())
        }
        (BoundTarget::Equality, _) => {
            let key = scalar_key(source, value)?;
            Ok(vec![constrain(RangeInfo::equality(source.attribute.as_str(), key))])
        }
        (BoundTarget::Lower { inclusive }, _) => {
            let key = scalar_key(source, value)?;
            Ok(vec![constrain(RangeInfo::lower(source.attribute.as_str(), key, inclusive))])
        }
        (BoundTarget::Upper { inclusive }, _) => {
            let key = scalar_key(source, value)?;
            Ok(vec![constrain(RangeInfo::upper(source.attribute.as_str(), key, inclusive))])
        }
    }
}

fn scalar_key(source: &BoundSource, value: &Value) -> ExecutorResult<IndexKey> {
    IndexKey::from_json(value).ok_or_else(|| {
        ExecutorError::invalid_bound_value(format!(
            "bound {} {} {} evaluated to a non-scalar value {}",
            source.attribute,
            source.target.operator(),
            source.expression,
            value
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorErrorCode;
    use crate::index::{IndexHandle, IndexId};
    use crate::plan::{EvaluationError, Expression, StandardEvaluator, Variable, VariableId};
    use serde_json::json;

    fn node(sources: Vec<BoundSource>) -> IndexNode {
        let idx = IndexHandle::hash(IndexId(1), "idx_xy", &["x", "y"]).into_ref();
        let mut node = IndexNode::new(1, "c", Variable::new(100, "doc"), 1, 2)
            .with_branch(AndCondition::new(idx).with_range(RangeInfo::equality("x", 5)));
        for source in sources {
            node = node.with_bound_source(source);
        }
        node
    }

    fn var_source(target: BoundTarget) -> BoundSource {
        BoundSource::new(0, "y", target, Expression::variable(VariableId(1)))
            .reading(Variable::new(1, "outer"), 0)
    }

    #[test]
    fn test_scalar_equality() {
        let node = node(vec![var_source(BoundTarget::Equality)]);
        let resolver = BoundResolver::new(&node).unwrap();

        let condition = resolver.resolve(&[json!(3)], &StandardEvaluator).unwrap();
        assert_eq!(condition.len(), 1);
        assert_eq!(
            condition[0].range("y").unwrap().equality_value(),
            Some(&IndexKey::from_int(3))
        );
        assert!(condition[0].range("x").unwrap().is_equality);
    }

    #[test]
    fn test_array_equality_expands() {
        let node = node(vec![var_source(BoundTarget::Equality)]);
        let resolver = BoundResolver::new(&node).unwrap();

        let condition = resolver.resolve(&[json!([3, 1, 2, 1])], &StandardEvaluator).unwrap();
        let ys: Vec<_> = condition
            .branches()
            .iter()
            .map(|b| b.range("y").unwrap().equality_value().cloned().unwrap())
            .collect();
        assert_eq!(ys, vec![IndexKey::from_int(1), IndexKey::from_int(2), IndexKey::from_int(3)]);
    }

    #[test]
    fn test_empty_array_yields_nothing() {
        let node = node(vec![var_source(BoundTarget::Equality)]);
        let resolver = BoundResolver::new(&node).unwrap();
        assert!(resolver.resolve(&[json!([])], &StandardEvaluator).unwrap().is_empty());
    }

    #[test]
    fn test_range_bounds() {
        let node = node(vec![
            var_source(BoundTarget::Lower { inclusive: true }),
            BoundSource::upper(0, "y", Expression::constant(10), false),
        ]);
        let resolver = BoundResolver::new(&node).unwrap();

        let condition = resolver.resolve(&[json!(4)], &StandardEvaluator).unwrap();
        let y = condition[0].range("y").unwrap();
        assert!(y.contains(&IndexKey::from_int(4)));
        assert!(!y.contains(&IndexKey::from_int(10)));

        let empty = resolver.resolve(&[json!(10)], &StandardEvaluator).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_array_range_bound_rejected() {
        let node = node(vec![var_source(BoundTarget::Upper { inclusive: true })]);
        let resolver = BoundResolver::new(&node).unwrap();
        let err = resolver.resolve(&[json!([1, 2])], &StandardEvaluator).unwrap_err();
        assert_eq!(err.code(), ExecutorErrorCode::AeroInvalidBoundValue);
    }

    #[test]
    fn test_object_bound_rejected() {
        let node = node(vec![var_source(BoundTarget::Equality)]);
        let resolver = BoundResolver::new(&node).unwrap();
        let err = resolver.resolve(&[json!({"a": 1})], &StandardEvaluator).unwrap_err();
        assert_eq!(err.code(), ExecutorErrorCode::AeroInvalidBoundValue);
    }

    #[test]
    fn test_evaluator_failure_is_invalid_bound() {
        struct FailingEvaluator;
        impl ExpressionEvaluator for FailingEvaluator {
            fn evaluate(
                &self,
                _: &Expression,
                _: &VariableBindings,
            ) -> Result<Value, EvaluationError> {
                Err(EvaluationError::Unsupported("test".into()))
            }
        }

        let node = node(vec![var_source(BoundTarget::Equality)]);
        let resolver = BoundResolver::new(&node).unwrap();
        let err = resolver.resolve(&[json!(1)], &FailingEvaluator).unwrap_err();
        assert_eq!(err.code(), ExecutorErrorCode::AeroInvalidBoundValue);
    }

    #[test]
    fn test_missing_register() {
        let node = node(vec![var_source(BoundTarget::Equality)]);
        let resolver = BoundResolver::new(&node).unwrap();
        let err = resolver.resolve(&[], &StandardEvaluator).unwrap_err();
        assert_eq!(err.code(), ExecutorErrorCode::AeroExecutionFailed);
    }

    #[test]
    fn test_unknown_branch_rejected() {
        let mut source = var_source(BoundTarget::Equality);
        source.branch = 4;
        let node = node(vec![source]);
        assert!(BoundResolver::new(&node).is_err());
    }
}
