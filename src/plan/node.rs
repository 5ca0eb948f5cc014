//! Index scan plan node
//!
//! The node is an already-decided plan fragment: which indexes to scan, the
//! OR-condition over them, where correlated bounds come from and which
//! register receives each document. It is shared read-only by the execution
//! block.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::condition::{AndCondition, OrCondition};
use crate::index::{IndexKind, IndexRef};

use super::explain::ExplainIndexNode;
use super::expression::{Expression, RegisterId, Variable};

/// Which part of a range a correlated bound fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundTarget {
    /// `attribute == value`, or membership when the value is an array
    Equality,
    /// `attribute > value` / `attribute >= value`
    Lower {
        /// Whether the bound admits the value itself
        inclusive: bool,
    },
    /// `attribute < value` / `attribute <= value`
    Upper {
        /// Whether the bound admits the value itself
        inclusive: bool,
    },
}

impl BoundTarget {
    /// Operator text for explain output
    pub fn operator(&self) -> &'static str {
        match self {
            BoundTarget::Equality => "==",
            BoundTarget::Lower { inclusive: true } => ">=",
            BoundTarget::Lower { inclusive: false } => ">",
            BoundTarget::Upper { inclusive: true } => "<=",
            BoundTarget::Upper { inclusive: false } => "<",
        }
    }
}

/// An outer variable and the register holding it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSlot {
    /// The variable
    pub variable: Variable,
    /// Register in the outer row
    pub register: RegisterId,
}

/// A bound whose value is computed per outer row
#[derive(Debug, Clone, PartialEq)]
pub struct BoundSource {
    /// Position of the branch in the node's condition
    pub branch: usize,
    /// Attribute the bound constrains
    pub attribute: String,
    /// Side of the range it fills
    pub target: BoundTarget,
    /// Expression producing the value
    pub expression: Expression,
    /// Outer variables the expression reads
    pub inputs: Vec<VariableSlot>,
}

impl BoundSource {
    /// Creates a correlated bound
    pub fn new(
        branch: usize,
        attribute: impl Into<String>,
        target: BoundTarget,
        expression: Expression,
    ) -> Self {
        Self {
            branch,
            attribute: attribute.into(),
            target,
            expression,
            inputs: Vec::new(),
        }
    }

    /// Equality (or membership) bound
    pub fn equality(branch: usize, attribute: impl Into<String>, expression: Expression) -> Self {
        Self::new(branch, attribute, BoundTarget::Equality, expression)
    }

    /// Lower bound
    pub fn lower(
        branch: usize,
        attribute: impl Into<String>,
        expression: Expression,
        inclusive: bool,
    ) -> Self {
        Self::new(branch, attribute, BoundTarget::Lower { inclusive }, expression)
    }

    /// Upper bound
    pub fn upper(
        branch: usize,
        attribute: impl Into<String>,
        expression: Expression,
        inclusive: bool,
    ) -> Self {
        Self::new(branch, attribute, BoundTarget::Upper { inclusive }, expression)
    }

    /// Declares that the expression reads `variable` from `register`
    pub fn reading(mut self, variable: Variable, register: RegisterId) -> Self {
        self.inputs.push(VariableSlot { variable, register });
        self
    }
}

/// Cost estimate for one node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostEstimate {
    /// Expected documents per branch, in condition order
    pub per_branch: Vec<f64>,
    /// Expected documents per incoming row
    pub items_per_input: f64,
    /// Expected output rows
    pub estimated_items: f64,
    /// Abstract cost: one unit per document plus one per opened branch
    pub estimated_cost: f64,
}

/// Plan fragment for an index scan
#[derive(Debug, Clone)]
pub struct IndexNode {
    /// Node identifier within the plan
    pub id: u64,
    /// Collection being scanned
    pub collection: String,
    /// Indexes the condition's branches use
    pub indexes: Vec<IndexRef>,
    /// Constant part of the condition, in DNF
    pub condition: OrCondition,
    /// Variable receiving each document
    pub out_variable: Variable,
    /// Register receiving each document
    pub out_register: RegisterId,
    /// Width of output rows
    pub nr_registers: usize,
    /// Correlated bounds filled per outer row
    pub bound_sources: Vec<BoundSource>,
    /// Whether sorted indexes are walked in descending order
    pub reverse: bool,
}

impl IndexNode {
    /// Creates a node with an empty condition
    pub fn new(
        id: u64,
        collection: impl Into<String>,
        out_variable: Variable,
        out_register: RegisterId,
        nr_registers: usize,
    ) -> Self {
        Self {
            id,
            collection: collection.into(),
            indexes: Vec::new(),
            condition: OrCondition::new(),
            out_variable,
            out_register,
            nr_registers,
            bound_sources: Vec::new(),
            reverse: false,
        }
    }

    /// Adds a branch; its index is recorded if not yet known
    pub fn with_branch(mut self, branch: AndCondition) -> Self {
        self.register_index(branch.index().clone());
        self.condition.push(branch);
        self
    }

    /// Replaces the condition, recording every index it uses
    pub fn with_condition(mut self, condition: OrCondition) -> Self {
        for branch in &condition {
            self.register_index(branch.index().clone());
        }
        self.condition = condition;
        self
    }

    /// Adds a correlated bound
    pub fn with_bound_source(mut self, source: BoundSource) -> Self {
        self.bound_sources.push(source);
        self
    }

    /// Scans in descending key order
    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }

    fn register_index(&mut self, index: IndexRef) {
        if !self.indexes.iter().any(|known| known.id == index.id) {
            self.indexes.push(index);
        }
    }

    /// Whether any bound depends on the outer row
    pub fn has_correlated_bounds(&self) -> bool {
        !self.bound_sources.is_empty()
    }

    /// Variables this node defines
    pub fn variables_set_here(&self) -> Vec<&Variable> {
        vec![&self.out_variable]
    }

    /// Outer variables read by correlated bounds, sorted by id
    pub fn variables_used_here(&self) -> Vec<&Variable> {
        let mut used = BTreeMap::new();
        for source in &self.bound_sources {
            for slot in &source.inputs {
                used.entry(slot.variable.id).or_insert(&slot.variable);
            }
        }
        used.into_values().collect()
    }

    /// Estimates output size and cost for `incoming_items` outer rows over a
    /// collection of `collection_size` documents
    pub fn estimate_cost(&self, incoming_items: f64, collection_size: usize) -> CostEstimate {
        let n = collection_size as f64;
        let per_branch: Vec<f64> = self
            .condition
            .branches()
            .iter()
            .map(|branch| estimate_branch(branch, n))
            .collect();

        let items_per_input: f64 = per_branch.iter().sum();
        let incoming = incoming_items.max(1.0);
        CostEstimate {
            estimated_items: items_per_input * incoming,
            estimated_cost: (items_per_input + per_branch.len() as f64) * incoming,
            items_per_input,
            per_branch,
        }
    }

    /// Structured explain output
    pub fn explain(&self) -> ExplainIndexNode {
        ExplainIndexNode::from_node(self)
    }
}

fn estimate_branch(branch: &AndCondition, n: f64) -> f64 {
    let index = branch.index();
    if branch.is_unsatisfiable() {
        return 0.0;
    }
    let point = if index.unique { 1.0_f64.min(n) } else { n * index.selectivity };

    match index.kind {
        IndexKind::Primary | IndexKind::Hash if branch.is_full_equality() => point,
        IndexKind::Sorted => match index.leading_field().and_then(|f| branch.range(f)) {
            Some(range) if range.is_equality => point,
            Some(range) => {
                let sides = usize::from(range.low.is_some()) + usize::from(range.high.is_some());
                n / 2f64.powi(sides as i32)
            }
            None => n,
        },
        _ => n,
    }
}
