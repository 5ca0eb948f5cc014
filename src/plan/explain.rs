//! Explain output for index scan nodes
//!
//! Produces deterministic, human-readable explain output.

use std::fmt;

use serde::Serialize;

use super::node::IndexNode;

/// Explain output for one index node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplainIndexNode {
    /// Node identifier
    pub node_id: u64,
    /// Scanned collection
    pub collection: String,
    /// Output variable name
    pub out_variable: String,
    /// Whether the scan runs in reverse
    pub reverse: bool,
    /// Indexes used, in plan order
    pub indexes: Vec<String>,
    /// Constant branches
    pub branches: Vec<String>,
    /// Correlated bounds
    pub correlated_bounds: Vec<String>,
    /// Outer variables read
    pub variables_used: Vec<String>,
}

impl ExplainIndexNode {
    /// Builds explain output from a plan node
    pub fn from_node(node: &IndexNode) -> Self {
        Self {
            node_id: node.id,
            collection: node.collection.clone(),
            out_variable: node.out_variable.name.clone(),
            reverse: node.reverse,
            indexes: node.indexes.iter().map(ToString::to_string).collect(),
            branches: node.condition.branches().iter().map(ToString::to_string).collect(),
            correlated_bounds: node
                .bound_sources
                .iter()
                .map(|s| {
                    format!(
                        "branch {}: {} {} {}",
                        s.branch,
                        s.attribute,
                        s.target.operator(),
                        s.expression
                    )
                })
                .collect(),
            variables_used: node
                .variables_used_here()
                .iter()
                .map(|v| v.name.clone())
                .collect(),
        }
    }
}

impl fmt::Display for ExplainIndexNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN INDEX NODE ===")?;
        writeln!(f, "Node: {}", self.node_id)?;
        writeln!(f, "Collection: {}", self.collection)?;
        writeln!(f, "Output: {}", self.out_variable)?;
        writeln!(f, "Direction: {}", if self.reverse { "DESC" } else { "ASC" })?;

        if !self.indexes.is_empty() {
            writeln!(f, "Indexes:")?;
            for index in &self.indexes {
                writeln!(f, "  - {}", index)?;
            }
        }
        if self.branches.is_empty() {
            writeln!(f, "Condition: false")?;
        } else {
            writeln!(f, "Condition:")?;
            for branch in &self.branches {
                writeln!(f, "  OR {}", branch)?;
            }
        }
        if !self.correlated_bounds.is_empty() {
            writeln!(f, "Correlated Bounds:")?;
            for bound in &self.correlated_bounds {
                writeln!(f, "  - {}", bound)?;
            }
            writeln!(f, "Uses: {}", self.variables_used.join(", "))?;
        }

        Ok(())
    }
}
