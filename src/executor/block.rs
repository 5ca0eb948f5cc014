//! Pull-based execution block protocol
//!
//! Blocks form a pipeline; each pulls rows from its dependency on demand.
//! A block returns fewer rows than requested only when it is exhausted.

use serde_json::Value;

use super::errors::{ExecutorError, ExecutorResult};

/// Default number of rows fetched from upstream per request
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// A batch of rows with a fixed number of registers
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemBlock {
    nr_regs: usize,
    rows: Vec<Vec<Value>>,
}

impl ItemBlock {
    /// Creates an empty batch
    pub fn new(nr_regs: usize) -> Self {
        Self {
            nr_regs,
            rows: Vec::new(),
        }
    }

    /// Creates an empty batch with room for `capacity` rows
    pub fn with_capacity(nr_regs: usize, capacity: usize) -> ExecutorResult<Self> {
        let mut rows = Vec::new();
        rows.try_reserve(capacity)?;
        Ok(Self { nr_regs, rows })
    }

    /// Creates a batch from rows, padding or truncating each to `nr_regs`
    pub fn from_rows(nr_regs: usize, rows: Vec<Vec<Value>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(nr_regs, Value::Null);
                row
            })
            .collect();
        Self { nr_regs, rows }
    }

    /// Appends a row, padding or truncating it to the register count
    pub fn push_row(&mut self, mut row: Vec<Value>) -> ExecutorResult<()> {
        row.resize(self.nr_regs, Value::Null);
        self.rows.try_reserve(1)?;
        self.rows.push(row);
        Ok(())
    }

    /// Number of registers per row
    pub fn nr_regs(&self) -> usize {
        self.nr_regs
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the batch has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row by position
    pub fn row(&self, position: usize) -> Option<&[Value]> {
        self.rows.get(position).map(Vec::as_slice)
    }

    /// Value in one register of one row
    pub fn value(&self, row: usize, register: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(register))
    }

    /// All rows
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Consumes the batch into its rows
    pub fn into_rows(self) -> Vec<Vec<Value>> {
        self.rows
    }
}

/// A stage of the pull-based execution pipeline
pub trait ExecutionBlock {
    /// Prepares the block and its dependencies for execution
    fn initialize(&mut self) -> ExecutorResult<()>;

    /// Resets the cursor; `items`/`pos` identify the row of an enclosing
    /// block the pipeline runs for, if any
    fn initialize_cursor(&mut self, items: Option<&ItemBlock>, pos: usize) -> ExecutorResult<()>;

    /// Returns between `at_least` and `at_most` rows, fewer only when
    /// exhausted; `None` when nothing remains
    fn get_some(&mut self, at_least: usize, at_most: usize) -> ExecutorResult<Option<ItemBlock>>;

    /// Like `get_some` but discards the rows and returns how many were skipped
    fn skip_some(&mut self, at_least: usize, at_most: usize) -> ExecutorResult<usize>;

    /// Releases all resources held by the block and its dependencies
    fn shutdown(&mut self) -> ExecutorResult<()>;
}

/// Rejects malformed pull requests
pub(crate) fn check_request(at_least: usize, at_most: usize) -> ExecutorResult<()> {
    if at_most == 0 {
        return Err(ExecutorError::execution_failed("at_most must be at least 1"));
    }
    if at_least > at_most {
        return Err(ExecutorError::execution_failed(format!(
            "at_least ({}) exceeds at_most ({})",
            at_least, at_most
        )));
    }
    Ok(())
}
