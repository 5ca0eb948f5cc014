//! Index scan execution block
//!
//! For every row pulled from the dependency, scans the node's condition and
//! emits one output row per matching document: the outer row's registers
//! plus the document in the node's out register.
//!
//! A constant condition is sorted once in `initialize` and borrowed from the
//! plan for every outer row. A condition with correlated bounds is rebuilt
//! and re-sorted per outer row.

use std::collections::VecDeque;

use serde_json::Value;

use crate::condition::{index_prefix, Condition, ConditionOrderer};
use crate::index::DocumentHandle;
use crate::observability::Event;
use crate::plan::IndexNode;

use super::block::{check_request, ExecutionBlock, ItemBlock};
use super::bounds::BoundResolver;
use super::context::ExecutionContext;
use super::driver::ScanState;
use super::errors::{ExecutorError, ExecutorErrorCode, ExecutorResult};

/// Where the condition for each outer row comes from
#[derive(Debug)]
pub enum ConditionSource<'a> {
    /// The node's condition, sorted once
    Constant {
        /// Scan order of the node's branches
        order: Vec<usize>,
    },
    /// Rebuilt from the outer row
    Correlated(BoundResolver<'a>),
}

impl ConditionSource<'_> {
    /// Whether the condition is rebuilt per outer row
    pub fn is_correlated(&self) -> bool {
        matches!(self, ConditionSource::Correlated(_))
    }
}

/// Execution block scanning indexes for each outer row
pub struct IndexBlock<'a> {
    node: &'a IndexNode,
    context: ExecutionContext<'a>,
    dependency: Box<dyn ExecutionBlock + 'a>,
    buffer: VecDeque<ItemBlock>,
    pos: usize,
    upstream_done: bool,
    initialized: bool,
    source: Option<ConditionSource<'a>>,
    scan: Option<ScanState<'a>>,
    pending: Option<ExecutorError>,
}

impl<'a> IndexBlock<'a> {
    /// Creates a block for `node` pulling outer rows from `dependency`
    pub fn new(
        node: &'a IndexNode,
        context: ExecutionContext<'a>,
        dependency: Box<dyn ExecutionBlock + 'a>,
    ) -> Self {
        Self {
            node,
            context,
            dependency,
            buffer: VecDeque::new(),
            pos: 0,
            upstream_done: false,
            initialized: false,
            source: None,
            scan: None,
            pending: None,
        }
    }

    /// The plan node
    pub fn node(&self) -> &IndexNode {
        self.node
    }

    /// Condition source chosen by `initialize`
    pub fn condition_source(&self) -> Option<&ConditionSource<'a>> {
        self.source.as_ref()
    }

    fn validate_node(&self) -> ExecutorResult<()> {
        let node = self.node;
        if node.out_register >= node.nr_registers {
            return Err(ExecutorError::execution_failed(format!(
                "out register {} is outside the row ({} registers)",
                node.out_register, node.nr_registers
            )));
        }
        for index in &node.indexes {
            if !self.context.indexes.contains(index) {
                return Err(ExecutorError::index_unavailable(index));
            }
        }
        for branch in &node.condition {
            if !node.indexes.iter().any(|known| known.id == branch.index().id) {
                return Err(ExecutorError::execution_failed(format!(
                    "branch {} uses an index the node does not list",
                    branch
                )));
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        if let Some(mut scan) = self.scan.take() {
            scan.close();
        }
        self.buffer.clear();
        self.pos = 0;
        self.upstream_done = false;
        self.pending = None;
    }

    fn ensure_initialized(&self) -> ExecutorResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(ExecutorError::execution_failed(format!(
                "index block for node {} is not initialized",
                self.node.id
            )))
        }
    }

    /// Current outer row, fetching from upstream when the buffer is empty.
    ///
    /// Returns `false` once upstream is exhausted.
    fn fetch_outer_row(&mut self) -> ExecutorResult<bool> {
        while self.buffer.front().map_or(true, |block| self.pos >= block.len()) {
            if self.buffer.pop_front().is_some() {
                self.pos = 0;
                continue;
            }
            if self.upstream_done {
                return Ok(false);
            }
            match self.dependency.get_some(1, self.context.config.batch_size)? {
                Some(block) => {
                    self.buffer.push_back(block);
                    self.pos = 0;
                }
                None => self.upstream_done = true,
            }
        }
        Ok(true)
    }

    fn advance_outer_row(&mut self) {
        self.scan = None;
        self.pos += 1;
    }

    /// Builds the scan for the current outer row
    fn start_scan(&mut self) -> ExecutorResult<ScanState<'a>> {
        let node: &'a IndexNode = self.node;
        let full_dedup = self.context.config.full_deduplication;

        match self.source.as_ref() {
            Some(ConditionSource::Constant { order }) => Ok(ScanState::new(
                Condition::Borrowed(&node.condition),
                order.clone(),
                full_dedup,
            )),
            Some(ConditionSource::Correlated(resolver)) => {
                let row = self
                    .buffer
                    .front()
                    .and_then(|block| block.row(self.pos))
                    .ok_or_else(|| ExecutorError::execution_failed("no current outer row"))?;
                let condition = resolver.resolve(row, self.context.evaluator)?;
                let order = ConditionOrderer::new(node.reverse).sort(&condition, &index_prefix(&condition));

                self.context.metrics.increment_conditions_rebuilt();
                let branches = condition.len().to_string();
                self.context
                    .log(Event::ConditionRebuilt, &[("branches", branches.as_str())]);
                Ok(ScanState::new(Condition::Owned(condition), order, full_dedup))
            }
            None => Err(ExecutorError::execution_failed("condition source not prepared")),
        }
    }

    /// Shared traversal of `get_some` and `skip_some`.
    ///
    /// Hands up to `at_most` (outer row, document) pairs to `sink` and
    /// returns how many were produced. A failure after some pairs were
    /// produced is held back and returned by the next call.
    fn traverse<F>(&mut self, at_most: usize, sink: F) -> ExecutorResult<usize>
    where
        F: FnMut(&[Value], &DocumentHandle) -> ExecutorResult<()>,
    {
        if let Some(err) = self.pending.take() {
            return Err(err);
        }

        let mut produced = 0;
        match self.fill(at_most, &mut produced, sink) {
            Ok(()) => Ok(produced),
            Err(err) => {
                self.abort(&err);
                if produced > 0 {
                    self.pending = Some(err);
                    Ok(produced)
                } else {
                    Err(err)
                }
            }
        }
    }

    fn fill<F>(&mut self, at_most: usize, produced: &mut usize, mut sink: F) -> ExecutorResult<()>
    where
        F: FnMut(&[Value], &DocumentHandle) -> ExecutorResult<()>,
    {
        while *produced < at_most {
            if !self.fetch_outer_row()? {
                break;
            }
            if self.scan.is_none() {
                let scan = self.start_scan()?;
                self.scan = Some(scan);
            }
            let Some(scan) = self.scan.as_mut() else {
                continue;
            };

            if scan.buffered().is_empty()
                && !scan.read_index(&self.context, self.node.reverse, at_most - *produced)?
            {
                self.advance_outer_row();
                continue;
            }

            let Some(row) = self.buffer.front().and_then(|block| block.row(self.pos)) else {
                continue;
            };
            let take = scan.buffered().len().min(at_most - *produced);
            for doc in &scan.buffered()[..take] {
                sink(row, doc)?;
                *produced += 1;
            }
            scan.consume(take);
        }
        Ok(())
    }

    fn abort(&mut self, err: &ExecutorError) {
        if let Some(mut scan) = self.scan.take() {
            scan.close();
        }
        if err.code() == ExecutorErrorCode::AeroInvalidBoundValue {
            self.pos += 1;
        }
        self.context.metrics.increment_scans_aborted();

        let node = self.node.id.to_string();
        let message = err.to_string();
        self.context.log(
            Event::ScanAborted,
            &[("error", message.as_str()), ("node", node.as_str())],
        );
    }
}

impl ExecutionBlock for IndexBlock<'_> {
    fn initialize(&mut self) -> ExecutorResult<()> {
        self.context
            .config
            .validate()
            .map_err(|err| ExecutorError::execution_failed(err.to_string()))?;
        self.dependency.initialize()?;
        self.validate_node()?;

        let node = self.node;
        self.source = Some(if node.has_correlated_bounds() {
            ConditionSource::Correlated(BoundResolver::new(node)?)
        } else {
            let order =
                ConditionOrderer::new(node.reverse).sort(&node.condition, &index_prefix(&node.condition));
            ConditionSource::Constant { order }
        });
        self.reset();
        self.initialized = true;

        let id = node.id.to_string();
        let branches = node.condition.len().to_string();
        let mode = if node.has_correlated_bounds() { "correlated" } else { "constant" };
        self.context.log(
            Event::ScanInitialized,
            &[
                ("branches", branches.as_str()),
                ("collection", node.collection.as_str()),
                ("condition", mode),
                ("node", id.as_str()),
            ],
        );
        Ok(())
    }

    fn initialize_cursor(&mut self, items: Option<&ItemBlock>, pos: usize) -> ExecutorResult<()> {
        self.reset();
        self.dependency.initialize_cursor(items, pos)
    }

    fn get_some(&mut self, at_least: usize, at_most: usize) -> ExecutorResult<Option<ItemBlock>> {
        self.ensure_initialized()?;
        check_request(at_least, at_most)?;

        let node = self.node;
        let mut out = ItemBlock::with_capacity(
            node.nr_registers,
            at_most.min(self.context.config.batch_size),
        )?;
        let result = self.traverse(at_most, |row, doc| {
            let mut values = row.to_vec();
            values.resize(node.nr_registers, Value::Null);
            values[node.out_register] = (*doc.body).clone();
            out.push_row(values)
        });

        match result? {
            0 => Ok(None),
            produced => {
                self.context.metrics.add_rows_produced(produced as u64);
                Ok(Some(out))
            }
        }
    }

    fn skip_some(&mut self, at_least: usize, at_most: usize) -> ExecutorResult<usize> {
        self.ensure_initialized()?;
        check_request(at_least, at_most)?;

        let skipped = self.traverse(at_most, |_, _| Ok(()))?;
        self.context.metrics.add_rows_skipped(skipped as u64);
        Ok(skipped)
    }

    fn shutdown(&mut self) -> ExecutorResult<()> {
        self.reset();
        self.buffer.shrink_to_fit();
        let was_initialized = std::mem::replace(&mut self.initialized, false);
        if was_initialized {
            let node = self.node.id.to_string();
            self.context.log(Event::ScanShutdown, &[("node", node.as_str())]);
        }
        self.dependency.shutdown()
    }
}
