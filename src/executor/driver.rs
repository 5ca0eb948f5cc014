//! Index iteration driver
//!
//! Walks the branches of one condition in sorted order, one live iterator at
//! a time, and buffers the documents it reads.
//!
//! # State machine
//!
//! `Idle -> BranchOpen -> Reading -> BranchExhausted -> (BranchOpen | AllExhausted)`
//!
//! Read-all-at-once iterators are drained by their first read and closed.
//! Range iterators are read in chunks of the caller's remaining demand.
//!
//! # Duplicates
//!
//! - Sorted neighbours on one index whose ranges overlap or touch are merged
//!   into one hull scan before opening
//! - When consecutive branches share an index, a branch's first document is
//!   dropped if it equals the last document emitted
//! - Full deduplication tracks every emitted document (opt-in)

use std::collections::HashSet;

use crate::condition::{merge_adjacent, AndCondition, Condition};
use crate::index::{DocumentHandle, IndexId, IndexIterator, StorageOffset};
use crate::observability::Event;

use super::context::ExecutionContext;
use super::errors::{ExecutorError, ExecutorResult};

/// Driver states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    /// No branch opened yet
    Idle,
    /// Iterator opened, nothing read
    BranchOpen,
    /// Iterator partially read
    Reading,
    /// Current branch done, next not yet opened
    BranchExhausted,
    /// Every branch done
    AllExhausted,
}

/// Scan state for one outer row
pub struct ScanState<'a> {
    condition: Condition<'a>,
    sort_coords: Vec<usize>,
    pos_in_ranges: usize,
    phase: ScanPhase,
    iterator: Option<Box<dyn IndexIterator>>,
    fresh: bool,
    documents: Vec<DocumentHandle>,
    pos_in_docs: usize,
    previous_index: Option<IndexId>,
    same_index_as_previous: bool,
    at_branch_start: bool,
    last_emitted: Option<StorageOffset>,
    seen: Option<HashSet<StorageOffset>>,
}

impl<'a> ScanState<'a> {
    /// Creates a scan over `condition` in `sort_coords` order
    pub fn new(condition: Condition<'a>, sort_coords: Vec<usize>, full_deduplication: bool) -> Self {
        Self {
            condition,
            sort_coords,
            pos_in_ranges: 0,
            phase: ScanPhase::Idle,
            iterator: None,
            fresh: false,
            documents: Vec::new(),
            pos_in_docs: 0,
            previous_index: None,
            same_index_as_previous: false,
            at_branch_start: false,
            last_emitted: None,
            seen: full_deduplication.then(HashSet::new),
        }
    }

    /// Current state
    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    /// The condition being scanned
    pub fn condition(&self) -> &Condition<'a> {
        &self.condition
    }

    /// Documents read but not yet consumed
    pub fn buffered(&self) -> &[DocumentHandle] {
        &self.documents[self.pos_in_docs..]
    }

    /// Marks `n` buffered documents as consumed
    pub fn consume(&mut self, n: usize) {
        self.pos_in_docs = (self.pos_in_docs + n).min(self.documents.len());
    }

    /// Refills the buffer with up to `at_most` documents from the current
    /// branch, moving to later branches as they run dry.
    ///
    /// Returns `false` once every branch is exhausted. Read-all-at-once
    /// iterators may deliver more than `at_most`.
    pub fn read_index(
        &mut self,
        ctx: &ExecutionContext<'_>,
        reverse: bool,
        at_most: usize,
    ) -> ExecutorResult<bool> {
        self.documents.clear();
        self.pos_in_docs = 0;
        if self.phase == ScanPhase::AllExhausted {
            return Ok(false);
        }
        let at_most = at_most.max(1);

        loop {
            if self.iterator.is_none() && !self.open_next_branch(ctx, reverse)? {
                self.phase = ScanPhase::AllExhausted;
                ctx.log(Event::ScanExhausted, &[]);
                return Ok(false);
            }
            let Some(iterator) = self.iterator.as_mut() else {
                continue;
            };

            let read_all = iterator.kind().reads_all_at_once();
            let request = if read_all && self.fresh { usize::MAX } else { at_most };
            let chunk = if read_all && !self.fresh {
                Vec::new()
            } else {
                iterator.next(request)
            };
            let exhausted = read_all || chunk.len() < request;
            self.fresh = false;
            self.phase = ScanPhase::Reading;

            ctx.metrics.add_documents_read(chunk.len() as u64);
            self.documents.try_reserve(chunk.len())?;
            for doc in chunk {
                if self.admit(ctx, &doc) {
                    self.documents.push(doc);
                }
            }

            if exhausted {
                self.close_branch(ctx);
            }
            if !self.documents.is_empty() {
                return Ok(true);
            }
        }
    }

    /// Opens the next non-empty branch, merging mergeable neighbours into it
    fn open_next_branch(&mut self, ctx: &ExecutionContext<'_>, reverse: bool) -> ExecutorResult<bool> {
        while let Some(&position) = self.sort_coords.get(self.pos_in_ranges) {
            self.pos_in_ranges += 1;
            let Some(branch) = self.condition.get(position) else {
                return Err(ExecutorError::execution_failed(format!(
                    "branch {} is outside the condition ({} branches)",
                    position,
                    self.condition.len()
                )));
            };
            if branch.is_unsatisfiable() {
                continue;
            }

            let mut scan: AndCondition = branch.clone();
            if ctx.config.merge_adjacent_branches {
                scan = self.absorb_neighbours(ctx, scan);
            }

            let index = scan.index().clone();
            let iterator = ctx.indexes.open(&index, &scan, reverse)?;

            self.same_index_as_previous = self.previous_index == Some(index.id);
            self.previous_index = Some(index.id);
            self.at_branch_start = true;
            self.fresh = true;
            self.phase = ScanPhase::BranchOpen;
            ctx.metrics.increment_branches_opened();
            if ctx.config.trace_branches {
                let branch = position.to_string();
                let condition = scan.to_string();
                ctx.log(
                    Event::BranchOpened,
                    &[
                        ("branch", branch.as_str()),
                        ("condition", condition.as_str()),
                        ("iterator", iterator.kind().as_str()),
                    ],
                );
            }
            self.iterator = Some(iterator);
            return Ok(true);
        }
        Ok(false)
    }

    fn absorb_neighbours(&mut self, ctx: &ExecutionContext<'_>, mut scan: AndCondition) -> AndCondition {
        while let Some(&next) = self.sort_coords.get(self.pos_in_ranges) {
            let Some(neighbour) = self.condition.get(next) else {
                break;
            };
            if neighbour.is_unsatisfiable() {
                self.pos_in_ranges += 1;
                continue;
            }
            let Some(merged) = merge_adjacent(&scan, neighbour) else {
                break;
            };
            self.pos_in_ranges += 1;
            ctx.metrics.increment_branches_merged();
            if ctx.config.trace_branches {
                let branch = next.to_string();
                let into = merged.to_string();
                ctx.log(Event::BranchMerged, &[("branch", branch.as_str()), ("into", into.as_str())]);
            }
            scan = merged;
        }
        scan
    }

    fn admit(&mut self, ctx: &ExecutionContext<'_>, doc: &DocumentHandle) -> bool {
        let first_of_branch = std::mem::replace(&mut self.at_branch_start, false);
        if first_of_branch && self.same_index_as_previous && self.last_emitted == Some(doc.offset) {
            ctx.metrics.increment_duplicates_suppressed();
            return false;
        }
        if let Some(seen) = self.seen.as_mut() {
            if !seen.insert(doc.offset) {
                ctx.metrics.increment_duplicates_suppressed();
                return false;
            }
        }
        self.last_emitted = Some(doc.offset);
        true
    }

    fn close_branch(&mut self, ctx: &ExecutionContext<'_>) {
        if let Some(mut iterator) = self.iterator.take() {
            iterator.close();
        }
        self.phase = ScanPhase::BranchExhausted;
        if ctx.config.trace_branches {
            let position = self.pos_in_ranges.to_string();
            ctx.log(Event::BranchExhausted, &[("position", position.as_str())]);
        }
    }

    /// Releases the iterator and buffers
    pub fn close(&mut self) {
        if let Some(mut iterator) = self.iterator.take() {
            iterator.close();
        }
        self.documents = Vec::new();
        self.pos_in_docs = 0;
        self.seen = None;
        self.phase = ScanPhase::AllExhausted;
    }
}

impl Drop for ScanState<'_> {
    fn drop(&mut self) {
        if let Some(mut iterator) = self.iterator.take() {
            iterator.close();
        }
    }
}
