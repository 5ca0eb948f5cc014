//! Query executor subsystem for aeroscan
//!
//! Execution blocks form a pull pipeline: each block asks its dependency for
//! rows and produces its own. The index scan block turns every outer row
//! into zero or more output rows, one per matching document.
//!
//! # Execution Flow (per outer row)
//!
//! 1. Obtain the condition (constant, or rebuilt from the row's registers)
//! 2. Order branches by index, then by range
//! 3. Open one index iterator per branch, absorbing overlapping neighbours
//! 4. Suppress adjacent duplicates at branch boundaries
//! 5. Emit outer row + document until the branches are exhausted
//!
//! # Invariants
//!
//! - A document matching several branches is emitted once when the branches
//!   are adjacent in scan order
//! - `get_some` and `skip_some` advance the same position
//! - A failed scan releases its iterator before the error is returned

mod block;
mod bounds;
mod config;
mod context;
mod driver;
mod errors;
mod index_block;
mod source;

pub use block::{ExecutionBlock, ItemBlock, DEFAULT_BATCH_SIZE};
pub use bounds::BoundResolver;
pub use config::{ConfigError, ScanConfig};
pub use context::ExecutionContext;
pub use driver::{ScanPhase, ScanState};
pub use errors::{ExecutorError, ExecutorErrorCode, ExecutorResult, Severity};
pub use index_block::{ConditionSource, IndexBlock};
pub use source::{RowsBlock, SingletonBlock};
