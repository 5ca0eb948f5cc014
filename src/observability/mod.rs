//! Observability subsystem for aeroscan
//!
//! - Structured logging (JSON)
//! - Scan metrics
//! - Typed lifecycle events
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on execution
//! 3. No async or background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use aeroscan::observability::{Event, Logger, ScanMetrics};
//!
//! Logger::emit(Event::ScanInitialized, &[("node", "3")]);
//!
//! let metrics = ScanMetrics::new();
//! metrics.increment_branches_opened();
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{ScanMetrics, ScanMetricsSnapshot};
