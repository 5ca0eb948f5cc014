//! Collaborators shared by the blocks of one query

use crate::index::IndexAccess;
use crate::observability::{Event, Logger, ScanMetrics, Severity};
use crate::plan::ExpressionEvaluator;

use super::config::ScanConfig;

/// Everything an index scan needs beyond its plan node
pub struct ExecutionContext<'a> {
    /// Index iterator primitive
    pub indexes: &'a dyn IndexAccess,
    /// Evaluator for correlated bounds
    pub evaluator: &'a dyn ExpressionEvaluator,
    /// Shared counters
    pub metrics: &'a ScanMetrics,
    /// Scan behaviour
    pub config: ScanConfig,
}

impl<'a> ExecutionContext<'a> {
    /// Creates a context with the default config
    pub fn new(
        indexes: &'a dyn IndexAccess,
        evaluator: &'a dyn ExpressionEvaluator,
        metrics: &'a ScanMetrics,
    ) -> Self {
        Self {
            indexes,
            evaluator,
            metrics,
            config: ScanConfig::default(),
        }
    }

    /// Replaces the config
    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    /// Logs an event; trace events only when branch tracing is on
    pub(crate) fn log(&self, event: Event, fields: &[(&str, &str)]) {
        if event.severity() == Severity::Trace && !self.config.trace_branches {
            return;
        }
        Logger::emit(event, fields);
    }
}
