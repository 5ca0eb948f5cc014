//! Executor error types
//!
//! Error codes:
//! - AERO_INDEX_UNAVAILABLE (FATAL)
//! - AERO_INVALID_BOUND_VALUE (ERROR)
//! - AERO_ALLOCATION_FAILURE (FATAL)
//! - AERO_EXECUTION_FAILED (ERROR)

use std::collections::TryReserveError;
use std::fmt;

use crate::index::{IndexError, IndexErrorCode};
use crate::plan::EvaluationError;

/// Severity levels for executor errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The outer row's scan failed; the block can continue after a reset
    Error,
    /// The query must be aborted
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Executor-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorErrorCode {
    /// A branch's index no longer exists
    AeroIndexUnavailable,
    /// A correlated bound evaluated to an unusable value
    AeroInvalidBoundValue,
    /// A scan buffer could not be reserved
    AeroAllocationFailure,
    /// Protocol misuse or upstream failure
    AeroExecutionFailed,
}

impl ExecutorErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorErrorCode::AeroIndexUnavailable => "AERO_INDEX_UNAVAILABLE",
            ExecutorErrorCode::AeroInvalidBoundValue => "AERO_INVALID_BOUND_VALUE",
            ExecutorErrorCode::AeroAllocationFailure => "AERO_ALLOCATION_FAILURE",
            ExecutorErrorCode::AeroExecutionFailed => "AERO_EXECUTION_FAILED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            ExecutorErrorCode::AeroIndexUnavailable | ExecutorErrorCode::AeroAllocationFailure => {
                Severity::Fatal
            }
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ExecutorErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Executor error type with full context
#[derive(Debug, Clone)]
pub struct ExecutorError {
    /// Error code
    code: ExecutorErrorCode,
    /// Human-readable message
    message: String,
}

impl ExecutorError {
    /// Create an index unavailable error (FATAL)
    pub fn index_unavailable(index: impl fmt::Display) -> Self {
        Self {
            code: ExecutorErrorCode::AeroIndexUnavailable,
            message: format!("index {} is not available", index),
        }
    }

    /// Create an invalid bound value error
    pub fn invalid_bound_value(reason: impl Into<String>) -> Self {
        Self {
            code: ExecutorErrorCode::AeroInvalidBoundValue,
            message: reason.into(),
        }
    }

    /// Create an allocation failure error (FATAL)
    pub fn allocation_failure(reason: impl Into<String>) -> Self {
        Self {
            code: ExecutorErrorCode::AeroAllocationFailure,
            message: reason.into(),
        }
    }

    /// Create an execution failed error
    pub fn execution_failed(reason: impl Into<String>) -> Self {
        Self {
            code: ExecutorErrorCode::AeroExecutionFailed,
            message: reason.into(),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> ExecutorErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for ExecutorError {}

impl From<IndexError> for ExecutorError {
    fn from(err: IndexError) -> Self {
        let code = match err.code() {
            IndexErrorCode::AeroIndexUnavailable => ExecutorErrorCode::AeroIndexUnavailable,
            IndexErrorCode::AeroIndexDefinitionInvalid => ExecutorErrorCode::AeroExecutionFailed,
        };
        Self {
            code,
            message: err.message().to_string(),
        }
    }
}

impl From<TryReserveError> for ExecutorError {
    fn from(err: TryReserveError) -> Self {
        Self::allocation_failure(format!("scan buffer reservation failed: {}", err))
    }
}

impl From<EvaluationError> for ExecutorError {
    fn from(err: EvaluationError) -> Self {
        Self::invalid_bound_value(format!("bound evaluation failed: {}", err))
    }
}

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;
