//! Index error types
//!
//! Error codes:
//! - AERO_INDEX_UNAVAILABLE (FATAL)
//! - AERO_INDEX_DEFINITION_INVALID (ERROR)

use std::fmt;

/// Severity levels for index errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation failed but the catalog is healthy
    Error,
    /// The current query must be aborted
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

/// Index-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexErrorCode {
    /// Referenced index does not exist (dropped or never created)
    AeroIndexUnavailable,
    /// Index definition rejected by the catalog
    AeroIndexDefinitionInvalid,
}

impl IndexErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            IndexErrorCode::AeroIndexUnavailable => "AERO_INDEX_UNAVAILABLE",
            IndexErrorCode::AeroIndexDefinitionInvalid => "AERO_INDEX_DEFINITION_INVALID",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            IndexErrorCode::AeroIndexUnavailable => Severity::Fatal,
            IndexErrorCode::AeroIndexDefinitionInvalid => Severity::Error,
        }
    }
}

impl fmt::Display for IndexErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Index error type with full context
#[derive(Debug, Clone)]
pub struct IndexError {
    code: IndexErrorCode,
    message: String,
}

impl IndexError {
    /// Create an index unavailable error
    pub fn unavailable(index: impl fmt::Display) -> Self {
        Self {
            code: IndexErrorCode::AeroIndexUnavailable,
            message: format!("index {} is not available", index),
        }
    }

    /// Create an invalid definition error
    pub fn definition_invalid(reason: impl Into<String>) -> Self {
        Self {
            code: IndexErrorCode::AeroIndexDefinitionInvalid,
            message: reason.into(),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> IndexErrorCode {
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

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for IndexError {}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;
