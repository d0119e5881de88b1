//! Public error types for the Quill API.
//!
//! Internal errors are converted to [`Error`] at the API boundary. Hosts only
//! need to tell three situations apart: the script was malformed (`Parse`),
//! it exceeded a resource budget (`Execution` with a protection error, see
//! [`Error::is_protection`]), or something else went wrong.

use core::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::evaluator::{ExecutionError, ProtectionError};
use crate::parser::{ParseError, Span};

/// Public error type for all Quill operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed script. A diagnostic for the submitter, not a fault.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Evaluation failed.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// The invocation did not finish within its wall-clock limit.
    #[error("script timed out after {after:?}")]
    Timeout { after: Duration },

    /// The pool was closed before an evaluator became available.
    #[error("evaluator pool is closed")]
    PoolClosed,
}

impl Error {
    /// True for resource-protection failures (loop or call budget exceeded).
    pub fn is_protection(&self) -> bool {
        self.protection().is_some()
    }

    pub fn protection(&self) -> Option<&ProtectionError> {
        match self {
            Error::Execution(e) => e.protection(),
            _ => None,
        }
    }

    /// Diagnostics to show the submitter, if the error has a source location.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            Error::Parse(e) => vec![e.to_diagnostic()],
            _ => Vec::new(),
        }
    }
}

impl From<ProtectionError> for Error {
    fn from(err: ProtectionError) -> Self {
        Error::Execution(err.into())
    }
}

/// A diagnostic message (error, warning, or info) with source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Severity level (error, warning, info).
    pub severity: Severity,

    /// Primary diagnostic message.
    pub message: String,

    /// Source location of the primary issue.
    pub span: Span,

    /// Help text suggesting how to fix the issue.
    pub help: Vec<String>,

    /// Optional error code (e.g., "P001") for documentation lookup.
    pub code: Option<String>,
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}
