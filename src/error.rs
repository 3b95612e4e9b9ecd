//! Error types.
//!
//! Two layers:
//!
//! - [`FitError`]: what can go wrong for a single package (fit, extraction,
//!   schema). Most variants are contained by the harmonizer and reported as
//!   per-package diagnostics.
//! - [`AppError`]: a run-level failure with a process exit code.

use thiserror::Error;

/// A failure attached to one package or one data source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    /// The fitting routine reported that it did not converge.
    #[error("fit did not converge: {0}")]
    ConvergenceFailure(String),

    /// The result handle cannot provide coefficients and standard errors.
    #[error("unsupported model kind '{kind}': {reason}")]
    UnsupportedModelKind { kind: String, reason: String },

    /// A persisted table does not match the expected tidy schema.
    #[error("schema mismatch in '{source_name}': {detail}")]
    SchemaMismatch { source_name: String, detail: String },

    /// Two coefficients normalized to the same term name.
    #[error("duplicate term '{0}' after name normalization")]
    DuplicateTerm(String),

    /// A package id appeared more than once in one comparison.
    #[error("package '{0}' already present in the table")]
    DuplicatePackage(String),

    /// A coefficient record violates the estimate invariants.
    #[error("invalid estimate for term '{term}': {reason}")]
    InvalidEstimate { term: String, reason: String },

    /// The fitting backend could not be started or exited abnormally.
    #[error("fit setup failed: {0}")]
    Setup(String),
}

impl FitError {
    pub fn unsupported(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedModelKind {
            kind: kind.into(),
            reason: reason.into(),
        }
    }

    pub fn schema(source_name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            source_name: source_name.into(),
            detail: detail.into(),
        }
    }

    /// Only schema-level errors abort a comparison.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FitError::SchemaMismatch { .. })
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        let code = if err.is_fatal() { 2 } else { 4 };
        AppError::new(code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
