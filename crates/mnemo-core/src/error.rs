// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Mnemo memory engine.

use strum::Display;
use thiserror::Error;

/// The primary error type used across all Mnemo adapters and core operations.
#[derive(Debug, Error)]
pub enum MnemoError {
    /// Malformed or missing caller input. Never retried.
    #[error("{0}")]
    InvalidArgument(String),

    /// The requested tool/operation name is not registered.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The vector backend or embedding provider could not be reached or failed.
    #[error("backend unavailable: {message}")]
    BackendUnavailable {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A batch operation completed with some per-item failures.
    #[error("partial failure: {succeeded} succeeded, {failed} failed")]
    PartialFailure { succeeded: usize, failed: usize },

    /// Configuration errors (invalid TOML, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// The operation observed a cancellation signal and stopped.
    #[error("operation cancelled")]
    Cancelled,

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error taxonomy class reported to protocol callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorKind {
    InvalidArgument,
    UnsupportedOperation,
    BackendUnavailable,
    NotFound,
    PartialFailure,
    Cancelled,
    Internal,
}

impl MnemoError {
    /// Shorthand for a backend failure with an underlying cause.
    pub fn backend(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        MnemoError::BackendUnavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns the taxonomy class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MnemoError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            MnemoError::UnsupportedOperation(_) => ErrorKind::UnsupportedOperation,
            MnemoError::BackendUnavailable { .. } | MnemoError::Timeout { .. } => {
                ErrorKind::BackendUnavailable
            }
            MnemoError::NotFound(_) => ErrorKind::NotFound,
            MnemoError::PartialFailure { .. } => ErrorKind::PartialFailure,
            MnemoError::Cancelled => ErrorKind::Cancelled,
            MnemoError::Config(_) | MnemoError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the error was caused by the caller rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidArgument | ErrorKind::UnsupportedOperation | ErrorKind::NotFound
        )
    }
}
