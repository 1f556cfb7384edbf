// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed error taxonomy for the sync core.
//!
//! Callers route on the variant: validation and permanent API errors are
//! surfaced to the operator, transient errors are retryable by the
//! caller's queue, authentication errors require re-running the
//! interactive authorization flow.

/// Sync error type.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A required field resolved to nothing. Raised before any network call.
    #[error("Missing required field {object}.{field}")]
    Validation { object: String, field: String },

    #[error("Salesforce authentication failed: {0}")]
    Authentication(String),

    /// 4xx from Salesforce (other than auth). The message is Salesforce's own.
    #[error("Salesforce rejected the request (HTTP {status}): {message}")]
    Permanent { status: u16, message: String },

    /// 5xx, network, or timeout. Safe for the caller to retry.
    #[error("Transient Salesforce error: {0}")]
    Transient(String),

    /// Bad mapping document or unknown target object at load time.
    #[error("Invalid field mapping: {0}")]
    Mapping(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl SyncError {
    /// Whether the caller may retry the operation as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Transient(_))
    }

    /// Whether the error requires re-running the interactive OAuth flow.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, SyncError::Authentication(_))
    }
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, SyncError>;
