// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for the audit pipeline and the job layer.

use uuid::Uuid;

/// Errors that end an audit run.
///
/// Per-page network and extraction failures never surface here; they are
/// folded into page-level failure records by the analyzers.
#[derive(thiserror::Error, Debug)]
pub enum AuditError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Main page {url} could not be analyzed: {reason}")]
    MainPage { url: String, reason: String },

    #[error("Browser unavailable: {0}")]
    Browser(String),

    #[error("Audit abgebrochen")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised by job stores and the job runner.
#[derive(thiserror::Error, Debug)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(Uuid),

    #[error("Job {0} is already finished")]
    AlreadyTerminal(Uuid),
}

pub type Result<T> = std::result::Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AuditError::MainPage {
            url: "https://example.com/".to_string(),
            reason: "navigation timed out after 30000ms".to_string(),
        };
        assert!(err.to_string().contains("https://example.com/"));
        assert!(err.to_string().contains("timed out"));
        assert_eq!(AuditError::Cancelled.to_string(), "Audit abgebrochen");
    }

    #[test]
    fn test_pattern_error_keeps_source() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = AuditError::InvalidPattern {
            pattern: "(".to_string(),
            source,
        };
        assert!(std::error::Error::source(&err).is_some());
    }
}
