//! Error classification and failure signatures.

pub mod signature;

use serde::{Deserialize, Serialize};

pub use signature::{normalize, sign};

/// Fixed failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Assertion,
    Timeout,
    Network,
    NullReference,
    FileSystem,
    Database,
    Environment,
    Unknown,
}

impl ErrorKind {
    /// Human-readable label. Part of every signature, so never change it.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Assertion => "Assertion Failure",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Network => "Network Error",
            ErrorKind::NullReference => "Null Reference",
            ErrorKind::FileSystem => "File System",
            ErrorKind::Database => "Database",
            ErrorKind::Environment => "Environment",
            ErrorKind::Unknown => "Unknown Error",
        }
    }

    pub fn parse(s: &str) -> Self {
        RULES
            .iter()
            .map(|(kind, _)| *kind)
            .find(|k| k.label() == s)
            .unwrap_or(ErrorKind::Unknown)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// Order is significant: the first rule with any match wins.
const RULES: &[(ErrorKind, &[&str])] = &[
    (
        ErrorKind::Assertion,
        &[
            "assertion",
            "assert",
            "expected",
            "actual",
            "should be",
            "must be",
            "equals",
            "not equal",
        ],
    ),
    (ErrorKind::Timeout, &["timeout", "timed out", "deadline exceeded"]),
    (
        ErrorKind::Network,
        &[
            "connection refused",
            "network",
            "socket",
            "http",
            "connection reset",
            "connection closed",
            "dns",
        ],
    ),
    (ErrorKind::NullReference, &["null", "nil", "none"]),
    (
        ErrorKind::FileSystem,
        &[
            "file not found",
            "no such file",
            "permission denied",
            "directory",
            "path",
        ],
    ),
    (
        ErrorKind::Database,
        &[
            "database",
            "sql",
            "query",
            "transaction",
            "duplicate key",
            "constraint",
        ],
    ),
    (
        ErrorKind::Environment,
        &[
            "environment",
            "config",
            "configuration",
            "property",
            "variable not set",
        ],
    ),
];

/// Classify an error by keyword search over message and stack trace.
pub fn classify(message: &str, stack_trace: &str) -> ErrorKind {
    let combined = format!("{} {}", message, stack_trace).to_lowercase();
    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| combined.contains(k)))
        .map(|(kind, _)| *kind)
        .unwrap_or(ErrorKind::Unknown)
}
