//! Failure grouping: classify, sign and bucket failed scenarios.
//!
//! Scenarios whose first failed step carries no message are excluded from
//! grouping entirely.

pub mod grouper;

use crate::classify::ErrorKind;
use crate::model::Severity;

pub use grouper::FailureGrouper;

/// Longest root cause kept, in characters, before `...` is appended.
pub const ROOT_CAUSE_MAX_CHARS: usize = 150;

/// Severity for a group of `count` occurrences of `kind`.
///
/// Database failures are always critical, even as a single occurrence.
pub fn severity(kind: ErrorKind, count: usize) -> Severity {
    if count >= 3 {
        return Severity::Critical;
    }
    match kind {
        ErrorKind::Database => Severity::Critical,
        ErrorKind::Timeout | ErrorKind::Network | ErrorKind::NullReference => Severity::High,
        ErrorKind::Assertion if count >= 2 => Severity::High,
        _ => Severity::Medium,
    }
}

/// First line of the message, trimmed and capped at [`ROOT_CAUSE_MAX_CHARS`].
pub fn root_cause(message: &str) -> String {
    let line = message.lines().next().unwrap_or_default().trim();
    if line.chars().count() > ROOT_CAUSE_MAX_CHARS {
        let cut: String = line.chars().take(ROOT_CAUSE_MAX_CHARS).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}

/// Canned remediation for each kind, used whenever no LLM answer is available.
pub fn fallback_fix(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Assertion => {
            "Review test expectations and verify they match actual behavior. \
             Check if application logic changed or test data is outdated."
        }
        ErrorKind::Timeout => {
            "Increase timeout values or investigate performance degradation. \
             Check for slow external dependencies or resource constraints."
        }
        ErrorKind::Network => {
            "Verify network connectivity, check service availability, \
             and ensure proper error handling for network failures."
        }
        ErrorKind::NullReference => {
            "Add null checks before accessing objects. \
             Verify object initialization and data flow in the application."
        }
        ErrorKind::FileSystem => {
            "Verify file paths, check file permissions, \
             and ensure required files exist before test execution."
        }
        ErrorKind::Database => {
            "Check database connection, verify schema integrity, \
             and ensure test data is properly set up."
        }
        ErrorKind::Environment => {
            "Review environment configuration, check required properties are set, \
             and verify environment setup scripts."
        }
        ErrorKind::Unknown => {
            "Review error logs and stack trace for more details. \
             Consider adding more specific error handling."
        }
    }
}
