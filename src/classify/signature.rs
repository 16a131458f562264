//! Stable grouping keys for error messages.

use std::sync::OnceLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use super::ErrorKind;

fn uuid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
            .expect("valid uuid pattern")
    })
}

fn path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/\S+").expect("valid path pattern"))
}

fn digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]+").expect("valid digit pattern"))
}

/// Erase volatile tokens: UUIDs -> `UUID`, absolute paths -> `/PATH`,
/// digit runs -> `N`.
///
/// UUIDs and paths go first; erasing digits first would leave neither
/// recognisable.
pub fn normalize(message: &str) -> String {
    let cleaned = uuid_re().replace_all(message, "UUID");
    let cleaned = path_re().replace_all(&cleaned, "/PATH");
    digits_re().replace_all(&cleaned, "N").into_owned()
}

/// SHA-256 hex of `"{kind}:{normalized message}"`.
pub fn sign(kind: ErrorKind, message: &str) -> String {
    let key = format!("{}:{}", kind.label(), normalize(message));
    hex::encode(Sha256::digest(key.as_bytes()))
}
