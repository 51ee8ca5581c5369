//! Input text normalization
//!
//! Inputs are reduced to CJK Unified Ideographs (U+4E00..=U+9FFF) and capped
//! at a fixed number of characters before they reach the store or the model.
//! The normalized text is the result store key.

use sha2::{Digest, Sha256};

/// Maximum number of characters kept after normalization
pub const MAX_INPUT_CHARS: usize = 512;

const CJK_START: char = '\u{4e00}';
const CJK_END: char = '\u{9fff}';

/// Whether `c` lies in the CJK Unified Ideographs block
#[inline]
pub fn is_target_char(c: char) -> bool {
    (CJK_START..=CJK_END).contains(&c)
}

/// Normalize with the default length cap
pub fn normalize(raw: &str) -> String {
    normalize_with_limit(raw, MAX_INPUT_CHARS)
}

/// Keep only target-script characters, truncated to `limit` characters
pub fn normalize_with_limit(raw: &str, limit: usize) -> String {
    raw.chars().filter(|c| is_target_char(*c)).take(limit).collect()
}

/// Short stable fingerprint for log lines (first 12 hex chars of SHA-256)
pub fn fingerprint(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let hex = format!("{:x}", digest);
    hex[..12].to_string()
}
