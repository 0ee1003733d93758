//! Base path canonicalization.
//!
//! Stored keys are URL-safe: each path segment is percent-encoded, slashes
//! between segments are kept as separators, and the leading slash is always
//! present. Routing captures arrive percent-decoded and without the leading
//! slash, so they are re-encoded here before touching the registry or the
//! store.

use std::borrow::Cow;

/// Percent-encode each segment of a base path, preserving the slashes
/// between segments and the leading slash.
pub fn encode_base_path(base_path: &str) -> String {
    let trimmed = base_path.trim_start_matches('/');
    let encoded = trimmed
        .split('/')
        .map(urlencoding::encode)
        .collect::<Vec<Cow<'_, str>>>()
        .join("/");
    format!("/{encoded}")
}

/// Canonicalize a decoded route capture into a stored key.
///
/// Wildcard captures come through with percent-escapes already decoded and
/// the leading slash stripped.
pub fn normalize_captured(captured: &str) -> String {
    encode_base_path(captured)
}
