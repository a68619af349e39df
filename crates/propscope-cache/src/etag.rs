//! Strong entity-tags over serialized response bodies.
//!
//! The validator is a content hash: stable across processes, no
//! timestamps, not used for anything security-relevant.

use sha2::{Digest, Sha256};

/// Quoted hex digest of the body bytes.
pub fn compute(body: &[u8]) -> String {
    format!("\"{}\"", hex::encode(Sha256::digest(body)))
}

/// Whether an `If-None-Match` header value matches the given entity-tag.
/// Handles `*` and comma-separated candidate lists; a weak prefix on a
/// candidate still matches the strong tag.
pub fn matches(if_none_match: Option<&str>, etag: &str) -> bool {
    let Some(header) = if_none_match else {
        return false;
    };
    if header.trim() == "*" {
        return true;
    }
    header
        .split(',')
        .map(str::trim)
        .any(|candidate| candidate == etag || candidate.strip_prefix("W/") == Some(etag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_and_content_only() {
        let a = compute(b"{\"total\":3}");
        let b = compute(b"{\"total\":3}");
        assert_eq!(a, b);
        assert_ne!(a, compute(b"{\"total\":4}"));
        assert!(a.starts_with('"') && a.ends_with('"'));
    }

    #[test]
    fn test_matches() {
        let tag = compute(b"body");
        assert!(matches(Some(&tag), &tag));
        assert!(matches(Some("*"), &tag));
        assert!(matches(Some(&format!("\"other\", {tag}")), &tag));
        assert!(matches(Some(&format!("W/{tag}")), &tag));
        assert!(!matches(Some("\"other\""), &tag));
        assert!(!matches(None, &tag));
    }
}
