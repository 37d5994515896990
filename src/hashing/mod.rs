//! Content digests used for change detection and cache keys.
//!
//! Every digest is a lowercase hex BLAKE3 hash (64 chars). Digests are persisted in
//! state files, so the algorithm and encoding must stay stable across releases.

mod normalize;

pub use normalize::normalize_text;

/// Length of a hex-encoded digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Returns the hex BLAKE3 digest of `bytes`.
#[inline]
pub fn digest(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Returns the cache key for a comment: the digest of its normalized text.
///
/// Formatting variants (case, punctuation, extra whitespace) collapse to the same key.
#[inline]
pub fn digest_text(text: &str) -> String {
    digest(normalize_text(text).as_bytes())
}

/// Returns `true` if `value` looks like a digest produced by this module.
pub fn is_digest(value: &str) -> bool {
    value.len() == DIGEST_HEX_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_digest_determinism() {
        let content = br#"[{"id": "ayk_01", "price": 100}]"#;

        let hash1 = digest(content);
        let hash2 = digest(content);
        let hash3 = digest(content);

        assert_eq!(hash1, hash2);
        assert_eq!(hash2, hash3);
    }

    #[test]
    fn test_digest_output_shape() {
        let hash = digest(b"test");
        assert_eq!(hash.len(), DIGEST_HEX_LEN);
        assert!(is_digest(&hash));
    }

    #[test]
    fn test_digest_uniqueness() {
        let inputs = [
            b"product-001".as_slice(),
            b"product-002".as_slice(),
            b"PRODUCT-001".as_slice(),
            b"product-001 ".as_slice(),
        ];

        let hashes: HashSet<_> = inputs.iter().map(|i| digest(i)).collect();
        assert_eq!(hashes.len(), inputs.len());
    }

    #[test]
    fn test_digest_empty_input() {
        let hash = digest(b"");
        assert!(is_digest(&hash));
        assert_ne!(hash, "0".repeat(DIGEST_HEX_LEN));
    }

    #[test]
    fn test_digest_text_ignores_formatting() {
        let base = digest_text("Harika bir ürün, tavsiye ederim!");

        assert_eq!(base, digest_text("harika BIR ürün tavsiye ederim"));
        assert_eq!(base, digest_text("  Harika   bir ürün,\ttavsiye ederim!!! "));
        assert_eq!(base, digest_text("harika bir urun tavsiye ederim"));
    }

    #[test]
    fn test_digest_text_distinguishes_content() {
        assert_ne!(digest_text("çok iyi"), digest_text("çok kötü"));
    }

    #[test]
    fn test_digest_text_matches_digest_of_normalized() {
        let text = "Kargo HIZLI geldi.";
        assert_eq!(
            digest_text(text),
            digest(normalize_text(text).as_bytes())
        );
    }

    #[test]
    fn test_is_digest_rejects_garbage() {
        assert!(!is_digest(""));
        assert!(!is_digest("xyz"));
        assert!(!is_digest(&"A".repeat(DIGEST_HEX_LEN)));
    }
}
