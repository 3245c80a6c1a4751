//! Plain API token format and its derived forms.
//!
//! A plain token is `flecto_` followed by 32 random bytes in URL-safe base64
//! without padding. Only its SHA-256 hash and a preview are ever stored.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub const TOKEN_PREFIX: &str = "flecto_";
const TOKEN_BYTES: usize = 32;
const PREVIEW_HEAD: usize = 4;
const PREVIEW_TAIL: usize = 4;

/// Generates a new plain token.
#[must_use]
pub fn generate() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill(&mut bytes);
    format!("{TOKEN_PREFIX}{}", URL_SAFE_NO_PAD.encode(bytes))
}

/// Lower-case hex SHA-256, used for API tokens and refresh tokens alike.
#[must_use]
pub fn hash(plain: &str) -> String {
    hex::encode(Sha256::digest(plain.as_bytes()))
}

/// `flecto_XXXX...YYYY`; tokens too short to abbreviate are returned as-is.
#[must_use]
pub fn preview(plain: &str) -> String {
    let head_end = TOKEN_PREFIX.len() + PREVIEW_HEAD;
    if plain.len() < head_end + PREVIEW_TAIL {
        return plain.to_string();
    }
    match (plain.get(..head_end), plain.get(plain.len() - PREVIEW_TAIL..)) {
        (Some(head), Some(tail)) => format!("{head}...{tail}"),
        _ => plain.to_string(),
    }
}

/// Cheap shape check done before any lookup.
#[must_use]
pub fn has_token_shape(plain: &str) -> bool {
    plain.len() > TOKEN_PREFIX.len() && plain.starts_with(TOKEN_PREFIX)
}

/// Constant-time comparison of two hex digests.
#[must_use]
pub fn hashes_match(a: &str, b: &str) -> bool {
    !a.is_empty() && a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_token_format() {
        let token = generate();
        assert!(token.starts_with(TOKEN_PREFIX));
        assert_eq!(token.len(), TOKEN_PREFIX.len() + 43);
        assert!(!token.contains('='));
        assert_ne!(token, generate());
    }

    #[test]
    fn test_hash_is_lowercase_hex_sha256() {
        let h = hash("abc");
        assert_eq!(h.len(), 64);
        assert_eq!(
            h,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_preview_keeps_head_and_tail() {
        let token = generate();
        let p = preview(&token);
        assert_eq!(p, format!("{}...{}", &token[..11], &token[token.len() - 4..]));
        assert_eq!(p.len(), 18);
    }

    #[test]
    fn test_preview_of_short_values() {
        assert_eq!(preview("flecto_abc"), "flecto_abc");
        assert_eq!(preview("flecto_abcdefg"), "flecto_abcdefg");
        assert_eq!(preview("flecto_abcdefgh"), "flecto_abcd...efgh");
        assert_eq!(preview(""), "");
    }

    #[test]
    fn test_token_shape() {
        assert!(has_token_shape("flecto_x"));
        assert!(!has_token_shape("flecto_"));
        assert!(!has_token_shape("acme_x"));
    }

    #[test]
    fn test_hashes_match() {
        let a = hash("one");
        assert!(hashes_match(&a, &hash("one")));
        assert!(!hashes_match(&a, &hash("two")));
        assert!(!hashes_match("", ""));
    }
}
