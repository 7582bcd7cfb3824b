//! SHA-256 content keys

use sha2::{Digest, Sha256};

/// Length of a rendered content key
pub const KEY_LEN: usize = 64;

/// Compute the content key for `data`
pub fn content_key(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    hex::encode(digest)
}

/// Check that `key` has the shape of a content key (64 lowercase hex chars)
pub fn is_content_key(key: &str) -> bool {
    key.len() == KEY_LEN
        && key
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
