//! Extension id derivation.
//!
//! Browsers compute an unpacked extension's id from its public key:
//! SHA-256 the DER key, keep the first 16 bytes, hex-encode, then shift
//! every hex digit into the `a..=p` alphabet. We must produce exactly the
//! same string or the pinned key and the id we open pages with disagree.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

/// Length of an extension id in characters.
pub const EXTENSION_ID_LEN: usize = 32;

static EXTENSION_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-p]{32}$").unwrap());

/// Derive the extension id for a DER-encoded (SPKI) public key.
pub fn extension_id(public_key_der: &[u8]) -> String {
    let digest = Sha256::digest(public_key_der);
    id_from_digest(&digest[..EXTENSION_ID_LEN / 2])
}

/// Map hex nibbles of `bytes` to `a..=p`.
fn id_from_digest(bytes: &[u8]) -> String {
    hex::encode(bytes)
        .chars()
        .filter_map(|c| c.to_digit(16))
        .map(|n| char::from(b'a' + n as u8))
        .collect()
}

/// Check whether `id` is shaped like an extension id.
pub fn is_extension_id(id: &str) -> bool {
    EXTENSION_ID_RE.is_match(id)
}
