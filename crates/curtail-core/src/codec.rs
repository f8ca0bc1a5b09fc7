//! Deterministic URL-to-key codec.
//!
//! The key is an opaque handle, not a round-trip encoding: the same
//! URL always yields the same key (which is what makes create
//! idempotent and keeps the file log small on replay), but nothing
//! decodes a key back into a URL.

use crate::short_key::ShortKey;
use xxhash_rust::xxh3::xxh3_128;

/// Encodes an original URL into its short key.
///
/// Total over the input domain: a 128-bit xxh3 digest of the URL
/// bytes, rendered as base58. Base58 output is alphanumeric, so the
/// key is always a valid path segment.
pub fn encode(original: &str) -> ShortKey {
    let digest = xxh3_128(original.as_bytes());
    let encoded = bs58::encode(digest.to_be_bytes()).into_string();
    ShortKey::new_unchecked(encoded)
}
