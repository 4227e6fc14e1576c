//! Short code generation and shape validation.
//!
//! Candidate codes come from pluggable generators behind [`CodeGenerator`].
//! Collision handling (retry, length growth) lives entirely in the
//! allocator; swapping generators never changes that policy.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::{Arc, LazyLock};

/// Starting length for generated candidate codes.
pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Compiled regex for the accepted short-code shape.
static SHORT_CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{4,64}$").unwrap());

/// Returns true when `code` has the accepted short-code shape
/// (4-64 characters of `[A-Za-z0-9_-]`).
///
/// Applied on the read path before touching the cache or the store, so
/// arbitrary path segments never become cache keys.
pub fn is_valid_short_code(code: &str) -> bool {
    SHORT_CODE_REGEX.is_match(code)
}

/// Produces candidate short codes of a requested length.
///
/// Implementations must be cheap and side-effect free; uniqueness is not
/// their concern. The allocator checks candidates against the durable store
/// and retries on collision.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self, length: usize) -> String;
}

/// Uniform random alphanumeric codes.
pub struct RandomAlphanumeric;

impl CodeGenerator for RandomAlphanumeric {
    fn generate(&self, length: usize) -> String {
        use rand::Rng;
        use rand::distr::Alphanumeric;

        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(length)
            .map(char::from)
            .collect()
    }
}

/// Content-derived codes: hex prefix of a SHA-256 over fresh entropy.
pub struct HexHash;

impl CodeGenerator for HexHash {
    fn generate(&self, length: usize) -> String {
        use rand::Rng;

        let seed: [u8; 16] = rand::rng().random();
        let nanos = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(seed);
        hasher.update(nanos.to_be_bytes());
        let digest = hex::encode(hasher.finalize());

        digest.chars().take(length).collect()
    }
}

/// Resolves a generator by its configured name.
///
/// Unknown names fall back to the random alphanumeric generator.
pub fn generator_from_name(name: &str) -> Arc<dyn CodeGenerator> {
    match name {
        "hex" => Arc::new(HexHash),
        _ => Arc::new(RandomAlphanumeric),
    }
}
