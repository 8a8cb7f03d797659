//! Deterministic fingerprints for assembled graphs.
//!
//! [`Fingerprinter`] feeds length-prefixed fields into a streaming xxh64
//! hasher, so `("ab", "c")` and `("a", "bc")` never collide by concatenation.
//!
//! ## Determinism Guarantees
//!
//! - Fields are hashed in the order they are fed
//! - Callers feed sequences in a stable order (`BTreeMap` iteration)

use xxhash_rust::xxh64::Xxh64;

/// Seed shared by every fingerprint.
const SEED: u64 = 0;

/// Streaming fingerprint builder.
#[derive(Clone)]
pub struct Fingerprinter {
    hasher: Xxh64,
}

impl Fingerprinter {
    /// Start a fingerprint under a domain tag.
    pub fn new(domain: &str) -> Self {
        let mut fp = Self {
            hasher: Xxh64::new(SEED),
        };
        fp.field(domain);
        fp
    }

    /// Feed one field.
    pub fn field(&mut self, value: &str) -> &mut Self {
        self.hasher.update(&(value.len() as u64).to_le_bytes());
        self.hasher.update(value.as_bytes());
        self
    }

    /// Feed a count, typically the length of the sequence that follows.
    pub fn count(&mut self, n: usize) -> &mut Self {
        self.hasher.update(&(n as u64).to_le_bytes());
        self
    }

    /// Finish as a 16-character hex string.
    pub fn finish_hex(&self) -> String {
        format!("{:016x}", self.hasher.digest())
    }
}

impl std::fmt::Debug for Fingerprinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fingerprinter")
            .field("digest", &self.finish_hex())
            .finish()
    }
}
