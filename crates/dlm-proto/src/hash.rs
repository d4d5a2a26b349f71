//! Resource name fingerprints.
//!
//! 32-bit FNV-1a (<http://www.isthe.com/chongo/tech/comp/fnv/>). Every node
//! hashes a resource name to the same value, which is what lets the cluster
//! agree on a directory node for it without talking. How the fingerprint is
//! turned into a node, and what happens on collisions, is up to the caller.

use std::hash::{BuildHasher, Hasher};

/// FNV-1a 32-bit offset basis; also the hash of the empty input.
pub const FNV_OFFSET_BASIS: u32 = 0x811C_9DC5;

/// FNV-1a 32-bit prime.
pub const FNV_PRIME: u32 = 0x0100_0193;

/// Hash `data` with 32-bit FNV-1a.
///
/// Identical output on every platform and word size.
#[inline]
pub fn hash(data: &[u8]) -> u32 {
    hash_more(data, FNV_OFFSET_BASIS)
}

/// Continue an FNV-1a hash from a previous accumulator.
///
/// `hash_more(b, hash(a)) == hash(&[a, b].concat())`.
#[inline]
pub fn hash_more(data: &[u8], seed: u32) -> u32 {
    data.iter().fold(seed, |h, &byte| (h ^ u32::from(byte)).wrapping_mul(FNV_PRIME))
}

/// Streaming FNV-1a hasher.
///
/// Bytes fed through [`Hasher::write`] produce the same fingerprint as
/// [`hash`] over their concatenation. Note that `Hash` impls for `str` and
/// slices also write a terminator or length prefix, so a `HashMap` key's
/// hash is not the wire fingerprint of the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fnv1aHasher {
    state: u32,
}

impl Fnv1aHasher {
    /// Hasher at the offset basis.
    pub const fn new() -> Self {
        Self { state: FNV_OFFSET_BASIS }
    }

    /// Current 32-bit fingerprint.
    pub const fn finish32(&self) -> u32 {
        self.state
    }
}

impl Default for Fnv1aHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for Fnv1aHasher {
    fn write(&mut self, bytes: &[u8]) {
        self.state = hash_more(bytes, self.state);
    }

    fn finish(&self) -> u64 {
        u64::from(self.state)
    }
}

/// [`BuildHasher`] for tables keyed by resource name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildFnv1a;

impl BuildHasher for BuildFnv1a {
    type Hasher = Fnv1aHasher;

    fn build_hasher(&self) -> Fnv1aHasher {
        Fnv1aHasher::new()
    }
}
