//! Deterministic hashing. The standard library `HashMap` is randomly seeded, which would make
//! any iteration over a map differ between runs. Everything in the engine whose iteration order
//! matters uses `IndexMap`/`IndexSet`; plain lookups use the `rustc-hash` maps re-exported here.
//!
//! `HashMap<K, V, S>` has no `new` method for a custom hasher. Use `HashMap::default()`.

use xxhash_rust::xxh3::xxh3_64;

pub use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

/// A convenience method to compute the hash of a `&str`. Stable across platforms and runs, which
/// is what the random module needs to derive per-generator seeds.
#[must_use]
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_strings() {
        assert_eq!(hash_str("EpisimRng"), hash_str("EpisimRng"));
        assert_ne!(hash_str("EpisimRng"), hash_str("OtherRng"));
    }
}
