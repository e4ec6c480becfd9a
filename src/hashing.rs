//! Deterministic hashing for the model. The hashing data structures in the standard library are
//! randomly seeded per process, which would make iteration order (and therefore random draws that
//! depend on it) differ between runs with the same seed. Use the `HashMap` and `HashSet` aliases
//! exported here instead; create them with `HashMap::default()`.
//!
//! The `hash_str` free function is used by `crate::random` to derive a stream's seed offset from
//! its name.

use xxhash_rust::xxh3::xxh3_64;

pub use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

/// A convenience method to compute the hash of a `&str`.
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}
