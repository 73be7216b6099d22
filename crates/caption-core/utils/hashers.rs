//! Hash map construction for lookup tables
//!
//! Style registries and identifier maps are looked up once per span or cue,
//! so they use ahash for consistent performance across platforms.
//!
//! # Example
//!
//! ```rust
//! use caption_core::utils::hashers::create_hash_map;
//!
//! let mut map = create_hash_map::<String, usize>();
//! map.insert("style0".to_string(), 0);
//! ```

use ahash::RandomState;

/// `HashMap` using the ahash hasher
pub type HashMap<K, V> = std::collections::HashMap<K, V, RandomState>;

/// Create a new `HashMap` with the ahash hasher
#[must_use]
pub fn create_hash_map<K, V>() -> HashMap<K, V> {
    HashMap::with_hasher(RandomState::new())
}

/// Create a new `HashMap` with specific capacity and the ahash hasher
#[must_use]
pub fn create_hash_map_with_capacity<K, V>(capacity: usize) -> HashMap<K, V> {
    HashMap::with_capacity_and_hasher(capacity, RandomState::new())
}
