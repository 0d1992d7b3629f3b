//! Provide hash containers, re-exports *hashbrown* and *foldhash*.

// -----------------------------------------------------------------------------
// Modules

mod hasher;

// -----------------------------------------------------------------------------
// Exports

pub use hasher::{FixedHashState, FixedHasher};
pub use hasher::{NoOpHashState, NoOpHasher};

/// A [`hashbrown::HashMap`] using [`FixedHashState`], iteration order only
/// depends on the inserted keys.
pub type HashMap<K, V> = hashbrown::HashMap<K, V, FixedHashState>;

/// A [`hashbrown::HashMap`] for keys that already are well distributed
/// integers, such as class ids.
pub type NoOpHashMap<K, V> = hashbrown::HashMap<K, V, NoOpHashState>;

/// Create an empty [`HashMap`].
///
/// # Examples
///
/// ```
/// let mut map = evo_utils::hash::new_map::<&str, u32>();
/// map.insert("a", 1);
/// assert_eq!(map.get("a"), Some(&1));
/// ```
#[inline]
pub const fn new_map<K, V>() -> HashMap<K, V> {
    hashbrown::HashMap::with_hasher(FixedHashState)
}

/// Create an empty [`NoOpHashMap`].
#[inline]
pub const fn new_noop_map<K, V>() -> NoOpHashMap<K, V> {
    hashbrown::HashMap::with_hasher(NoOpHashState)
}

// -----------------------------------------------------------------------------
// Re-export crates

pub use foldhash;
pub use hashbrown;
