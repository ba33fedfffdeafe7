/// Deterministic content keys for cached resources

use std::hash::{Hash, Hasher};
use rustc_hash::FxHasher;

/// 64-bit key derived from a resource's creation parameters
///
/// Equal parameters always produce the same key (FxHasher is unseeded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey(pub u64);

impl ResourceKey {
    /// Key of a single hashable value
    pub fn of<T: Hash + ?Sized>(value: &T) -> Self {
        Self::build(|hasher| value.hash(hasher))
    }

    /// Key built by feeding several values into one hasher
    pub fn build(feed: impl FnOnce(&mut FxHasher)) -> Self {
        let mut hasher = FxHasher::default();
        feed(&mut hasher);
        Self(hasher.finish())
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
