/// Reference-counted, content-keyed caches for expensive GPU objects

pub mod resource_key;
pub mod resource_cache;
pub mod resource_caches;

pub use resource_key::*;
pub use resource_cache::*;
pub use resource_caches::*;
