//! Cache-key derivation, the byte store abstraction, and the admission
//! filter that together form the repository's cache tier.

pub mod admission;
pub mod key;
pub mod memory;
#[cfg(feature = "redis-store")]
pub mod redis;
pub mod store;

pub use admission::AdmissionFilter;
pub use key::KeyCoder;
pub use memory::InMemoryByteStore;
#[cfg(feature = "redis-store")]
pub use redis::RedisByteStore;
pub use store::{
    ByteStore, EMPTY_NETWORK, EMPTY_PATH, EMPTY_REL_LIST, EMPTY_SEARCH, EntityOutcome, GetOutcome,
    IdListEnvelope, NIL_VALUE, get_entity, jittered_ttl, set_entity, set_nil_marker,
};
