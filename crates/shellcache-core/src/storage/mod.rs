//! Cache bucket storage for precached shell assets.
//!
//! A bucket is a named key-value store of (request URL -> stored
//! response) pairs. The bucket name is the cache generation tag; the
//! activate phase keeps exactly one generation alive. Buckets are written
//! in bulk at install time and read on every fallback lookup.
//!
//! Two backends:
//! - `MemoryStorage`: ephemeral, for tests and throwaway runs
//! - `DiskStorage`: one JSON document per bucket under the cache dir

pub mod disk;
pub mod memory;
pub mod store;

pub use disk::DiskStorage;
pub use memory::MemoryStorage;
pub use store::{CacheBucket, CacheStorage, StorageError, StoredResponse};
