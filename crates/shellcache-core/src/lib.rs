//! shellcache - offline application-shell cache for the catalogue app.
//!
//! Keeps the app shell available when the network is not: a versioned,
//! network-first asset cache with an explicit install / activate /
//! intercept lifecycle. At install time every manifest URL is fetched and
//! stored in a bucket named by the current generation tag; at activation
//! every other generation's bucket is purged; on interception the network
//! is always tried first and the bucket only answers outright transport
//! failures.
//!
//! The network and the cache store are injected behind traits, so the
//! whole lifecycle runs against fakes in tests and against reqwest plus
//! the on-disk store in production.

pub mod config;
pub mod manifest;
pub mod net;
pub mod storage;
pub mod worker;

// Re-export main types for convenience
pub use config::Config;
pub use manifest::AssetManifest;
pub use net::{FetchError, HttpNetwork, NetworkProvider, Request, Response};
pub use storage::{
    CacheBucket, CacheStorage, DiskStorage, MemoryStorage, StorageError, StoredResponse,
};
pub use worker::{
    channel, CacheWorker, Interceptor, LifecycleEvent, NullPlatform, PlatformHooks, WorkerError,
    WorkerHandle, WorkerState,
};
