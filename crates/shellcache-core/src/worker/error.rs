use thiserror::Error;

use crate::net::FetchError;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("cache storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to precache {url}: {source}")]
    Precache {
        url: String,
        #[source]
        source: FetchError,
    },

    /// A shell asset that resolves to an error page must never be cached,
    /// so a non-success precache response fails the install.
    #[error("precache of {url} returned status {status}")]
    PrecacheStatus { url: String, status: u16 },

    #[error("platform hook failed: {0}")]
    Platform(String),

    /// The worker's event loop has ended; this generation is redundant.
    #[error("worker is gone")]
    WorkerGone,
}
