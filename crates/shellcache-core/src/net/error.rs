use thiserror::Error;

/// Transport-level fetch failure. HTTP error statuses never land here;
/// they come back as ordinary responses.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// For providers with no transport error of their own (offline
    /// simulations, alternative backends).
    #[error("network unreachable: {0}")]
    Unreachable(String),
}
