//! Network provider for fetching shell assets and intercepted requests.
//!
//! The worker never talks to the network directly; it goes through the
//! `NetworkProvider` trait so the lifecycle can be exercised with fakes.
//! `HttpNetwork` is the reqwest-backed implementation used in production.

pub mod client;
pub mod error;
pub mod types;

pub use client::{HttpNetwork, NetworkProvider};
pub use error::FetchError;
pub use types::{Request, Response};
