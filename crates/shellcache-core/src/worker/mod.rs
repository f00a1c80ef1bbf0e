//! Worker lifecycle: install, activate, intercept.
//!
//! The worker is an explicit event-driven process rather than a pile of
//! ambient listeners: the platform delivers install/activate/fetch events
//! over a channel, each carrying a completion token, and the run loop
//! settles every lifecycle phase before taking the next event. Fetch
//! intercepts run as independent tasks and never block the loop.
//!
//! Lifecycle phases:
//! `Registering -> Installing -> Installed -> Activating -> Active -> Redundant`

pub mod error;
pub mod events;
pub mod lifecycle;

pub use error::WorkerError;
pub use events::{channel, LifecycleEvent, NullPlatform, PlatformHooks, WorkerHandle};
pub use lifecycle::{CacheWorker, Interceptor, WorkerState};
