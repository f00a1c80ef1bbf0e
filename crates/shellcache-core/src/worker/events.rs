//! Event contract between the platform and the worker.
//!
//! Install and activate carry a completion token the handler resolves
//! once the phase has fully settled; fetch carries the request and a
//! responder for the optional response. The worker emits no events of
//! its own.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use super::error::WorkerError;
use crate::net::{Request, Response};

/// Deferred-completion token for a lifecycle phase.
pub type CompletionToken = oneshot::Sender<Result<(), WorkerError>>;

pub enum LifecycleEvent {
    Install(CompletionToken),
    Activate(CompletionToken),
    Fetch {
        request: Request,
        respond: oneshot::Sender<Option<Response>>,
    },
}

/// Side effects the worker requests from its embedding platform:
/// skip-waiting after a successful install, claim-clients after activate.
#[async_trait]
pub trait PlatformHooks: Send + Sync {
    /// Skip the waiting phase so this generation takes over without
    /// waiting for pages of the old generation to close.
    async fn skip_waiting(&self) -> Result<(), WorkerError>;

    /// Take control of all currently open pages so interception starts
    /// without a reload.
    async fn claim_clients(&self) -> Result<(), WorkerError>;
}

/// No-op hooks for standalone runs without an embedding platform.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPlatform;

impl NullPlatform {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PlatformHooks for NullPlatform {
    async fn skip_waiting(&self) -> Result<(), WorkerError> {
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), WorkerError> {
        Ok(())
    }
}

/// Create the event channel between platform and worker. The receiver
/// goes to `CacheWorker::run`; the handle stays with the platform side.
pub fn channel(buffer: usize) -> (WorkerHandle, mpsc::Receiver<LifecycleEvent>) {
    let (tx, rx) = mpsc::channel(buffer);
    (WorkerHandle { tx }, rx)
}

/// Platform-side handle that delivers lifecycle events and awaits their
/// settled results.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<LifecycleEvent>,
}

impl WorkerHandle {
    pub async fn install(&self) -> Result<(), WorkerError> {
        let (done, settled) = oneshot::channel();
        self.tx
            .send(LifecycleEvent::Install(done))
            .await
            .map_err(|_| WorkerError::WorkerGone)?;
        settled.await.map_err(|_| WorkerError::WorkerGone)?
    }

    pub async fn activate(&self) -> Result<(), WorkerError> {
        let (done, settled) = oneshot::channel();
        self.tx
            .send(LifecycleEvent::Activate(done))
            .await
            .map_err(|_| WorkerError::WorkerGone)?;
        settled.await.map_err(|_| WorkerError::WorkerGone)?
    }

    /// Intercept one request. `Ok(None)` means the page sees its fetch
    /// fail: the network rejected and nothing matched in the cache.
    pub async fn fetch(&self, request: Request) -> Result<Option<Response>, WorkerError> {
        let (respond, settled) = oneshot::channel();
        self.tx
            .send(LifecycleEvent::Fetch { request, respond })
            .await
            .map_err(|_| WorkerError::WorkerGone)?;
        settled.await.map_err(|_| WorkerError::WorkerGone)
    }
}
