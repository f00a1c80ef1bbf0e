use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::error::WorkerError;
use super::events::{LifecycleEvent, PlatformHooks};
use crate::config::Config;
use crate::manifest::AssetManifest;
use crate::net::{NetworkProvider, Request, Response};
use crate::storage::{CacheStorage, StoredResponse};

/// Worker lifecycle phases. `Redundant` is terminal: a failed install, a
/// closed event source, or a newer generation taking over all end here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Registering,
    Installing,
    Installed,
    Activating,
    Active,
    Redundant,
}

/// The offline cache manager: maintains one named bucket of precached
/// shell assets per deployed generation and serves them as a network-first
/// fallback.
pub struct CacheWorker {
    config: Config,
    manifest: AssetManifest,
    network: Arc<dyn NetworkProvider>,
    storage: Arc<dyn CacheStorage>,
    platform: Arc<dyn PlatformHooks>,
    state: WorkerState,
}

impl CacheWorker {
    pub fn new(
        config: Config,
        network: Arc<dyn NetworkProvider>,
        storage: Arc<dyn CacheStorage>,
        platform: Arc<dyn PlatformHooks>,
    ) -> Self {
        let manifest = AssetManifest::from_config(&config);
        Self {
            config,
            manifest,
            network,
            storage,
            platform,
            state: WorkerState::Registering,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn manifest(&self) -> &AssetManifest {
        &self.manifest
    }

    /// Detachable network-first interceptor over this worker's generation.
    pub fn interceptor(&self) -> Interceptor {
        Interceptor {
            generation_tag: self.config.generation_tag.clone(),
            network: Arc::clone(&self.network),
            storage: Arc::clone(&self.storage),
        }
    }

    /// Install: fetch every manifest URL and store it in the bucket named
    /// by the current generation tag. Fail-fast: all fetches must succeed
    /// before anything is written, and one failure aborts the install.
    /// On success the platform is asked to skip the waiting phase.
    pub async fn handle_install(&mut self) -> Result<(), WorkerError> {
        self.state = WorkerState::Installing;
        info!(
            generation = %self.config.generation_tag,
            assets = self.manifest.len(),
            "installing shell cache"
        );

        let bucket = self.storage.open(&self.config.generation_tag).await?;

        let urls: Vec<String> = self.manifest.urls().to_vec();
        let fetches = urls.into_iter().map(|url| {
            let network = Arc::clone(&self.network);
            async move {
                let response = network
                    .fetch(&Request::new(url.clone()))
                    .await
                    .map_err(|source| WorkerError::Precache {
                        url: url.clone(),
                        source,
                    })?;
                if !response.is_success() {
                    return Err(WorkerError::PrecacheStatus {
                        url,
                        status: response.status,
                    });
                }
                Ok((url, StoredResponse::from_response(&response)))
            }
        });

        let entries = try_join_all(fetches).await?;
        for (url, stored) in entries {
            bucket.put(&url, stored).await?;
        }

        self.platform.skip_waiting().await?;
        self.state = WorkerState::Installed;
        info!(generation = %self.config.generation_tag, "shell cache installed");
        Ok(())
    }

    /// Activate: purge every bucket whose name differs from the current
    /// generation tag, then claim all open pages. A failed deletion is
    /// logged and skipped; the orphan stays until the next activation.
    pub async fn handle_activate(&mut self) -> Result<(), WorkerError> {
        self.state = WorkerState::Activating;

        let names = match self.storage.keys().await {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "failed to enumerate cache buckets, skipping purge");
                Vec::new()
            }
        };

        let stale: Vec<String> = names
            .into_iter()
            .filter(|name| name != &self.config.generation_tag)
            .collect();

        let deletions = stale.into_iter().map(|name| {
            let storage = Arc::clone(&self.storage);
            async move {
                let result = storage.delete(&name).await;
                (name, result)
            }
        });

        for (name, result) in join_all(deletions).await {
            match result {
                Ok(_) => info!(bucket = %name, "purged stale cache generation"),
                Err(e) => warn!(bucket = %name, error = %e, "failed to purge stale cache generation"),
            }
        }

        self.platform.claim_clients().await?;
        self.state = WorkerState::Active;
        info!(generation = %self.config.generation_tag, "worker active");
        Ok(())
    }

    /// Event loop. Install and activate settle in arrival order; fetch
    /// intercepts are spawned so concurrent requests stay independent.
    /// Returns the final (terminal) state.
    pub async fn run(mut self, mut events: mpsc::Receiver<LifecycleEvent>) -> WorkerState {
        while let Some(event) = events.recv().await {
            match event {
                LifecycleEvent::Install(done) => {
                    let result = self.handle_install().await;
                    if let Err(ref e) = result {
                        error!(error = %e, "install failed, worker is redundant");
                        self.state = WorkerState::Redundant;
                    }
                    let _ = done.send(result);
                }
                LifecycleEvent::Activate(done) => {
                    let result = self.handle_activate().await;
                    if let Err(ref e) = result {
                        error!(error = %e, "activate failed");
                    }
                    let _ = done.send(result);
                }
                LifecycleEvent::Fetch { request, respond } => {
                    if self.state != WorkerState::Active {
                        debug!(url = %request.url, state = ?self.state, "fetch before activation, passing through");
                        let _ = respond.send(None);
                        continue;
                    }
                    let interceptor = self.interceptor();
                    tokio::spawn(async move {
                        let _ = respond.send(interceptor.intercept(&request).await);
                    });
                }
            }
            if self.state == WorkerState::Redundant {
                break;
            }
        }
        // Event source gone: a newer generation has taken over.
        self.state = WorkerState::Redundant;
        self.state
    }
}

/// Network-first request interception with cache fallback.
///
/// The network is always attempted first; the cache is consulted only on
/// outright transport rejection, never for HTTP error statuses, and a
/// miss (or any storage trouble during fallback) yields no response.
#[derive(Clone)]
pub struct Interceptor {
    generation_tag: String,
    network: Arc<dyn NetworkProvider>,
    storage: Arc<dyn CacheStorage>,
}

impl Interceptor {
    pub async fn intercept(&self, request: &Request) -> Option<Response> {
        match self.network.fetch(request).await {
            Ok(response) => Some(response),
            Err(e) => {
                debug!(url = %request.url, error = %e, "network fetch failed, trying cache");
                self.lookup(&request.url).await
            }
        }
    }

    async fn lookup(&self, url: &str) -> Option<Response> {
        let bucket = match self.storage.open(&self.generation_tag).await {
            Ok(bucket) => bucket,
            Err(e) => {
                debug!(error = %e, "cache unavailable during fallback");
                return None;
            }
        };
        match bucket.match_url(url).await {
            Ok(Some(stored)) => {
                debug!(url = %url, "serving cached fallback");
                Some(stored.into_response(url))
            }
            Ok(None) => {
                debug!(url = %url, "no cached fallback");
                None
            }
            Err(e) => {
                debug!(url = %url, error = %e, "cache lookup failed");
                None
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::net::FetchError;
    use crate::storage::{CacheBucket, MemoryStorage, StorageError};
    use crate::worker::events::{channel, NullPlatform};

    // ----- fakes -----

    #[derive(Default)]
    struct FakeNetwork {
        routes: Mutex<HashMap<String, Response>>,
        offline: AtomicBool,
    }

    impl FakeNetwork {
        fn route(&self, url: &str, status: u16, body: &[u8]) {
            let mut routes = self.routes.lock().unwrap();
            routes.insert(
                url.to_string(),
                Response {
                    url: url.to_string(),
                    status,
                    content_type: None,
                    body: body.to_vec(),
                },
            );
        }

        fn set_offline(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl NetworkProvider for FakeNetwork {
        async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(FetchError::Unreachable("offline".to_string()));
            }
            let routes = self.routes.lock().unwrap();
            routes
                .get(&request.url)
                .cloned()
                .ok_or_else(|| FetchError::Unreachable(format!("no route to {}", request.url)))
        }
    }

    #[derive(Default)]
    struct RecordingPlatform {
        skipped_waiting: AtomicBool,
        claimed: AtomicBool,
    }

    #[async_trait]
    impl PlatformHooks for RecordingPlatform {
        async fn skip_waiting(&self) -> Result<(), WorkerError> {
            self.skipped_waiting.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn claim_clients(&self) -> Result<(), WorkerError> {
            self.claimed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Storage wrapper that fails deleting one bucket and, optionally,
    /// every open.
    struct StickyStorage {
        inner: MemoryStorage,
        undeletable: String,
        fail_open: AtomicBool,
    }

    impl StickyStorage {
        fn new(inner: MemoryStorage, undeletable: &str) -> Self {
            Self {
                inner,
                undeletable: undeletable.to_string(),
                fail_open: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl CacheStorage for StickyStorage {
        async fn open(&self, name: &str) -> Result<Arc<dyn CacheBucket>, StorageError> {
            if self.fail_open.load(Ordering::SeqCst) {
                return Err(StorageError::Backend("open refused".to_string()));
            }
            self.inner.open(name).await
        }

        async fn keys(&self) -> Result<Vec<String>, StorageError> {
            self.inner.keys().await
        }

        async fn delete(&self, name: &str) -> Result<bool, StorageError> {
            if name == self.undeletable {
                return Err(StorageError::Backend("delete refused".to_string()));
            }
            self.inner.delete(name).await
        }
    }

    // ----- helpers -----

    fn test_config(tag: &str) -> Config {
        Config {
            origin: "http://127.0.0.1:5000".to_string(),
            static_base_path: "/static/".to_string(),
            generation_tag: tag.to_string(),
            manifest_paths: vec![
                "/".to_string(),
                "css/style.css".to_string(),
                "js/app.js".to_string(),
            ],
        }
    }

    fn shell_network() -> Arc<FakeNetwork> {
        let network = FakeNetwork::default();
        network.route("/", 200, b"<html>catalogue</html>");
        network.route("/static/css/style.css", 200, b"body { margin: 0 }");
        network.route("/static/js/app.js", 200, b"'use strict';");
        Arc::new(network)
    }

    fn worker(
        tag: &str,
        network: Arc<FakeNetwork>,
        storage: Arc<dyn CacheStorage>,
        platform: Arc<dyn PlatformHooks>,
    ) -> CacheWorker {
        CacheWorker::new(test_config(tag), network, storage, platform)
    }

    async fn seed_bucket(storage: &MemoryStorage, name: &str) {
        let bucket = storage.open(name).await.unwrap();
        let old = Response {
            url: "/".to_string(),
            status: 200,
            content_type: None,
            body: b"old generation".to_vec(),
        };
        bucket
            .put("/", StoredResponse::from_response(&old))
            .await
            .unwrap();
    }

    // ----- install -----

    #[tokio::test]
    async fn test_install_populates_bucket_from_manifest() {
        let network = shell_network();
        let storage = Arc::new(MemoryStorage::new());
        let mut worker = worker(
            "catalogue-assets",
            network,
            storage.clone(),
            Arc::new(NullPlatform::new()),
        );

        worker.handle_install().await.unwrap();
        assert_eq!(worker.state(), WorkerState::Installed);

        let bucket = storage.open("catalogue-assets").await.unwrap();
        assert_eq!(
            bucket.urls().await.unwrap(),
            vec![
                "/".to_string(),
                "/static/css/style.css".to_string(),
                "/static/js/app.js".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_install_twice_is_idempotent() {
        let network = shell_network();
        let storage = Arc::new(MemoryStorage::new());
        let mut worker = worker(
            "catalogue-assets",
            network,
            storage.clone(),
            Arc::new(NullPlatform::new()),
        );

        worker.handle_install().await.unwrap();
        worker.handle_install().await.unwrap();

        let bucket = storage.open("catalogue-assets").await.unwrap();
        let urls = bucket.urls().await.unwrap();
        assert_eq!(urls.len(), worker.manifest().len());
        for url in worker.manifest().urls() {
            assert!(bucket.match_url(url).await.unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn test_install_aborts_when_asset_unreachable() {
        let network = shell_network();
        {
            let mut routes = network.routes.lock().unwrap();
            routes.remove("/static/js/app.js");
        }
        let storage = Arc::new(MemoryStorage::new());
        let mut worker = worker(
            "catalogue-assets",
            network,
            storage.clone(),
            Arc::new(NullPlatform::new()),
        );

        let err = worker.handle_install().await.unwrap_err();
        assert!(matches!(err, WorkerError::Precache { .. }));

        // Fail-fast: nothing was written.
        let bucket = storage.open("catalogue-assets").await.unwrap();
        assert!(bucket.urls().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_install_rejects_error_status() {
        let network = shell_network();
        network.route("/static/js/app.js", 404, b"not found");
        let storage = Arc::new(MemoryStorage::new());
        let mut worker = worker(
            "catalogue-assets",
            network,
            storage,
            Arc::new(NullPlatform::new()),
        );

        let err = worker.handle_install().await.unwrap_err();
        match err {
            WorkerError::PrecacheStatus { url, status } => {
                assert_eq!(url, "/static/js/app.js");
                assert_eq!(status, 404);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_install_requests_skip_waiting() {
        let network = shell_network();
        let platform = Arc::new(RecordingPlatform::default());
        let mut worker = worker(
            "catalogue-assets",
            network,
            Arc::new(MemoryStorage::new()),
            platform.clone(),
        );

        worker.handle_install().await.unwrap();
        assert!(platform.skipped_waiting.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failed_install_does_not_skip_waiting() {
        let network = shell_network();
        {
            let mut routes = network.routes.lock().unwrap();
            routes.remove("/");
        }
        let platform = Arc::new(RecordingPlatform::default());
        let mut worker = worker(
            "catalogue-assets",
            network,
            Arc::new(MemoryStorage::new()),
            platform.clone(),
        );

        assert!(worker.handle_install().await.is_err());
        assert!(!platform.skipped_waiting.load(Ordering::SeqCst));
    }

    // ----- activate -----

    #[tokio::test]
    async fn test_activate_purges_stale_generations() {
        let network = shell_network();
        let memory = MemoryStorage::new();
        seed_bucket(&memory, "catalogue-assets-v1").await;
        let storage = Arc::new(memory);
        let mut worker = worker(
            "catalogue-assets-v2",
            network,
            storage.clone(),
            Arc::new(NullPlatform::new()),
        );

        worker.handle_install().await.unwrap();
        worker.handle_activate().await.unwrap();
        assert_eq!(worker.state(), WorkerState::Active);

        // Exactly one generation survives.
        assert_eq!(
            storage.keys().await.unwrap(),
            vec!["catalogue-assets-v2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_activate_claims_clients() {
        let network = shell_network();
        let platform = Arc::new(RecordingPlatform::default());
        let mut worker = worker(
            "catalogue-assets",
            network,
            Arc::new(MemoryStorage::new()),
            platform.clone(),
        );

        worker.handle_install().await.unwrap();
        worker.handle_activate().await.unwrap();
        assert!(platform.claimed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failed_deletion_does_not_block_claim() {
        let network = shell_network();
        let memory = MemoryStorage::new();
        seed_bucket(&memory, "catalogue-assets-v1").await;
        let storage = Arc::new(StickyStorage::new(memory, "catalogue-assets-v1"));
        let platform = Arc::new(RecordingPlatform::default());
        let mut worker = worker(
            "catalogue-assets-v2",
            network,
            storage.clone(),
            platform.clone(),
        );

        worker.handle_install().await.unwrap();
        worker.handle_activate().await.unwrap();

        // The orphan stays, but activation completed and pages are claimed.
        assert!(platform.claimed.load(Ordering::SeqCst));
        assert_eq!(worker.state(), WorkerState::Active);
        assert!(storage
            .keys()
            .await
            .unwrap()
            .contains(&"catalogue-assets-v1".to_string()));
    }

    // ----- intercept -----

    #[tokio::test]
    async fn test_network_first_returns_live_response() {
        let network = shell_network();
        let storage = Arc::new(MemoryStorage::new());
        let mut worker = worker(
            "catalogue-assets",
            network.clone(),
            storage,
            Arc::new(NullPlatform::new()),
        );
        worker.handle_install().await.unwrap();

        // The live copy changes after install; the cache must not win.
        network.route("/", 200, b"<html>fresh</html>");

        let interceptor = worker.interceptor();
        let response = interceptor.intercept(&Request::new("/")).await.unwrap();
        assert_eq!(response.body, b"<html>fresh</html>");
    }

    #[tokio::test]
    async fn test_fallback_returns_cached_bytes() {
        let network = shell_network();
        let storage = Arc::new(MemoryStorage::new());
        let mut worker = worker(
            "catalogue-assets",
            network.clone(),
            storage,
            Arc::new(NullPlatform::new()),
        );
        worker.handle_install().await.unwrap();

        network.set_offline(true);

        let interceptor = worker.interceptor();
        let response = interceptor
            .intercept(&Request::new("/static/css/style.css"))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"body { margin: 0 }");
    }

    #[tokio::test]
    async fn test_http_error_status_passes_through() {
        let network = shell_network();
        let storage = Arc::new(MemoryStorage::new());
        let mut worker = worker(
            "catalogue-assets",
            network.clone(),
            storage,
            Arc::new(NullPlatform::new()),
        );
        worker.handle_install().await.unwrap();

        // 500 is a completed exchange, not a network failure.
        network.route("/", 500, b"oops");

        let interceptor = worker.interceptor();
        let response = interceptor.intercept(&Request::new("/")).await.unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(response.body, b"oops");
    }

    #[tokio::test]
    async fn test_miss_on_uncached_failure_yields_none() {
        let network = shell_network();
        let storage = Arc::new(MemoryStorage::new());
        let mut worker = worker(
            "catalogue-assets",
            network.clone(),
            storage,
            Arc::new(NullPlatform::new()),
        );
        worker.handle_install().await.unwrap();

        network.set_offline(true);

        let interceptor = worker.interceptor();
        let response = interceptor.intercept(&Request::new("/api/logs")).await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_cache_unavailable_counts_as_miss() {
        let network = shell_network();
        let storage = Arc::new(StickyStorage::new(MemoryStorage::new(), "none"));
        let mut worker = worker(
            "catalogue-assets",
            network.clone(),
            storage.clone(),
            Arc::new(NullPlatform::new()),
        );
        worker.handle_install().await.unwrap();

        network.set_offline(true);
        storage.fail_open.store(true, Ordering::SeqCst);

        let interceptor = worker.interceptor();
        assert!(interceptor.intercept(&Request::new("/")).await.is_none());
    }

    // ----- run loop -----

    #[tokio::test]
    async fn test_full_lifecycle_over_channel() {
        let network = shell_network();
        let memory = MemoryStorage::new();
        seed_bucket(&memory, "catalogue-assets-v1").await;
        let storage = Arc::new(memory);
        let platform = Arc::new(RecordingPlatform::default());
        let worker = worker(
            "catalogue-assets-v2",
            network.clone(),
            storage.clone(),
            platform.clone(),
        );

        let (handle, events) = channel(16);
        let running = tokio::spawn(worker.run(events));

        handle.install().await.unwrap();
        handle.activate().await.unwrap();
        assert!(platform.skipped_waiting.load(Ordering::SeqCst));
        assert!(platform.claimed.load(Ordering::SeqCst));
        assert_eq!(
            storage.keys().await.unwrap(),
            vec!["catalogue-assets-v2".to_string()]
        );

        network.set_offline(true);
        let response = handle.fetch(Request::new("/")).await.unwrap().unwrap();
        assert_eq!(response.body, b"<html>catalogue</html>");

        drop(handle);
        assert_eq!(running.await.unwrap(), WorkerState::Redundant);
    }

    #[tokio::test]
    async fn test_failed_install_makes_worker_redundant() {
        let network = shell_network();
        {
            let mut routes = network.routes.lock().unwrap();
            routes.remove("/");
        }
        let worker = worker(
            "catalogue-assets",
            network,
            Arc::new(MemoryStorage::new()),
            Arc::new(NullPlatform::new()),
        );

        let (handle, events) = channel(16);
        let running = tokio::spawn(worker.run(events));

        assert!(handle.install().await.is_err());
        assert_eq!(running.await.unwrap(), WorkerState::Redundant);

        // The loop is gone; further events cannot be delivered.
        assert!(matches!(
            handle.activate().await,
            Err(WorkerError::WorkerGone)
        ));
    }

    #[tokio::test]
    async fn test_fetch_before_activation_passes_through() {
        let network = shell_network();
        let worker = worker(
            "catalogue-assets",
            network,
            Arc::new(MemoryStorage::new()),
            Arc::new(NullPlatform::new()),
        );

        let (handle, events) = channel(16);
        tokio::spawn(worker.run(events));

        // Online with a routable URL, but the worker is not active yet.
        let response = handle.fetch(Request::new("/")).await.unwrap();
        assert!(response.is_none());
    }
}
