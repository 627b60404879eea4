use crate::cache::CacheStore;
use crate::config::StreamerConfig;
use crate::decode::decode_asset;
use crate::error::StreamResult;
use crate::events::{EventFanout, StreamEvent};
use crate::fallback::fallback_resource;
use crate::resolver::{AssetInfo, BundledSource, LoadStrategy, PathResolver};
use crate::scheduler::{DownloadOutcome, DownloadScheduler};
use crate::transport::{fetch_manifest, FetchError, StreamingTransport};
use crossbeam_channel::{Receiver, Sender};
use dashmap::DashMap;
use rivulet_base::hashing::HashMap;
use rivulet_base::{AssetResource, CanonicalAssetPath, Manifest, Priority};
use std::sync::{Arc, Mutex};

//
// The coordination core. One AssetRecord exists per canonical path and the
// coordinator behind the mutex is the single writer of every LoadingState
// transition. Download workers and API calls communicate with it purely
// through the event channel; `update()` drains events and then pumps the
// scheduler, so a batch of requests is fully queued (in priority order)
// before any dispatch happens.
//

/// Per-record pipeline state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoadingState {
    Pending,
    Resolving,
    Downloading,
    Caching,
    Loading,
    Ready,
    Failed,
}

struct AssetRecord {
    info: AssetInfo,
    state: LoadingState,
    resource: Option<AssetResource>,
    /// Transfer attempts used so far, for diagnostics
    attempts: u32,
    /// Coalesced requests waiting on this record. Each outstanding request
    /// gets its own terminal event delivery.
    waiters: u32,
}

/// Events that drive the state machine.
#[derive(Debug)]
pub enum StreamerEvent {
    Request {
        identifier: String,
        priority: Priority,
    },
    DownloadComplete {
        path: CanonicalAssetPath,
        attempt: u32,
        result: Result<Vec<u8>, FetchError>,
    },
    ClearCache,
}

/// Resource table shared with the facade so ready checks and resource gets
/// never contend with the coordinator lock.
struct LoadedEntry {
    resource: AssetResource,
    ready: bool,
}

type ResourceTable = Arc<DashMap<CanonicalAssetPath, LoadedEntry>>;

struct StreamerInner {
    resolver: PathResolver,
    scheduler: DownloadScheduler,
    cache: CacheStore,
    records: HashMap<CanonicalAssetPath, AssetRecord>,
    resources: ResourceTable,
    fanout: EventFanout,
    events_rx: Receiver<StreamerEvent>,
}

impl StreamerInner {
    /// Process all pending events, possibly changing load states, then keep
    /// the worker pool saturated.
    #[profiling::function]
    fn update(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            log::debug!("handle event {:?}", event);
            match event {
                StreamerEvent::Request {
                    identifier,
                    priority,
                } => self.handle_request(&identifier, priority),
                StreamerEvent::DownloadComplete {
                    path,
                    attempt,
                    result,
                } => self.handle_download_complete(&path, attempt, result),
                StreamerEvent::ClearCache => self.handle_clear_cache(),
            }
        }

        self.scheduler.pump();
    }

    fn handle_request(
        &mut self,
        identifier: &str,
        priority: Priority,
    ) {
        let info = self.resolver.resolve(identifier);
        let path = info.path.clone();

        if let Some(record) = self.records.get_mut(&path) {
            match record.state {
                LoadingState::Ready => {
                    // Idempotent re-request: answer immediately
                    if let Some(resource) = record.resource.clone() {
                        self.fanout.emit(StreamEvent::Ready { path, resource });
                    }
                }
                LoadingState::Failed => {
                    // A new request for a failed path restarts the pipeline
                    log::debug!("Restarting failed pipeline for {}", path);
                    record.state = LoadingState::Pending;
                    record.resource = None;
                    record.attempts = 0;
                    record.waiters = 1;
                    self.resources.remove(&path);
                    self.start_pipeline(&path, priority);
                }
                _ => {
                    // Already in flight; the eventual terminal event will
                    // cover this caller too
                    record.waiters += 1;
                    log::debug!(
                        "Coalesced request for {} ({} waiters)",
                        path,
                        record.waiters
                    );
                }
            }
            return;
        }

        self.records.insert(
            path.clone(),
            AssetRecord {
                info,
                state: LoadingState::Pending,
                resource: None,
                attempts: 0,
                waiters: 1,
            },
        );
        self.start_pipeline(&path, priority);
    }

    fn start_pipeline(
        &mut self,
        path: &CanonicalAssetPath,
        priority: Priority,
    ) {
        let record = match self.records.get_mut(path) {
            Some(record) => record,
            None => return,
        };
        record.state = LoadingState::Resolving;

        match record.info.strategy {
            LoadStrategy::Bundled => self.load_bundled(path),
            LoadStrategy::Streamed => {
                if self.cache.exists(path) {
                    self.load_from_cache(path);
                } else {
                    record.state = LoadingState::Downloading;
                    self.scheduler.enqueue(path.clone(), priority);
                }
            }
            LoadStrategy::Hybrid => {
                // Try bundled, then cache, else fall back immediately. No
                // network request is ever made for an unmatched identifier.
                if self.resolver.bundled().exists(path) {
                    self.load_bundled(path);
                } else if self.cache.exists(path) {
                    self.load_from_cache(path);
                } else {
                    self.fail_with_fallback(
                        path,
                        "no manifest entry, bundled resource, or cached copy".to_string(),
                    );
                }
            }
        }
    }

    fn load_bundled(
        &mut self,
        path: &CanonicalAssetPath,
    ) {
        match self.resolver.bundled().read(path) {
            Ok(bytes) => self.finish_decode(path, &bytes),
            Err(e) => {
                self.fail_with_fallback(path, format!("bundled read failed: {}", e));
            }
        }
    }

    fn load_from_cache(
        &mut self,
        path: &CanonicalAssetPath,
    ) {
        match self.cache.read(path) {
            Ok(bytes) => self.finish_decode(path, &bytes),
            Err(e) => {
                // Cache-read failures are presumed deterministic; no retry
                self.fail_with_fallback(path, format!("cache read failed: {}", e));
            }
        }
    }

    fn handle_download_complete(
        &mut self,
        path: &CanonicalAssetPath,
        attempt: u32,
        result: Result<Vec<u8>, FetchError>,
    ) {
        let record = match self.records.get_mut(path) {
            Some(record) => record,
            None => {
                log::warn!("Download completed for untracked path {}", path);
                return;
            }
        };
        if record.state != LoadingState::Downloading {
            log::debug!(
                "Ignoring stale download completion for {} in state {:?}",
                path,
                record.state
            );
            return;
        }
        record.attempts = attempt + 1;

        match self.scheduler.complete(path, attempt, result) {
            DownloadOutcome::Retrying => {
                // Task went back to the front of the queue; nothing to do
                // until it completes again
            }
            DownloadOutcome::Fetched(bytes) => {
                let record = match self.records.get_mut(path) {
                    Some(record) => record,
                    None => return,
                };
                record.state = LoadingState::Caching;
                match self.cache.write(path, &bytes) {
                    Ok(()) => self.finish_decode(path, &bytes),
                    Err(e) => {
                        self.fail_with_fallback(path, format!("cache write failed: {}", e));
                    }
                }
            }
            DownloadOutcome::Failed(reason) => {
                self.fail_with_fallback(path, reason);
            }
        }
    }

    fn finish_decode(
        &mut self,
        path: &CanonicalAssetPath,
        bytes: &[u8],
    ) {
        let record = match self.records.get_mut(path) {
            Some(record) => record,
            None => return,
        };
        record.state = LoadingState::Loading;
        let kind = record.info.kind;

        match decode_asset(kind, path, bytes) {
            Ok(resource) => self.complete_ready(path, resource),
            Err(e) => {
                self.fail_with_fallback(path, format!("decode failed: {}", e));
            }
        }
    }

    fn complete_ready(
        &mut self,
        path: &CanonicalAssetPath,
        resource: AssetResource,
    ) {
        let record = match self.records.get_mut(path) {
            Some(record) => record,
            None => return,
        };
        log::debug!("Asset ready: {}", path);
        record.state = LoadingState::Ready;
        record.resource = Some(resource.clone());

        self.resources.insert(
            path.clone(),
            LoadedEntry {
                resource: resource.clone(),
                ready: true,
            },
        );

        // One delivery per coalesced request
        let waiters = std::mem::take(&mut record.waiters);
        for _ in 0..waiters {
            self.fanout.emit(StreamEvent::Ready {
                path: path.clone(),
                resource: resource.clone(),
            });
        }
    }

    fn fail_with_fallback(
        &mut self,
        path: &CanonicalAssetPath,
        message: String,
    ) {
        let record = match self.records.get_mut(path) {
            Some(record) => record,
            None => return,
        };
        log::error!(
            "Streaming failed for {} after {} transfer attempts: {}",
            path,
            record.attempts,
            message
        );
        let fallback = fallback_resource(record.info.kind);
        record.state = LoadingState::Failed;
        record.resource = Some(fallback.clone());

        self.resources.insert(
            path.clone(),
            LoadedEntry {
                resource: fallback.clone(),
                ready: false,
            },
        );

        // Diagnostics once, then a terminal event per coalesced request
        self.fanout.emit(StreamEvent::Error {
            path: path.clone(),
            message,
        });
        let waiters = std::mem::take(&mut record.waiters);
        for _ in 0..waiters {
            self.fanout.emit(StreamEvent::Failed {
                path: path.clone(),
                fallback: fallback.clone(),
            });
        }
    }

    fn handle_clear_cache(&mut self) {
        if let Err(e) = self.cache.clear() {
            log::error!("Cache clear failed: {}", e);
        }
    }

    fn loading_state(
        &self,
        path: &CanonicalAssetPath,
    ) -> Option<LoadingState> {
        self.records.get(path).map(|record| record.state)
    }
}

//
// The AssetStreamer acts as the public interface for StreamerInner.
//
#[derive(Clone)]
pub struct AssetStreamer {
    inner: Arc<Mutex<StreamerInner>>,
    events_tx: Sender<StreamerEvent>,
    resolver: PathResolver,
    resources: ResourceTable,
}

impl AssetStreamer {
    /// Fetch the manifest and build a fully streaming-capable streamer.
    /// Manifest fetch/parse failure is a hard error here; callers degrade
    /// to bundled-only operation via [`AssetStreamer::with_manifest`] and
    /// an empty manifest.
    pub fn connect(
        config: &StreamerConfig,
        transport: Arc<dyn StreamingTransport>,
        bundled: Arc<dyn BundledSource>,
    ) -> StreamResult<AssetStreamer> {
        let manifest = fetch_manifest(&*transport, &config.manifest_url)?;
        Self::with_manifest(config, transport, bundled, Arc::new(manifest))
    }

    pub fn with_manifest(
        config: &StreamerConfig,
        transport: Arc<dyn StreamingTransport>,
        bundled: Arc<dyn BundledSource>,
        manifest: Arc<Manifest>,
    ) -> StreamResult<AssetStreamer> {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();

        let mut cache = CacheStore::open(&config.cache_root)?;
        // A stale cache must be gone before any download is scheduled
        let cleared = cache.sync_version(manifest.version())?;
        if cleared {
            log::info!("Cache invalidated for manifest version {}", manifest.version());
        }

        let resolver = PathResolver::new(manifest, bundled, config.cache_root.clone());
        let scheduler = DownloadScheduler::new(
            transport,
            config.base_url.clone(),
            config.max_concurrent_downloads,
            config.retry_attempts,
            events_tx.clone(),
        );
        let resources: ResourceTable = Arc::new(DashMap::default());

        let inner = StreamerInner {
            resolver: resolver.clone(),
            scheduler,
            cache,
            records: HashMap::default(),
            resources: resources.clone(),
            fanout: EventFanout::default(),
            events_rx,
        };

        Ok(AssetStreamer {
            inner: Arc::new(Mutex::new(inner)),
            events_tx,
            resolver,
            resources,
        })
    }

    /// Request an asset by identifier. Returns immediately; completion is
    /// observed through subscribed event channels.
    pub fn request_asset(
        &self,
        identifier: &str,
        priority: Priority,
    ) {
        let _ = self.events_tx.send(StreamerEvent::Request {
            identifier: identifier.to_string(),
            priority,
        });
    }

    /// Resolve an identifier without requesting it.
    pub fn resolve(
        &self,
        identifier: &str,
    ) -> AssetInfo {
        self.resolver.resolve(identifier)
    }

    /// True only for assets that genuinely decoded (not fallbacks).
    pub fn is_asset_ready(
        &self,
        identifier: &str,
    ) -> bool {
        let info = self.resolver.resolve(identifier);
        self.resources
            .get(&info.path)
            .map(|entry| entry.ready)
            .unwrap_or(false)
    }

    /// The decoded resource for an identifier, if its pipeline reached a
    /// terminal state. Failed assets yield their fallback, so a `Some`
    /// result is always renderable.
    pub fn loaded_resource(
        &self,
        identifier: &str,
    ) -> Option<AssetResource> {
        let info = self.resolver.resolve(identifier);
        self.resources
            .get(&info.path)
            .map(|entry| entry.resource.clone())
    }

    /// Wipe the local cache. Processed on the next `update()`.
    pub fn clear_cache(&self) {
        let _ = self.events_tx.send(StreamerEvent::ClearCache);
    }

    pub fn subscribe(&self) -> Receiver<StreamEvent> {
        self.inner.lock().unwrap().fanout.subscribe()
    }

    /// Pipeline state for a canonical path, mainly for diagnostics.
    pub fn loading_state(
        &self,
        path: &CanonicalAssetPath,
    ) -> Option<LoadingState> {
        self.inner.lock().unwrap().loading_state(path)
    }

    /// Drive the state machine. Call once per frame (or tick); all state
    /// transitions happen on the calling thread.
    pub fn update(&self) {
        self.inner.lock().unwrap().update();
    }
}
