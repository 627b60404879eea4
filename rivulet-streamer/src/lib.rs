//! Asset streaming runtime: resolve identifiers against a manifest, download
//! over HTTP with priority scheduling and retries, persist to a local cache,
//! decode into engine resources, and substitute procedural fallbacks when
//! everything else fails.

mod cache;
mod config;
mod decode;
mod error;
mod events;
mod fallback;
mod resolver;
mod scheduler;
mod streamer;
mod transport;

pub use cache::CacheStore;
pub use config::{StreamerConfig, StreamerConfigJson};
pub use decode::decode_asset;
pub use error::{StreamError, StreamResult};
pub use events::StreamEvent;
pub use fallback::{
    fallback_audio, fallback_model, fallback_resource, fallback_texture, FALLBACK_COLOR_RGBA,
};
pub use resolver::{
    AssetInfo, BundledSource, DirBundledSource, LoadStrategy, NullBundledSource, PathResolver,
    FUZZY_MATCH_THRESHOLD,
};
pub use scheduler::{DownloadOutcome, DownloadQueue, DownloadScheduler, DownloadTask};
pub use streamer::{AssetStreamer, LoadingState, StreamerEvent};
pub use transport::{fetch_manifest, FetchError, HttpTransport, StreamingTransport};
