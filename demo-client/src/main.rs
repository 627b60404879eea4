mod stream_manager;

use rivulet_base::{AssetResource, CanonicalAssetPath, Manifest, Priority};
use rivulet_streamer::{
    AssetStreamer, BundledSource, DirBundledSource, HttpTransport, NullBundledSource,
    StreamerConfig,
};
use std::path::Path;
use std::sync::Arc;
use stream_manager::{NodeId, SceneBinding, StreamManager};

// Stand-in for a real scene graph: just logs what each node received
#[derive(Default)]
struct LoggingScene {
    settled: usize,
}

impl SceneBinding for LoggingScene {
    fn asset_ready(
        &mut self,
        node: NodeId,
        path: &CanonicalAssetPath,
        resource: &AssetResource,
    ) {
        self.settled += 1;
        println!("node {:?}: {} ready ({:?})", node, path, resource.kind());
    }

    fn asset_failed(
        &mut self,
        node: NodeId,
        path: &CanonicalAssetPath,
        fallback: &AssetResource,
    ) {
        self.settled += 1;
        println!(
            "node {:?}: {} failed, using {:?} fallback",
            node,
            path,
            fallback.kind()
        );
    }
}

fn load_config() -> StreamerConfig {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "streamer_config.json".to_string());

    match StreamerConfig::from_file(Path::new(&config_path)) {
        Ok(config) => config,
        Err(e) => {
            log::warn!(
                "Could not read config {:?} ({}), using localhost defaults",
                config_path,
                e
            );
            StreamerConfig::new(
                "http://localhost:8080/assets",
                "http://localhost:8080/assets/manifest.json",
                Path::new("demo_cache"),
            )
        }
    }
}

fn main() {
    // Setup logging
    env_logger::Builder::default()
        .write_style(env_logger::WriteStyle::Always)
        .filter_level(log::LevelFilter::Debug)
        .init();

    let config = load_config();
    let bundled: Arc<dyn BundledSource> = match &config.bundled_root {
        Some(root) => Arc::new(DirBundledSource::new(root)),
        None => Arc::new(NullBundledSource),
    };
    let transport =
        Arc::new(HttpTransport::new(config.request_timeout).expect("failed to build HTTP client"));

    // If the manifest cannot be fetched, keep running on bundled resources
    // and fallbacks alone
    let streamer = match AssetStreamer::connect(&config, transport.clone(), bundled.clone()) {
        Ok(streamer) => streamer,
        Err(e) => {
            log::error!("Manifest unavailable ({}), running bundled-only", e);
            AssetStreamer::with_manifest(&config, transport, bundled, Arc::new(Manifest::empty("offline")))
                .expect("failed to start asset streamer")
        }
    };

    let mut manager = StreamManager::new(streamer);
    let mut scene = LoggingScene::default();

    manager.register_node(
        NodeId(1),
        "models/environment/floating_island.glb",
        Priority::Critical,
    );
    manager.register_node(NodeId(2), "textures/terrain/grass.png", Priority::High);
    manager.register_node(NodeId(3), "audio/music/theme.ogg", Priority::Low);
    // Identifier written the way engine scripts pass them
    manager.register_node(NodeId(4), "res://assets/models/props/barrel.glb", Priority::Medium);

    loop {
        std::thread::sleep(std::time::Duration::from_millis(15));
        manager.update(&mut scene);

        if manager.pending_count() == 0 {
            break;
        }
    }

    println!("{} node bindings settled", scene.settled);
}
