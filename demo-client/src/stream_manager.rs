use crossbeam_channel::Receiver;
use rivulet_base::hashing::HashMap;
use rivulet_base::{AssetResource, CanonicalAssetPath, Priority};
use rivulet_streamer::{AssetStreamer, StreamEvent};

//
// Glue between the streamer and a scene graph: scene nodes register interest
// in an asset by identifier, and completed resources are pushed to them
// through the SceneBinding callbacks as events arrive. One registration gets
// exactly one callback, ready or failed.
//

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub u64);

/// Implemented by whatever owns the scene. Callbacks fire on the thread that
/// calls [`StreamManager::update`].
pub trait SceneBinding {
    fn asset_ready(
        &mut self,
        node: NodeId,
        path: &CanonicalAssetPath,
        resource: &AssetResource,
    );

    fn asset_failed(
        &mut self,
        node: NodeId,
        path: &CanonicalAssetPath,
        fallback: &AssetResource,
    );
}

pub struct StreamManager {
    streamer: AssetStreamer,
    events: Receiver<StreamEvent>,
    // Nodes waiting per canonical path, oldest first. The streamer delivers
    // one terminal event per request, so each event settles one node.
    pending: HashMap<CanonicalAssetPath, Vec<NodeId>>,
}

impl StreamManager {
    pub fn new(streamer: AssetStreamer) -> StreamManager {
        let events = streamer.subscribe();
        StreamManager {
            streamer,
            events,
            pending: HashMap::default(),
        }
    }

    pub fn streamer(&self) -> &AssetStreamer {
        &self.streamer
    }

    pub fn pending_count(&self) -> usize {
        self.pending.values().map(|nodes| nodes.len()).sum()
    }

    /// Register a node's interest in an asset and kick off (or join) its
    /// pipeline.
    pub fn register_node(
        &mut self,
        node: NodeId,
        identifier: &str,
        priority: Priority,
    ) {
        let info = self.streamer.resolve(identifier);
        log::debug!("Node {:?} waiting on {}", node, info.path);
        self.pending.entry(info.path).or_default().push(node);
        self.streamer.request_asset(identifier, priority);
    }

    /// Drive the streamer and deliver completions to the scene.
    #[profiling::function]
    pub fn update(
        &mut self,
        binding: &mut dyn SceneBinding,
    ) {
        self.streamer.update();

        while let Ok(event) = self.events.try_recv() {
            match event {
                StreamEvent::Ready { path, resource } => {
                    if let Some(node) = self.take_waiter(&path) {
                        binding.asset_ready(node, &path, &resource);
                    }
                }
                StreamEvent::Failed { path, fallback } => {
                    if let Some(node) = self.take_waiter(&path) {
                        binding.asset_failed(node, &path, &fallback);
                    }
                }
                StreamEvent::Error { path, message } => {
                    log::warn!("Streaming problem for {}: {}", path, message);
                }
            }
        }
    }

    fn take_waiter(
        &mut self,
        path: &CanonicalAssetPath,
    ) -> Option<NodeId> {
        let nodes = self.pending.get_mut(path)?;
        if nodes.is_empty() {
            return None;
        }
        let node = nodes.remove(0);
        if nodes.is_empty() {
            self.pending.remove(path);
        }
        Some(node)
    }
}
