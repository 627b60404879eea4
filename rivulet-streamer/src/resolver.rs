use rivulet_base::{AssetKind, CanonicalAssetPath, Manifest, Priority};
use std::path::{Path, PathBuf};
use std::sync::Arc;

//
// Path resolution: normalize an arbitrary identifier, look it up against the
// manifest (exact, then basename, then fuzzy), and decide a load strategy.
// Resolution never fails outright; identifiers nothing knows about degrade
// to a hybrid strategy with a guaranteed fallback class, so the caller
// always ends up with something renderable.
//

/// How an asset should be produced.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoadStrategy {
    /// Load from the bundled resources shipped with the build
    Bundled,
    /// Download via the manifest-backed streaming endpoint (or serve from
    /// cache)
    Streamed,
    /// Try bundled, then cache, then fall back
    Hybrid,
}

#[derive(Clone, Debug)]
pub struct AssetInfo {
    pub path: CanonicalAssetPath,
    pub strategy: LoadStrategy,
    pub kind: AssetKind,
    pub priority: Priority,
    pub cache_path: PathBuf,
}

/// Source of bundled (shipped-with-the-build) resources. Behind a trait so
/// the resolver can be exercised with fakes and so web builds that bundle
/// nothing can plug in the null source.
pub trait BundledSource: Send + Sync + 'static {
    fn exists(
        &self,
        path: &CanonicalAssetPath,
    ) -> bool;

    fn read(
        &self,
        path: &CanonicalAssetPath,
    ) -> std::io::Result<Vec<u8>>;
}

/// Bundled resources laid out under a directory root.
pub struct DirBundledSource {
    root: PathBuf,
}

impl DirBundledSource {
    pub fn new(root: &Path) -> DirBundledSource {
        DirBundledSource {
            root: root.to_path_buf(),
        }
    }
}

impl BundledSource for DirBundledSource {
    fn exists(
        &self,
        path: &CanonicalAssetPath,
    ) -> bool {
        self.root.join(path.as_str()).is_file()
    }

    fn read(
        &self,
        path: &CanonicalAssetPath,
    ) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.root.join(path.as_str()))
    }
}

/// A build that ships no bundled resources.
pub struct NullBundledSource;

impl BundledSource for NullBundledSource {
    fn exists(
        &self,
        _path: &CanonicalAssetPath,
    ) -> bool {
        false
    }

    fn read(
        &self,
        path: &CanonicalAssetPath,
    ) -> std::io::Result<Vec<u8>> {
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no bundled resource for {}", path),
        ))
    }
}

/// Minimum directory-segment similarity for a fuzzy manifest match.
pub const FUZZY_MATCH_THRESHOLD: f32 = 0.70;

#[derive(Clone)]
pub struct PathResolver {
    manifest: Arc<Manifest>,
    bundled: Arc<dyn BundledSource>,
    cache_root: PathBuf,
}

impl PathResolver {
    pub fn new(
        manifest: Arc<Manifest>,
        bundled: Arc<dyn BundledSource>,
        cache_root: PathBuf,
    ) -> PathResolver {
        PathResolver {
            manifest,
            bundled,
            cache_root,
        }
    }

    pub fn manifest(&self) -> &Arc<Manifest> {
        &self.manifest
    }

    pub fn bundled(&self) -> &Arc<dyn BundledSource> {
        &self.bundled
    }

    pub fn resolve(
        &self,
        identifier: &str,
    ) -> AssetInfo {
        let normalized = CanonicalAssetPath::normalize(identifier);

        // 1. Exact canonical-path match
        if let Some(entry) = self.manifest.find_exact(&normalized) {
            return self.streamed_info(entry.path.clone(), entry.priority);
        }

        // 2. Filename-only match, kept for identifiers predating the
        //    canonical layout
        if !normalized.basename().is_empty() {
            if let Some(entry) = self.manifest.find_by_basename(normalized.basename()) {
                log::info!(
                    "Resolved {:?} by basename to {} (compatibility path)",
                    identifier,
                    entry.path
                );
                return self.streamed_info(entry.path.clone(), entry.priority);
            }
        }

        // 3. Fuzzy match for near-miss directory layouts
        if let Some(entry) = self
            .manifest
            .find_fuzzy(&normalized, FUZZY_MATCH_THRESHOLD)
        {
            log::info!("Fuzzy-resolved {:?} to {}", identifier, entry.path);
            return self.streamed_info(entry.path.clone(), entry.priority);
        }

        // 4. Not in the manifest but shipped with the build
        if self.bundled.exists(&normalized) {
            let kind = AssetKind::from_path(&normalized);
            let cache_path = self.cache_root.join(normalized.as_str());
            return AssetInfo {
                path: normalized,
                strategy: LoadStrategy::Bundled,
                kind,
                priority: Priority::Medium,
                cache_path,
            };
        }

        // 5. Unknown to everyone: hybrid strategy, fallback guaranteed
        log::warn!(
            "Identifier {:?} matched neither manifest nor bundled resources",
            identifier
        );
        let kind = AssetKind::from_path(&normalized);
        let cache_path = self.cache_root.join(normalized.as_str());
        AssetInfo {
            path: normalized,
            strategy: LoadStrategy::Hybrid,
            kind,
            priority: Priority::Unknown,
            cache_path,
        }
    }

    fn streamed_info(
        &self,
        path: CanonicalAssetPath,
        priority: Priority,
    ) -> AssetInfo {
        let kind = AssetKind::from_path(&path);
        let cache_path = self.cache_root.join(path.as_str());
        AssetInfo {
            path,
            strategy: LoadStrategy::Streamed,
            kind,
            priority,
            cache_path,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rivulet_base::hashing::HashMap;

    struct FakeBundled {
        files: HashMap<String, Vec<u8>>,
    }

    impl FakeBundled {
        fn new(paths: &[&str]) -> FakeBundled {
            let mut files = HashMap::default();
            for path in paths {
                files.insert(path.to_string(), b"bundled".to_vec());
            }
            FakeBundled { files }
        }
    }

    impl BundledSource for FakeBundled {
        fn exists(
            &self,
            path: &CanonicalAssetPath,
        ) -> bool {
            self.files.contains_key(path.as_str())
        }

        fn read(
            &self,
            path: &CanonicalAssetPath,
        ) -> std::io::Result<Vec<u8>> {
            self.files
                .get(path.as_str())
                .cloned()
                .ok_or_else(|| std::io::ErrorKind::NotFound.into())
        }
    }

    fn manifest() -> Arc<Manifest> {
        let json = r#"{
            "version": "1",
            "streaming_assets": {
                "models": [
                    {"path": "models/environment/floating_island.glb", "priority": "critical"},
                    {"path": "models/props/a/b/barrel.glb", "priority": "low"}
                ],
                "textures": [
                    {"path": "textures/terrain/grass.png", "priority": "medium"}
                ]
            }
        }"#;
        Arc::new(Manifest::from_json_bytes(json.as_bytes()).unwrap())
    }

    fn resolver(bundled: &[&str]) -> PathResolver {
        PathResolver::new(
            manifest(),
            Arc::new(FakeBundled::new(bundled)),
            PathBuf::from("/cache"),
        )
    }

    #[test]
    fn exact_match_is_streamed() {
        let info = resolver(&[]).resolve("res://assets/models/environment/floating_island.glb");
        assert_eq!(info.strategy, LoadStrategy::Streamed);
        assert_eq!(info.path.as_str(), "models/environment/floating_island.glb");
        assert_eq!(info.kind, AssetKind::Model);
        assert_eq!(info.priority, Priority::Critical);
        assert_eq!(
            info.cache_path,
            PathBuf::from("/cache/models/environment/floating_island.glb")
        );
    }

    #[test]
    fn bare_filename_matches_by_basename() {
        let info = resolver(&[]).resolve("floating_island.glb");
        assert_eq!(info.strategy, LoadStrategy::Streamed);
        assert_eq!(info.path.as_str(), "models/environment/floating_island.glb");
        assert_eq!(info.priority, Priority::Critical);
    }

    #[test]
    fn fuzzy_match_at_threshold_boundary() {
        // Manifest has models/props/a/b/barrel.glb. Basename matching wins
        // before fuzzy gets a chance, so exercise the fuzzy metric directly:
        // 0.70 exactly should match, just below must not.
        let manifest = manifest();
        let entry_path =
            CanonicalAssetPath::normalize("models/props/a/b/barrel.glb");

        // [models, props, a, b, x] vs [models, props, a, b]: 4/5 = 0.8
        let close = CanonicalAssetPath::normalize("models/props/a/b/x/barrel.glb");
        assert!(close.segment_similarity(&entry_path) >= FUZZY_MATCH_THRESHOLD);
        assert!(manifest.find_fuzzy(&close, FUZZY_MATCH_THRESHOLD).is_some());

        // [models, y, z, b] vs [models, props, a, b]: 2/4 = 0.5
        let far = CanonicalAssetPath::normalize("models/y/z/b/barrel.glb");
        assert!(far.segment_similarity(&entry_path) < FUZZY_MATCH_THRESHOLD);
        assert!(manifest.find_fuzzy(&far, FUZZY_MATCH_THRESHOLD).is_none());
    }

    #[test]
    fn unmatched_but_bundled_resolves_bundled() {
        let info = resolver(&["ui/cursor.png"]).resolve("res://assets/ui/cursor.png");
        assert_eq!(info.strategy, LoadStrategy::Bundled);
        assert_eq!(info.kind, AssetKind::Texture);
    }

    #[test]
    fn unknown_identifier_degrades_to_hybrid() {
        let info = resolver(&[]).resolve("models/never_heard_of_it.glb");
        assert_eq!(info.strategy, LoadStrategy::Hybrid);
        assert_eq!(info.priority, Priority::Unknown);
        assert_eq!(info.kind, AssetKind::Model);
    }

    #[test]
    fn resolution_never_fails_for_garbage() {
        let info = resolver(&[]).resolve("   ");
        assert_eq!(info.strategy, LoadStrategy::Hybrid);
        assert_eq!(info.kind, AssetKind::Unknown);
    }
}
