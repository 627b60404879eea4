use crate::error::{ManifestError, ManifestResult};
use crate::hashing::HashMap;
use crate::{AssetKind, CanonicalAssetPath, Priority};
use serde::Deserialize;

//
// The manifest is a versioned, immutable-per-fetch catalogue of streamable
// assets served as a JSON document. The schema is strongly typed and
// validated once at parse time; lookups afterwards go through prebuilt
// tables rather than dynamic map traversal.
//

#[derive(Debug, Deserialize)]
pub struct ChunkJson {
    pub index: u32,
    pub offset: u64,
    pub size: u64,
}

#[derive(Debug, Deserialize)]
pub struct ManifestEntryJson {
    #[serde(default)]
    pub name: Option<String>,
    pub path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub chunks: Vec<ChunkJson>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ManifestCategoriesJson {
    #[serde(default)]
    pub models: Vec<ManifestEntryJson>,
    #[serde(default)]
    pub textures: Vec<ManifestEntryJson>,
    #[serde(default)]
    pub audio: Vec<ManifestEntryJson>,
}

#[derive(Debug, Deserialize)]
pub struct ManifestJson {
    pub version: String,
    #[serde(default)]
    pub streaming_assets: ManifestCategoriesJson,
    #[serde(default)]
    pub core_assets: ManifestCategoriesJson,
}

#[derive(Debug, Clone)]
pub struct ChunkInfo {
    pub index: u32,
    pub offset: u64,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct ManifestEntry {
    pub name: String,
    pub path: CanonicalAssetPath,
    pub kind: AssetKind,
    pub size: u64,
    pub priority: Priority,
    pub chunks: Vec<ChunkInfo>,
}

/// Parsed manifest with lookup tables by canonical path and by basename.
pub struct Manifest {
    version: String,
    entries: Vec<ManifestEntry>,
    by_path: HashMap<CanonicalAssetPath, usize>,
    by_basename: HashMap<String, Vec<usize>>,
}

impl Manifest {
    pub fn from_json_bytes(bytes: &[u8]) -> ManifestResult<Manifest> {
        let json: ManifestJson = serde_json::from_slice(bytes)?;
        Ok(Self::from_json(json))
    }

    pub fn from_json(json: ManifestJson) -> Manifest {
        let mut manifest = Manifest {
            version: json.version,
            entries: Vec::default(),
            by_path: HashMap::default(),
            by_basename: HashMap::default(),
        };

        for category in [json.streaming_assets, json.core_assets] {
            for entry in category
                .models
                .into_iter()
                .chain(category.textures)
                .chain(category.audio)
            {
                manifest.add_entry(entry);
            }
        }

        manifest
    }

    /// An empty manifest, used for bundled-only operation and tests.
    pub fn empty(version: &str) -> Manifest {
        Manifest {
            version: version.to_string(),
            entries: Vec::default(),
            by_path: HashMap::default(),
            by_basename: HashMap::default(),
        }
    }

    fn add_entry(
        &mut self,
        json: ManifestEntryJson,
    ) {
        let path = CanonicalAssetPath::normalize(&json.path);
        if path.is_empty() {
            log::warn!("Manifest entry with empty path ignored: {:?}", json.name);
            return;
        }
        if self.by_path.contains_key(&path) {
            log::warn!("Duplicate manifest entry for {}, first entry wins", path);
            return;
        }

        let priority = match json.priority.as_deref() {
            None => Priority::Medium,
            Some(value) => Priority::parse(value).unwrap_or_else(|| {
                log::warn!(
                    "Unrecognized priority {:?} for {}, defaulting to medium",
                    value,
                    path
                );
                Priority::Medium
            }),
        };

        let entry = ManifestEntry {
            name: json
                .name
                .unwrap_or_else(|| path.basename().to_string()),
            kind: AssetKind::from_path(&path),
            size: json.size,
            priority,
            chunks: json
                .chunks
                .into_iter()
                .map(|chunk| ChunkInfo {
                    index: chunk.index,
                    offset: chunk.offset,
                    size: chunk.size,
                })
                .collect(),
            path,
        };

        let index = self.entries.len();
        self.by_path.insert(entry.path.clone(), index);
        self.by_basename
            .entry(entry.path.basename().to_string())
            .or_default()
            .push(index);
        self.entries.push(entry);
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find_exact(
        &self,
        path: &CanonicalAssetPath,
    ) -> Option<&ManifestEntry> {
        self.by_path.get(path).map(|&index| &self.entries[index])
    }

    /// First entry whose basename matches. Ambiguity between entries sharing
    /// a basename resolves to the first manifest entry; callers log this as
    /// a backward-compatibility path.
    pub fn find_by_basename(
        &self,
        basename: &str,
    ) -> Option<&ManifestEntry> {
        let indices = self.by_basename.get(basename)?;
        if indices.len() > 1 {
            log::warn!(
                "{} manifest entries share basename {:?}, using the first",
                indices.len(),
                basename
            );
        }
        indices.first().map(|&index| &self.entries[index])
    }

    pub fn basename_match_count(
        &self,
        basename: &str,
    ) -> usize {
        self.by_basename
            .get(basename)
            .map(|indices| indices.len())
            .unwrap_or(0)
    }

    /// Fuzzy lookup: basenames must be equal and the directory-segment
    /// similarity must meet the threshold. The best-scoring entry wins.
    pub fn find_fuzzy(
        &self,
        path: &CanonicalAssetPath,
        threshold: f32,
    ) -> Option<&ManifestEntry> {
        let indices = self.by_basename.get(path.basename())?;
        let mut best: Option<(f32, usize)> = None;
        for &index in indices {
            let similarity = path.segment_similarity(&self.entries[index].path);
            if similarity >= threshold {
                match best {
                    Some((best_similarity, _)) if best_similarity >= similarity => {}
                    _ => best = Some((similarity, index)),
                }
            }
        }
        best.map(|(_, index)| &self.entries[index])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_manifest() -> Manifest {
        let json = r#"{
            "version": "2024.06.1",
            "streaming_assets": {
                "models": [
                    {"name": "island", "path": "assets/models/environment/floating_island.glb", "size": 1048576, "priority": "critical"},
                    {"path": "models/props/crate.glb", "size": 2048, "priority": "low"}
                ],
                "textures": [
                    {"path": "textures/grass.png", "size": 512, "priority": "medium",
                     "chunks": [{"index": 0, "offset": 0, "size": 512}]}
                ],
                "audio": [
                    {"path": "audio/theme.ogg", "size": 4096, "priority": "bogus"}
                ]
            },
            "core_assets": {
                "models": [
                    {"path": "models/player.glb", "size": 8192, "priority": "critical"}
                ]
            }
        }"#;
        Manifest::from_json_bytes(json.as_bytes()).unwrap()
    }

    #[test]
    fn parses_all_categories() {
        let manifest = sample_manifest();
        assert_eq!(manifest.version(), "2024.06.1");
        assert_eq!(manifest.len(), 5);
    }

    #[test]
    fn entry_paths_are_canonical() {
        let manifest = sample_manifest();
        let path = CanonicalAssetPath::normalize("models/environment/floating_island.glb");
        let entry = manifest.find_exact(&path).unwrap();
        assert_eq!(entry.name, "island");
        assert_eq!(entry.kind, AssetKind::Model);
        assert_eq!(entry.priority, Priority::Critical);
    }

    #[test]
    fn unknown_priority_defaults_to_medium() {
        let manifest = sample_manifest();
        let path = CanonicalAssetPath::normalize("audio/theme.ogg");
        let entry = manifest.find_exact(&path).unwrap();
        assert_eq!(entry.priority, Priority::Medium);
    }

    #[test]
    fn basename_lookup_finds_first_match() {
        let manifest = sample_manifest();
        let entry = manifest.find_by_basename("floating_island.glb").unwrap();
        assert_eq!(
            entry.path.as_str(),
            "models/environment/floating_island.glb"
        );
        assert!(manifest.find_by_basename("missing.glb").is_none());
    }

    #[test]
    fn fuzzy_lookup_honors_threshold() {
        let manifest = sample_manifest();

        // [models, environment] vs [models, old] = 1/2 = 0.5, below threshold
        let path = CanonicalAssetPath::normalize("models/old/floating_island.glb");
        assert!(manifest.find_fuzzy(&path, 0.70).is_none());
        assert!(manifest.find_fuzzy(&path, 0.50).is_some());

        // Equal directories match at any threshold <= 1.0
        let path = CanonicalAssetPath::normalize("models/environment/floating_island.glb");
        assert!(manifest.find_fuzzy(&path, 0.70).is_some());

        // Basename mismatch never fuzzy-matches
        let path = CanonicalAssetPath::normalize("models/environment/other.glb");
        assert!(manifest.find_fuzzy(&path, 0.0).is_none());
    }

    #[test]
    fn manifest_with_missing_version_is_rejected() {
        let result = Manifest::from_json_bytes(br#"{"streaming_assets": {}}"#);
        assert!(result.is_err());
    }
}
