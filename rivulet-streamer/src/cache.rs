use crate::error::StreamResult;
use rivulet_base::hashing::HashMap;
use rivulet_base::CanonicalAssetPath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

//
// Path-addressed local cache. Files mirror canonical path structure under
// the cache root. Existence is the sole validity signal; invalidation is
// wholesale when the manifest version changes. Two sidecar files persist
// across restarts:
// - index.json: canonical path -> { size, downloaded_at }
// - cache_info.json: { version, last_updated }
//

const INDEX_FILE_NAME: &str = "index.json";
const INFO_FILE_NAME: &str = "cache_info.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheIndexEntry {
    pub size: u64,
    pub downloaded_at: u64,
}

#[derive(Serialize, Deserialize, Default)]
struct CacheIndexJson {
    entries: BTreeMap<String, CacheIndexEntry>,
}

#[derive(Serialize, Deserialize)]
struct CacheInfoJson {
    version: String,
    last_updated: u64,
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub struct CacheStore {
    root: PathBuf,
    index: HashMap<CanonicalAssetPath, CacheIndexEntry>,
    version: Option<String>,
}

impl CacheStore {
    /// Open (or create) a cache rooted at the given directory, loading the
    /// persisted index and version info. A corrupt sidecar file is treated
    /// as an empty cache rather than an error.
    pub fn open(root: &Path) -> StreamResult<CacheStore> {
        std::fs::create_dir_all(root)?;

        let mut store = CacheStore {
            root: root.to_path_buf(),
            index: HashMap::default(),
            version: None,
        };

        let index_path = root.join(INDEX_FILE_NAME);
        if index_path.exists() {
            match std::fs::read_to_string(&index_path)
                .map_err(|e| e.to_string())
                .and_then(|json_str| {
                    serde_json::from_str::<CacheIndexJson>(&json_str).map_err(|e| e.to_string())
                }) {
                Ok(index_json) => {
                    for (path, entry) in index_json.entries {
                        store
                            .index
                            .insert(CanonicalAssetPath::from_canonical(path), entry);
                    }
                }
                Err(e) => {
                    log::warn!("Cache index unreadable, starting empty: {}", e);
                }
            }
        }

        let info_path = root.join(INFO_FILE_NAME);
        if info_path.exists() {
            match std::fs::read_to_string(&info_path)
                .map_err(|e| e.to_string())
                .and_then(|json_str| {
                    serde_json::from_str::<CacheInfoJson>(&json_str).map_err(|e| e.to_string())
                }) {
                Ok(info) => store.version = Some(info.version),
                Err(e) => {
                    log::warn!("Cache info unreadable, version unknown: {}", e);
                }
            }
        }

        log::debug!(
            "Opened cache at {:?}: {} entries, version {:?}",
            store.root,
            store.index.len(),
            store.version
        );
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entry_count(&self) -> usize {
        self.index.len()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn file_path(
        &self,
        path: &CanonicalAssetPath,
    ) -> PathBuf {
        self.root.join(path.as_str())
    }

    // Suffix on the full file name, so sibling assets differing only by
    // extension never share a temp file
    fn temp_file_path(
        &self,
        path: &CanonicalAssetPath,
    ) -> PathBuf {
        self.root.join(format!("{}.tmp-download", path.as_str()))
    }

    /// True when the asset is indexed and its file is actually on disk.
    pub fn exists(
        &self,
        path: &CanonicalAssetPath,
    ) -> bool {
        self.index.contains_key(path) && self.file_path(path).exists()
    }

    pub fn read(
        &self,
        path: &CanonicalAssetPath,
    ) -> StreamResult<Vec<u8>> {
        let bytes = std::fs::read(self.file_path(path))?;
        Ok(bytes)
    }

    /// Persist downloaded bytes. The write goes to a temp sibling first and
    /// is renamed into place so a crash never leaves a truncated file that
    /// `exists()` reports as present. The index is persisted after every
    /// mutation.
    pub fn write(
        &mut self,
        path: &CanonicalAssetPath,
        bytes: &[u8],
    ) -> StreamResult<()> {
        let file_path = self.file_path(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let temp_path = self.temp_file_path(path);
        std::fs::write(&temp_path, bytes)?;
        std::fs::rename(&temp_path, &file_path)?;

        self.index.insert(
            path.clone(),
            CacheIndexEntry {
                size: bytes.len() as u64,
                downloaded_at: unix_timestamp(),
            },
        );
        self.persist_index()?;
        log::debug!("Cached {} ({} bytes)", path, bytes.len());
        Ok(())
    }

    /// Remove every cached file and reset the index. The whole cache root is
    /// walked rather than just the indexed entries, so files orphaned by a
    /// lost or corrupt index are removed as well. File removal is
    /// best-effort; the index is always reset so the cache cannot wedge
    /// itself into a permanently dirty state.
    pub fn clear(&mut self) -> StreamResult<()> {
        log::info!("Clearing {} cached assets", self.index.len());
        Self::remove_cached_files(&self.root, true);
        self.index.clear();
        self.persist_index()?;
        Ok(())
    }

    // Recursive best-effort removal of everything under the cache root
    // except the sidecar files at the top level
    fn remove_cached_files(
        dir: &Path,
        is_root: bool,
    ) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Could not enumerate cache directory {:?}: {}", dir, e);
                return;
            }
        };

        for entry in entries.flatten() {
            let entry_path = entry.path();
            if entry_path.is_dir() {
                Self::remove_cached_files(&entry_path, false);
                let _ = std::fs::remove_dir(&entry_path);
            } else {
                if is_root
                    && (entry.file_name() == INDEX_FILE_NAME
                        || entry.file_name() == INFO_FILE_NAME)
                {
                    continue;
                }
                if let Err(e) = std::fs::remove_file(&entry_path) {
                    log::warn!("Failed to remove cached file {:?}: {}", entry_path, e);
                }
            }
        }
    }

    /// Reconcile the cache with a freshly fetched manifest version. A
    /// version change wipes the cache wholesale before any new download is
    /// scheduled. Returns whether a wipe happened.
    pub fn sync_version(
        &mut self,
        manifest_version: &str,
    ) -> StreamResult<bool> {
        let cleared = match self.version.as_deref() {
            Some(version) if version == manifest_version => false,
            Some(version) => {
                log::info!(
                    "Manifest version changed ({} -> {}), invalidating cache",
                    version,
                    manifest_version
                );
                self.clear()?;
                true
            }
            None => {
                // First run, nothing to invalidate
                false
            }
        };

        self.version = Some(manifest_version.to_string());
        self.persist_info()?;
        Ok(cleared)
    }

    fn persist_index(&self) -> StreamResult<()> {
        let mut index_json = CacheIndexJson::default();
        for (path, entry) in &self.index {
            index_json
                .entries
                .insert(path.as_str().to_string(), entry.clone());
        }
        let json_str = serde_json::to_string_pretty(&index_json)?;
        std::fs::write(self.root.join(INDEX_FILE_NAME), json_str)?;
        Ok(())
    }

    fn persist_info(&self) -> StreamResult<()> {
        let info = CacheInfoJson {
            version: self.version.clone().unwrap_or_default(),
            last_updated: unix_timestamp(),
        };
        let json_str = serde_json::to_string_pretty(&info)?;
        std::fs::write(self.root.join(INFO_FILE_NAME), json_str)?;
        Ok(())
    }
}
