use serde::{Deserialize, Serialize};

/// Normalized, scheme-free, forward-slash relative asset path.
///
/// This is the universal key for manifest lookup, cache storage and in-flight
/// request tracking. Two identifiers that denote the same underlying asset
/// normalize to the same canonical path, and normalization is idempotent.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalAssetPath(String);

impl CanonicalAssetPath {
    /// Normalize an arbitrary asset identifier into a canonical path.
    ///
    /// Strips a bundled-resource scheme prefix (`res://` or `user://`),
    /// converts backslashes to forward slashes, drops empty and `.` segments
    /// and leading slashes, and removes leading `assets/` segments.
    pub fn normalize(identifier: &str) -> CanonicalAssetPath {
        let cleaned = identifier.trim().replace('\\', "/");
        let without_scheme = cleaned
            .strip_prefix("res://")
            .or_else(|| cleaned.strip_prefix("user://"))
            .unwrap_or(&cleaned);

        let mut segments: Vec<&str> = without_scheme
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect();

        // Strip leading "assets/" repeatedly so re-normalizing is a no-op
        while segments.first() == Some(&"assets") {
            segments.remove(0);
        }

        CanonicalAssetPath(segments.join("/"))
    }

    /// Wrap a string that is already in canonical form (e.g. read back from
    /// the cache index).
    pub fn from_canonical(path: String) -> CanonicalAssetPath {
        CanonicalAssetPath(path)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Final path segment, i.e. the file name.
    pub fn basename(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }

    /// Lowercased file extension, if any.
    pub fn extension(&self) -> Option<String> {
        let basename = self.basename();
        let (stem, ext) = basename.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    pub fn segments(&self) -> Vec<&str> {
        if self.0.is_empty() {
            Vec::default()
        } else {
            self.0.split('/').collect()
        }
    }

    /// Directory segments only, excluding the basename.
    fn parent_segments(&self) -> Vec<&str> {
        let mut segments = self.segments();
        segments.pop();
        segments
    }

    /// Similarity of the directory portion of two paths: the count of
    /// identical same-position segments divided by the larger segment count.
    /// Two paths with no directory portion at all are fully similar.
    pub fn segment_similarity(
        &self,
        other: &CanonicalAssetPath,
    ) -> f32 {
        let a = self.parent_segments();
        let b = other.parent_segments();
        let max_len = a.len().max(b.len());
        if max_len == 0 {
            return 1.0;
        }

        let matching = a
            .iter()
            .zip(b.iter())
            .filter(|(left, right)| left == right)
            .count();
        matching as f32 / max_len as f32
    }
}

impl std::fmt::Display for CanonicalAssetPath {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn normalize_strips_scheme_and_assets_prefix() {
        let path = CanonicalAssetPath::normalize("res://assets/models/slime.glb");
        assert_eq!(path.as_str(), "models/slime.glb");

        let path = CanonicalAssetPath::normalize("assets/textures/grass.png");
        assert_eq!(path.as_str(), "textures/grass.png");
    }

    #[test]
    fn normalize_canonicalizes_separators_and_slashes() {
        let path = CanonicalAssetPath::normalize("models\\environment\\island.glb");
        assert_eq!(path.as_str(), "models/environment/island.glb");

        let path = CanonicalAssetPath::normalize("/models//tree.glb");
        assert_eq!(path.as_str(), "models/tree.glb");

        let path = CanonicalAssetPath::normalize("./audio/theme.ogg");
        assert_eq!(path.as_str(), "audio/theme.ogg");
    }

    #[test]
    fn normalize_is_idempotent() {
        let identifiers = [
            "res://assets/models/slime.glb",
            "assets/assets/models/slime.glb",
            "models\\slime.glb",
            "/slime.glb",
            "slime.glb",
            "",
        ];
        for identifier in identifiers {
            let once = CanonicalAssetPath::normalize(identifier);
            let twice = CanonicalAssetPath::normalize(once.as_str());
            assert_eq!(once, twice, "not idempotent for {:?}", identifier);
        }
    }

    #[test]
    fn equivalent_identifiers_normalize_identically() {
        let a = CanonicalAssetPath::normalize("res://assets/models/slime.glb");
        let b = CanonicalAssetPath::normalize("models/slime.glb");
        let c = CanonicalAssetPath::normalize("assets\\models\\slime.glb");
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn basename_and_extension() {
        let path = CanonicalAssetPath::normalize("models/environment/island.glb");
        assert_eq!(path.basename(), "island.glb");
        assert_eq!(path.extension(), Some("glb".to_string()));

        let path = CanonicalAssetPath::normalize("textures/GRASS.PNG");
        assert_eq!(path.extension(), Some("png".to_string()));

        let path = CanonicalAssetPath::normalize("no_extension");
        assert_eq!(path.extension(), None);
    }

    #[test]
    fn segment_similarity_counts_directory_segments() {
        let a = CanonicalAssetPath::normalize("a/b/c/file.glb");
        let b = CanonicalAssetPath::normalize("a/x/c/file.glb");
        // Directories [a, b, c] vs [a, x, c] agree in 2 of 3 positions
        let similarity = a.segment_similarity(&b);
        assert!((similarity - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn segment_similarity_of_bare_filenames_is_full() {
        let a = CanonicalAssetPath::normalize("file.glb");
        let b = CanonicalAssetPath::normalize("file.glb");
        assert_eq!(a.segment_similarity(&b), 1.0);
    }

    #[test]
    fn segment_similarity_at_exact_boundary() {
        // 7 of 10 directory segments agree: similarity is exactly 0.70
        let a = CanonicalAssetPath::normalize("a/b/c/d/e/f/g/h/i/j/file.glb");
        let b = CanonicalAssetPath::normalize("a/b/c/d/e/f/g/x/y/z/file.glb");
        let similarity = a.segment_similarity(&b);
        assert!((similarity - 0.70).abs() < 1e-6);
        assert!(similarity >= 0.70);

        // 6 of 10 falls below
        let c = CanonicalAssetPath::normalize("a/b/c/d/e/f/w/x/y/z/file.glb");
        assert!(a.segment_similarity(&c) < 0.70);
    }

    #[test]
    fn segment_similarity_uses_larger_segment_count() {
        let a = CanonicalAssetPath::normalize("a/b/file.glb");
        let b = CanonicalAssetPath::normalize("a/b/c/d/file.glb");
        // Directories [a, b] vs [a, b, c, d] agree in 2 of 4 positions
        let similarity = a.segment_similarity(&b);
        assert!((similarity - 0.5).abs() < 1e-6);
    }
}
