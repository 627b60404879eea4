use crate::CanonicalAssetPath;
use serde::{Deserialize, Serialize};

/// Asset kind derived from the file extension. Also names the fallback class
/// used when the real asset cannot be produced.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Model,
    Texture,
    Audio,
    Unknown,
}

impl AssetKind {
    pub fn from_extension(extension: &str) -> AssetKind {
        match extension.to_ascii_lowercase().as_str() {
            "glb" | "gltf" => AssetKind::Model,
            "png" | "jpg" | "jpeg" | "webp" | "bmp" | "tga" => AssetKind::Texture,
            "ogg" | "mp3" | "wav" | "m4a" => AssetKind::Audio,
            _ => AssetKind::Unknown,
        }
    }

    pub fn from_path(path: &CanonicalAssetPath) -> AssetKind {
        path.extension()
            .map(|ext| AssetKind::from_extension(&ext))
            .unwrap_or(AssetKind::Unknown)
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let name = match self {
            AssetKind::Model => "model",
            AssetKind::Texture => "texture",
            AssetKind::Audio => "audio",
            AssetKind::Unknown => "unknown",
        };
        name.fmt(f)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kind_from_extension() {
        assert_eq!(AssetKind::from_extension("glb"), AssetKind::Model);
        assert_eq!(AssetKind::from_extension("GLTF"), AssetKind::Model);
        assert_eq!(AssetKind::from_extension("png"), AssetKind::Texture);
        assert_eq!(AssetKind::from_extension("jpeg"), AssetKind::Texture);
        assert_eq!(AssetKind::from_extension("ogg"), AssetKind::Audio);
        assert_eq!(AssetKind::from_extension("wav"), AssetKind::Audio);
        assert_eq!(AssetKind::from_extension("txt"), AssetKind::Unknown);
    }

    #[test]
    fn kind_from_path() {
        let path = CanonicalAssetPath::normalize("models/slime.glb");
        assert_eq!(AssetKind::from_path(&path), AssetKind::Model);

        let path = CanonicalAssetPath::normalize("README");
        assert_eq!(AssetKind::from_path(&path), AssetKind::Unknown);
    }
}
