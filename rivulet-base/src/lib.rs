pub mod hashing;

mod asset_path;
mod error;
mod kind;
mod priority;

pub use asset_path::CanonicalAssetPath;
pub use error::{ManifestError, ManifestResult};
pub use kind::AssetKind;
pub use priority::Priority;

pub mod manifest;
pub use manifest::{Manifest, ManifestEntry};

pub mod resource;
pub use resource::{
    AssetResource, AudioFormat, AudioResource, MeshData, ModelResource, TextureResource,
};
