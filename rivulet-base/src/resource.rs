use crate::AssetKind;
use std::sync::Arc;

//
// Decoded in-memory resources produced by the streaming pipeline. These are
// plain data the rendering/audio side consumes; the pipeline never hands a
// caller raw bytes or a null resource.
//

#[derive(Debug, Default, Clone)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

#[derive(Debug, Default, Clone)]
pub struct ModelResource {
    pub meshes: Vec<MeshData>,
}

#[derive(Clone)]
pub struct TextureResource {
    pub width: u32,
    pub height: u32,
    pub rgba8: Vec<u8>,
}

impl std::fmt::Debug for TextureResource {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("TextureResource")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("byte_length", &self.rgba8.len())
            .finish()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Ogg,
    Mp3,
    M4a,
}

#[derive(Clone)]
pub struct AudioResource {
    pub format: AudioFormat,
    pub sample_rate: Option<u32>,
    pub channel_count: Option<u16>,
    /// Container bytes, handed to the playback layer as-is for compressed
    /// formats.
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for AudioResource {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("AudioResource")
            .field("format", &self.format)
            .field("sample_rate", &self.sample_rate)
            .field("channel_count", &self.channel_count)
            .field("byte_length", &self.bytes.len())
            .finish()
    }
}

/// A decoded resource of any kind. Cheap to clone; payloads are shared.
#[derive(Clone, Debug)]
pub enum AssetResource {
    Model(Arc<ModelResource>),
    Texture(Arc<TextureResource>),
    Audio(Arc<AudioResource>),
}

impl AssetResource {
    pub fn kind(&self) -> AssetKind {
        match self {
            AssetResource::Model(_) => AssetKind::Model,
            AssetResource::Texture(_) => AssetKind::Texture,
            AssetResource::Audio(_) => AssetKind::Audio,
        }
    }

    pub fn as_model(&self) -> Option<&Arc<ModelResource>> {
        match self {
            AssetResource::Model(model) => Some(model),
            _ => None,
        }
    }

    pub fn as_texture(&self) -> Option<&Arc<TextureResource>> {
        match self {
            AssetResource::Texture(texture) => Some(texture),
            _ => None,
        }
    }

    pub fn as_audio(&self) -> Option<&Arc<AudioResource>> {
        match self {
            AssetResource::Audio(audio) => Some(audio),
            _ => None,
        }
    }
}
