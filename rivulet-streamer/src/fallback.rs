use rivulet_base::{
    AssetKind, AssetResource, AudioFormat, AudioResource, MeshData, ModelResource,
    TextureResource,
};
use std::sync::Arc;

//
// Procedural placeholder resources. These stand in when an identifier cannot
// be resolved at all or when the real pipeline fails terminally. They are
// constructed purely in memory so fallback production itself cannot fail:
// every request is guaranteed to end with a usable, non-null resource.
//

/// Bright marker color so placeholder content is unmistakable in-scene.
pub const FALLBACK_COLOR_RGBA: [u8; 4] = [255, 0, 255, 255];

pub fn fallback_resource(kind: AssetKind) -> AssetResource {
    match kind {
        AssetKind::Texture => AssetResource::Texture(Arc::new(fallback_texture())),
        AssetKind::Audio => AssetResource::Audio(Arc::new(fallback_audio())),
        // Unknown kinds get the box; a visible shape beats silence or a
        // flat color when nothing is known about the asset
        AssetKind::Model | AssetKind::Unknown => {
            AssetResource::Model(Arc::new(fallback_model()))
        }
    }
}

/// Unit cube centered at the origin.
pub fn fallback_model() -> ModelResource {
    let positions = vec![
        [-0.5, -0.5, -0.5],
        [0.5, -0.5, -0.5],
        [0.5, 0.5, -0.5],
        [-0.5, 0.5, -0.5],
        [-0.5, -0.5, 0.5],
        [0.5, -0.5, 0.5],
        [0.5, 0.5, 0.5],
        [-0.5, 0.5, 0.5],
    ];
    #[rustfmt::skip]
    let indices = vec![
        0, 2, 1,  0, 3, 2, // back
        4, 5, 6,  4, 6, 7, // front
        0, 4, 7,  0, 7, 3, // left
        1, 6, 5,  1, 2, 6, // right
        3, 7, 6,  3, 6, 2, // top
        0, 1, 5,  0, 5, 4, // bottom
    ];
    ModelResource {
        meshes: vec![MeshData {
            positions,
            normals: Vec::default(),
            tex_coords: Vec::default(),
            indices,
        }],
    }
}

/// Solid 4x4 marker-color texture.
pub fn fallback_texture() -> TextureResource {
    let mut rgba8 = Vec::with_capacity(4 * 4 * 4);
    for _ in 0..16 {
        rgba8.extend_from_slice(&FALLBACK_COLOR_RGBA);
    }
    TextureResource {
        width: 4,
        height: 4,
        rgba8,
    }
}

/// Quarter second of 16-bit mono silence at 44.1kHz. The RIFF header is
/// assembled by hand so construction is infallible.
pub fn fallback_audio() -> AudioResource {
    const SAMPLE_RATE: u32 = 44100;
    const SAMPLE_COUNT: u32 = SAMPLE_RATE / 4;
    const DATA_LEN: u32 = SAMPLE_COUNT * 2;

    let mut bytes = Vec::with_capacity(44 + DATA_LEN as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + DATA_LEN).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes()); // fmt chunk size
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
    bytes.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    bytes.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes()); // byte rate
    bytes.extend_from_slice(&2u16.to_le_bytes()); // block align
    bytes.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&DATA_LEN.to_le_bytes());
    bytes.resize(44 + DATA_LEN as usize, 0);

    AudioResource {
        format: AudioFormat::Wav,
        sample_rate: Some(SAMPLE_RATE),
        channel_count: Some(1),
        bytes,
    }
}
