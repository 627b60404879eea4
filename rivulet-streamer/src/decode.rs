use crate::error::{StreamError, StreamResult};
use rivulet_base::{
    AssetKind, AssetResource, AudioFormat, AudioResource, CanonicalAssetPath, MeshData,
    ModelResource, TextureResource,
};
use std::sync::Arc;

//
// Byte-to-resource decoding. Decode failures are deterministic (corrupt
// bytes stay corrupt), so the streamer treats them as immediate terminal
// failures with no retry. Nothing in here panics on malformed input.
//

pub fn decode_asset(
    kind: AssetKind,
    path: &CanonicalAssetPath,
    bytes: &[u8],
) -> StreamResult<AssetResource> {
    match kind {
        AssetKind::Model => Ok(AssetResource::Model(Arc::new(decode_model(bytes)?))),
        AssetKind::Texture => Ok(AssetResource::Texture(Arc::new(decode_texture(bytes)?))),
        AssetKind::Audio => Ok(AssetResource::Audio(Arc::new(decode_audio(path, bytes)?))),
        AssetKind::Unknown => Err(StreamError::DecodeError(format!(
            "cannot decode {}: unknown asset kind",
            path
        ))),
    }
}

fn decode_model(bytes: &[u8]) -> StreamResult<ModelResource> {
    let (document, buffers, _images) = gltf::import_slice(bytes)
        .map_err(|e| StreamError::DecodeError(format!("glTF parse failed: {}", e)))?;

    let mut meshes = Vec::default();
    for mesh in document.meshes() {
        for primitive in mesh.primitives() {
            let reader = primitive
                .reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

            let mut mesh_data = MeshData::default();
            if let Some(positions) = reader.read_positions() {
                mesh_data.positions = positions.collect();
            }
            if let Some(normals) = reader.read_normals() {
                mesh_data.normals = normals.collect();
            }
            if let Some(tex_coords) = reader.read_tex_coords(0) {
                mesh_data.tex_coords = tex_coords.into_f32().collect();
            }
            if let Some(indices) = reader.read_indices() {
                mesh_data.indices = indices.into_u32().collect();
            }
            meshes.push(mesh_data);
        }
    }

    Ok(ModelResource { meshes })
}

fn decode_texture(bytes: &[u8]) -> StreamResult<TextureResource> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| StreamError::DecodeError(format!("image decode failed: {}", e)))?;
    let rgba = decoded.to_rgba8();
    Ok(TextureResource {
        width: rgba.width(),
        height: rgba.height(),
        rgba8: rgba.into_raw(),
    })
}

fn decode_audio(
    path: &CanonicalAssetPath,
    bytes: &[u8],
) -> StreamResult<AudioResource> {
    let extension = path.extension().unwrap_or_default();
    match extension.as_str() {
        "wav" => {
            let reader = hound::WavReader::new(std::io::Cursor::new(bytes))
                .map_err(|e| StreamError::DecodeError(format!("WAV decode failed: {}", e)))?;
            let spec = reader.spec();
            Ok(AudioResource {
                format: AudioFormat::Wav,
                sample_rate: Some(spec.sample_rate),
                channel_count: Some(spec.channels),
                bytes: bytes.to_vec(),
            })
        }
        "ogg" => {
            // Compressed containers are validated and handed to the audio
            // backend as-is
            if bytes.len() < 4 || &bytes[0..4] != b"OggS" {
                return Err(StreamError::DecodeError(
                    "not an Ogg container".to_string(),
                ));
            }
            Ok(wrapped_audio(AudioFormat::Ogg, bytes))
        }
        "mp3" => {
            let id3 = bytes.len() >= 3 && &bytes[0..3] == b"ID3";
            let frame_sync = bytes.len() >= 2 && bytes[0] == 0xFF && (bytes[1] & 0xE0) == 0xE0;
            if !id3 && !frame_sync {
                return Err(StreamError::DecodeError(
                    "not an MP3 stream".to_string(),
                ));
            }
            Ok(wrapped_audio(AudioFormat::Mp3, bytes))
        }
        "m4a" => {
            if bytes.len() < 8 || &bytes[4..8] != b"ftyp" {
                return Err(StreamError::DecodeError(
                    "not an MPEG-4 container".to_string(),
                ));
            }
            Ok(wrapped_audio(AudioFormat::M4a, bytes))
        }
        other => Err(StreamError::DecodeError(format!(
            "unsupported audio container {:?}",
            other
        ))),
    }
}

fn wrapped_audio(
    format: AudioFormat,
    bytes: &[u8],
) -> AudioResource {
    AudioResource {
        format,
        sample_rate: None,
        channel_count: None,
        bytes: bytes.to_vec(),
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    fn path(s: &str) -> CanonicalAssetPath {
        CanonicalAssetPath::normalize(s)
    }

    pub(crate) fn png_bytes() -> Vec<u8> {
        let mut bytes = Vec::default();
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 255]));
        image::DynamicImage::ImageRgba8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageOutputFormat::Png,
            )
            .unwrap();
        bytes
    }

    pub(crate) fn wav_bytes() -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..64 {
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    pub(crate) fn glb_bytes() -> Vec<u8> {
        // Minimal valid glTF 2.0 binary: header plus a single JSON chunk
        let json = br#"{"asset":{"version":"2.0"}}"#;
        let mut chunk = json.to_vec();
        while chunk.len() % 4 != 0 {
            chunk.push(b' ');
        }

        let mut bytes = Vec::default();
        bytes.extend_from_slice(b"glTF");
        bytes.extend_from_slice(&2u32.to_le_bytes());
        let total_len = 12 + 8 + chunk.len();
        bytes.extend_from_slice(&(total_len as u32).to_le_bytes());
        bytes.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
        bytes.extend_from_slice(b"JSON");
        bytes.extend_from_slice(&chunk);
        bytes
    }

    #[test]
    fn decodes_png_texture() {
        let resource = decode_asset(AssetKind::Texture, &path("t.png"), &png_bytes()).unwrap();
        let texture = resource.as_texture().unwrap();
        assert_eq!(texture.width, 2);
        assert_eq!(texture.height, 2);
        assert_eq!(texture.rgba8.len(), 16);
    }

    #[test]
    fn decodes_wav_audio() {
        let resource = decode_asset(AssetKind::Audio, &path("a.wav"), &wav_bytes()).unwrap();
        let audio = resource.as_audio().unwrap();
        assert_eq!(audio.format, AudioFormat::Wav);
        assert_eq!(audio.sample_rate, Some(44100));
        assert_eq!(audio.channel_count, Some(1));
    }

    #[test]
    fn decodes_minimal_glb_model() {
        let resource = decode_asset(AssetKind::Model, &path("m.glb"), &glb_bytes()).unwrap();
        let model = resource.as_model().unwrap();
        assert!(model.meshes.is_empty());
    }

    #[test]
    fn wraps_ogg_container() {
        let mut bytes = b"OggS".to_vec();
        bytes.extend_from_slice(&[0u8; 32]);
        let resource = decode_asset(AssetKind::Audio, &path("a.ogg"), &bytes).unwrap();
        assert_eq!(resource.as_audio().unwrap().format, AudioFormat::Ogg);
    }

    #[test]
    fn corrupt_bytes_error_instead_of_panicking() {
        let garbage = b"definitely not an asset";
        assert!(decode_asset(AssetKind::Texture, &path("t.png"), garbage).is_err());
        assert!(decode_asset(AssetKind::Model, &path("m.glb"), garbage).is_err());
        assert!(decode_asset(AssetKind::Audio, &path("a.wav"), garbage).is_err());
        assert!(decode_asset(AssetKind::Audio, &path("a.ogg"), garbage).is_err());
    }

    #[test]
    fn unknown_kind_is_a_decode_error() {
        let result = decode_asset(AssetKind::Unknown, &path("mystery.bin"), b"bytes");
        assert!(matches!(result, Err(StreamError::DecodeError(_))));
    }
}
