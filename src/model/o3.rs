//! O3 decoder: single-mesh model with optional external animation streams.
//!
//! Model file layout:
//! ```text
//! 0x0000  polygon records, 32 bytes each (polygon_count of them)
//! 0x3200  base pose, 6 bytes per vertex (3 × i16)
//! 0x4800  vertex_count   (u16)
//! 0x4802  polygon_count  (u16)
//! 0x4804  texture_height (u16, low 10 bits; high bits are a V shift)
//! 0x4806  texture pixels, 64 × height bytes, to end of file
//! ```
//!
//! Animation file layout:
//! ```text
//! 0x0000  vertex_count (u16), or frame count in a combined stream
//! 0x0002  frames × vertex_count × 6 bytes of positions
//! ```

use tracing::{debug, warn};

use crate::binary::{ByteReader, FixedRecord, PolygonRecord, VertexRecord};
use crate::error::{DecodeError, Result};
use crate::math::z_extent;

use super::geometry::{
    build_mesh, frames_in_bytes, to_animation_vertices, GroupMapping, MeshLayout, UvMapping,
};
use super::{Animation, Model, Texture};

const POLYGONS_OFFSET: usize = 0x0000;
const BASE_POSE_OFFSET: usize = 0x3200;
const VERTEX_COUNT_OFFSET: usize = 0x4800;
const POLYGON_COUNT_OFFSET: usize = 0x4802;
const TEXTURE_HEIGHT_OFFSET: usize = 0x4804;
const TEXTURE_OFFSET: usize = 0x4806;

const ANIMATION_HEADER_SIZE: usize = 2;

pub const O3_TEXTURE_WIDTH: u32 = 64;
const TEXTURE_HEIGHT_MASK: u16 = 1023;

/// Several per-animation streams joined into one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedAnimations {
    /// Frame-count header followed by every whole frame, in input order
    pub data: Vec<u8>,
    /// One per input stream, with sequential frame ranges
    pub animations: Vec<Animation>,
    pub vertex_count: u16,
    pub frame_count: u32,
}

/// Join per-animation streams. Every stream must declare the same vertex count.
///
/// Bytes that do not form a whole frame at the end of a stream are dropped so
/// they cannot shift the frames of the next stream.
pub fn concat_o3_animations(buffers: &[&[u8]]) -> Result<CombinedAnimations> {
    let mut vertex_count = None;
    let mut animations = Vec::with_capacity(buffers.len());
    let mut frame_data = Vec::new();
    let mut frame_count = 0u32;

    for (i, buffer) in buffers.iter().enumerate() {
        let reader = ByteReader::new(buffer);
        let declared = reader.u16_at(0, "O3 animation header")?;
        let expected = *vertex_count.get_or_insert(declared);
        if declared != expected {
            return Err(DecodeError::VertexCountMismatch {
                index: i,
                expected,
                actual: declared,
            });
        }

        let payload = buffer.len() - ANIMATION_HEADER_SIZE;
        let frames = frames_in_bytes(payload, declared);
        let whole = frames * declared as usize * VertexRecord::SIZE;
        if whole != payload {
            warn!(
                "O3 animation {} has {} trailing bytes after {} frames",
                i,
                payload - whole,
                frames
            );
        }
        frame_data.extend_from_slice(reader.bytes(ANIMATION_HEADER_SIZE, whole, "O3 animation frames")?);

        animations.push(Animation {
            id: i as u32,
            first_frame: frame_count,
            frame_count: frames as u32,
        });
        frame_count += frames as u32;
    }

    let header = u16::try_from(frame_count).unwrap_or(u16::MAX);
    let mut data = Vec::with_capacity(ANIMATION_HEADER_SIZE + frame_data.len());
    data.extend_from_slice(&header.to_le_bytes());
    data.extend_from_slice(&frame_data);

    Ok(CombinedAnimations {
        data,
        animations,
        vertex_count: vertex_count.unwrap_or(0),
        frame_count,
    })
}

/// Decode an O3 model, optionally animated by one animation stream.
///
/// Without a stream the base pose is the only frame. With one, every whole
/// frame in it becomes a frame of a single animation.
pub fn decode_o3(model: &[u8], animation: Option<&[u8]>) -> Result<Model> {
    let reader = ByteReader::new(model);

    let vertex_count = reader.u16_at(VERTEX_COUNT_OFFSET, "O3 vertex count")?;
    let polygon_count = reader.u16_at(POLYGON_COUNT_OFFSET, "O3 polygon count")?;
    let height_field = reader.u16_at(TEXTURE_HEIGHT_OFFSET, "O3 texture height")?;

    let v_shift = (height_field & !TEXTURE_HEIGHT_MASK) as u32;
    let height = (height_field & TEXTURE_HEIGHT_MASK) as u32;

    let texture_len = (O3_TEXTURE_WIDTH * height) as usize;
    let pixels = reader
        .bytes(TEXTURE_OFFSET, texture_len, "O3 texture")?
        .to_vec();
    if model.len() != TEXTURE_OFFSET + texture_len {
        return Err(DecodeError::LengthMismatch {
            format: "O3",
            expected: TEXTURE_OFFSET + texture_len,
            actual: model.len(),
        });
    }

    let polygons: Vec<PolygonRecord> =
        reader.records(POLYGONS_OFFSET, polygon_count as usize, "O3 polygons")?;
    let base_pose = to_animation_vertices(reader.records(
        BASE_POSE_OFFSET,
        vertex_count as usize,
        "O3 base pose",
    )?);

    // z extent always comes from the base pose, even when animated
    let (z_min, z_max) = z_extent(&base_pose).unwrap_or((0.0, 0.0));

    let (frame_count, frames) = match animation {
        None => (1, base_pose),
        Some(animation) => {
            let anim_reader = ByteReader::new(animation);
            anim_reader.u16_at(0, "O3 animation header")?;
            let frame_count = frames_in_bytes(animation.len() - ANIMATION_HEADER_SIZE, vertex_count);
            let records = anim_reader.records(
                ANIMATION_HEADER_SIZE,
                frame_count * vertex_count as usize,
                "O3 animation frames",
            )?;
            (frame_count as u32, to_animation_vertices(records))
        }
    };

    let layout = MeshLayout {
        uv: UvMapping::Texels {
            width: O3_TEXTURE_WIDTH,
            height,
            v_shift,
        },
        groups: GroupMapping::AllGroups,
    };
    let mut mesh = build_mesh(&polygons, vertex_count, frame_count, frames, &layout)?;
    mesh.z_min = z_min;
    mesh.z_max = z_max;
    mesh.animations = vec![Animation {
        id: 0,
        first_frame: 0,
        frame_count,
    }];

    debug!(
        "Decoded O3 model: {} vertices, {} polygons, {} frames, texture 64x{}",
        vertex_count, polygon_count, frame_count, height
    );

    Ok(Model {
        texture: Texture {
            width: O3_TEXTURE_WIDTH,
            height,
            pixels,
        },
        mesh,
        submodels: vec![],
        sounds: vec![],
    })
}

/// Decode an O3 model with one animation per stream.
///
/// Streams are concatenated in order, so animation `i` starts at the sum of
/// the frame counts of animations `0..i`. With no streams this is the same as
/// [`decode_o3`] without animation.
pub fn decode_o3_animated(model: &[u8], animations: &[&[u8]]) -> Result<Model> {
    if animations.is_empty() {
        return decode_o3(model, None);
    }

    let combined = concat_o3_animations(animations)?;

    let model_vertex_count = ByteReader::new(model).u16_at(VERTEX_COUNT_OFFSET, "O3 vertex count")?;
    if combined.vertex_count != model_vertex_count {
        return Err(DecodeError::VertexCountMismatch {
            index: 0,
            expected: model_vertex_count,
            actual: combined.vertex_count,
        });
    }

    let mut decoded = decode_o3(model, Some(combined.data.as_slice()))?;
    debug_assert_eq!(decoded.mesh.frame_count, combined.frame_count);
    decoded.mesh.animations = combined.animations;

    Ok(decoded)
}
