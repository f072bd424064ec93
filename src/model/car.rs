//! CAR decoder: main body, up to three submodels and sound clips in one file.
//!
//! Layout:
//! ```text
//! 0x0000  CarHeader (0x66 bytes): section byte lengths
//! 0x0066  main body polygon records, 32 bytes each
//! 0x4866  vertex_count  (u16)
//! 0x4868  polygon_count (u16)
//! 0x486A  texel_count   (u16)
//! 0x486C  texture pixels, texel_count bytes (width 64)
//!         main body frames, frame_count × vertex_count × 6 bytes
//!         submodel blocks, only for submodels with animation data:
//!             +0x0000  polygon records
//!             +0x4800  vertex_count  (u16)
//!             +0x4802  polygon_count (u16)
//!             +0x4806  frames, sum of the two declared slot lengths
//!         sound clips, back to back
//! ```
//!
//! Nothing marks where a section ends. Each boundary is the running sum of
//! the sizes consumed so far, and the sum must land exactly on the end of
//! the buffer.

use tracing::{debug, trace};

use crate::binary::records::{CAR_SUBMODEL_COUNT, CAR_SUBMODEL_ANIMATION_SLOTS};
use crate::binary::{ByteReader, CarHeader, FixedRecord, PolygonRecord, VertexRecord};
use crate::error::{DecodeError, Result};
use crate::math::z_extent;

use super::geometry::{
    build_mesh, frames_in_bytes, to_animation_vertices, GroupMapping, MeshLayout, UvMapping,
};
use super::{AnimatedMesh, Animation, Model, Submodel, Texture};

const HEADER_OFFSET: usize = 0x0000;
const POLYGONS_OFFSET: usize = 0x0066;
const VERTEX_COUNT_OFFSET: usize = 0x4866;
const POLYGON_COUNT_OFFSET: usize = 0x4868;
const TEXEL_COUNT_OFFSET: usize = 0x486A;
const TEXTURE_OFFSET: usize = 0x486C;

// Offsets local to a submodel block
const SUBMODEL_POLYGONS_OFFSET: usize = 0x0000;
const SUBMODEL_VERTEX_COUNT_OFFSET: usize = 0x4800;
const SUBMODEL_POLYGON_COUNT_OFFSET: usize = 0x4802;
const SUBMODEL_FRAMES_OFFSET: usize = 0x4806;

pub const CAR_TEXTURE_WIDTH: u32 = 64;

/// Animations for the non-empty slots, packed back to back from frame 0.
///
/// Slots shorter than one frame are skipped and take no frames. Returns the
/// animations and the number of frames they cover.
fn slot_animations(slots: &[u16], vertex_count: u16) -> (Vec<Animation>, u32) {
    let mut animations = vec![];
    let mut next_frame = 0u32;
    for (id, &len) in slots.iter().enumerate() {
        let frame_count = frames_in_bytes(len as usize, vertex_count) as u32;
        if frame_count == 0 {
            continue;
        }
        animations.push(Animation {
            id: id as u32,
            first_frame: next_frame,
            frame_count,
        });
        next_frame += frame_count;
    }
    (animations, next_frame)
}

/// Base-pose z extent: the first frame, which for CAR models is the first
/// frame of the run animation.
fn first_frame_z(mesh: &mut AnimatedMesh) {
    let (z_min, z_max) = z_extent(mesh.frame(0)).unwrap_or((0.0, 0.0));
    mesh.z_min = z_min;
    mesh.z_max = z_max;
}

/// Submodel animations all carry the submodel index as their id.
fn decode_submodel(
    index: usize,
    block: ByteReader<'_>,
    slots: &[u16; CAR_SUBMODEL_ANIMATION_SLOTS],
    animation_bytes: usize,
    layout: &MeshLayout,
) -> Result<AnimatedMesh> {
    let vertex_count = block.u16_at(SUBMODEL_VERTEX_COUNT_OFFSET, "CAR submodel vertex count")?;
    let polygon_count =
        block.u16_at(SUBMODEL_POLYGON_COUNT_OFFSET, "CAR submodel polygon count")?;

    let frame_count = frames_in_bytes(animation_bytes, vertex_count);
    let polygons: Vec<PolygonRecord> = block.records(
        SUBMODEL_POLYGONS_OFFSET,
        polygon_count as usize,
        "CAR submodel polygons",
    )?;
    let frames = block.records(
        SUBMODEL_FRAMES_OFFSET,
        frame_count * vertex_count as usize,
        "CAR submodel frames",
    )?;

    let mut mesh = build_mesh(
        &polygons,
        vertex_count,
        frame_count as u32,
        to_animation_vertices(frames),
        layout,
    )?;
    mesh.animations = slot_animations(slots, vertex_count)
        .0
        .into_iter()
        .map(|animation| Animation {
            id: index as u32,
            ..animation
        })
        .collect();
    first_frame_z(&mut mesh);

    Ok(mesh)
}

/// Decode a CAR model.
///
/// The result always has three submodels and seven sound clips; submodels
/// without animation data are empty and zero-length clips are empty vectors.
pub fn decode_car(data: &[u8]) -> Result<Model> {
    let reader = ByteReader::new(data);

    let header: CarHeader = reader.record(HEADER_OFFSET, "CAR header")?;
    let vertex_count = reader.u16_at(VERTEX_COUNT_OFFSET, "CAR vertex count")?;
    let polygon_count = reader.u16_at(POLYGON_COUNT_OFFSET, "CAR polygon count")?;
    let texel_count = reader.u16_at(TEXEL_COUNT_OFFSET, "CAR texel count")? as usize;

    let texture = Texture {
        width: CAR_TEXTURE_WIDTH,
        height: texel_count as u32 / CAR_TEXTURE_WIDTH,
        pixels: reader
            .bytes(TEXTURE_OFFSET, texel_count, "CAR texture")?
            .to_vec(),
    };
    let layout = MeshLayout {
        uv: UvMapping::SubTexels {
            width: texture.width,
            height: texture.height,
        },
        groups: GroupMapping::ById,
    };

    // Main body
    let (animations, frame_count) = slot_animations(&header.animations, vertex_count);
    let frames_offset = TEXTURE_OFFSET + texel_count;
    let polygons: Vec<PolygonRecord> =
        reader.records(POLYGONS_OFFSET, polygon_count as usize, "CAR polygons")?;
    let frames = reader.records(
        frames_offset,
        frame_count as usize * vertex_count as usize,
        "CAR frames",
    )?;

    let mut mesh = build_mesh(
        &polygons,
        vertex_count,
        frame_count,
        to_animation_vertices(frames),
        &layout,
    )?;
    mesh.animations = animations;
    first_frame_z(&mut mesh);

    let mut offset =
        frames_offset + frame_count as usize * vertex_count as usize * VertexRecord::SIZE;
    trace!("CAR main body ends at {:#x}", offset);

    // Submodels
    let mut submodels = Vec::with_capacity(CAR_SUBMODEL_COUNT);
    for (i, slots) in header.submodel_animations.iter().enumerate() {
        let animation_bytes = header.submodel_animation_bytes(i);
        if animation_bytes == 0 {
            submodels.push(Submodel::default());
            continue;
        }

        let block = reader.window(offset, "CAR submodel block")?;
        let mesh = decode_submodel(i, block, slots, animation_bytes, &layout)?;
        trace!(
            "CAR submodel {} at {:#x}: {} frames",
            i,
            offset,
            mesh.frame_count
        );
        submodels.push(Submodel { mesh });

        offset += SUBMODEL_FRAMES_OFFSET + animation_bytes;
    }

    // Sounds
    let mut sounds = Vec::with_capacity(header.sounds.len());
    for &len in &header.sounds {
        let len = len as usize;
        sounds.push(reader.bytes(offset, len, "CAR sound")?.to_vec());
        offset += len;
    }

    if offset != data.len() {
        return Err(DecodeError::LengthMismatch {
            format: "CAR",
            expected: offset,
            actual: data.len(),
        });
    }

    debug!(
        "Decoded CAR model: {} vertices, {} polygons, {} frames, {} animated submodels, {} sound bytes",
        vertex_count,
        polygon_count,
        frame_count,
        submodels.iter().filter(|s| s.mesh.frame_count > 0).count(),
        sounds.iter().map(Vec::len).sum::<usize>()
    );

    Ok(Model {
        texture,
        mesh,
        submodels,
        sounds,
    })
}
