//! Polygon triangulation shared by the O3 and CAR decoders.
//!
//! Every polygon record becomes 3 or 4 fresh output vertices and 3/6 indices
//! (doubled when two-sided) appended to either the regular or the transparent
//! index list. The front face winds 2,1,0 (+ 0,3,2 for quads); the back face of
//! a two-sided polygon winds 0,1,2 (+ 2,3,0) and follows the front block.

use crate::binary::records::{
    FixedRecord, PolygonRecord, VertexRecord, POLYGON_FLAG_ALPHA_TESTED, POLYGON_FLAG_TRANSLUCENT,
    POLYGON_FLAG_TWO_SIDED,
};
use crate::error::{DecodeError, Result};
use crate::math::frame_bounding_box;

use super::{AnimatedMesh, AnimationVertex, Vertex, ALL_GROUPS_MASK};

/// Group id 0 collides with "no mask", so it gets its own otherwise unused bit.
pub const GROUP_ZERO_MASK: u8 = 64;

const FRONT_TRIANGLE: [u32; 3] = [2, 1, 0];
const FRONT_QUAD_TAIL: [u32; 3] = [0, 3, 2];
const BACK_TRIANGLE: [u32; 3] = [0, 1, 2];
const BACK_QUAD_TAIL: [u32; 3] = [2, 3, 0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Triangle,
    Quad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Opaque,
    AlphaTested,
    /// Always alpha-tested as well
    Translucent,
}

/// Flags of a polygon record, decoded once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolygonClass {
    pub shape: Shape,
    pub surface: Surface,
    pub two_sided: bool,
}

impl PolygonClass {
    pub fn classify(record: &PolygonRecord, vertex_count: u16) -> Self {
        let shape = if record.vertex_indices[3] >= vertex_count {
            Shape::Triangle
        } else {
            Shape::Quad
        };
        let surface = if record.flags & POLYGON_FLAG_TRANSLUCENT != 0 {
            Surface::Translucent
        } else if record.flags & POLYGON_FLAG_ALPHA_TESTED != 0 {
            Surface::AlphaTested
        } else {
            Surface::Opaque
        };
        Self {
            shape,
            surface,
            two_sided: record.flags & POLYGON_FLAG_TWO_SIDED != 0,
        }
    }

    pub fn corner_count(&self) -> usize {
        match self.shape {
            Shape::Triangle => 3,
            Shape::Quad => 4,
        }
    }

    pub fn index_count(&self) -> usize {
        let one_side = match self.shape {
            Shape::Triangle => 3,
            Shape::Quad => 6,
        };
        if self.two_sided {
            one_side * 2
        } else {
            one_side
        }
    }

    pub fn alpha_tested(&self) -> bool {
        self.surface != Surface::Opaque
    }

    pub fn transparent(&self) -> bool {
        self.surface == Surface::Translucent
    }
}

/// How raw polygon UVs map into normalized texture space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UvMapping {
    /// O3: whole texels, plus a per-model V shift from the texture height field
    Texels { width: u32, height: u32, v_shift: u32 },
    /// CAR: 1/256 texel units, polygon V offset in quarter texels
    SubTexels { width: u32, height: u32 },
}

impl UvMapping {
    fn map(&self, uv: [u16; 2], v_offset: u16) -> [f32; 2] {
        match *self {
            UvMapping::Texels {
                width,
                height,
                v_shift,
            } => [
                uv[0] as f32 / width.max(1) as f32,
                (uv[1] as u32 + v_offset as u32 + v_shift) as f32 / height.max(1) as f32,
            ],
            UvMapping::SubTexels { width, height } => [
                uv[0] as f32 / (width.max(1) << 8) as f32,
                (uv[1] as u32 + 4 * v_offset as u32) as f32 / (height.max(1) << 8) as f32,
            ],
        }
    }
}

/// How polygon group ids become vertex group masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupMapping {
    /// Every vertex belongs to every group
    AllGroups,
    /// Mask is the group id, with id 0 remapped to [`GROUP_ZERO_MASK`]
    ById,
}

impl GroupMapping {
    pub fn mask(&self, group_id: u8) -> u8 {
        match self {
            GroupMapping::AllGroups => ALL_GROUPS_MASK,
            GroupMapping::ById if group_id == 0 => GROUP_ZERO_MASK,
            GroupMapping::ById => group_id,
        }
    }
}

/// Format-specific parameters of the assembler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshLayout {
    pub uv: UvMapping,
    pub groups: GroupMapping,
}

/// Append one polygon to the mesh's vertex and index buffers.
///
/// `vertex_count` is the number of position slots per frame; it decides
/// triangle vs quad and bounds every used corner index.
pub fn assemble_polygon(
    mesh: &mut AnimatedMesh,
    polygon: usize,
    record: &PolygonRecord,
    vertex_count: u16,
    layout: &MeshLayout,
) -> Result<PolygonClass> {
    let class = PolygonClass::classify(record, vertex_count);
    let corners = class.corner_count();

    for &index in &record.vertex_indices[..corners] {
        if index >= vertex_count {
            return Err(DecodeError::VertexIndexOutOfRange {
                polygon,
                index,
                vertex_count,
            });
        }
    }

    let first = mesh.vertices.len() as u32;
    let groups_mask = layout.groups.mask(record.group_id);
    for j in 0..corners {
        mesh.vertices.push(Vertex {
            tex_coord: layout.uv.map(record.uv[j], record.v_offset),
            vertex_id: record.vertex_indices[j],
            alpha_tested: class.alpha_tested(),
            groups_mask,
        });
    }

    let dst = if class.transparent() {
        &mut mesh.transparent_indices
    } else {
        &mut mesh.regular_indices
    };

    let mut emit = |tri: &[u32; 3]| dst.extend(tri.iter().map(|c| first + c));
    emit(&FRONT_TRIANGLE);
    if class.shape == Shape::Quad {
        emit(&FRONT_QUAD_TAIL);
    }
    if class.two_sided {
        emit(&BACK_TRIANGLE);
        if class.shape == Shape::Quad {
            emit(&BACK_QUAD_TAIL);
        }
    }

    Ok(class)
}

/// Whole frames contained in `byte_len` bytes of positions.
///
/// A mesh with no vertices has no frames.
pub fn frames_in_bytes(byte_len: usize, vertex_count: u16) -> usize {
    let stride = vertex_count as usize * VertexRecord::SIZE;
    if stride == 0 {
        0
    } else {
        byte_len / stride
    }
}

pub fn to_animation_vertices(records: Vec<VertexRecord>) -> Vec<AnimationVertex> {
    records
        .into_iter()
        .map(|r| AnimationVertex::new(r.xyz))
        .collect()
}

/// Build one mesh body from its polygon table and per-frame positions.
///
/// `frames` holds `frame_count * vertex_count` positions. Animations and
/// z extents are left to the caller, which knows the format's frame layout.
pub fn build_mesh(
    polygons: &[PolygonRecord],
    vertex_count: u16,
    frame_count: u32,
    frames: Vec<AnimationVertex>,
    layout: &MeshLayout,
) -> Result<AnimatedMesh> {
    debug_assert_eq!(frames.len(), frame_count as usize * vertex_count as usize);

    let mut mesh = AnimatedMesh {
        frame_vertex_count: vertex_count,
        frame_count,
        animation_vertices: frames,
        ..Default::default()
    };

    for (p, record) in polygons.iter().enumerate() {
        assemble_polygon(&mut mesh, p, record, vertex_count, layout)?;
    }

    mesh.bounding_boxes = if vertex_count == 0 {
        vec![frame_bounding_box(&[]); frame_count as usize]
    } else {
        mesh.animation_vertices
            .chunks(vertex_count as usize)
            .map(frame_bounding_box)
            .collect()
    };

    Ok(mesh)
}
