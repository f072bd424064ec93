//! In-memory animated mesh decoded from the O3 and CAR formats.
//!
//! Vertices do not carry positions. Each [`Vertex`] names a position slot
//! (`vertex_id`) which is looked up in the current frame of the mesh's flat
//! [`AnimationVertex`] array: `animation_vertices[frame * frame_vertex_count + vertex_id]`.

pub mod car;
pub mod geometry;
pub mod o3;

use std::path::Path;

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use cgmath::Vector3;

use crate::math::{scaled_position, BoundingBox};

pub use car::decode_car;
pub use o3::{concat_o3_animations, decode_o3, decode_o3_animated, CombinedAnimations};

/// Group mask that selects every body part.
pub const ALL_GROUPS_MASK: u8 = 255;

/// Palette-indexed texture copied verbatim from the asset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// One output corner. Corners are never shared between polygons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Normalized against the texture size
    pub tex_coord: [f32; 2],
    /// Position slot inside each animation frame
    pub vertex_id: u16,
    pub alpha_tested: bool,
    pub groups_mask: u8,
}

/// One animated position for one frame.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct AnimationVertex {
    /// Raw fixed-point units, see [`crate::math::COORDS_SCALE`]
    pub position: [i16; 3],
    /// Spherically packed normal, zero until reconstruction runs
    pub normal: u16,
}

impl AnimationVertex {
    pub fn new(position: [i16; 3]) -> Self {
        Self {
            position,
            normal: 0,
        }
    }
}

/// Contiguous range of frames inside a mesh's animation array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Animation {
    pub id: u32,
    pub first_frame: u32,
    pub frame_count: u32,
}

impl Animation {
    /// Absolute frame for an unwrapped animation tick.
    ///
    /// Looping animations wrap; one-shot animations hold their last frame.
    pub fn frame_at(&self, tick: u32, looping: bool) -> u32 {
        if self.frame_count == 0 {
            return self.first_frame;
        }
        let local = if looping {
            tick % self.frame_count
        } else {
            tick.min(self.frame_count - 1)
        };
        self.first_frame + local
    }

    pub fn frames(&self) -> std::ops::Range<u32> {
        self.first_frame..self.first_frame + self.frame_count
    }
}

/// Geometry plus per-frame positions. Shared by the main body and submodels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimatedMesh {
    pub vertices: Vec<Vertex>,
    pub regular_indices: Vec<u32>,
    pub transparent_indices: Vec<u32>,
    pub animations: Vec<Animation>,
    /// Position slots per frame
    pub frame_vertex_count: u16,
    pub frame_count: u32,
    /// `frame_count * frame_vertex_count` entries
    pub animation_vertices: Vec<AnimationVertex>,
    /// One per frame
    pub bounding_boxes: Vec<BoundingBox>,
    pub z_min: f32,
    pub z_max: f32,
}

impl AnimatedMesh {
    /// Positions of one frame.
    pub fn frame(&self, frame: u32) -> &[AnimationVertex] {
        let count = self.frame_vertex_count as usize;
        let start = frame as usize * count;
        self.animation_vertices
            .get(start..start + count)
            .unwrap_or(&[])
    }

    /// Model-space position of a slot in a frame.
    pub fn position(&self, frame: u32, vertex_id: u16) -> Option<Vector3<f32>> {
        self.frame(frame)
            .get(vertex_id as usize)
            .map(|v| scaled_position(v.position))
    }

    pub fn triangle_count(&self) -> usize {
        (self.regular_indices.len() + self.transparent_indices.len()) / 3
    }

    /// Verify the structural invariants every decoded mesh must hold.
    ///
    /// Returns one message per violation; an empty list means the mesh is
    /// consistent.
    pub fn check_invariants(&self) -> Vec<String> {
        let mut problems = vec![];

        for (i, v) in self.vertices.iter().enumerate() {
            if v.vertex_id >= self.frame_vertex_count {
                problems.push(format!(
                    "vertex {} references slot {} of {}",
                    i, v.vertex_id, self.frame_vertex_count
                ));
            }
        }

        for (name, indices) in [
            ("regular", &self.regular_indices),
            ("transparent", &self.transparent_indices),
        ] {
            if indices.len() % 3 != 0 {
                problems.push(format!(
                    "{} index count {} is not a multiple of 3",
                    name,
                    indices.len()
                ));
            }
            if let Some(&bad) = indices.iter().find(|&&i| i as usize >= self.vertices.len()) {
                problems.push(format!(
                    "{} index {} exceeds vertex count {}",
                    name,
                    bad,
                    self.vertices.len()
                ));
            }
        }

        let expected_len = self.frame_count as usize * self.frame_vertex_count as usize;
        if self.animation_vertices.len() != expected_len {
            problems.push(format!(
                "animation vertex count {} != {} frames x {} slots",
                self.animation_vertices.len(),
                self.frame_count,
                self.frame_vertex_count
            ));
        }

        if self.bounding_boxes.len() != self.frame_count as usize {
            problems.push(format!(
                "{} bounding boxes for {} frames",
                self.bounding_boxes.len(),
                self.frame_count
            ));
        }

        let mut sorted: Vec<&Animation> = self.animations.iter().collect();
        sorted.sort_by_key(|a| a.first_frame);
        let mut next_free = 0;
        for anim in sorted {
            if anim.first_frame < next_free {
                problems.push(format!("animation {} overlaps the previous one", anim.id));
            }
            if anim.first_frame + anim.frame_count > self.frame_count {
                problems.push(format!(
                    "animation {} ends at frame {} past frame count {}",
                    anim.id,
                    anim.first_frame + anim.frame_count,
                    self.frame_count
                ));
            }
            next_free = next_free.max(anim.first_frame + anim.frame_count);
        }

        problems
    }
}

/// Independently animated attachment of a CAR model (turret, limb...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Submodel {
    pub mesh: AnimatedMesh,
}

/// One decoded asset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub texture: Texture,
    pub mesh: AnimatedMesh,
    /// Always three for CAR, empty for O3
    pub submodels: Vec<Submodel>,
    /// Always seven for CAR, empty for O3
    pub sounds: Vec<Vec<u8>>,
}

impl Model {
    pub fn frame_count(&self) -> u32 {
        self.mesh.frame_count
    }

    /// The main body followed by every submodel mesh.
    pub fn meshes(&self) -> impl Iterator<Item = &AnimatedMesh> {
        std::iter::once(&self.mesh).chain(self.submodels.iter().map(|s| &s.mesh))
    }
}

// ============================================================================
// File loading
// ============================================================================

/// Load an O3 model with no animation file; the base pose is its only frame.
pub fn load_o3(path: &Path) -> Result<Model> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    decode_o3(&data, None).with_context(|| format!("Failed to decode O3 model {:?}", path))
}

/// Load an O3 model together with its per-animation files, in order.
pub fn load_o3_animated<P: AsRef<Path>>(path: &Path, animation_paths: &[P]) -> Result<Model> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;

    let mut animations = Vec::with_capacity(animation_paths.len());
    for anim_path in animation_paths {
        let anim_path = anim_path.as_ref();
        animations.push(
            std::fs::read(anim_path)
                .with_context(|| format!("Failed to read animation {:?}", anim_path))?,
        );
    }
    let slices: Vec<&[u8]> = animations.iter().map(Vec::as_slice).collect();

    decode_o3_animated(&data, &slices)
        .with_context(|| format!("Failed to decode O3 model {:?}", path))
}

/// Load a CAR model.
pub fn load_car(path: &Path) -> Result<Model> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    decode_car(&data).with_context(|| format!("Failed to decode CAR model {:?}", path))
}
