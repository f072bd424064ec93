use cgmath::Vector3;
use serde::Serialize;

use crate::model::AnimationVertex;

/// Raw position units per model-space unit.
pub const COORDS_SCALE: f32 = 1.0 / 2048.0;

/// Convert a raw fixed-point position to model space.
pub fn scaled_position(raw: [i16; 3]) -> Vector3<f32> {
    raw_position(raw) * COORDS_SCALE
}

/// Raw fixed-point position as floats, unscaled.
pub fn raw_position(raw: [i16; 3]) -> Vector3<f32> {
    Vector3::new(raw[0] as f32, raw[1] as f32, raw[2] as f32)
}

/// Axis-aligned box over one frame's vertices, in model-space units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl BoundingBox {
    /// Inverted box that any point extends.
    pub fn empty() -> Self {
        Self {
            min: Vector3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Vector3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    /// True while no point has been added.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn extend(&mut self, p: Vector3<f32>) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    pub fn contains(&self, p: Vector3<f32>) -> bool {
        p.x >= self.min.x
            && p.y >= self.min.y
            && p.z >= self.min.z
            && p.x <= self.max.x
            && p.y <= self.max.y
            && p.z <= self.max.z
    }
}

/// Compute the box of one frame of raw positions.
///
/// An empty frame yields [`BoundingBox::empty`].
pub fn frame_bounding_box(frame: &[AnimationVertex]) -> BoundingBox {
    let mut bbox = BoundingBox::empty();
    for v in frame {
        bbox.extend(scaled_position(v.position));
    }
    bbox
}

/// Vertical extent `(z_min, z_max)` of one frame, in model-space units.
///
/// Returns `None` for an empty frame.
pub fn z_extent(frame: &[AnimationVertex]) -> Option<(f32, f32)> {
    frame.iter().fold(None, |acc, v| {
        let z = v.position[2] as f32 * COORDS_SCALE;
        Some(match acc {
            None => (z, z),
            Some((lo, hi)) => (lo.min(z), hi.max(z)),
        })
    })
}
