//! Smoothed per-vertex normals for every animation frame.
//!
//! Neither format stores normals. For each frame the triangles of a mesh are
//! expanded into per-corner instances, each gets its triangle's face normal,
//! and corners that sit on exactly the same raw position in different
//! triangles average their face normals when the angle between them is small
//! enough. The result is packed into 16 bits per position slot.
//!
//! Frames are independent of each other, so they can run in parallel.

use std::collections::HashMap;
use std::f32::consts::{FRAC_1_SQRT_2, PI};

use cgmath::{InnerSpace, Vector3, Zero};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::NormalOptions;
use crate::math::raw_position;
use crate::model::{AnimatedMesh, AnimationVertex, Model, Vertex};

/// cos 45°
pub const SMOOTHING_THRESHOLD: f32 = FRAC_1_SQRT_2;

const NORMAL_FIELD_STEPS: f32 = 64.0;
const NORMAL_FIELD_MAX: u16 = 63;
const NORMAL_FIELD_MASK: u16 = 0x3F;

/// One triangle corner of one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexInstance {
    /// Index into the mesh vertex buffer
    pub index: u32,
    /// Position slot the corner reads from
    pub slot: u16,
    /// Sum of the raw components; a coarse bucket, not a unique key
    pub hash: i32,
    pub raw: [i16; 3],
    pub position: Vector3<f32>,
    pub face_normal: Vector3<f32>,
    pub smoothed_normal: Vector3<f32>,
}

/// Borrowed triangle lists of a mesh.
#[derive(Debug, Clone, Copy)]
pub struct Topology<'a> {
    pub vertices: &'a [Vertex],
    pub regular_indices: &'a [u32],
    pub transparent_indices: &'a [u32],
}

impl<'a> Topology<'a> {
    pub fn of(mesh: &'a AnimatedMesh) -> Self {
        Self {
            vertices: &mesh.vertices,
            regular_indices: &mesh.regular_indices,
            transparent_indices: &mesh.transparent_indices,
        }
    }
}

/// Counters from a reconstruction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalStats {
    pub frames: usize,
    pub instances: usize,
    /// Instances whose smoothed normal had no length; their slot is untouched
    pub degenerate: usize,
}

impl NormalStats {
    fn merge(self, other: Self) -> Self {
        Self {
            frames: self.frames + other.frames,
            instances: self.instances + other.instances,
            degenerate: self.degenerate + other.degenerate,
        }
    }
}

/// Walk the transparent then the regular triangles and expand every corner.
///
/// A triangle with a corner outside the vertex buffer or the frame is skipped
/// whole so the remaining instances stay grouped in threes.
pub fn gather_instances(topology: &Topology<'_>, frame: &[AnimationVertex]) -> Vec<VertexInstance> {
    let mut instances =
        Vec::with_capacity(topology.regular_indices.len() + topology.transparent_indices.len());

    for indices in [topology.transparent_indices, topology.regular_indices] {
        for tri in indices.chunks_exact(3) {
            let corners: Option<Vec<VertexInstance>> = tri
                .iter()
                .map(|&index| {
                    let vertex = topology.vertices.get(index as usize)?;
                    let raw = frame.get(vertex.vertex_id as usize)?.position;
                    Some(VertexInstance {
                        index,
                        slot: vertex.vertex_id,
                        hash: raw.iter().map(|&c| c as i32).sum(),
                        raw,
                        position: raw_position(raw),
                        face_normal: Vector3::zero(),
                        smoothed_normal: Vector3::zero(),
                    })
                })
                .collect();

            if let Some(corners) = corners {
                instances.extend(corners);
            }
        }
    }

    instances
}

fn normalized_or_zero(v: Vector3<f32>) -> Vector3<f32> {
    let len2 = v.magnitude2();
    if len2 > f32::EPSILON {
        v / len2.sqrt()
    } else {
        Vector3::zero()
    }
}

/// Give every corner its triangle's normal, as face and initial smoothed normal.
///
/// Degenerate triangles get a zero normal.
pub fn compute_face_normals(instances: &mut [VertexInstance]) {
    for tri in instances.chunks_exact_mut(3) {
        let e1 = tri[1].position - tri[0].position;
        let e2 = tri[2].position - tri[0].position;
        let normal = normalized_or_zero(e1.cross(e2));
        for corner in tri.iter_mut() {
            corner.face_normal = normal;
            corner.smoothed_normal = normal;
        }
    }
}

/// Accumulate face normals between coincident corners of different triangles.
///
/// Corner `b` is only compared with corners at least three instances before
/// it, so neighbours one or two apart are never paired even when they fall
/// in adjacent triangles. Two corners match when their hashes and raw
/// positions are equal and the dot product of their face normals exceeds
/// `threshold`. Each one then adds the other's face normal to its smoothed
/// normal.
pub fn smooth_normals(instances: &mut [VertexInstance], threshold: f32) {
    let mut buckets: HashMap<i32, Vec<usize>> = HashMap::new();
    for (i, instance) in instances.iter().enumerate() {
        buckets.entry(instance.hash).or_default().push(i);
    }

    for members in buckets.values() {
        // members are in ascending instance order
        for (k, &a) in members.iter().enumerate() {
            for &b in &members[k + 1..] {
                if b < a + 3 || instances[a].raw != instances[b].raw {
                    continue;
                }

                let face_a = instances[a].face_normal;
                let face_b = instances[b].face_normal;
                if face_a.dot(face_b) <= threshold {
                    continue;
                }

                instances[a].smoothed_normal += face_b;
                instances[b].smoothed_normal += face_a;
            }
        }
    }
}

/// Pack a unit vector as two 6-bit spherical angles.
///
/// `theta = acos(z) / π` goes in the low byte and `phi = (atan2(y, x) + π) / 2π`
/// in the high byte, both scaled by 64 and clamped to 63.
pub fn pack_normal(n: Vector3<f32>) -> u16 {
    let theta = n.z.clamp(-1.0, 1.0).acos() / PI;
    let phi = (n.y.atan2(n.x) + PI) / (2.0 * PI);
    quantize(theta) | quantize(phi) << 8
}

fn quantize(v: f32) -> u16 {
    ((v * NORMAL_FIELD_STEPS) as u16).min(NORMAL_FIELD_MAX)
}

/// Unit vector at the centre of a packed normal's angle bucket.
pub fn unpack_normal(packed: u16) -> Vector3<f32> {
    let theta_bits = packed & NORMAL_FIELD_MASK;
    let phi_bits = (packed >> 8) & NORMAL_FIELD_MASK;

    let theta = (theta_bits as f32 + 0.5) / NORMAL_FIELD_STEPS * PI;
    let phi = (phi_bits as f32 + 0.5) / NORMAL_FIELD_STEPS * 2.0 * PI - PI;

    Vector3::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos())
}

/// Gather, face normals, smoothing and normalization for one frame.
///
/// Smoothed normals come back unit length, or zero for degenerate geometry.
pub fn smooth_frame(
    topology: &Topology<'_>,
    frame: &[AnimationVertex],
    threshold: f32,
) -> Vec<VertexInstance> {
    let mut instances = gather_instances(topology, frame);
    compute_face_normals(&mut instances);
    smooth_normals(&mut instances, threshold);
    for instance in instances.iter_mut() {
        instance.smoothed_normal = normalized_or_zero(instance.smoothed_normal);
    }
    instances
}

/// Reconstruct and write back the packed normals of one frame.
pub fn reconstruct_frame(
    topology: &Topology<'_>,
    frame: &mut [AnimationVertex],
    threshold: f32,
) -> NormalStats {
    let instances = smooth_frame(topology, frame, threshold);

    let mut stats = NormalStats {
        frames: 1,
        instances: instances.len(),
        degenerate: 0,
    };
    for instance in &instances {
        if instance.smoothed_normal.is_zero() {
            stats.degenerate += 1;
            continue;
        }
        frame[instance.slot as usize].normal = pack_normal(instance.smoothed_normal);
    }
    stats
}

/// Reconstruct every frame covered by one of the mesh's animations.
pub fn reconstruct_mesh_normals(mesh: &mut AnimatedMesh, options: &NormalOptions) -> NormalStats {
    let AnimatedMesh {
        vertices,
        regular_indices,
        transparent_indices,
        animations,
        frame_vertex_count,
        frame_count,
        animation_vertices,
        ..
    } = mesh;

    let slots = *frame_vertex_count as usize;
    if slots == 0 {
        return NormalStats::default();
    }

    let mut covered = vec![false; *frame_count as usize];
    for anim in animations.iter() {
        for frame in anim.frames() {
            if let Some(flag) = covered.get_mut(frame as usize) {
                *flag = true;
            }
        }
    }

    let topology = Topology {
        vertices,
        regular_indices,
        transparent_indices,
    };
    let threshold = options.smoothing_threshold;
    let work = |(frame, positions): (usize, &mut [AnimationVertex])| {
        if covered.get(frame).copied().unwrap_or(false) {
            reconstruct_frame(&topology, positions, threshold)
        } else {
            NormalStats::default()
        }
    };

    if options.parallel {
        animation_vertices
            .par_chunks_mut(slots)
            .enumerate()
            .map(work)
            .reduce(NormalStats::default, NormalStats::merge)
    } else {
        animation_vertices
            .chunks_mut(slots)
            .enumerate()
            .map(work)
            .fold(NormalStats::default(), NormalStats::merge)
    }
}

/// Reconstruct normals for every submodel, and the main body unless disabled.
pub fn reconstruct_normals(model: &mut Model, options: &NormalOptions) -> NormalStats {
    let mut stats = NormalStats::default();

    if options.include_main_body {
        stats = stats.merge(reconstruct_mesh_normals(&mut model.mesh, options));
    }
    for submodel in model.submodels.iter_mut() {
        stats = stats.merge(reconstruct_mesh_normals(&mut submodel.mesh, options));
    }

    debug!(
        "Reconstructed normals: {} frames, {} corners, {} degenerate",
        stats.frames, stats.instances, stats.degenerate
    );
    if stats.degenerate > 0 {
        warn!(
            "{} corners had no usable normal and kept their previous value",
            stats.degenerate
        );
    }
    stats
}
