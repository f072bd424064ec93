use serde::Serialize;

use crate::model::{AnimatedMesh, Model};

/// Summary statistics for one mesh body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshSummary {
    /// Output corners, never shared between polygons
    pub vertex_count: u32,
    /// Position slots per frame
    pub position_count: u16,
    pub triangle_count: u32,
    pub transparent_triangle_count: u32,
    pub frame_count: u32,
    pub animation_count: u32,
    pub z_min: f32,
    pub z_max: f32,
}

impl MeshSummary {
    pub fn from_mesh(mesh: &AnimatedMesh) -> Self {
        Self {
            vertex_count: mesh.vertices.len() as u32,
            position_count: mesh.frame_vertex_count,
            triangle_count: mesh.triangle_count() as u32,
            transparent_triangle_count: (mesh.transparent_indices.len() / 3) as u32,
            frame_count: mesh.frame_count,
            animation_count: mesh.animations.len() as u32,
            z_min: mesh.z_min,
            z_max: mesh.z_max,
        }
    }
}

/// Summary of a decoded model, usable for both O3 and CAR.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub texture_width: u32,
    pub texture_height: u32,
    pub main: MeshSummary,
    pub submodels: Vec<MeshSummary>,
    /// Byte length of each sound clip
    pub sound_sizes: Vec<usize>,
    /// Warnings about potential issues (e.g. frames no animation can reach).
    pub warnings: Vec<String>,
}

/// Frames that no animation range covers.
fn uncovered_frames(mesh: &AnimatedMesh) -> usize {
    let mut covered = vec![false; mesh.frame_count as usize];
    for anim in &mesh.animations {
        for frame in anim.frames() {
            if let Some(flag) = covered.get_mut(frame as usize) {
                *flag = true;
            }
        }
    }
    covered.iter().filter(|c| !**c).count()
}

fn mesh_warnings(name: &str, mesh: &AnimatedMesh, warnings: &mut Vec<String>) {
    for problem in mesh.check_invariants() {
        warnings.push(format!("{}: {}", name, problem));
    }

    if mesh.frame_count > 0 && mesh.animations.is_empty() {
        warnings.push(format!(
            "{} has {} frames but no animations",
            name, mesh.frame_count
        ));
        return;
    }

    let uncovered = uncovered_frames(mesh);
    if uncovered > 0 {
        warnings.push(format!(
            "{} has {} frames outside every animation",
            name, uncovered
        ));
    }
}

impl ModelSummary {
    pub fn from_model(model: &Model) -> Self {
        let mut warnings = vec![];

        let expected_pixels = model.texture.width as usize * model.texture.height as usize;
        if model.texture.pixels.len() != expected_pixels {
            warnings.push(format!(
                "Texture has {} pixels, {}x{} needs {}",
                model.texture.pixels.len(),
                model.texture.width,
                model.texture.height,
                expected_pixels
            ));
        }

        mesh_warnings("main body", &model.mesh, &mut warnings);
        for (i, submodel) in model.submodels.iter().enumerate() {
            mesh_warnings(&format!("submodel {}", i), &submodel.mesh, &mut warnings);
        }

        if model.meshes().all(|m| m.vertices.is_empty()) {
            warnings.push("Model has no polygons".to_string());
        }

        Self {
            texture_width: model.texture.width,
            texture_height: model.texture.height,
            main: MeshSummary::from_mesh(&model.mesh),
            submodels: model
                .submodels
                .iter()
                .map(|s| MeshSummary::from_mesh(&s.mesh))
                .collect(),
            sound_sizes: model.sounds.iter().map(Vec::len).collect(),
            warnings,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
