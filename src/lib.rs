//! Decoders for the O3 and CAR animated model formats.
//!
//! Both formats decode to a [`model::Model`]: a texture, a main
//! [`model::AnimatedMesh`] and, for CAR, three submodels and seven sound
//! clips. Neither stores normals; [`mesh_processing::normals`] rebuilds them.

pub mod binary;
pub mod config;
pub mod error;
pub mod math;
pub mod mesh_processing;
pub mod model;

pub use config::NormalOptions;
pub use error::DecodeError;
pub use mesh_processing::analysis::ModelSummary;
pub use mesh_processing::normals::{reconstruct_mesh_normals, reconstruct_normals, NormalStats};
pub use model::{
    decode_car, decode_o3, decode_o3_animated, load_car, load_o3, load_o3_animated, AnimatedMesh,
    Animation, AnimationVertex, Model, Submodel, Texture, Vertex,
};
