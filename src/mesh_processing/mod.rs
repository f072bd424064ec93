pub mod analysis;
pub mod normals;
