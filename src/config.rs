use serde::{Deserialize, Serialize};

use crate::mesh_processing::normals::SMOOTHING_THRESHOLD;

/// Options for the normal reconstruction pass.
///
/// Every field has a default, so a partial JSON document such as
/// `{"parallel": true}` is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalOptions {
    /// Minimum cosine between two face normals for them to be averaged
    pub smoothing_threshold: f32,
    /// Process frames on the rayon thread pool
    pub parallel: bool,
    /// Reconstruct the main body as well as the submodels
    pub include_main_body: bool,
}

impl Default for NormalOptions {
    fn default() -> Self {
        Self {
            smoothing_threshold: SMOOTHING_THRESHOLD,
            parallel: false,
            include_main_body: true,
        }
    }
}

impl NormalOptions {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
