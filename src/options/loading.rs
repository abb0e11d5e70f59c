use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Load sequencing switches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Loading", inline)]
#[serde(default)]
pub struct LoadingOptions {
    /// In auto mode, skip the density volume of entries without a lattice
    /// segmentation.
    #[schemars(title = "Volume Requires Lattice")]
    pub volume_requires_lattice: bool,
    /// Image-mode entry loaded when none is given.
    #[schemars(title = "Image Entry")]
    pub image_entry: String,
    /// Voxel budget of image-mode requests.
    #[schemars(title = "Image Max Voxels", range(min = 1))]
    pub image_max_voxels: u64,
}

impl Default for LoadingOptions {
    fn default() -> Self {
        Self {
            volume_requires_lattice: true,
            image_entry: "emd-99999".to_owned(),
            image_max_voxels: 10_000_000,
        }
    }
}
