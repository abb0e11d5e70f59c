use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::api::{VolumeBox, VolumeRequest};

/// Volume server connection and request sizing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Server", inline)]
#[serde(default)]
pub struct ApiOptions {
    /// API root, including the version segment.
    #[schemars(title = "Base URL")]
    pub base_url: String,
    /// Voxel budget per volume request; the server downsamples to fit.
    #[schemars(title = "Max Voxels", range(min = 1))]
    pub max_voxels: u64,
    /// Lower corner of the request box.
    #[schemars(skip)]
    pub box_min: [f64; 3],
    /// Upper corner of the request box.
    #[schemars(skip)]
    pub box_max: [f64; 3],
    /// Request the whole cell instead of the box.
    #[schemars(title = "Whole Cell")]
    pub whole_cell: bool,
    /// Lattice segmentation to request.
    #[schemars(title = "Lattice")]
    pub lattice_index: u32,
}

impl Default for ApiOptions {
    fn default() -> Self {
        let region = VolumeBox::default();
        Self {
            base_url: "http://localhost:9000/v1".to_owned(),
            max_voxels: 100_000_000,
            box_min: region.min,
            box_max: region.max,
            whole_cell: false,
            lattice_index: 0,
        }
    }
}

impl ApiOptions {
    /// Volume request described by these options.
    #[must_use]
    pub fn volume_request(&self) -> VolumeRequest {
        VolumeRequest {
            lattice_index: self.lattice_index,
            region: (!self.whole_cell).then_some(VolumeBox {
                min: self.box_min,
                max: self.box_max,
            }),
            max_voxels: self.max_voxels,
        }
    }
}
