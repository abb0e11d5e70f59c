use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::scene::IsosurfaceParams;
use crate::util::color::{self, Rgb};
use crate::volume::IsoValue;

/// Isosurface of the density map shown alongside a segmentation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Density Volume", inline)]
#[serde(default)]
pub struct VolumeOptions {
    /// Surface threshold.
    pub iso_value: IsoValue,
    /// Surface opacity.
    #[schemars(title = "Opacity", range(min = 0.0, max = 1.0), extend("step" = 0.05))]
    pub alpha: f32,
    /// Surface color.
    #[schemars(skip)]
    pub color: Rgb,
}

impl Default for VolumeOptions {
    fn default() -> Self {
        Self {
            iso_value: IsoValue::Relative(2.73),
            alpha: 0.2,
            color: color::from_hex(0x12_12_12),
        }
    }
}

impl VolumeOptions {
    /// Isosurface parameters for the density node.
    #[must_use]
    pub fn isosurface(&self) -> IsosurfaceParams {
        IsosurfaceParams {
            iso_value: self.iso_value,
            alpha: self.alpha,
            color: self.color,
        }
    }
}
