use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::metadata::{DetailLevel, SegmentId};
use crate::scene::IsosurfaceParams;
use crate::util::color::{self, Rgb};
use crate::volume::IsoValue;

/// How segments are drawn and which mesh detail is fetched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Segments", inline)]
#[serde(default)]
pub struct SegmentOptions {
    /// Threshold of lattice segment masks (values are 0 or 1).
    #[schemars(skip)]
    pub iso_value: IsoValue,
    /// Segment surface opacity.
    #[schemars(title = "Opacity", range(min = 0.0, max = 1.0), extend("step" = 0.05))]
    pub alpha: f32,
    /// Color for segments whose annotation has no usable color.
    #[schemars(skip)]
    pub fallback_color: Rgb,
    /// Finest mesh detail level wanted; `None` fetches the coarsest.
    #[schemars(title = "Preferred Detail")]
    pub preferred_detail: Option<DetailLevel>,
    /// Segments dropped by foreground-only mesh loads.
    #[schemars(skip)]
    pub background_segments: Vec<SegmentId>,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            iso_value: IsoValue::Absolute(0.95),
            alpha: 1.0,
            fallback_color: color::GRAY,
            preferred_detail: None,
            background_segments: vec![13, 15],
        }
    }
}

impl SegmentOptions {
    /// Isosurface parameters for a lattice segment of `color`.
    #[must_use]
    pub fn isosurface(&self, color: Rgb) -> IsosurfaceParams {
        IsosurfaceParams {
            iso_value: self.iso_value,
            alpha: self.alpha,
            color,
        }
    }
}
