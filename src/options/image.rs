use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::scene::IsosurfaceParams;
use crate::util::color::{self, Rgb};
use crate::volume::IsoValue;

/// Image-mode volume and its z-score threshold segmentation.
///
/// With segmentation shown the image surface fades to `backdrop_alpha`
/// and two masks are drawn: *plus* (z above `upper_threshold`) and *minus*
/// (z between the current iso value and `upper_threshold`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Image", inline)]
#[serde(default)]
pub struct ImageOptions {
    /// Initial image threshold, in standard deviations.
    #[schemars(title = "Iso Value", range(min = -3.0, max = 3.0), extend("step" = 0.05))]
    pub iso_value: f64,
    /// Image surface opacity.
    #[schemars(skip)]
    pub alpha: f32,
    /// Image surface color.
    #[schemars(skip)]
    pub color: Rgb,
    /// Image surface opacity while the segmentation is shown.
    #[schemars(skip)]
    pub backdrop_alpha: f32,
    /// Image surface color while the segmentation is shown.
    #[schemars(skip)]
    pub backdrop_color: Rgb,
    /// Fixed z-score bound between the two masks.
    #[schemars(title = "Upper Threshold", range(min = -3.0, max = 3.0), extend("step" = 0.05))]
    pub upper_threshold: f64,
    /// Plus mask color.
    #[schemars(skip)]
    pub plus_color: Rgb,
    /// Plus mask opacity.
    #[schemars(skip)]
    pub plus_alpha: f32,
    /// Minus mask color.
    #[schemars(skip)]
    pub minus_color: Rgb,
    /// Minus mask opacity.
    #[schemars(skip)]
    pub minus_alpha: f32,
    /// Threshold of both masks (values are 0 or 1).
    #[schemars(skip)]
    pub mask_iso_value: IsoValue,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            iso_value: -0.55,
            alpha: 1.0,
            color: color::from_hex(0x22_48_99),
            backdrop_alpha: 0.0,
            backdrop_color: color::from_hex(0x77_77_77),
            upper_threshold: -0.35,
            plus_color: [0.3, 0.7, 0.6],
            plus_alpha: 0.5,
            minus_color: [0.1, 0.3, 0.7],
            minus_alpha: 1.0,
            mask_iso_value: IsoValue::Absolute(0.95),
        }
    }
}

impl ImageOptions {
    /// Image surface at relative threshold `value`.
    #[must_use]
    pub fn surface(&self, value: f64, show_segmentation: bool) -> IsosurfaceParams {
        let (alpha, color) = if show_segmentation {
            (self.backdrop_alpha, self.backdrop_color)
        } else {
            (self.alpha, self.color)
        };
        IsosurfaceParams {
            iso_value: IsoValue::Relative(value),
            alpha,
            color,
        }
    }

    /// Plus mask surface.
    #[must_use]
    pub fn plus_surface(&self) -> IsosurfaceParams {
        IsosurfaceParams {
            iso_value: self.mask_iso_value,
            alpha: self.plus_alpha,
            color: self.plus_color,
        }
    }

    /// Minus mask surface.
    #[must_use]
    pub fn minus_surface(&self) -> IsosurfaceParams {
        IsosurfaceParams {
            iso_value: self.mask_iso_value,
            alpha: self.minus_alpha,
            color: self.minus_color,
        }
    }
}
