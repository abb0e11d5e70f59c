//! RGB helpers for segment and isosurface colors.
//!
//! Colors are normalized `[r, g, b]` triples, the form annotations carry
//! them in. Hex constants are accepted for configured defaults.

/// Normalized RGB color.
pub type Rgb = [f32; 3];

/// Neutral gray used when a segment has no usable color.
pub const GRAY: Rgb = from_hex(0x80_80_80);

/// Convert a `0xRRGGBB` constant to a normalized color.
#[must_use]
pub const fn from_hex(hex: u32) -> Rgb {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

/// First three components of a normalized RGB(A) array.
///
/// Returns `None` for fewer than three components. Alpha is ignored.
#[must_use]
pub fn from_normalized(components: &[f32]) -> Option<Rgb> {
    match components {
        [r, g, b, ..] => Some([*r, *g, *b]),
        _ => None,
    }
}
