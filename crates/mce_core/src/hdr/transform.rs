//! Scene-linear to display-referred transfer functions.

use crate::models::ViewTransform;

/// Input above this is already at display white and would overflow the fit.
const FILMIC_CEILING: f32 = 1.0e4;

/// Narkowicz fit of the ACES filmic tone curve.
pub fn aces_filmic(x: f32) -> f32 {
    let x = x.min(FILMIC_CEILING);
    const A: f32 = 2.51;
    const B: f32 = 0.03;
    const C: f32 = 2.43;
    const D: f32 = 0.59;
    const E: f32 = 0.14;
    ((x * (A * x + B)) / (x * (C * x + D) + E)).clamp(0.0, 1.0)
}

/// sRGB opto-electronic transfer function on a [0, 1] value.
pub fn srgb_oetf(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Map one linear channel value to an 8-bit display code value.
///
/// `gain` is the exposure multiplier (`2^stops`). NaN and negative input
/// map to black.
pub fn display_encode(linear: f32, gain: f32, view: ViewTransform) -> u8 {
    let x = if linear.is_finite() {
        (linear * gain).max(0.0)
    } else if linear == f32::INFINITY {
        f32::MAX
    } else {
        0.0
    };

    let mapped = match view {
        ViewTransform::Standard => x.min(1.0),
        ViewTransform::Filmic => aces_filmic(x),
    };

    to_u8(srgb_oetf(mapped))
}

/// Alpha is stored linearly.
pub(crate) fn alpha_encode(alpha: f32) -> u8 {
    if alpha.is_nan() {
        return 255;
    }
    to_u8(alpha.clamp(0.0, 1.0))
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
