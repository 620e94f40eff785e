//! Clamping of requested dimensions to the source image.
//!
//! The resize step never enlarges the source along the dimension that
//! would be upscaled:
//!
//! - requested width above the source width: the width is clamped and the
//!   height is recomputed from the *requested* aspect ratio;
//! - otherwise, requested height above the source height: the height is
//!   clamped and the requested width is kept as is;
//! - otherwise the request passes through unchanged.
//!
//! The height branch does not recompute the width. This asymmetry is kept
//! so existing variants keep their dimensions.

/// Effective `(width, height)` for a request against a source image.
///
/// All inputs are positive. The result is never below one pixel.
pub fn resolve_dimensions(
    requested: (u32, u32),
    original: (u32, u32),
) -> (u32, u32) {
    let (width, height) = requested;
    let (original_width, original_height) = original;

    if width > original_width {
        let requested_ratio = width as f64 / height as f64;
        let effective_height = (original_width as f64 / requested_ratio).floor() as u32;
        (original_width, effective_height.max(1))
    } else if height > original_height {
        (width, original_height)
    } else {
        (width, height)
    }
}
