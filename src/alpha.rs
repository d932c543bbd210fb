//! Planar 8-bit alpha premultiplication.

use crate::plane::{PlaneError, span};

/// Scale one 8-bit sample by an 8-bit alpha, rounding to nearest.
#[inline]
pub fn premultiply_sample(value: u8, alpha: u8) -> u8 {
    // Never exceeds 255: (255 * 255 + 127) / 255 == 255.
    ((value as u32 * alpha as u32 + 127) / 255) as u8
}

/// Multiply every sample of `plane` by its co-located `alpha` sample in place.
///
/// Covers `width` samples of `height` rows; each plane keeps its own stride.
pub fn premultiply(
    plane: &mut [u8],
    plane_stride: usize,
    alpha: &[u8],
    alpha_stride: usize,
    width: usize,
    height: usize,
) -> Result<(), PlaneError> {
    let alpha_len = span(alpha_stride, width, height)?;
    let plane_len = span(plane_stride, width, height)?;
    if alpha.len() < alpha_len {
        return Err(PlaneError::SourceTooShort {
            required: alpha_len,
            actual: alpha.len(),
        });
    }
    if plane.len() < plane_len {
        return Err(PlaneError::DestinationTooShort {
            required: plane_len,
            actual: plane.len(),
        });
    }
    if width == 0 {
        return Ok(());
    }

    for row in 0..height {
        let p = row * plane_stride;
        let a = row * alpha_stride;
        for (value, &alpha) in plane[p..p + width].iter_mut().zip(&alpha[a..a + width]) {
            *value = premultiply_sample(*value, alpha);
        }
    }
    Ok(())
}
