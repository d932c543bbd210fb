//! Chroma interleaving for bi-planar layouts.

use crate::plane::PlaneError;

/// Merge `count` bytes of separate Cb and Cr planes into `dst` as CbCr pairs.
///
/// After the call `dst[2 * i] == cb[i]` and `dst[2 * i + 1] == cr[i]` for every
/// `i < count`. Bytes of `dst` past `2 * count` are untouched.
pub fn interleave(dst: &mut [u8], cb: &[u8], cr: &[u8], count: usize) -> Result<(), PlaneError> {
    let pairs = count.checked_mul(2).ok_or(PlaneError::Overflow)?;
    if dst.len() < pairs {
        return Err(PlaneError::DestinationTooShort {
            required: pairs,
            actual: dst.len(),
        });
    }
    let shortest = cb.len().min(cr.len());
    if shortest < count {
        return Err(PlaneError::SourceTooShort {
            required: count,
            actual: shortest,
        });
    }

    for ((pair, &b), &r) in dst[..pairs]
        .chunks_exact_mut(2)
        .zip(&cb[..count])
        .zip(&cr[..count])
    {
        pair[0] = b;
        pair[1] = r;
    }
    Ok(())
}
