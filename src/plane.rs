//! Stride-aware plane copies.

/// A plane operation was handed slices that cannot hold the requested rows.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneError {
    #[error("source plane holds {actual} bytes but {required} are needed")]
    SourceTooShort { required: usize, actual: usize },
    #[error("destination plane holds {actual} bytes but {required} are needed")]
    DestinationTooShort { required: usize, actual: usize },
    #[error("row {row_bytes} bytes exceeds stride {stride}")]
    RowExceedsStride { row_bytes: usize, stride: usize },
    #[error("plane size overflows")]
    Overflow,
}

/// Bytes spanned by `rows` rows of `row_bytes` each, `stride` apart.
///
/// The last row need not be padded out to the full stride.
pub(crate) fn span(stride: usize, row_bytes: usize, rows: usize) -> Result<usize, PlaneError> {
    if rows == 0 {
        return Ok(0);
    }
    if row_bytes > stride {
        return Err(PlaneError::RowExceedsStride { row_bytes, stride });
    }
    stride
        .checked_mul(rows - 1)
        .and_then(|n| n.checked_add(row_bytes))
        .ok_or(PlaneError::Overflow)
}

/// Copy `rows` rows of `row_bytes` each from `src` into `dst`.
///
/// When both strides equal `row_bytes` the rows are contiguous and the whole
/// plane moves in one copy. Otherwise each row is copied on its own, stepping
/// `dst_stride` and `src_stride` bytes per row. Either way the copied rows are
/// identical.
pub fn copy_plane(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[u8],
    src_stride: usize,
    row_bytes: usize,
    rows: usize,
) -> Result<(), PlaneError> {
    let src_len = span(src_stride, row_bytes, rows)?;
    let dst_len = span(dst_stride, row_bytes, rows)?;
    if src.len() < src_len {
        return Err(PlaneError::SourceTooShort {
            required: src_len,
            actual: src.len(),
        });
    }
    if dst.len() < dst_len {
        return Err(PlaneError::DestinationTooShort {
            required: dst_len,
            actual: dst.len(),
        });
    }
    if rows == 0 || row_bytes == 0 {
        return Ok(());
    }

    if dst_stride == src_stride && src_stride == row_bytes {
        dst[..src_len].copy_from_slice(&src[..src_len]);
        return Ok(());
    }

    for row in 0..rows {
        let d = row * dst_stride;
        let s = row * src_stride;
        dst[d..d + row_bytes].copy_from_slice(&src[s..s + row_bytes]);
    }
    Ok(())
}

#[cfg(all(test, feature = "alloc"))]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    fn rows_of(data: &[u8], stride: usize, row_bytes: usize, rows: usize) -> Vec<Vec<u8>> {
        (0..rows)
            .map(|r| data[r * stride..r * stride + row_bytes].to_vec())
            .collect()
    }

    #[test]
    fn contiguous_copy_matches_per_row_copy() {
        let src: Vec<u8> = (0..64u8).collect();

        let mut bulk = vec![0u8; 64];
        copy_plane(&mut bulk, 8, &src, 8, 8, 8).unwrap();

        let mut per_row = vec![0u8; 64];
        for r in 0..8 {
            copy_plane(&mut per_row[r * 8..], 8, &src[r * 8..], 8, 8, 1).unwrap();
        }

        assert_eq!(bulk, per_row);
        assert_eq!(bulk, src);
    }

    #[test]
    fn mismatched_strides_copy_row_by_row() {
        // 4 rows of 3 bytes, source padded to 5, destination padded to 16.
        let src: Vec<u8> = (0..20u8).collect();
        let mut dst = vec![0xAAu8; 16 * 3 + 3];

        copy_plane(&mut dst, 16, &src, 5, 3, 4).unwrap();

        assert_eq!(rows_of(&dst, 16, 3, 4), rows_of(&src, 5, 3, 4));
        // Padding in the destination is left alone.
        assert_eq!(dst[3..16], [0xAA; 13]);
    }

    #[test]
    fn equal_padded_strides_keep_rows_identical() {
        let src: Vec<u8> = (0..32u8).collect();
        let mut dst = vec![0u8; 32];

        copy_plane(&mut dst, 8, &src, 8, 6, 4).unwrap();

        assert_eq!(rows_of(&dst, 8, 6, 4), rows_of(&src, 8, 6, 4));
    }

    #[test]
    fn short_slices_are_rejected() {
        let src = [0u8; 10];
        let mut dst = [0u8; 64];
        assert_eq!(
            copy_plane(&mut dst, 8, &src, 4, 4, 3),
            Err(PlaneError::SourceTooShort {
                required: 12,
                actual: 10
            })
        );

        let src = [0u8; 64];
        let mut dst = [0u8; 10];
        assert_eq!(
            copy_plane(&mut dst, 8, &src, 8, 8, 2),
            Err(PlaneError::DestinationTooShort {
                required: 16,
                actual: 10
            })
        );
    }

    #[test]
    fn row_wider_than_stride_is_rejected() {
        let src = [0u8; 64];
        let mut dst = [0u8; 64];
        assert_eq!(
            copy_plane(&mut dst, 4, &src, 8, 6, 2),
            Err(PlaneError::RowExceedsStride {
                row_bytes: 6,
                stride: 4
            })
        );
    }

    #[test]
    fn unpadded_last_row_is_enough() {
        let src = [7u8; 8 + 3];
        let mut dst = [0u8; 3 + 3];
        copy_plane(&mut dst, 3, &src, 8, 3, 2).unwrap();
        assert_eq!(dst, [7; 6]);
    }
}
