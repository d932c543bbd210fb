use crate::types::{PixelFormat, Size};

#[cfg(feature = "alloc")]
use crate::types::MAX_FRAME_PLANES;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;
#[cfg(feature = "alloc")]
use arrayvec::ArrayVec;

/// A single plane of image data.
#[derive(Debug, Clone, Copy)]
pub struct Plane<'a> {
    pub data: &'a [u8],
    pub bytes_per_row: usize,
}

/// A single writable plane of image data.
#[derive(Debug)]
pub struct PlaneMut<'a> {
    pub data: &'a mut [u8],
    pub bytes_per_row: usize,
}

impl PlaneMut<'_> {
    pub fn as_plane(&self) -> Plane<'_> {
        Plane {
            data: self.data,
            bytes_per_row: self.bytes_per_row,
        }
    }
}

/// A decoded video frame, borrowed from the decoder that produced it.
///
/// Dropping the frame hands it back to the decoder.
pub trait Frame {
    fn pixel_format(&self) -> PixelFormat;
    fn size(&self) -> Size;
    /// Plane `index` in decoder order, or `None` when the decoder left it empty.
    fn plane(&self, index: usize) -> Option<Plane<'_>>;
    fn pts(&self) -> Option<i64>;
    fn dts(&self) -> Option<i64>;
}

/// An owned plane of a [`VideoFrame`].
#[cfg(feature = "alloc")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedPlane {
    pub data: Vec<u8>,
    pub bytes_per_row: usize,
}

/// A decoded frame whose planes live on the heap.
#[cfg(feature = "alloc")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub pixel_format: PixelFormat,
    pub size: Size,
    pub planes: ArrayVec<Option<OwnedPlane>, MAX_FRAME_PLANES>,
    pub pts: Option<i64>,
    pub dts: Option<i64>,
}

#[cfg(feature = "alloc")]
impl VideoFrame {
    pub fn new(pixel_format: PixelFormat, size: Size) -> Self {
        VideoFrame {
            pixel_format,
            size,
            planes: ArrayVec::new(),
            pts: None,
            dts: None,
        }
    }

    /// Append a plane (or an empty slot) in decoder order.
    ///
    /// Planes past [`MAX_FRAME_PLANES`] are ignored.
    pub fn with_plane(mut self, plane: Option<OwnedPlane>) -> Self {
        let _ = self.planes.try_push(plane);
        self
    }

    pub fn with_timestamps(mut self, pts: Option<i64>, dts: Option<i64>) -> Self {
        self.pts = pts;
        self.dts = dts;
        self
    }
}

#[cfg(feature = "alloc")]
impl Frame for VideoFrame {
    fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    fn size(&self) -> Size {
        self.size
    }

    fn plane(&self, index: usize) -> Option<Plane<'_>> {
        self.planes.get(index)?.as_ref().map(|p| Plane {
            data: &p.data,
            bytes_per_row: p.bytes_per_row,
        })
    }

    fn pts(&self) -> Option<i64> {
        self.pts
    }

    fn dts(&self) -> Option<i64> {
        self.dts
    }
}

#[cfg(all(test, feature = "alloc"))]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn empty_slots_read_as_missing() {
        let frame = VideoFrame::new(
            PixelFormat::Yuv420p,
            Size {
                width: 2,
                height: 2,
            },
        )
        .with_plane(None)
        .with_plane(Some(OwnedPlane {
            data: vec![1, 2],
            bytes_per_row: 1,
        }));

        assert!(frame.plane(0).is_none());
        assert_eq!(frame.plane(1).map(|p| p.data), Some(&[1u8, 2][..]));
        assert!(frame.plane(3).is_none());
    }
}
