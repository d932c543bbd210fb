//! A portable native buffer allocator backed by ordinary heap memory.
//!
//! Lays planes out the way CoreVideo does (one region per plane, row strides
//! rounded up to an alignment) so conversions behave the same on every
//! platform.

use arrayvec::ArrayVec;

use crate::buffer::{BufferAllocator, LockedBuffer, NativeBuffer};
use crate::frame::{Plane, PlaneMut};
use crate::types::{MAX_NATIVE_PLANES, NativeFormat, SampleTiming, Size, Status};

/// `kCVReturnInvalidArgument`.
pub const INVALID_ARGUMENT: Status = -6661;
/// `kCVReturnAllocationFailed`.
pub const ALLOCATION_FAILED: Status = -6662;

/// Row stride alignment used when the caller gives no hint.
pub const DEFAULT_ALIGNMENT: usize = 64;

#[derive(Debug, Clone, Copy)]
pub struct HeapAllocator {
    alignment: usize,
}

impl Default for HeapAllocator {
    fn default() -> Self {
        Self::with_alignment(DEFAULT_ALIGNMENT)
    }
}

impl HeapAllocator {
    /// An allocator aligning row strides to `alignment` bytes when no hint is given.
    ///
    /// An alignment of zero is treated as one.
    pub fn with_alignment(alignment: usize) -> Self {
        HeapAllocator {
            alignment: alignment.max(1),
        }
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct HeapPlane {
    data: Vec<u8>,
    bytes_per_row: usize,
}

/// A native buffer whose planes are separate heap regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapBuffer {
    format: NativeFormat,
    size: Size,
    planes: ArrayVec<HeapPlane, MAX_NATIVE_PLANES>,
}

impl HeapBuffer {
    pub fn format(&self) -> NativeFormat {
        self.format
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    pub fn plane(&self, index: usize) -> Option<Plane<'_>> {
        self.planes.get(index).map(|p| Plane {
            data: &p.data,
            bytes_per_row: p.bytes_per_row,
        })
    }
}

/// Lock on a [`HeapBuffer`]. Heap memory needs no real locking; the guard
/// exists so heap buffers follow the same bracket as platform buffers.
pub struct HeapLock<'a> {
    buffer: &'a mut HeapBuffer,
}

impl LockedBuffer for HeapLock<'_> {
    fn planes_mut(&mut self) -> ArrayVec<PlaneMut<'_>, MAX_NATIVE_PLANES> {
        self.buffer
            .planes
            .iter_mut()
            .map(|p| PlaneMut {
                data: &mut p.data,
                bytes_per_row: p.bytes_per_row,
            })
            .collect()
    }
}

impl NativeBuffer for HeapBuffer {
    type Locked<'a> = HeapLock<'a>;

    fn lock(&mut self) -> Result<HeapLock<'_>, Status> {
        Ok(HeapLock { buffer: self })
    }
}

/// Format descriptor of a finished [`HeapBuffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapDescription {
    pub format: NativeFormat,
    pub size: Size,
    pub bytes_per_row: ArrayVec<usize, MAX_NATIVE_PLANES>,
}

/// A heap buffer with its descriptor and timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapSample {
    buffer: HeapBuffer,
    description: HeapDescription,
    timing: SampleTiming,
}

impl HeapSample {
    pub fn buffer(&self) -> &HeapBuffer {
        &self.buffer
    }

    pub fn description(&self) -> &HeapDescription {
        &self.description
    }

    pub fn timing(&self) -> SampleTiming {
        self.timing
    }

    pub fn into_buffer(self) -> HeapBuffer {
        self.buffer
    }
}

impl BufferAllocator for HeapAllocator {
    type Buffer = HeapBuffer;
    type Description = HeapDescription;
    type Sample = HeapSample;

    fn create_buffer(
        &self,
        size: Size,
        format: NativeFormat,
        bytes_per_row_alignment: Option<usize>,
    ) -> Result<HeapBuffer, Status> {
        if size.width == 0 || size.height == 0 {
            return Err(INVALID_ARGUMENT);
        }
        let alignment = bytes_per_row_alignment
            .filter(|&a| a > 0)
            .unwrap_or(self.alignment);

        let mut planes = ArrayVec::new();
        for shape in format.plane_shapes(size) {
            let bytes_per_row = shape
                .row_bytes
                .checked_next_multiple_of(alignment)
                .ok_or(ALLOCATION_FAILED)?;
            let len = bytes_per_row
                .checked_mul(shape.rows)
                .ok_or(ALLOCATION_FAILED)?;
            planes.push(HeapPlane {
                data: vec![0; len],
                bytes_per_row,
            });
        }

        Ok(HeapBuffer {
            format,
            size,
            planes,
        })
    }

    fn describe(&self, buffer: &HeapBuffer) -> Result<HeapDescription, Status> {
        Ok(HeapDescription {
            format: buffer.format,
            size: buffer.size,
            bytes_per_row: buffer.planes.iter().map(|p| p.bytes_per_row).collect(),
        })
    }

    fn make_sample(
        &self,
        buffer: HeapBuffer,
        description: HeapDescription,
        timing: SampleTiming,
    ) -> Result<HeapSample, Status> {
        Ok(HeapSample {
            buffer,
            description,
            timing,
        })
    }
}
