use std::ffi::c_void;
use std::ptr::{self, NonNull};

use arrayvec::ArrayVec;
use objc2::rc::Retained;
use objc2::runtime::{AnyObject, ProtocolObject};
use objc2_core_foundation::{CFDictionary, CFRetained, CFString};
use objc2_core_media::{
    CMSampleBuffer, CMSampleBufferCreateForImageBuffer, CMSampleTimingInfo, CMTime, CMTimeFlags,
    CMVideoFormatDescription, CMVideoFormatDescriptionCreateForImageBuffer,
};
use objc2_core_video::{
    CVPixelBuffer, CVPixelBufferCreate, CVPixelBufferGetBaseAddressOfPlane,
    CVPixelBufferGetBytesPerRowOfPlane, CVPixelBufferGetHeightOfPlane,
    CVPixelBufferGetPlaneCount, CVPixelBufferLockBaseAddress, CVPixelBufferLockFlags,
    CVPixelBufferUnlockBaseAddress, kCVPixelBufferBytesPerRowAlignmentKey,
};
use objc2_foundation::{NSDictionary, NSNumber, NSString};

use crate::buffer::{BufferAllocator, LockedBuffer, NativeBuffer};
use crate::frame::PlaneMut;
use crate::types::{MAX_NATIVE_PLANES, NativeFormat, SampleTiming, Size, Status};

const SUCCESS: Status = 0;
/// `kCVReturnAllocationFailed`.
const ALLOCATION_FAILED: Status = -6662;

/// Read-write locking.
const LOCK_FLAGS: CVPixelBufferLockFlags = CVPixelBufferLockFlags(0);

/// Allocates `CVPixelBuffer`s and wraps them into `CMSampleBuffer`s.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreVideoAllocator;

impl CoreVideoAllocator {
    pub fn new() -> Self {
        CoreVideoAllocator
    }
}

/// A retained `CVPixelBuffer`.
pub struct CoreVideoBuffer {
    pixel_buffer: CFRetained<CVPixelBuffer>,
}

impl CoreVideoBuffer {
    pub fn pixel_buffer(&self) -> &CVPixelBuffer {
        &self.pixel_buffer
    }
}

/// Base address lock on a `CVPixelBuffer`, released on drop.
pub struct PixelBufferLock<'a> {
    pixel_buffer: &'a CVPixelBuffer,
}

impl Drop for PixelBufferLock<'_> {
    fn drop(&mut self) {
        unsafe { CVPixelBufferUnlockBaseAddress(self.pixel_buffer, LOCK_FLAGS) };
    }
}

impl LockedBuffer for PixelBufferLock<'_> {
    fn planes_mut(&mut self) -> ArrayVec<PlaneMut<'_>, MAX_NATIVE_PLANES> {
        let pixel_buffer = self.pixel_buffer;
        let count = unsafe { CVPixelBufferGetPlaneCount(pixel_buffer) }.min(MAX_NATIVE_PLANES);
        (0..count)
            .filter_map(|i| {
                let base = unsafe { CVPixelBufferGetBaseAddressOfPlane(pixel_buffer, i) };
                if base.is_null() {
                    return None;
                }
                let bytes_per_row = unsafe { CVPixelBufferGetBytesPerRowOfPlane(pixel_buffer, i) };
                let rows = unsafe { CVPixelBufferGetHeightOfPlane(pixel_buffer, i) };
                // SAFETY: the base address is locked for as long as `self` lives,
                // and CoreVideo planes never overlap.
                let data =
                    unsafe { std::slice::from_raw_parts_mut(base.cast::<u8>(), bytes_per_row * rows) };
                Some(PlaneMut {
                    data,
                    bytes_per_row,
                })
            })
            .collect()
    }
}

impl NativeBuffer for CoreVideoBuffer {
    type Locked<'a> = PixelBufferLock<'a>;

    fn lock(&mut self) -> Result<PixelBufferLock<'_>, Status> {
        let status = unsafe { CVPixelBufferLockBaseAddress(&self.pixel_buffer, LOCK_FLAGS) };
        if status != SUCCESS {
            return Err(status);
        }
        Ok(PixelBufferLock {
            pixel_buffer: &self.pixel_buffer,
        })
    }
}

/// A `CMSampleBuffer` holding one converted frame.
pub struct CoreMediaSample {
    sample_buffer: CFRetained<CMSampleBuffer>,
}

impl CoreMediaSample {
    pub fn sample_buffer(&self) -> &CMSampleBuffer {
        &self.sample_buffer
    }

    /// Raw pointer to the backing `CMSampleBuffer` (escape hatch).
    pub fn sample_buffer_ptr(&self) -> *const c_void {
        &*self.sample_buffer as *const CMSampleBuffer as *const c_void
    }
}

fn row_alignment_attributes(alignment: usize) -> Retained<NSDictionary<NSString, AnyObject>> {
    unsafe {
        let key: &NSString = std::mem::transmute::<&CFString, &NSString>(
            kCVPixelBufferBytesPerRowAlignmentKey,
        );
        let value = NSNumber::new_usize(alignment);
        NSDictionary::dictionaryWithObject_forKey(&value, ProtocolObject::from_ref(key))
    }
}

impl BufferAllocator for CoreVideoAllocator {
    type Buffer = CoreVideoBuffer;
    type Description = CFRetained<CMVideoFormatDescription>;
    type Sample = CoreMediaSample;

    fn create_buffer(
        &self,
        size: Size,
        format: NativeFormat,
        bytes_per_row_alignment: Option<usize>,
    ) -> Result<CoreVideoBuffer, Status> {
        let attributes = bytes_per_row_alignment.map(row_alignment_attributes);
        // NSDictionary is toll-free bridged to CFDictionary.
        let attributes = attributes
            .as_ref()
            .map(|dict| unsafe { &*Retained::as_ptr(dict).cast::<CFDictionary>() });

        let mut out: *mut CVPixelBuffer = ptr::null_mut();
        let status = unsafe {
            CVPixelBufferCreate(
                None,
                size.width as usize,
                size.height as usize,
                format.fourcc(),
                attributes,
                NonNull::from(&mut out),
            )
        };
        if status != SUCCESS {
            return Err(status);
        }
        let pixel_buffer = NonNull::new(out).ok_or(ALLOCATION_FAILED)?;
        Ok(CoreVideoBuffer {
            pixel_buffer: unsafe { CFRetained::from_raw(pixel_buffer) },
        })
    }

    fn describe(&self, buffer: &CoreVideoBuffer) -> Result<Self::Description, Status> {
        let mut out: *const CMVideoFormatDescription = ptr::null();
        let status = unsafe {
            CMVideoFormatDescriptionCreateForImageBuffer(
                None,
                &buffer.pixel_buffer,
                NonNull::from(&mut out),
            )
        };
        if status != SUCCESS {
            return Err(status);
        }
        let description = NonNull::new(out.cast_mut()).ok_or(ALLOCATION_FAILED)?;
        Ok(unsafe { CFRetained::from_raw(description) })
    }

    fn make_sample(
        &self,
        buffer: CoreVideoBuffer,
        description: Self::Description,
        timing: SampleTiming,
    ) -> Result<CoreMediaSample, Status> {
        let timing = CMSampleTimingInfo {
            duration: CMTime {
                value: 0,
                timescale: 0,
                flags: CMTimeFlags(0),
                epoch: 0,
            },
            presentationTimeStamp: timing.presentation.into(),
            decodeTimeStamp: timing.decode.into(),
        };

        let mut out: *mut CMSampleBuffer = ptr::null_mut();
        let status = unsafe {
            CMSampleBufferCreateForImageBuffer(
                None,
                &buffer.pixel_buffer,
                true,
                None,
                ptr::null_mut(),
                &description,
                NonNull::from(&timing),
                NonNull::from(&mut out),
            )
        };
        if status != SUCCESS {
            return Err(status);
        }
        let sample_buffer = NonNull::new(out).ok_or(ALLOCATION_FAILED)?;
        Ok(CoreMediaSample {
            sample_buffer: unsafe { CFRetained::from_raw(sample_buffer) },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NATIVE_ALPHA, NATIVE_CHROMA, NATIVE_LUMA, Time};

    #[test]
    fn tri_planar_buffer_has_three_planes() {
        let allocator = CoreVideoAllocator::new();
        let size = Size {
            width: 64,
            height: 32,
        };
        let mut buffer = allocator
            .create_buffer(size, NativeFormat::TriPlanar420VideoRangeAlpha, Some(64))
            .unwrap();
        {
            let mut locked = buffer.lock().unwrap();
            let planes = locked.planes_mut();
            assert_eq!(planes.len(), 3);
            assert!(planes[NATIVE_LUMA].bytes_per_row >= 64);
            assert!(planes[NATIVE_CHROMA].data.len() >= 64 * 16);
            assert!(planes[NATIVE_ALPHA].data.len() >= 64 * 32);
        }

        let description = allocator.describe(&buffer).unwrap();
        let timing = SampleTiming {
            presentation: Time::new(3, 25),
            decode: Time::INVALID,
        };
        assert!(allocator.make_sample(buffer, description, timing).is_ok());
    }
}
