//! Decoded frame to native sample conversion.

use tracing::{debug, trace};

use crate::alpha::premultiply;
use crate::buffer::{BufferAllocator, LockedBuffer, NativeBuffer};
use crate::chroma::interleave;
use crate::error::{ConvertError, InvalidFrameReason};
use crate::frame::{Frame, Plane, PlaneMut};
use crate::plane::{PlaneError, copy_plane};
use crate::scratch::ScratchBuffer;
use crate::types::{
    NativeFormat, SOURCE_ALPHA, SOURCE_CB, SOURCE_CR, SOURCE_LUMA, SampleTiming, Time,
};

/// Source planes of a frame that passed validation.
struct SourcePlanes<'a> {
    luma: Plane<'a>,
    cb: Plane<'a>,
    cr: Plane<'a>,
    alpha: Option<Plane<'a>>,
}

/// Turns decoded 4:2:0 frames into native, timestamped samples.
///
/// Holds the chroma scratch region between calls, so one converter should
/// serve a whole stream. Not meant to be shared between threads.
pub struct FrameConverter<A: BufferAllocator> {
    allocator: A,
    scratch: ScratchBuffer,
}

impl<A: BufferAllocator> FrameConverter<A> {
    pub fn new(allocator: A) -> Self {
        FrameConverter {
            allocator,
            scratch: ScratchBuffer::new(),
        }
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    pub fn scratch(&self) -> &ScratchBuffer {
        &self.scratch
    }

    /// Convert `frame` into a native sample.
    ///
    /// `timebase` is the stream's resolved tick duration (see
    /// [`resolve_timebase`](crate::timebase::resolve_timebase)). The native
    /// buffer is locked only while its planes are written, and unlocked again
    /// on every path out of this call.
    pub fn convert<F>(&mut self, frame: &F, timebase: Time) -> Result<A::Sample, ConvertError>
    where
        F: Frame + ?Sized,
    {
        let format = NativeFormat::for_pixel_format(frame.pixel_format());
        let planes = validate(frame, format)?;
        let size = frame.size();

        let timing = SampleTiming {
            presentation: Time::from_ticks(frame.pts(), timebase),
            decode: Time::from_ticks(frame.dts(), timebase),
        };

        let mut buffer = self
            .allocator
            .create_buffer(size, format, Some(planes.luma.bytes_per_row))
            .map_err(ConvertError::BufferAllocationFailed)?;

        {
            let mut locked = buffer.lock().map_err(ConvertError::BufferLockFailed)?;
            let mut native = locked.planes_mut();
            self.fill(&mut native, &planes, format, size.height as usize)?;
        }

        let description = self
            .allocator
            .describe(&buffer)
            .map_err(ConvertError::FormatDescriptionFailed)?;
        let sample = self
            .allocator
            .make_sample(buffer, description, timing)
            .map_err(ConvertError::SampleConstructionFailed)?;

        trace!(
            width = size.width,
            height = size.height,
            ?format,
            pts = timing.presentation.value,
            timescale = timing.presentation.timescale,
            "converted frame"
        );
        Ok(sample)
    }

    fn fill(
        &mut self,
        native: &mut [PlaneMut<'_>],
        src: &SourcePlanes<'_>,
        format: NativeFormat,
        height: usize,
    ) -> Result<(), ConvertError> {
        let expected = format.plane_count();
        let actual = native.len();
        let (luma, chroma, mut alpha) = match native {
            [luma, chroma] if !format.has_alpha() => (luma, chroma, None),
            [luma, chroma, alpha] if format.has_alpha() => (luma, chroma, Some(alpha)),
            _ => return Err(ConvertError::BufferLayout { expected, actual }),
        };

        if let (Some(dst), Some(src)) = (alpha.as_deref_mut(), src.alpha) {
            copy_into(dst, src, height)?;
        }

        copy_into(luma, src.luma, height)?;

        if let (Some(dst), Some(_)) = (alpha.as_deref(), src.alpha) {
            let width = luma.bytes_per_row.min(dst.bytes_per_row);
            premultiply(
                &mut *luma.data,
                luma.bytes_per_row,
                &*dst.data,
                dst.bytes_per_row,
                width,
                height,
            )?;
        }

        let chroma_rows = height.div_ceil(2);
        let count = src
            .cb
            .bytes_per_row
            .checked_mul(chroma_rows)
            .ok_or(PlaneError::Overflow)?;
        let interleaved_len = count.checked_mul(2).ok_or(PlaneError::Overflow)?;

        let reallocating = self.scratch.len() != interleaved_len;
        let scratch = self.scratch.ensure_size(interleaved_len);
        if reallocating {
            debug!(bytes = interleaved_len, "resized chroma scratch buffer");
        }
        interleave(scratch, src.cb.data, src.cr.data, count)?;

        copy_into(
            chroma,
            Plane {
                data: scratch,
                bytes_per_row: src.cb.bytes_per_row * 2,
            },
            chroma_rows,
        )?;
        Ok(())
    }
}

/// Copy `rows` rows of `src` into `dst`, as much of each row as both strides allow.
fn copy_into(dst: &mut PlaneMut<'_>, src: Plane<'_>, rows: usize) -> Result<(), PlaneError> {
    let row_bytes = src.bytes_per_row.min(dst.bytes_per_row);
    copy_plane(
        dst.data,
        dst.bytes_per_row,
        src.data,
        src.bytes_per_row,
        row_bytes,
        rows,
    )
}

fn validate<F: Frame + ?Sized>(
    frame: &F,
    format: NativeFormat,
) -> Result<SourcePlanes<'_>, InvalidFrameReason> {
    let luma = frame
        .plane(SOURCE_LUMA)
        .ok_or(InvalidFrameReason::MissingLuma)?;
    let cb = frame
        .plane(SOURCE_CB)
        .ok_or(InvalidFrameReason::MissingChroma(SOURCE_CB))?;
    let cr = frame
        .plane(SOURCE_CR)
        .ok_or(InvalidFrameReason::MissingChroma(SOURCE_CR))?;
    if cb.bytes_per_row != cr.bytes_per_row {
        return Err(InvalidFrameReason::ChromaStrideMismatch {
            cb: cb.bytes_per_row,
            cr: cr.bytes_per_row,
        });
    }

    let alpha = if format.has_alpha() {
        Some(
            frame
                .plane(SOURCE_ALPHA)
                .ok_or(InvalidFrameReason::MissingAlpha)?,
        )
    } else {
        None
    };

    let size = frame.size();
    if size.width == 0 || size.height == 0 {
        return Err(InvalidFrameReason::ZeroSize {
            width: size.width,
            height: size.height,
        });
    }

    Ok(SourcePlanes {
        luma,
        cb,
        cr,
        alpha,
    })
}
