use arrayvec::ArrayVec;

use crate::frame::PlaneMut;
use crate::types::{MAX_NATIVE_PLANES, NativeFormat, SampleTiming, Size, Status};

/// Creates native image buffers and wraps them into timed samples.
pub trait BufferAllocator {
    type Buffer: NativeBuffer;
    /// Format descriptor built from a finished buffer.
    type Description;
    /// A buffer, its descriptor and its timing, ready for display.
    type Sample;

    /// Create a `size` buffer in `format`.
    ///
    /// `bytes_per_row_alignment` asks the allocator to align row strides to
    /// the given byte count; allocators may ignore it.
    fn create_buffer(
        &self,
        size: Size,
        format: NativeFormat,
        bytes_per_row_alignment: Option<usize>,
    ) -> Result<Self::Buffer, Status>;

    fn describe(&self, buffer: &Self::Buffer) -> Result<Self::Description, Status>;

    fn make_sample(
        &self,
        buffer: Self::Buffer,
        description: Self::Description,
        timing: SampleTiming,
    ) -> Result<Self::Sample, Status>;
}

/// A native buffer whose memory is only reachable while locked.
pub trait NativeBuffer {
    /// Exclusive access to the buffer's planes. Dropping it unlocks the buffer.
    type Locked<'a>: LockedBuffer
    where
        Self: 'a;

    fn lock(&mut self) -> Result<Self::Locked<'_>, Status>;
}

/// The planes of a locked native buffer.
pub trait LockedBuffer {
    /// All planes in native order, as disjoint writable views.
    fn planes_mut(&mut self) -> ArrayVec<PlaneMut<'_>, MAX_NATIVE_PLANES>;
}
