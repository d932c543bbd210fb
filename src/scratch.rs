//! Reusable scratch memory for the interleaved chroma plane.

use alloc::vec;
use alloc::vec::Vec;

/// One heap region reused across frame conversions.
///
/// The region is only replaced when a different size is requested; the
/// previous region is freed at that point. Owned by a single converter and
/// never shared.
#[derive(Debug, Default)]
pub struct ScratchBuffer {
    data: Vec<u8>,
    allocations: usize,
}

impl ScratchBuffer {
    pub const fn new() -> Self {
        ScratchBuffer {
            data: Vec::new(),
            allocations: 0,
        }
    }

    /// Borrow a region of exactly `size` bytes.
    ///
    /// Returns the current region untouched when it already has `size` bytes,
    /// otherwise frees it and allocates a zeroed one.
    pub fn ensure_size(&mut self, size: usize) -> &mut [u8] {
        if self.data.len() != size {
            drop(core::mem::take(&mut self.data));
            self.data = vec![0; size];
            self.allocations += 1;
        }
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Address of the current region, for identity checks.
    pub fn as_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }

    /// Number of regions allocated over this buffer's lifetime.
    pub fn allocations(&self) -> usize {
        self.allocations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_size_reuses_region() {
        let mut scratch = ScratchBuffer::new();
        scratch.ensure_size(64)[0] = 42;
        let first = scratch.as_ptr();

        let region = scratch.ensure_size(64);
        assert_eq!(region[0], 42);
        assert_eq!(scratch.as_ptr(), first);
        assert_eq!(scratch.allocations(), 1);
    }

    #[test]
    fn new_size_replaces_region() {
        let mut scratch = ScratchBuffer::new();
        scratch.ensure_size(64).fill(1);

        let region = scratch.ensure_size(128);
        assert_eq!(region.len(), 128);
        assert!(region.iter().all(|&b| b == 0));
        assert_eq!(scratch.allocations(), 2);

        scratch.ensure_size(64);
        assert_eq!(scratch.len(), 64);
        assert_eq!(scratch.allocations(), 3);
    }

    #[test]
    fn empty_request_does_not_allocate() {
        let mut scratch = ScratchBuffer::new();
        assert!(scratch.ensure_size(0).is_empty());
        assert!(scratch.is_empty());
        assert_eq!(scratch.allocations(), 0);
    }
}
