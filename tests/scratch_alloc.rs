//! Heap accounting for the scratch buffer and frame validation.
//!
//! Runs in its own test binary so the counting allocator sees nothing else.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

use sample_demux::{
    ConvertError, FrameConverter, HeapAllocator, InvalidFrameReason, OwnedPlane, PixelFormat,
    ScratchBuffer, Size, Time, VideoFrame,
};

struct Counting;

thread_local! {
    static ALLOCATIONS: Cell<usize> = const { Cell::new(0) };
    static FREES: Cell<usize> = const { Cell::new(0) };
}

fn bump(counter: &'static std::thread::LocalKey<Cell<usize>>) {
    let _ = counter.try_with(|c| c.set(c.get() + 1));
}

unsafe impl GlobalAlloc for Counting {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        bump(&ALLOCATIONS);
        unsafe { System.alloc(layout) }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        bump(&ALLOCATIONS);
        unsafe { System.alloc_zeroed(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        bump(&FREES);
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static GLOBAL: Counting = Counting;

/// Run `f`, returning its result with the allocations and frees it made on this thread.
fn counted<R>(f: impl FnOnce() -> R) -> (R, usize, usize) {
    let allocations = ALLOCATIONS.with(Cell::get);
    let frees = FREES.with(Cell::get);
    let result = f();
    (
        result,
        ALLOCATIONS.with(Cell::get) - allocations,
        FREES.with(Cell::get) - frees,
    )
}

#[test]
fn equal_sizes_do_not_touch_the_heap() {
    let mut scratch = ScratchBuffer::new();
    scratch.ensure_size(4096);
    let first = scratch.as_ptr();

    let (len, allocations, frees) = counted(|| scratch.ensure_size(4096).len());
    assert_eq!(len, 4096);
    assert_eq!((allocations, frees), (0, 0));
    assert_eq!(scratch.as_ptr(), first);
}

#[test]
fn resizing_frees_the_old_region() {
    let mut scratch = ScratchBuffer::new();
    scratch.ensure_size(4096);

    let (len, allocations, frees) = counted(|| scratch.ensure_size(8192).len());
    assert_eq!(len, 8192);
    assert_eq!((allocations, frees), (1, 1));

    let ((), allocations, frees) = counted(|| drop(scratch));
    assert_eq!((allocations, frees), (0, 1));
}

#[test]
fn invalid_frame_allocates_nothing() {
    let frame = VideoFrame::new(
        PixelFormat::Yuv420p,
        Size {
            width: 4,
            height: 4,
        },
    )
    .with_plane(None)
    .with_plane(Some(OwnedPlane {
        data: vec![128; 8],
        bytes_per_row: 2,
    }))
    .with_plane(Some(OwnedPlane {
        data: vec![128; 8],
        bytes_per_row: 2,
    }));
    let mut converter = FrameConverter::new(HeapAllocator::default());

    let (result, allocations, _) = counted(|| converter.convert(&frame, Time::new(1, 25)).err());
    assert_eq!(
        result,
        Some(ConvertError::InvalidFrame(InvalidFrameReason::MissingLuma))
    );
    assert_eq!(allocations, 0);
    assert_eq!(converter.scratch().allocations(), 0);
}
