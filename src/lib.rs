#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod alpha;
pub mod chroma;
pub mod format;
pub mod frame;
pub mod plane;
pub mod timebase;
pub mod types;

#[cfg(feature = "alloc")]
pub mod scratch;

#[cfg(feature = "std")]
pub mod backend;
#[cfg(feature = "std")]
pub mod buffer;
#[cfg(feature = "std")]
pub mod converter;
#[cfg(feature = "std")]
pub mod demux;
#[cfg(feature = "std")]
pub mod error;
#[cfg(feature = "std")]
pub mod heap;
#[cfg(feature = "std")]
pub mod platform;

// Re-exports
pub use frame::*;
pub use plane::{PlaneError, copy_plane};
pub use timebase::{DEFAULT_TIMEBASE, resolve_timebase};
pub use types::*;

#[cfg(feature = "alloc")]
pub use scratch::ScratchBuffer;

#[cfg(feature = "std")]
pub use buffer::*;
#[cfg(feature = "std")]
pub use converter::FrameConverter;
#[cfg(feature = "std")]
pub use demux::{Demux, DemuxConfig, DemuxReport, Demuxer, DroppedFrame};
#[cfg(feature = "std")]
pub use error::*;
#[cfg(feature = "std")]
pub use heap::{HeapAllocator, HeapBuffer, HeapDescription, HeapSample};
