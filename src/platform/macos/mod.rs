//! CoreVideo / CoreMedia native buffers.

pub mod buffer;
pub mod time;

pub use buffer::{CoreMediaSample, CoreVideoAllocator, CoreVideoBuffer, PixelBufferLock};
