//! The decoder backend seam: containers, packets, decoding contexts and frames.
//!
//! Packets and frames release their backend resources when dropped.

use std::path::Path;

use crate::frame::Frame;
use crate::types::Rational;

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
pub mod memory;

/// Error bound shared by every backend error type.
pub trait BackendErrorBound: std::error::Error + Send + Sync + 'static {}
impl<T: std::error::Error + Send + Sync + 'static> BackendErrorBound for T {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Video,
    Audio,
    Subtitle,
    Data,
    Unknown,
}

/// One elementary stream of an opened source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub index: usize,
    pub media_type: MediaType,
    /// Codec identifier as the backend names it, e.g. `h264`.
    pub codec: String,
    pub timebase: Rational,
}

/// Opens media sources.
pub trait DecoderBackend {
    type Input: MediaInput;
    type Error: BackendErrorBound;

    fn open(&self, path: &Path) -> Result<Self::Input, Self::Error>;
}

/// An opened media source.
pub trait MediaInput {
    type Packet: Packet;
    type Context: DecoderContext<Packet = Self::Packet>;
    type Error: BackendErrorBound;

    /// Probe and describe every stream in the source.
    fn streams(&mut self) -> Result<Vec<StreamInfo>, Self::Error>;

    /// A decoding context for `stream` with the stream's parameters applied,
    /// or `None` when no decoder exists for its codec.
    fn decoder_context(&self, stream: &StreamInfo) -> Result<Option<Self::Context>, Self::Error>;

    /// Read the next compressed packet. End of input is reported as an error.
    fn read_packet(&mut self) -> Result<Self::Packet, Self::Error>;
}

/// A compressed packet.
pub trait Packet {
    fn stream_index(&self) -> usize;
}

/// A configured, not yet opened, decoding context.
pub trait DecoderContext {
    type Packet;
    type Decoder: VideoDecoder<Packet = Self::Packet>;
    type Error: BackendErrorBound;

    /// The context's own timebase, absent when the codec does not set one.
    fn timebase(&self) -> Rational;

    fn open(self) -> Result<Self::Decoder, Self::Error>;
}

/// Why [`VideoDecoder::receive_frame`] produced no frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveError<E> {
    /// The decoder needs more input first.
    Again,
    /// The decoder has been fully drained.
    Eof,
    Backend(E),
}

/// An opened video decoder.
pub trait VideoDecoder {
    type Packet;
    type Frame: Frame;
    type Error: BackendErrorBound;

    fn send_packet(&mut self, packet: &Self::Packet) -> Result<(), Self::Error>;

    /// Signal end of input so buffered frames can be drained.
    fn send_eof(&mut self) -> Result<(), Self::Error>;

    fn receive_frame(&mut self) -> Result<Self::Frame, ReceiveError<Self::Error>>;
}
