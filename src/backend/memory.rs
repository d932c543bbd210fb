//! A scripted, in-memory decoder backend.
//!
//! Sources are registered by path. Each one lists its streams and a packet
//! sequence; every packet carries what the decoder does with it. Live packets
//! and frames are counted so callers can check that each one is released.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{
    DecoderBackend, DecoderContext, MediaInput, MediaType, Packet, ReceiveError, StreamInfo,
    VideoDecoder,
};
use crate::frame::{Frame, Plane, VideoFrame};
use crate::types::{PixelFormat, Rational, Size};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("no source registered at {0}")]
    NotFound(PathBuf),
    #[error("source has no readable stream information")]
    StreamInfo,
    #[error("end of input")]
    EndOfInput,
    #[error("decoder for `{0}` failed to open")]
    Open(String),
    #[error("packet rejected: {0}")]
    Send(String),
    #[error("decoding failed: {0}")]
    Decode(String),
}

/// What the decoder does with one packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Accept the packet and produce these frames.
    Frames(Vec<VideoFrame>),
    /// Refuse the packet.
    SendError(String),
    /// Accept the packet, then fail the first receive.
    ReceiveError(String),
}

#[derive(Debug, Clone)]
struct ScriptedPacket {
    stream_index: usize,
    outcome: Outcome,
}

/// Contents of one in-memory source.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    streams: Vec<StreamInfo>,
    packets: Vec<ScriptedPacket>,
    held: Vec<VideoFrame>,
    codec_timebase: Option<Rational>,
    unsupported: Vec<String>,
    broken_stream_info: bool,
    broken_decoder: bool,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stream(mut self, stream: StreamInfo) -> Self {
        self.streams.push(stream);
        self
    }

    /// Add a video stream at the next index.
    pub fn with_video_stream(self, codec: &str, timebase: Rational) -> Self {
        let index = self.streams.len();
        self.with_stream(StreamInfo {
            index,
            media_type: MediaType::Video,
            codec: codec.to_owned(),
            timebase,
        })
    }

    /// Add an audio stream at the next index.
    pub fn with_audio_stream(self, codec: &str) -> Self {
        let index = self.streams.len();
        self.with_stream(StreamInfo {
            index,
            media_type: MediaType::Audio,
            codec: codec.to_owned(),
            timebase: Rational::new(1, 48_000),
        })
    }

    pub fn with_packet(mut self, stream_index: usize, outcome: Outcome) -> Self {
        self.packets.push(ScriptedPacket {
            stream_index,
            outcome,
        });
        self
    }

    /// Frames the decoder holds back until end of input is signalled.
    pub fn with_held_frames(mut self, frames: impl IntoIterator<Item = VideoFrame>) -> Self {
        self.held.extend(frames);
        self
    }

    /// Timebase reported by decoding contexts. Absent unless set.
    pub fn with_codec_timebase(mut self, timebase: Rational) -> Self {
        self.codec_timebase = Some(timebase);
        self
    }

    /// Pretend no decoder exists for `codec`.
    pub fn without_decoder(mut self, codec: &str) -> Self {
        self.unsupported.push(codec.to_owned());
        self
    }

    pub fn with_broken_stream_info(mut self) -> Self {
        self.broken_stream_info = true;
        self
    }

    pub fn with_broken_decoder(mut self) -> Self {
        self.broken_decoder = true;
        self
    }
}

#[derive(Debug, Default)]
struct Counts {
    live_packets: AtomicUsize,
    live_frames: AtomicUsize,
    packets: AtomicUsize,
    frames: AtomicUsize,
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Packet,
    Frame,
}

/// Keeps one packet or frame counted as live until dropped.
#[derive(Debug)]
struct Tracked {
    counts: Arc<Counts>,
    kind: Kind,
}

impl Tracked {
    fn new(counts: &Arc<Counts>, kind: Kind) -> Self {
        let (live, total) = match kind {
            Kind::Packet => (&counts.live_packets, &counts.packets),
            Kind::Frame => (&counts.live_frames, &counts.frames),
        };
        live.fetch_add(1, Ordering::Relaxed);
        total.fetch_add(1, Ordering::Relaxed);
        Tracked {
            counts: counts.clone(),
            kind,
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        let live = match self.kind {
            Kind::Packet => &self.counts.live_packets,
            Kind::Frame => &self.counts.live_frames,
        };
        live.fetch_sub(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    sources: HashMap<PathBuf, MemorySource>,
    counts: Arc<Counts>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, source: MemorySource) {
        self.sources.insert(path.into(), source);
    }

    pub fn with_source(mut self, path: impl Into<PathBuf>, source: MemorySource) -> Self {
        self.insert(path, source);
        self
    }

    /// Packets read and not yet dropped.
    pub fn live_packets(&self) -> usize {
        self.counts.live_packets.load(Ordering::Relaxed)
    }

    /// Frames received and not yet dropped.
    pub fn live_frames(&self) -> usize {
        self.counts.live_frames.load(Ordering::Relaxed)
    }

    pub fn packets_read(&self) -> usize {
        self.counts.packets.load(Ordering::Relaxed)
    }

    pub fn frames_received(&self) -> usize {
        self.counts.frames.load(Ordering::Relaxed)
    }
}

impl DecoderBackend for MemoryBackend {
    type Input = MemoryInput;
    type Error = MemoryError;

    fn open(&self, path: &Path) -> Result<MemoryInput, MemoryError> {
        let source = self
            .sources
            .get(path)
            .ok_or_else(|| MemoryError::NotFound(path.to_path_buf()))?;
        Ok(MemoryInput {
            source: source.clone(),
            cursor: 0,
            counts: self.counts.clone(),
        })
    }
}

pub struct MemoryInput {
    source: MemorySource,
    cursor: usize,
    counts: Arc<Counts>,
}

impl MediaInput for MemoryInput {
    type Packet = MemoryPacket;
    type Context = MemoryContext;
    type Error = MemoryError;

    fn streams(&mut self) -> Result<Vec<StreamInfo>, MemoryError> {
        if self.source.broken_stream_info {
            return Err(MemoryError::StreamInfo);
        }
        Ok(self.source.streams.clone())
    }

    fn decoder_context(&self, stream: &StreamInfo) -> Result<Option<MemoryContext>, MemoryError> {
        if self.source.unsupported.contains(&stream.codec) {
            return Ok(None);
        }
        Ok(Some(MemoryContext {
            codec: stream.codec.clone(),
            timebase: self.source.codec_timebase.unwrap_or(Rational::ZERO),
            broken: self.source.broken_decoder,
            held: self.source.held.clone(),
            counts: self.counts.clone(),
        }))
    }

    fn read_packet(&mut self) -> Result<MemoryPacket, MemoryError> {
        let scripted = self
            .source
            .packets
            .get(self.cursor)
            .ok_or(MemoryError::EndOfInput)?;
        self.cursor += 1;
        Ok(MemoryPacket {
            stream_index: scripted.stream_index,
            outcome: scripted.outcome.clone(),
            _tracked: Tracked::new(&self.counts, Kind::Packet),
        })
    }
}

#[derive(Debug)]
pub struct MemoryPacket {
    stream_index: usize,
    outcome: Outcome,
    _tracked: Tracked,
}

impl Packet for MemoryPacket {
    fn stream_index(&self) -> usize {
        self.stream_index
    }
}

pub struct MemoryContext {
    codec: String,
    timebase: Rational,
    broken: bool,
    held: Vec<VideoFrame>,
    counts: Arc<Counts>,
}

impl DecoderContext for MemoryContext {
    type Packet = MemoryPacket;
    type Decoder = MemoryDecoder;
    type Error = MemoryError;

    fn timebase(&self) -> Rational {
        self.timebase
    }

    fn open(self) -> Result<MemoryDecoder, MemoryError> {
        if self.broken {
            return Err(MemoryError::Open(self.codec));
        }
        Ok(MemoryDecoder {
            pending: VecDeque::new(),
            failure: None,
            held: self.held,
            eof: false,
            counts: self.counts,
        })
    }
}

pub struct MemoryDecoder {
    pending: VecDeque<VideoFrame>,
    failure: Option<String>,
    held: Vec<VideoFrame>,
    eof: bool,
    counts: Arc<Counts>,
}

impl VideoDecoder for MemoryDecoder {
    type Packet = MemoryPacket;
    type Frame = MemoryFrame;
    type Error = MemoryError;

    fn send_packet(&mut self, packet: &MemoryPacket) -> Result<(), MemoryError> {
        match &packet.outcome {
            Outcome::Frames(frames) => self.pending.extend(frames.iter().cloned()),
            Outcome::SendError(reason) => return Err(MemoryError::Send(reason.clone())),
            Outcome::ReceiveError(reason) => self.failure = Some(reason.clone()),
        }
        Ok(())
    }

    fn send_eof(&mut self) -> Result<(), MemoryError> {
        self.eof = true;
        self.pending.extend(self.held.drain(..));
        Ok(())
    }

    fn receive_frame(&mut self) -> Result<MemoryFrame, ReceiveError<MemoryError>> {
        if let Some(reason) = self.failure.take() {
            return Err(ReceiveError::Backend(MemoryError::Decode(reason)));
        }
        match self.pending.pop_front() {
            Some(frame) => Ok(MemoryFrame {
                frame,
                _tracked: Tracked::new(&self.counts, Kind::Frame),
            }),
            None if self.eof => Err(ReceiveError::Eof),
            None => Err(ReceiveError::Again),
        }
    }
}

/// A frame handed out by [`MemoryDecoder`].
#[derive(Debug)]
pub struct MemoryFrame {
    frame: VideoFrame,
    _tracked: Tracked,
}

impl Frame for MemoryFrame {
    fn pixel_format(&self) -> PixelFormat {
        self.frame.pixel_format()
    }

    fn size(&self) -> Size {
        self.frame.size()
    }

    fn plane(&self, index: usize) -> Option<Plane<'_>> {
        self.frame.plane(index)
    }

    fn pts(&self) -> Option<i64> {
        self.frame.pts()
    }

    fn dts(&self) -> Option<i64> {
        self.frame.dts()
    }
}
