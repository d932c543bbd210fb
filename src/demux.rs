//! The demux/decode loop.

use std::path::Path;

use tracing::{debug, warn};

use crate::backend::{
    DecoderBackend, DecoderContext, MediaInput, MediaType, Packet, ReceiveError, VideoDecoder,
};
use crate::buffer::BufferAllocator;
use crate::converter::FrameConverter;
use crate::error::{ConvertError, DemuxError};
use crate::frame::Frame;
use crate::timebase::{DEFAULT_TIMEBASE, resolve_timebase};
use crate::types::{Rational, Time};

/// Demux loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemuxConfig {
    /// Timebase used when neither the stream nor its decoder declares one.
    pub default_timebase: Rational,
    /// Signal end of input once reading stops and convert the frames the
    /// decoder still holds.
    pub drain_at_end: bool,
}

impl Default for DemuxConfig {
    fn default() -> Self {
        Self {
            default_timebase: DEFAULT_TIMEBASE,
            drain_at_end: false,
        }
    }
}

/// A decoded frame that could not be converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedFrame {
    pub pts: Option<i64>,
    pub error: ConvertError,
}

/// Converted samples in decode order, plus the frames that were dropped.
#[derive(Debug)]
pub struct DemuxReport<S> {
    pub samples: Vec<S>,
    pub dropped: Vec<DroppedFrame>,
}

/// Turns a media source into a sequence of native samples.
pub trait Demux {
    type Sample;

    /// Decode the first video stream of `source`.
    ///
    /// Blocks until the source is exhausted. Fails only on stream setup;
    /// frames that fail conversion are left out.
    fn demux(&mut self, source: &Path) -> Result<Vec<Self::Sample>, DemuxError>;
}

/// Decodes sources from `B` into samples allocated by `A`.
pub struct Demuxer<B, A: BufferAllocator> {
    backend: B,
    converter: FrameConverter<A>,
    config: DemuxConfig,
}

impl<B, A> Demuxer<B, A>
where
    B: DecoderBackend,
    A: BufferAllocator,
{
    pub fn new(backend: B, allocator: A) -> Self {
        Self::with_config(backend, allocator, DemuxConfig::default())
    }

    pub fn with_config(backend: B, allocator: A, config: DemuxConfig) -> Self {
        Demuxer {
            backend,
            converter: FrameConverter::new(allocator),
            config,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn converter(&self) -> &FrameConverter<A> {
        &self.converter
    }

    pub fn config(&self) -> &DemuxConfig {
        &self.config
    }

    /// Like [`Demux::demux`], but also reports every frame that was dropped.
    pub fn demux_with_report(
        &mut self,
        source: &Path,
    ) -> Result<DemuxReport<A::Sample>, DemuxError> {
        let mut input = self
            .backend
            .open(source)
            .map_err(|e| DemuxError::Open(Box::new(e)))?;
        let streams = input
            .streams()
            .map_err(|e| DemuxError::StreamInfo(Box::new(e)))?;
        let stream = streams
            .into_iter()
            .find(|s| s.media_type == MediaType::Video)
            .ok_or(DemuxError::StreamNotFound)?;

        let context = input
            .decoder_context(&stream)
            .map_err(|e| DemuxError::OpenDecoder(Box::new(e)))?
            .ok_or_else(|| DemuxError::CodecNotFound(stream.codec.clone()))?;
        let timebase = resolve_timebase(
            [stream.timebase, context.timebase()],
            self.config.default_timebase,
        );
        let mut decoder = context
            .open()
            .map_err(|e| DemuxError::OpenDecoder(Box::new(e)))?;
        debug!(
            stream = stream.index,
            codec = %stream.codec,
            timebase = ?timebase,
            "decoding video stream"
        );

        let mut report = DemuxReport {
            samples: Vec::new(),
            dropped: Vec::new(),
        };
        loop {
            let packet = match input.read_packet() {
                Ok(packet) => packet,
                Err(e) => {
                    debug!(reason = %e, "stopped reading packets");
                    break;
                }
            };
            if packet.stream_index() != stream.index {
                continue;
            }
            if let Err(e) = decoder.send_packet(&packet) {
                warn!(error = %e, "decoder rejected packet");
                continue;
            }
            self.receive_frames(&mut decoder, timebase, &mut report);
        }

        if self.config.drain_at_end {
            match decoder.send_eof() {
                Ok(()) => self.receive_frames(&mut decoder, timebase, &mut report),
                Err(e) => warn!(error = %e, "failed to drain decoder"),
            }
        }

        debug!(
            samples = report.samples.len(),
            dropped = report.dropped.len(),
            "demux finished"
        );
        Ok(report)
    }

    /// Convert frames until the decoder has nothing more for now.
    fn receive_frames<D: VideoDecoder>(
        &mut self,
        decoder: &mut D,
        timebase: Time,
        report: &mut DemuxReport<A::Sample>,
    ) {
        loop {
            let frame = match decoder.receive_frame() {
                Ok(frame) => frame,
                Err(ReceiveError::Again | ReceiveError::Eof) => return,
                Err(ReceiveError::Backend(e)) => {
                    warn!(error = %e, "failed to receive frame");
                    return;
                }
            };
            match self.converter.convert(&frame, timebase) {
                Ok(sample) => report.samples.push(sample),
                Err(error) => {
                    warn!(pts = ?frame.pts(), %error, "dropped frame");
                    report.dropped.push(DroppedFrame {
                        pts: frame.pts(),
                        error,
                    });
                }
            }
        }
    }
}

impl<B, A> Demux for Demuxer<B, A>
where
    B: DecoderBackend,
    A: BufferAllocator,
{
    type Sample = A::Sample;

    fn demux(&mut self, source: &Path) -> Result<Vec<A::Sample>, DemuxError> {
        self.demux_with_report(source).map(|report| report.samples)
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::backend::memory::{MemoryBackend, MemorySource, Outcome};
    use crate::converter::testing::{Fault, FaultyAllocator};
    use crate::error::InvalidFrameReason;
    use crate::frame::{OwnedPlane, VideoFrame};
    use crate::heap::HeapAllocator;
    use crate::types::{PixelFormat, Size};

    fn frame(pts: i64) -> VideoFrame {
        let plane = |bytes_per_row: usize, rows: usize| {
            Some(OwnedPlane {
                data: vec![16; bytes_per_row * rows],
                bytes_per_row,
            })
        };
        VideoFrame::new(
            PixelFormat::Yuv420p,
            Size {
                width: 4,
                height: 4,
            },
        )
        .with_plane(plane(4, 4))
        .with_plane(plane(2, 2))
        .with_plane(plane(2, 2))
        .with_timestamps(Some(pts), Some(pts))
    }

    fn memory_demuxer(source: MemorySource) -> Demuxer<MemoryBackend, HeapAllocator> {
        Demuxer::new(
            MemoryBackend::new().with_source("clip.mp4", source),
            HeapAllocator::default(),
        )
    }

    #[test]
    fn missing_decoder_is_reported() {
        let mut demuxer = memory_demuxer(
            MemorySource::new()
                .with_video_stream("av1", Rational::new(1, 25))
                .without_decoder("av1")
                .with_packet(0, Outcome::Frames(vec![frame(0)])),
        );

        let err = demuxer.demux(Path::new("clip.mp4")).unwrap_err();
        assert!(matches!(err, DemuxError::CodecNotFound(codec) if codec == "av1"));
        assert_eq!(demuxer.backend().packets_read(), 0);
    }

    #[test]
    fn open_failures_are_setup_errors() {
        let mut demuxer = memory_demuxer(MemorySource::new());
        assert!(matches!(
            demuxer.demux(Path::new("nope.mp4")),
            Err(DemuxError::Open(_))
        ));

        let mut demuxer = memory_demuxer(
            MemorySource::new()
                .with_video_stream("h264", Rational::new(1, 25))
                .with_broken_decoder(),
        );
        assert!(matches!(
            demuxer.demux(Path::new("clip.mp4")),
            Err(DemuxError::OpenDecoder(_))
        ));

        let mut demuxer = memory_demuxer(MemorySource::new().with_broken_stream_info());
        assert!(matches!(
            demuxer.demux(Path::new("clip.mp4")),
            Err(DemuxError::StreamInfo(_))
        ));
    }

    #[test]
    fn context_timebase_used_when_stream_has_none() {
        let mut demuxer = memory_demuxer(
            MemorySource::new()
                .with_video_stream("h264", Rational::ZERO)
                .with_codec_timebase(Rational::new(1, 25))
                .with_packet(0, Outcome::Frames(vec![frame(4)])),
        );

        let samples = demuxer.demux(Path::new("clip.mp4")).unwrap();
        assert_eq!(samples[0].timing().presentation, Time::new(4, 25));
    }

    #[test]
    #[traced_test]
    fn failed_packets_do_not_stop_the_loop() {
        let mut demuxer = memory_demuxer(
            MemorySource::new()
                .with_video_stream("h264", Rational::new(1, 25))
                .with_packet(0, Outcome::SendError("corrupt slice".into()))
                .with_packet(0, Outcome::ReceiveError("bad frame".into()))
                .with_packet(0, Outcome::Frames(vec![frame(2)])),
        );

        let samples = demuxer.demux(Path::new("clip.mp4")).unwrap();
        assert_eq!(samples.len(), 1);
        assert!(logs_contain("decoder rejected packet"));
        assert!(logs_contain("failed to receive frame"));
        assert_eq!(demuxer.backend().live_packets(), 0);
    }

    #[test]
    #[traced_test]
    fn bad_frames_are_reported() {
        let mut broken = frame(1);
        broken.planes[0] = None;
        let mut demuxer = memory_demuxer(
            MemorySource::new()
                .with_video_stream("h264", Rational::new(1, 25))
                .with_packet(0, Outcome::Frames(vec![frame(0), broken, frame(2)])),
        );

        let report = demuxer.demux_with_report(Path::new("clip.mp4")).unwrap();
        assert_eq!(report.samples.len(), 2);
        assert_eq!(
            report.dropped,
            [DroppedFrame {
                pts: Some(1),
                error: ConvertError::InvalidFrame(InvalidFrameReason::MissingLuma),
            }]
        );
        assert!(logs_contain("dropped frame"));
        assert_eq!(demuxer.backend().live_frames(), 0);
    }

    #[test]
    #[traced_test]
    fn allocation_failure_drops_only_that_frame() {
        let source = MemorySource::new()
            .with_video_stream("h264", Rational::new(1, 25))
            .with_packet(0, Outcome::Frames(vec![frame(0)]))
            .with_packet(0, Outcome::Frames(vec![frame(1)]))
            .with_packet(0, Outcome::Frames(vec![frame(2)]));
        let mut demuxer = Demuxer::new(
            MemoryBackend::new().with_source("clip.mp4", source),
            FaultyAllocator::new(Fault::Create(-6662)).on_call(1),
        );

        let report = demuxer.demux_with_report(Path::new("clip.mp4")).unwrap();
        let pts: Vec<_> = report
            .samples
            .iter()
            .map(|s| s.timing().presentation.value)
            .collect();
        assert_eq!(pts, [0, 2]);
        assert_eq!(
            report.dropped,
            [DroppedFrame {
                pts: Some(1),
                error: ConvertError::BufferAllocationFailed(-6662),
            }]
        );
        assert!(logs_contain("dropped frame"));

        let allocator = demuxer.converter().allocator();
        assert_eq!((allocator.locks(), allocator.unlocks()), (2, 2));
        assert_eq!(demuxer.backend().live_packets(), 0);
        assert_eq!(demuxer.backend().live_frames(), 0);
    }

    #[test]
    fn held_frames_need_drain() {
        let source = MemorySource::new()
            .with_video_stream("h264", Rational::new(1, 25))
            .with_packet(0, Outcome::Frames(vec![frame(0)]))
            .with_held_frames([frame(1), frame(2)]);

        let mut plain = memory_demuxer(source.clone());
        assert_eq!(plain.demux(Path::new("clip.mp4")).unwrap().len(), 1);

        let mut draining = Demuxer::with_config(
            MemoryBackend::new().with_source("clip.mp4", source),
            HeapAllocator::default(),
            DemuxConfig {
                drain_at_end: true,
                ..DemuxConfig::default()
            },
        );
        let samples = draining.demux(Path::new("clip.mp4")).unwrap();
        let pts: Vec<_> = samples
            .iter()
            .map(|s| s.timing().presentation.value)
            .collect();
        assert_eq!(pts, [0, 1, 2]);
    }
}
