//! Decoder backend on top of FFmpeg, through `ffmpeg-next`.

use std::path::Path;

use ffmpeg_next as ffmpeg;
use ffmpeg::util::error::EAGAIN;

use super::{
    DecoderBackend, DecoderContext, MediaInput, MediaType, Packet, ReceiveError, StreamInfo,
    VideoDecoder,
};
use crate::frame::{Frame, Plane};
use crate::types::{PixelFormat, Rational, Size};

/// Opens files with libavformat.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegBackend;

impl FfmpegBackend {
    pub fn new() -> Self {
        FfmpegBackend
    }
}

impl DecoderBackend for FfmpegBackend {
    type Input = FfmpegInput;
    type Error = ffmpeg::Error;

    fn open(&self, path: &Path) -> Result<FfmpegInput, ffmpeg::Error> {
        ffmpeg::init()?;
        let input = ffmpeg::format::input(path)?;
        Ok(FfmpegInput { input })
    }
}

pub struct FfmpegInput {
    input: ffmpeg::format::context::Input,
}

fn media_type(medium: ffmpeg::media::Type) -> MediaType {
    match medium {
        ffmpeg::media::Type::Video => MediaType::Video,
        ffmpeg::media::Type::Audio => MediaType::Audio,
        ffmpeg::media::Type::Subtitle => MediaType::Subtitle,
        ffmpeg::media::Type::Data => MediaType::Data,
        _ => MediaType::Unknown,
    }
}

fn rational(r: ffmpeg::Rational) -> Rational {
    Rational::new(r.numerator(), r.denominator())
}

impl MediaInput for FfmpegInput {
    type Packet = FfmpegPacket;
    type Context = FfmpegContext;
    type Error = ffmpeg::Error;

    fn streams(&mut self) -> Result<Vec<StreamInfo>, ffmpeg::Error> {
        // `format::input` has already probed the container.
        Ok(self
            .input
            .streams()
            .map(|stream| {
                let parameters = stream.parameters();
                StreamInfo {
                    index: stream.index(),
                    media_type: media_type(parameters.medium()),
                    codec: parameters.id().name().to_owned(),
                    timebase: rational(stream.time_base()),
                }
            })
            .collect())
    }

    fn decoder_context(&self, stream: &StreamInfo) -> Result<Option<FfmpegContext>, ffmpeg::Error> {
        let parameters = self
            .input
            .stream(stream.index)
            .ok_or(ffmpeg::Error::StreamNotFound)?
            .parameters();
        if ffmpeg::codec::decoder::find(parameters.id()).is_none() {
            return Ok(None);
        }
        let context = ffmpeg::codec::Context::from_parameters(parameters)?;
        Ok(Some(FfmpegContext { context }))
    }

    fn read_packet(&mut self) -> Result<FfmpegPacket, ffmpeg::Error> {
        let mut packet = ffmpeg::Packet::empty();
        packet.read(&mut self.input)?;
        Ok(FfmpegPacket(packet))
    }
}

pub struct FfmpegPacket(ffmpeg::Packet);

impl Packet for FfmpegPacket {
    fn stream_index(&self) -> usize {
        self.0.stream()
    }
}

pub struct FfmpegContext {
    context: ffmpeg::codec::Context,
}

impl DecoderContext for FfmpegContext {
    type Packet = FfmpegPacket;
    type Decoder = FfmpegDecoder;
    type Error = ffmpeg::Error;

    fn timebase(&self) -> Rational {
        // SAFETY: the context owns a valid AVCodecContext for its lifetime.
        let tb = unsafe { (*self.context.as_ptr()).time_base };
        Rational::new(tb.num, tb.den)
    }

    fn open(self) -> Result<FfmpegDecoder, ffmpeg::Error> {
        let decoder = self.context.decoder().video()?;
        Ok(FfmpegDecoder { decoder })
    }
}

pub struct FfmpegDecoder {
    decoder: ffmpeg::codec::decoder::Video,
}

impl VideoDecoder for FfmpegDecoder {
    type Packet = FfmpegPacket;
    type Frame = FfmpegFrame;
    type Error = ffmpeg::Error;

    fn send_packet(&mut self, packet: &FfmpegPacket) -> Result<(), ffmpeg::Error> {
        self.decoder.send_packet(&packet.0)
    }

    fn send_eof(&mut self) -> Result<(), ffmpeg::Error> {
        self.decoder.send_eof()
    }

    fn receive_frame(&mut self) -> Result<FfmpegFrame, ReceiveError<ffmpeg::Error>> {
        let mut frame = ffmpeg::frame::Video::empty();
        match self.decoder.receive_frame(&mut frame) {
            Ok(()) => Ok(FfmpegFrame(frame)),
            Err(ffmpeg::Error::Eof) => Err(ReceiveError::Eof),
            Err(ffmpeg::Error::Other { errno }) if errno == EAGAIN => Err(ReceiveError::Again),
            Err(e) => Err(ReceiveError::Backend(e)),
        }
    }
}

/// A frame owned by libavcodec; freed on drop.
pub struct FfmpegFrame(ffmpeg::frame::Video);

impl Frame for FfmpegFrame {
    fn pixel_format(&self) -> PixelFormat {
        match self.0.format() {
            ffmpeg::format::Pixel::YUV420P => PixelFormat::Yuv420p,
            ffmpeg::format::Pixel::YUVJ420P => PixelFormat::Yuvj420p,
            ffmpeg::format::Pixel::YUVA420P => PixelFormat::Yuva420p,
            _ => PixelFormat::Other,
        }
    }

    fn size(&self) -> Size {
        Size {
            width: self.0.width(),
            height: self.0.height(),
        }
    }

    fn plane(&self, index: usize) -> Option<Plane<'_>> {
        if index >= self.0.planes() {
            return None;
        }
        // SAFETY: index is below the plane count, and the frame holds a valid AVFrame.
        let base = unsafe { (*self.0.as_ptr()).data[index] };
        if base.is_null() {
            return None;
        }
        Some(Plane {
            data: self.0.data(index),
            bytes_per_row: self.0.stride(index),
        })
    }

    fn pts(&self) -> Option<i64> {
        self.0.pts()
    }

    fn dts(&self) -> Option<i64> {
        // SAFETY: the frame holds a valid AVFrame.
        let dts = unsafe { (*self.0.as_ptr()).pkt_dts };
        (dts != ffmpeg::ffi::AV_NOPTS_VALUE).then_some(dts)
    }
}
