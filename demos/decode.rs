//! Decode a video file and print every converted sample.
//!
//! ```sh
//! RUST_LOG=sample_demux=debug cargo run --example decode --features ffmpeg -- clip.mp4
//! ```

use std::path::PathBuf;

use clap::Parser;
use sample_demux::backend::ffmpeg::FfmpegBackend;
use sample_demux::{
    DemuxConfig, Demuxer, HeapAllocator, NATIVE_CHROMA, NATIVE_LUMA, Rational,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "decode")]
#[command(about = "Decode the first video stream of a file into native samples")]
struct Args {
    /// Media file to decode
    input: PathBuf,

    /// Drain frames still held by the decoder at end of input
    #[arg(long)]
    drain: bool,

    /// Timebase denominator used when the file declares none
    #[arg(long, default_value = "40000")]
    default_timescale: i32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = DemuxConfig {
        default_timebase: Rational::new(1, args.default_timescale),
        drain_at_end: args.drain,
    };
    let mut demuxer = Demuxer::with_config(FfmpegBackend::new(), HeapAllocator::default(), config);

    let report = demuxer.demux_with_report(&args.input)?;
    for (i, sample) in report.samples.iter().enumerate() {
        let buffer = sample.buffer();
        let timing = sample.timing();
        let stride = |plane| buffer.plane(plane).map_or(0, |p| p.bytes_per_row);
        println!(
            "#{i:<5} pts {:>10}/{}  dts {:>10}/{}  {:?} {}x{}  strides {}/{}",
            timing.presentation.value,
            timing.presentation.timescale,
            timing.decode.value,
            timing.decode.timescale,
            buffer.format(),
            buffer.size().width,
            buffer.size().height,
            stride(NATIVE_LUMA),
            stride(NATIVE_CHROMA),
        );
    }

    println!(
        "{} samples, {} dropped",
        report.samples.len(),
        report.dropped.len()
    );
    for dropped in &report.dropped {
        println!("  dropped pts {:?}: {}", dropped.pts, dropped.error);
    }
    Ok(())
}
