use std::error::Error as StdError;

use crate::plane::PlaneError;
use crate::types::Status;

/// Boxed error raised by a decoder backend.
pub type BackendError = Box<dyn StdError + Send + Sync + 'static>;

/// Why a decoded frame was refused before conversion.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidFrameReason {
    #[error("luma plane is missing")]
    MissingLuma,
    #[error("chroma plane {0} is missing")]
    MissingChroma(usize),
    #[error("alpha plane is missing")]
    MissingAlpha,
    #[error("chroma strides differ ({cb} vs {cr})")]
    ChromaStrideMismatch { cb: usize, cr: usize },
    #[error("frame has no area ({width}x{height})")]
    ZeroSize { width: u32, height: u32 },
}

/// Failure to turn one decoded frame into a native sample.
///
/// Only the frame being converted is affected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConvertError {
    #[error("invalid frame: {0}")]
    InvalidFrame(InvalidFrameReason),
    #[error("plane copy failed: {0}")]
    Plane(#[from] PlaneError),
    #[error("native buffer allocation failed (status {0})")]
    BufferAllocationFailed(Status),
    #[error("native buffer lock failed (status {0})")]
    BufferLockFailed(Status),
    #[error("native buffer has {actual} planes, expected {expected}")]
    BufferLayout { expected: usize, actual: usize },
    #[error("format description creation failed (status {0})")]
    FormatDescriptionFailed(Status),
    #[error("sample construction failed (status {0})")]
    SampleConstructionFailed(Status),
}

impl ConvertError {
    /// True for errors caused by the shape of the input frame rather than
    /// the native buffer allocator.
    pub fn is_input_shape(&self) -> bool {
        matches!(self, Self::InvalidFrame(_) | Self::Plane(_))
    }
}

impl From<InvalidFrameReason> for ConvertError {
    fn from(reason: InvalidFrameReason) -> Self {
        Self::InvalidFrame(reason)
    }
}

/// Failure that aborts a whole demux call before any decoding.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum DemuxError {
    #[error("failed to open source: {0}")]
    Open(#[source] BackendError),
    #[error("failed to read stream information: {0}")]
    StreamInfo(#[source] BackendError),
    #[error("no video stream found")]
    StreamNotFound,
    #[error("no decoder found for codec `{0}`")]
    CodecNotFound(String),
    #[error("failed to open decoder: {0}")]
    OpenDecoder(#[source] BackendError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let e = ConvertError::from(InvalidFrameReason::ChromaStrideMismatch { cb: 32, cr: 48 });
        assert_eq!(
            e.to_string(),
            "invalid frame: chroma strides differ (32 vs 48)"
        );

        let e = ConvertError::BufferAllocationFailed(-6661);
        assert_eq!(
            e.to_string(),
            "native buffer allocation failed (status -6661)"
        );

        assert_eq!(DemuxError::StreamNotFound.to_string(), "no video stream found");
    }

    #[test]
    fn error_classes() {
        assert!(ConvertError::InvalidFrame(InvalidFrameReason::MissingLuma).is_input_shape());
        assert!(ConvertError::Plane(PlaneError::Overflow).is_input_shape());
        assert!(!ConvertError::BufferLockFailed(-6660).is_input_shape());
    }

    #[test]
    fn error_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.mp4");
        let e = DemuxError::Open(Box::new(io));
        assert!(StdError::source(&e).is_some());
        assert!(StdError::source(&DemuxError::StreamNotFound).is_none());
    }
}
