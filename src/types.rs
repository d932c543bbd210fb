use arrayvec::ArrayVec;

/// Maximum number of planes a decoded frame can carry.
pub const MAX_FRAME_PLANES: usize = 4;

/// Maximum number of planes in a native buffer.
pub const MAX_NATIVE_PLANES: usize = 3;

/// Source plane indices of a planar 4:2:0 frame.
pub const SOURCE_LUMA: usize = 0;
pub const SOURCE_CB: usize = 1;
pub const SOURCE_CR: usize = 2;
pub const SOURCE_ALPHA: usize = 3;

/// Native buffer plane indices.
pub const NATIVE_LUMA: usize = 0;
pub const NATIVE_CHROMA: usize = 1;
pub const NATIVE_ALPHA: usize = 2;

/// Pixel formats a decoder can hand us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PixelFormat {
    /// 8-bit planar 4:2:0, video range.
    Yuv420p,
    /// 8-bit planar 4:2:0, full range (JPEG).
    Yuvj420p,
    /// 8-bit planar 4:2:0 with a fourth, full-resolution alpha plane.
    Yuva420p,
    /// Anything else the decoder produces.
    Other,
}

impl PixelFormat {
    pub fn has_alpha(&self) -> bool {
        matches!(self, Self::Yuva420p)
    }
}

/// Native buffer layouts we can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeFormat {
    /// Luma plane plus one interleaved CbCr plane ('420v').
    BiPlanar420VideoRange,
    /// Luma, interleaved CbCr and a separate alpha plane ('v0a8').
    TriPlanar420VideoRangeAlpha,
}

/// Row length and row count of one plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaneShape {
    pub row_bytes: usize,
    pub rows: usize,
}

impl NativeFormat {
    /// The CoreVideo pixel format type for this layout.
    pub fn fourcc(&self) -> u32 {
        #[allow(clippy::mistyped_literal_suffixes)]
        match self {
            Self::BiPlanar420VideoRange => 0x34_32_30_76, // '420v'
            Self::TriPlanar420VideoRangeAlpha => 0x76_30_61_38, // 'v0a8'
        }
    }

    pub fn has_alpha(&self) -> bool {
        matches!(self, Self::TriPlanar420VideoRangeAlpha)
    }

    pub fn plane_count(&self) -> usize {
        if self.has_alpha() { 3 } else { 2 }
    }

    /// Per-plane shape for a buffer of the given size, in native plane order.
    pub fn plane_shapes(&self, size: Size) -> ArrayVec<PlaneShape, MAX_NATIVE_PLANES> {
        let width = size.width as usize;
        let height = size.height as usize;

        let mut shapes = ArrayVec::new();
        shapes.push(PlaneShape {
            row_bytes: width,
            rows: height,
        });
        shapes.push(PlaneShape {
            row_bytes: width.div_ceil(2) * 2,
            rows: height.div_ceil(2),
        });
        if self.has_alpha() {
            shapes.push(PlaneShape {
                row_bytes: width,
                rows: height,
            });
        }
        shapes
    }
}

/// Pixel dimensions of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

/// A rational number (numerator / denominator).
///
/// Used for stream and codec time bases, e.g. 1/90000 for MPEG-TS.
/// A rational with a zero component is treated as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    pub numerator: i32,
    pub denominator: i32,
}

impl Rational {
    pub const ZERO: Self = Self::new(0, 0);

    pub const fn new(numerator: i32, denominator: i32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Whether this candidate timebase should be skipped.
    ///
    /// Any zero component counts, not only `0/0`: FFmpeg leaves unset codec
    /// timebases at `0/1`, and a zero denominator has no tick duration.
    pub fn is_absent(&self) -> bool {
        self.numerator == 0 || self.denominator == 0
    }

    pub fn as_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

/// A fixed-point time value mirroring Core Media's `CMTime`.
///
/// `value / timescale` seconds. A zero timescale marks an invalid time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Time {
    pub value: i64,
    pub timescale: i32,
}

impl Time {
    pub const INVALID: Self = Self {
        value: 0,
        timescale: 0,
    };

    pub const fn new(value: i64, timescale: i32) -> Self {
        Self { value, timescale }
    }

    /// Stamp raw `ticks` with the timescale of the resolved timebase `unit`.
    ///
    /// The tick count is kept as the value and the numerator of `unit` is not
    /// applied, so `3` ticks of `1001/30000` become `3/30000`. Use
    /// [`Time::from_ticks_scaled`] for wall-clock values.
    pub fn from_ticks(ticks: Option<i64>, unit: Time) -> Self {
        match ticks {
            Some(ticks) if unit.is_valid() => Self {
                value: ticks,
                timescale: unit.timescale,
            },
            _ => Self::INVALID,
        }
    }

    /// Like [`Time::from_ticks`], but multiplies the ticks by the numerator of
    /// `unit` so the result is in seconds: `3` ticks of `1001/30000` become
    /// `3003/30000`.
    pub fn from_ticks_scaled(ticks: Option<i64>, unit: Time) -> Self {
        match ticks {
            Some(ticks) if unit.is_valid() => Self {
                value: ticks.saturating_mul(unit.value),
                timescale: unit.timescale,
            },
            _ => Self::INVALID,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.timescale > 0
    }

    pub fn as_secs_f64(&self) -> f64 {
        if self.is_valid() {
            self.value as f64 / self.timescale as f64
        } else {
            0.0
        }
    }
}

/// Presentation and decode time of one native sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleTiming {
    pub presentation: Time,
    pub decode: Time,
}

/// Status code reported by a native buffer allocator (`CVReturn` / `OSStatus`).
pub type Status = i32;
