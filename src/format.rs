//! Mapping decoder pixel formats onto native buffer layouts.

use crate::types::{NativeFormat, PixelFormat};

impl NativeFormat {
    /// The native layout a frame in `format` is converted into.
    ///
    /// Formats carrying an alpha plane get the tri-planar alpha layout;
    /// everything else, including formats we do not recognise, becomes
    /// bi-planar.
    pub fn for_pixel_format(format: PixelFormat) -> Self {
        match format {
            PixelFormat::Yuva420p => NativeFormat::TriPlanar420VideoRangeAlpha,
            PixelFormat::Yuv420p | PixelFormat::Yuvj420p | PixelFormat::Other => {
                NativeFormat::BiPlanar420VideoRange
            }
        }
    }
}

impl From<PixelFormat> for NativeFormat {
    fn from(format: PixelFormat) -> Self {
        Self::for_pixel_format(format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_maps_to_tri_planar() {
        assert_eq!(
            NativeFormat::for_pixel_format(PixelFormat::Yuva420p),
            NativeFormat::TriPlanar420VideoRangeAlpha
        );
    }

    #[test]
    fn everything_else_maps_to_bi_planar() {
        for format in [PixelFormat::Yuv420p, PixelFormat::Yuvj420p, PixelFormat::Other] {
            assert_eq!(
                NativeFormat::from(format),
                NativeFormat::BiPlanar420VideoRange
            );
        }
    }
}
