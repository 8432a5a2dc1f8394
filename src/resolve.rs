//! Pixel format resolution.
//!
//! Maps a frame's pixel format to the canonical layout the decoder reads,
//! plus the pixel stride and byte offset that select the luma byte in
//! interleaved formats. The decoder consumes the in-memory byte sequence, so
//! packed 32-bit formats resolve differently on little- and big-endian hosts.

use crate::pixel::{Endian, PixelLayout};
use crate::still::ImageFormat;
use crate::video::VideoPixelFormat;

/// Direct mapping of a video frame's first plane onto a [`PixelLayout`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutMapping {
    pub layout: PixelLayout,
    /// Bytes between pixels; `None` means the layout's own pixel size.
    pub pixel_stride: Option<usize>,
    /// Byte offset of pixel (0, 0) within the first plane.
    pub offset: usize,
}

impl LayoutMapping {
    const fn packed(layout: PixelLayout) -> Self {
        Self {
            layout,
            pixel_stride: None,
            offset: 0,
        }
    }

    const fn luma(pixel_stride: usize, offset: usize) -> Self {
        Self {
            layout: PixelLayout::Lum,
            pixel_stride: Some(pixel_stride),
            offset,
        }
    }
}

/// Resolve a video pixel format for the host byte order.
///
/// `None` means there is no direct mapping and the frame must be converted.
pub fn resolve_video_format(format: VideoPixelFormat) -> Option<LayoutMapping> {
    resolve_video_format_for(format, Endian::NATIVE)
}

/// Resolve a video pixel format for an explicit byte order.
pub fn resolve_video_format_for(format: VideoPixelFormat, endian: Endian) -> Option<LayoutMapping> {
    use crate::video::VideoPixelFormat as F;
    let little = endian == Endian::Little;
    let mapping = match format {
        F::Argb32 | F::Argb32Premultiplied | F::Rgb32 => {
            LayoutMapping::packed(if little { PixelLayout::Bgra } else { PixelLayout::Argb })
        }
        F::Bgra32 | F::Bgra32Premultiplied | F::Bgr32 | F::Abgr32 => {
            LayoutMapping::packed(if little { PixelLayout::Rgba } else { PixelLayout::Abgr })
        }
        F::Y8
        | F::Yuv420P
        | F::Yuv422P
        | F::Yv12
        | F::Nv12
        | F::Nv21
        | F::Imc1
        | F::Imc2
        | F::Imc3
        | F::Imc4 => LayoutMapping::packed(PixelLayout::Lum),
        F::Yuyv => LayoutMapping::luma(2, 0),
        F::Uyvy => LayoutMapping::luma(2, 1),
        // Significant byte of a 16-bit luma sample.
        F::Y16 | F::P010 | F::P016 => LayoutMapping::luma(2, if little { 1 } else { 0 }),
        F::Ayuv | F::AyuvPremultiplied => LayoutMapping::luma(4, if little { 3 } else { 2 }),
        F::Invalid
        | F::Rgba8888
        | F::Rgbx8888
        | F::Yuv420P10
        | F::Jpeg
        | F::SamplerExternalOes
        | F::SamplerRect => return None,
    };
    Some(mapping)
}

/// Resolve a still-image format for the host byte order.
///
/// `None` means the image is normalized to 8-bit grayscale before decoding.
pub fn resolve_image_format(format: ImageFormat) -> Option<PixelLayout> {
    resolve_image_format_for(format, Endian::NATIVE)
}

/// Resolve a still-image format for an explicit byte order.
pub fn resolve_image_format_for(format: ImageFormat, endian: Endian) -> Option<PixelLayout> {
    match format {
        ImageFormat::Argb32 | ImageFormat::Rgb32 => Some(match endian {
            Endian::Little => PixelLayout::Bgra,
            Endian::Big => PixelLayout::Argb,
        }),
        ImageFormat::Rgb888 => Some(PixelLayout::Rgb),
        ImageFormat::Rgbx8888 | ImageFormat::Rgba8888 => Some(PixelLayout::Rgba),
        ImageFormat::Grayscale8 => Some(PixelLayout::Lum),
        ImageFormat::Argb32Premultiplied
        | ImageFormat::Bgr888
        | ImageFormat::Grayscale16
        | ImageFormat::Rgb16 => None,
    }
}
