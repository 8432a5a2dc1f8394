use std::borrow::Cow;

use crate::error::ScanError;
use crate::limits::Limits;
use crate::pixel::luma;

/// Pixel format of a still image.
///
/// Packed 32-bit and 16-bit formats are native-endian words, so their byte
/// order in memory depends on the host.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// 8-bit grayscale.
    Grayscale8,
    /// 16-bit grayscale (native endian).
    Grayscale16,
    /// 3 bytes: R, G, B.
    Rgb888,
    /// 3 bytes: B, G, R.
    Bgr888,
    /// 32-bit word `0xffRRGGBB`.
    Rgb32,
    /// 32-bit word `0xAARRGGBB`.
    Argb32,
    /// 32-bit word `0xAARRGGBB` with premultiplied color.
    Argb32Premultiplied,
    /// 4 bytes: R, G, B, padding.
    Rgbx8888,
    /// 4 bytes: R, G, B, A.
    Rgba8888,
    /// 16-bit word, 5-6-5 RGB.
    Rgb16,
}

impl ImageFormat {
    /// Bytes per pixel for this format.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Grayscale8 => 1,
            Self::Grayscale16 | Self::Rgb16 => 2,
            Self::Rgb888 | Self::Bgr888 => 3,
            Self::Rgb32
            | Self::Argb32
            | Self::Argb32Premultiplied
            | Self::Rgbx8888
            | Self::Rgba8888 => 4,
        }
    }
}

/// Single-plane image. Pixels may be borrowed (zero-copy) or owned.
///
/// Geometry is checked against the pixel data on construction and cannot be
/// changed afterwards:
///
/// ```compile_fail
/// let data = [0u8; 4];
/// let mut img = zenscan::StillImage::from_gray(&data, 2, 2).unwrap();
/// img.width = 50;
/// ```
#[derive(Clone, Debug)]
pub struct StillImage<'a> {
    pixels: Cow<'a, [u8]>,
    width: u32,
    height: u32,
    format: ImageFormat,
    bytes_per_line: usize,
}

impl<'a> StillImage<'a> {
    /// Borrow existing pixel memory.
    pub fn new(
        data: &'a [u8],
        width: u32,
        height: u32,
        format: ImageFormat,
        bytes_per_line: usize,
    ) -> Result<Self, ScanError> {
        validate(data.len(), width, height, format, bytes_per_line)?;
        Ok(Self {
            pixels: Cow::Borrowed(data),
            width,
            height,
            format,
            bytes_per_line,
        })
    }

    /// Take ownership of pixel memory.
    pub fn owned(
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: ImageFormat,
        bytes_per_line: usize,
    ) -> Result<StillImage<'static>, ScanError> {
        validate(data.len(), width, height, format, bytes_per_line)?;
        Ok(StillImage {
            pixels: Cow::Owned(data),
            width,
            height,
            format,
            bytes_per_line,
        })
    }

    /// Tightly packed 8-bit grayscale image borrowing `data`.
    pub fn from_gray(data: &'a [u8], width: u32, height: u32) -> Result<Self, ScanError> {
        Self::new(data, width, height, ImageFormat::Grayscale8, width as usize)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Bytes between the starts of consecutive rows.
    pub fn bytes_per_line(&self) -> usize {
        self.bytes_per_line
    }

    /// Access the pixel data.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Take ownership of the pixel data (copies if borrowed).
    pub fn into_owned(self) -> StillImage<'static> {
        StillImage {
            pixels: Cow::Owned(self.pixels.into_owned()),
            width: self.width,
            height: self.height,
            format: self.format,
            bytes_per_line: self.bytes_per_line,
        }
    }

    /// Whether the pixel data is borrowed.
    pub fn is_borrowed(&self) -> bool {
        matches!(self.pixels, Cow::Borrowed(_))
    }

    /// Normalize to a tightly packed 8-bit grayscale image.
    pub fn to_gray8(&self) -> StillImage<'static> {
        let w = self.width as usize;
        let h = self.height as usize;
        let bpp = self.format.bytes_per_pixel();
        let mut out = Vec::with_capacity(w * h);
        for y in 0..h {
            let row = &self.pixels[y * self.bytes_per_line..][..w * bpp];
            for px in row.chunks_exact(bpp) {
                out.push(gray_of(self.format, px));
            }
        }
        StillImage {
            pixels: Cow::Owned(out),
            width: self.width,
            height: self.height,
            format: ImageFormat::Grayscale8,
            bytes_per_line: w,
        }
    }

    /// [`StillImage::to_gray8`] with the conversion allocation checked
    /// against `limits` first.
    pub(crate) fn to_gray8_within(
        &self,
        limits: Option<&Limits>,
    ) -> Result<StillImage<'static>, ScanError> {
        if let Some(limits) = limits {
            limits.check_memory((self.width as usize).saturating_mul(self.height as usize))?;
        }
        Ok(self.to_gray8())
    }
}

#[cfg(feature = "rgb")]
impl<'a> StillImage<'a> {
    /// Zero-copy image over packed RGB8 pixels.
    pub fn from_rgb8(
        pixels: &'a [rgb::Rgb<u8>],
        width: u32,
        height: u32,
    ) -> Result<Self, ScanError> {
        use rgb::ComponentBytes as _;
        Self::new(
            pixels.as_bytes(),
            width,
            height,
            ImageFormat::Rgb888,
            width as usize * 3,
        )
    }

    /// Zero-copy image over packed RGBA8 pixels.
    pub fn from_rgba8(
        pixels: &'a [rgb::Rgba<u8>],
        width: u32,
        height: u32,
    ) -> Result<Self, ScanError> {
        use rgb::ComponentBytes as _;
        Self::new(
            pixels.as_bytes(),
            width,
            height,
            ImageFormat::Rgba8888,
            width as usize * 4,
        )
    }
}

#[cfg(feature = "imgref")]
impl<'a> StillImage<'a> {
    /// Zero-copy view of an 8-bit grayscale [`imgref::ImgRef`], padding included.
    pub fn from_imgref_gray(img: imgref::ImgRef<'a, u8>) -> Result<Self, ScanError> {
        let (width, height, stride) = (img.width() as u32, img.height() as u32, img.stride());
        Self::new(img.into_buf(), width, height, ImageFormat::Grayscale8, stride)
    }

    /// Zero-copy view of an RGBA8 [`imgref::ImgRef`], padding included.
    pub fn from_imgref_rgba(img: imgref::ImgRef<'a, rgb::Rgba<u8>>) -> Result<Self, ScanError> {
        use rgb::ComponentBytes as _;
        let (width, height, stride) = (img.width() as u32, img.height() as u32, img.stride());
        Self::new(
            img.into_buf().as_bytes(),
            width,
            height,
            ImageFormat::Rgba8888,
            stride * 4,
        )
    }
}

fn validate(
    len: usize,
    width: u32,
    height: u32,
    format: ImageFormat,
    bytes_per_line: usize,
) -> Result<(), ScanError> {
    if width == 0 || height == 0 {
        return Err(ScanError::InvalidDimensions { width, height });
    }
    let row = (width as usize)
        .checked_mul(format.bytes_per_pixel())
        .ok_or(ScanError::InvalidDimensions { width, height })?;
    if bytes_per_line < row {
        return Err(ScanError::StrideTooSmall {
            stride: bytes_per_line,
            min: row,
        });
    }
    let needed = (height as usize - 1)
        .checked_mul(bytes_per_line)
        .and_then(|n| n.checked_add(row))
        .ok_or(ScanError::InvalidDimensions { width, height })?;
    if len < needed {
        return Err(ScanError::BufferTooSmall {
            needed,
            actual: len,
        });
    }
    Ok(())
}

fn gray_of(format: ImageFormat, px: &[u8]) -> u8 {
    match format {
        ImageFormat::Grayscale8 => px[0],
        ImageFormat::Grayscale16 => (u16::from_ne_bytes([px[0], px[1]]) >> 8) as u8,
        ImageFormat::Rgb888 | ImageFormat::Rgbx8888 | ImageFormat::Rgba8888 => {
            luma(px[0], px[1], px[2])
        }
        ImageFormat::Bgr888 => luma(px[2], px[1], px[0]),
        ImageFormat::Rgb32 | ImageFormat::Argb32 | ImageFormat::Argb32Premultiplied => {
            let word = u32::from_ne_bytes([px[0], px[1], px[2], px[3]]);
            luma((word >> 16) as u8, (word >> 8) as u8, word as u8)
        }
        ImageFormat::Rgb16 => {
            let word = u16::from_ne_bytes([px[0], px[1]]);
            let r = ((word >> 11) & 0x1F) as u8;
            let g = ((word >> 5) & 0x3F) as u8;
            let b = (word & 0x1F) as u8;
            luma(r << 3 | r >> 2, g << 2 | g >> 4, b << 3 | b >> 2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn borrowed_until_owned() {
        let data = vec![7u8; 12];
        let img = StillImage::from_gray(&data, 4, 3).unwrap();
        assert!(img.is_borrowed());
        let owned = img.into_owned();
        assert!(!owned.is_borrowed());
        assert_eq!(owned.pixels(), &data[..]);
    }

    #[test]
    fn accessors_report_validated_geometry() {
        let data = [0u8; 12];
        let img = StillImage::new(&data, 1, 2, ImageFormat::Bgr888, 6).unwrap();
        assert_eq!((img.width(), img.height()), (1, 2));
        assert_eq!(img.format(), ImageFormat::Bgr888);
        assert_eq!(img.bytes_per_line(), 6);
        assert_eq!(img.to_gray8().pixels().len(), 2);
    }

    #[test]
    fn rejects_inconsistent_geometry() {
        let data = [0u8; 10];
        assert!(matches!(
            StillImage::new(&data, 4, 3, ImageFormat::Grayscale8, 4),
            Err(ScanError::BufferTooSmall { needed: 12, actual: 10 })
        ));
        assert!(matches!(
            StillImage::new(&data, 4, 1, ImageFormat::Rgb888, 8),
            Err(ScanError::StrideTooSmall { stride: 8, min: 12 })
        ));
    }

    #[test]
    fn argb32_words_convert_on_any_host() {
        let white = 0xFFFF_FFFFu32.to_ne_bytes();
        let red = 0xFFFF_0000u32.to_ne_bytes();
        let mut data = Vec::new();
        data.extend_from_slice(&white);
        data.extend_from_slice(&red);
        let img = StillImage::new(&data, 2, 1, ImageFormat::Argb32Premultiplied, 8).unwrap();
        let gray = img.to_gray8();
        assert_eq!(gray.format(), ImageFormat::Grayscale8);
        assert_eq!(gray.pixels(), &[255, luma(255, 0, 0)]);
    }

    #[test]
    fn bgr888_and_rgb16_convert() {
        let bgr = [255u8, 0, 0];
        let img = StillImage::new(&bgr, 1, 1, ImageFormat::Bgr888, 3).unwrap();
        assert_eq!(img.to_gray8().pixels(), &[luma(0, 0, 255)]);

        let white565 = 0xFFFFu16.to_ne_bytes();
        let img = StillImage::new(&white565, 1, 1, ImageFormat::Rgb16, 2).unwrap();
        assert_eq!(img.to_gray8().pixels(), &[255]);
    }

    #[test]
    fn gray16_keeps_high_byte_and_drops_row_padding() {
        let mut data = Vec::new();
        data.extend_from_slice(&0xAB12u16.to_ne_bytes());
        data.extend_from_slice(&[0xEE, 0xEE]); // padding
        data.extend_from_slice(&0x3400u16.to_ne_bytes());
        let img = StillImage::new(&data, 1, 2, ImageFormat::Grayscale16, 4).unwrap();
        let gray = img.to_gray8();
        assert_eq!(gray.pixels(), &[0xAB, 0x34]);
        assert_eq!(gray.bytes_per_line(), 1);
    }

    #[test]
    fn conversion_respects_memory_limit() {
        let data = [0u8; 64];
        let img = StillImage::new(&data, 8, 2, ImageFormat::Rgba8888, 32).unwrap();
        let limits = Limits {
            max_memory_bytes: Some(8),
            ..Limits::default()
        };
        assert!(img.to_gray8_within(Some(&limits)).is_err());
        assert!(img.to_gray8_within(None).is_ok());
    }
}
