use std::borrow::Cow;

use crate::error::ScanError;
use crate::pixel::{PixelLayout, luma};

/// Borrowed view over pixel memory in one of the canonical layouts.
///
/// The slice starts at the first byte of pixel (0, 0), which for interleaved
/// formats may already be offset into the source plane. Rows are
/// `row_stride` bytes apart and pixels `pixel_stride` bytes apart.
#[derive(Clone, Copy, Debug)]
pub struct FrameBuffer<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    layout: PixelLayout,
    row_stride: usize,
    pixel_stride: usize,
}

impl<'a> FrameBuffer<'a> {
    /// Create a view, validating strides against the slice length.
    ///
    /// `pixel_stride` of `None` means the layout's own pixel size.
    pub fn new(
        data: &'a [u8],
        width: u32,
        height: u32,
        layout: PixelLayout,
        row_stride: usize,
        pixel_stride: Option<usize>,
    ) -> Result<Self, ScanError> {
        if width == 0 || height == 0 {
            return Err(ScanError::InvalidDimensions { width, height });
        }
        let bpp = layout.bytes_per_pixel();
        let pixel_stride = pixel_stride.unwrap_or(bpp);
        if pixel_stride == 0 {
            return Err(ScanError::InvalidDimensions { width, height });
        }
        let group = pixel_stride.max(bpp);
        let min_row = (width as usize)
            .checked_mul(group)
            .ok_or(ScanError::InvalidDimensions { width, height })?;
        if row_stride < min_row {
            return Err(ScanError::StrideTooSmall {
                stride: row_stride,
                min: min_row,
            });
        }
        let needed = (height as usize - 1)
            .checked_mul(row_stride)
            .and_then(|n| n.checked_add((width as usize - 1) * pixel_stride + bpp))
            .ok_or(ScanError::InvalidDimensions { width, height })?;
        if data.len() < needed {
            return Err(ScanError::BufferTooSmall {
                needed,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            layout,
            row_stride,
            pixel_stride,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    pub fn pixel_stride(&self) -> usize {
        self.pixel_stride
    }

    /// Raw bytes of the view, starting at pixel (0, 0).
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Whether pixels are packed with no gaps between pixels or rows.
    pub fn is_contiguous(&self) -> bool {
        let bpp = self.layout.bytes_per_pixel();
        self.pixel_stride == bpp && self.row_stride == self.width as usize * bpp
    }

    /// Tightly packed 8-bit luminance, `width * height` bytes.
    ///
    /// Borrows when the view already is contiguous luminance.
    pub fn luminance(&self) -> Cow<'a, [u8]> {
        let w = self.width as usize;
        let h = self.height as usize;
        if self.layout == PixelLayout::Lum && self.is_contiguous() {
            return Cow::Borrowed(&self.data[..w * h]);
        }
        let mut out = Vec::with_capacity(w * h);
        for y in 0..h {
            let row = &self.data[y * self.row_stride..];
            match self.layout.rgb_offsets() {
                None => out.extend((0..w).map(|x| row[x * self.pixel_stride])),
                Some([r, g, b]) => out.extend((0..w).map(|x| {
                    let px = &row[x * self.pixel_stride..];
                    luma(px[r], px[g], px[b])
                })),
            }
        }
        Cow::Owned(out)
    }
}
