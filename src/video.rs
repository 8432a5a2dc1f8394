//! Camera/video frame abstraction.
//!
//! A [`VideoFrame`] describes its pixel format and can be mapped read-only.
//! The returned [`MappedFrame`] guard releases the mapping when dropped, so
//! every exit path of a scan unmaps the frame.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::ScanError;
use crate::still::{ImageFormat, StillImage};

/// Pixel format tag carried by a video frame.
///
/// Packed 32-bit formats are named by their word order (most significant
/// byte first), matching the convention of common capture stacks.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VideoPixelFormat {
    Invalid,
    Argb32,
    Argb32Premultiplied,
    Rgb32,
    Bgra32,
    Bgra32Premultiplied,
    Bgr32,
    Abgr32,
    /// Byte-ordered R, G, B, A.
    Rgba8888,
    /// Byte-ordered R, G, B, padding.
    Rgbx8888,
    Ayuv,
    AyuvPremultiplied,
    Yuv420P,
    Yuv422P,
    Yv12,
    Uyvy,
    Yuyv,
    Nv12,
    Nv21,
    Imc1,
    Imc2,
    Imc3,
    Imc4,
    Y8,
    Y16,
    P010,
    P016,
    /// Planar 4:2:0 with 10-bit samples in the low bits of 16-bit words.
    Yuv420P10,
    Jpeg,
    SamplerExternalOes,
    SamplerRect,
}

impl VideoPixelFormat {
    /// Every format tag, in declaration order.
    pub const ALL: [VideoPixelFormat; 31] = [
        Self::Invalid,
        Self::Argb32,
        Self::Argb32Premultiplied,
        Self::Rgb32,
        Self::Bgra32,
        Self::Bgra32Premultiplied,
        Self::Bgr32,
        Self::Abgr32,
        Self::Rgba8888,
        Self::Rgbx8888,
        Self::Ayuv,
        Self::AyuvPremultiplied,
        Self::Yuv420P,
        Self::Yuv422P,
        Self::Yv12,
        Self::Uyvy,
        Self::Yuyv,
        Self::Nv12,
        Self::Nv21,
        Self::Imc1,
        Self::Imc2,
        Self::Imc3,
        Self::Imc4,
        Self::Y8,
        Self::Y16,
        Self::P010,
        Self::P016,
        Self::Yuv420P10,
        Self::Jpeg,
        Self::SamplerExternalOes,
        Self::SamplerRect,
    ];
}

impl fmt::Display for VideoPixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One mapped memory plane.
#[derive(Clone, Copy, Debug)]
pub struct MappedPlane<'a> {
    pub data: &'a [u8],
    pub bytes_per_line: usize,
}

/// Read-only mapping of a frame. Dropping it releases the mapping.
pub struct MappedFrame<'a> {
    planes: Vec<MappedPlane<'a>>,
    release: Option<Box<dyn FnOnce() + 'a>>,
}

impl<'a> MappedFrame<'a> {
    pub fn new(planes: Vec<MappedPlane<'a>>) -> Self {
        Self {
            planes,
            release: None,
        }
    }

    /// Run `release` when the mapping is dropped.
    pub fn on_release(mut self, release: impl FnOnce() + 'a) -> Self {
        self.release = Some(Box::new(release));
        self
    }

    pub fn plane(&self, index: usize) -> Option<&MappedPlane<'a>> {
        self.planes.get(index)
    }

    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }
}

impl Drop for MappedFrame<'_> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for MappedFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedFrame")
            .field("planes", &self.planes)
            .field("release", &self.release.is_some())
            .finish()
    }
}

/// A platform frame that can be scanned.
///
/// Frames move to the worker context when submitted to a
/// [`Dispatcher`](crate::Dispatcher), hence `Send + 'static`.
pub trait VideoFrame: Send + 'static {
    fn pixel_format(&self) -> VideoPixelFormat;
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Map the frame's planes for reading.
    fn map(&self) -> Result<MappedFrame<'_>, ScanError>;

    /// Full conversion into a still image, for formats without a direct layout.
    ///
    /// `None` when the frame cannot be converted.
    fn to_image(&self) -> Option<StillImage<'static>> {
        None
    }
}

/// Plane of a [`CpuFrame`].
#[derive(Clone, Debug)]
struct CpuPlane {
    data: Arc<[u8]>,
    bytes_per_line: usize,
}

/// Frame whose planes live in shared system memory. Cloning is cheap.
#[derive(Clone, Debug)]
pub struct CpuFrame {
    format: VideoPixelFormat,
    width: u32,
    height: u32,
    planes: Vec<CpuPlane>,
}

impl CpuFrame {
    pub fn new(format: VideoPixelFormat, width: u32, height: u32) -> Self {
        Self {
            format,
            width,
            height,
            planes: Vec::new(),
        }
    }

    /// Append a plane.
    pub fn with_plane(mut self, data: impl Into<Arc<[u8]>>, bytes_per_line: usize) -> Self {
        self.planes.push(CpuPlane {
            data: data.into(),
            bytes_per_line,
        });
        self
    }

    pub fn is_valid(&self) -> bool {
        self.format != VideoPixelFormat::Invalid
            && self.width > 0
            && self.height > 0
            && !self.planes.is_empty()
    }

    fn first_plane(&self) -> Option<&CpuPlane> {
        self.planes.first()
    }
}

impl VideoFrame for CpuFrame {
    fn pixel_format(&self) -> VideoPixelFormat {
        self.format
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn map(&self) -> Result<MappedFrame<'_>, ScanError> {
        if !self.is_valid() {
            return Err(ScanError::MapFailed(format!(
                "invalid {} frame {}x{} with {} planes",
                self.format,
                self.width,
                self.height,
                self.planes.len()
            )));
        }
        Ok(MappedFrame::new(
            self.planes
                .iter()
                .map(|p| MappedPlane {
                    data: &p.data,
                    bytes_per_line: p.bytes_per_line,
                })
                .collect(),
        ))
    }

    fn to_image(&self) -> Option<StillImage<'static>> {
        if !self.is_valid() {
            return None;
        }
        let plane = self.first_plane()?;
        match self.format {
            VideoPixelFormat::Rgba8888 | VideoPixelFormat::Rgbx8888 => StillImage::owned(
                plane.data.to_vec(),
                self.width,
                self.height,
                ImageFormat::Rgba8888,
                plane.bytes_per_line,
            )
            .ok(),
            VideoPixelFormat::Yuv420P10 => {
                let (w, h) = (self.width as usize, self.height as usize);
                let row_bytes = w.checked_mul(2)?;
                let needed = (h - 1)
                    .checked_mul(plane.bytes_per_line)?
                    .checked_add(row_bytes)?;
                if plane.bytes_per_line < row_bytes || plane.data.len() < needed {
                    debug!(
                        width = self.width,
                        height = self.height,
                        len = plane.data.len(),
                        "10-bit luma plane too small for frame"
                    );
                    return None;
                }
                let mut out = Vec::with_capacity(w * h);
                for y in 0..h {
                    let row = &plane.data[y * plane.bytes_per_line..][..row_bytes];
                    out.extend(
                        row.chunks_exact(2)
                            .map(|s| (u16::from_le_bytes([s[0], s[1]]) >> 2).min(255) as u8),
                    );
                }
                StillImage::owned(out, self.width, self.height, ImageFormat::Grayscale8, w).ok()
            }
            _ => None,
        }
    }
}
