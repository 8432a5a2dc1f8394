//! Synchronous read entry points.
//!
//! [`ScanRequest`] resolves an image or frame to a [`FrameBuffer`], falls back
//! to conversion when no direct layout exists, and hands the buffer to a
//! [`BarcodeDecoder`]. The `try_*` methods report why a scan could not run;
//! the others log that reason and return "nothing found".

use enough::{Stop, Unstoppable};
use tracing::{debug, warn};

use crate::barcode::Barcode;
use crate::buffer::FrameBuffer;
use crate::error::ScanError;
use crate::limits::Limits;
use crate::options::ReaderOptions;
use crate::pixel::PixelLayout;
use crate::resolve::{LayoutMapping, resolve_image_format, resolve_video_format};
use crate::still::StillImage;
use crate::video::VideoFrame;

/// Opaque symbol detector.
///
/// Implementations receive a borrowed buffer that is only valid for the call.
pub trait BarcodeDecoder: Send + Sync + 'static {
    fn decode(
        &self,
        buffer: &FrameBuffer<'_>,
        options: &ReaderOptions,
        stop: &dyn Stop,
    ) -> Result<Vec<Barcode>, ScanError>;
}

/// A configured scan against one decoder.
pub struct ScanRequest<'a, D: ?Sized> {
    decoder: &'a D,
    options: ReaderOptions,
    limits: Option<&'a Limits>,
}

impl<'a, D: BarcodeDecoder + ?Sized> ScanRequest<'a, D> {
    pub fn new(decoder: &'a D) -> Self {
        Self {
            decoder,
            options: ReaderOptions::default(),
            limits: None,
        }
    }

    pub fn with_options(mut self, options: &ReaderOptions) -> Self {
        self.options = options.clone();
        self
    }

    pub fn with_limits(mut self, limits: &'a Limits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Scan a still image, returning up to `max_number_of_symbols` barcodes.
    pub fn try_read_image(
        &self,
        image: &StillImage<'_>,
        stop: &dyn Stop,
    ) -> Result<Vec<Barcode>, ScanError> {
        decode_image(self.decoder, image, &self.options, self.limits, stop)
    }

    /// Scan a video frame, returning up to `max_number_of_symbols` barcodes.
    pub fn try_read_frame(
        &self,
        frame: &dyn VideoFrame,
        stop: &dyn Stop,
    ) -> Result<Vec<Barcode>, ScanError> {
        decode_frame(self.decoder, frame, &self.options, self.limits, stop)
    }

    pub fn read_barcodes_image(&self, image: &StillImage<'_>) -> Vec<Barcode> {
        absorb(self.try_read_image(image, &Unstoppable))
    }

    pub fn read_barcodes_frame(&self, frame: &dyn VideoFrame) -> Vec<Barcode> {
        absorb(self.try_read_frame(frame, &Unstoppable))
    }

    /// Best single match in a still image, or the invalid default barcode.
    pub fn read_barcode_image(&self, image: &StillImage<'_>) -> Barcode {
        first(self.single().read_barcodes_image(image))
    }

    /// Best single match in a video frame, or the invalid default barcode.
    pub fn read_barcode_frame(&self, frame: &dyn VideoFrame) -> Barcode {
        first(self.single().read_barcodes_frame(frame))
    }

    fn single(&self) -> Self {
        Self {
            decoder: self.decoder,
            options: self.options.clone().with_max_number_of_symbols(1),
            limits: self.limits,
        }
    }
}

/// Scan a still image, reporting why nothing could be scanned.
pub fn try_read_barcodes_image<D: BarcodeDecoder + ?Sized>(
    decoder: &D,
    image: &StillImage<'_>,
    options: &ReaderOptions,
    stop: &dyn Stop,
) -> Result<Vec<Barcode>, ScanError> {
    decode_image(decoder, image, options, None, stop)
}

/// Scan a video frame, reporting why nothing could be scanned.
pub fn try_read_barcodes_frame<D: BarcodeDecoder + ?Sized>(
    decoder: &D,
    frame: &dyn VideoFrame,
    options: &ReaderOptions,
    stop: &dyn Stop,
) -> Result<Vec<Barcode>, ScanError> {
    decode_frame(decoder, frame, options, None, stop)
}

/// Scan a still image with `options`.
pub fn read_barcodes<D: BarcodeDecoder + ?Sized>(
    decoder: &D,
    image: &StillImage<'_>,
    options: &ReaderOptions,
) -> Vec<Barcode> {
    ScanRequest::new(decoder)
        .with_options(options)
        .read_barcodes_image(image)
}

/// Single best match in a still image, or `Barcode::default()`.
pub fn read_barcode<D: BarcodeDecoder + ?Sized>(
    decoder: &D,
    image: &StillImage<'_>,
    options: &ReaderOptions,
) -> Barcode {
    ScanRequest::new(decoder)
        .with_options(options)
        .read_barcode_image(image)
}

/// Scan a video frame with `options`.
pub fn read_barcodes_frame<D: BarcodeDecoder + ?Sized>(
    decoder: &D,
    frame: &dyn VideoFrame,
    options: &ReaderOptions,
) -> Vec<Barcode> {
    ScanRequest::new(decoder)
        .with_options(options)
        .read_barcodes_frame(frame)
}

/// Single best match in a video frame, or `Barcode::default()`.
pub fn read_barcode_frame<D: BarcodeDecoder + ?Sized>(
    decoder: &D,
    frame: &dyn VideoFrame,
    options: &ReaderOptions,
) -> Barcode {
    ScanRequest::new(decoder)
        .with_options(options)
        .read_barcode_frame(frame)
}

fn absorb(result: Result<Vec<Barcode>, ScanError>) -> Vec<Barcode> {
    result.unwrap_or_else(|e| {
        warn!(error = %e, "scan skipped, reporting no barcode");
        Vec::new()
    })
}

fn first(barcodes: Vec<Barcode>) -> Barcode {
    barcodes.into_iter().next().unwrap_or_default()
}

pub(crate) fn decode_image<D: BarcodeDecoder + ?Sized>(
    decoder: &D,
    image: &StillImage<'_>,
    options: &ReaderOptions,
    limits: Option<&Limits>,
    stop: &dyn Stop,
) -> Result<Vec<Barcode>, ScanError> {
    if let Some(limits) = limits {
        limits.check(image.width(), image.height())?;
    }
    stop.check()?;
    let found = match resolve_image_format(image.format()) {
        Some(layout) => {
            let buffer = FrameBuffer::new(
                image.pixels(),
                image.width(),
                image.height(),
                layout,
                image.bytes_per_line(),
                None,
            )?;
            decoder.decode(&buffer, options, stop)?
        }
        None => {
            debug!(format = ?image.format(), "no direct layout, converting to grayscale");
            let gray = image.to_gray8_within(limits)?;
            let buffer = FrameBuffer::new(
                gray.pixels(),
                gray.width(),
                gray.height(),
                PixelLayout::Lum,
                gray.bytes_per_line(),
                None,
            )?;
            decoder.decode(&buffer, options, stop)?
        }
    };
    Ok(limit_results(found, options))
}

pub(crate) fn decode_frame<D: BarcodeDecoder + ?Sized>(
    decoder: &D,
    frame: &dyn VideoFrame,
    options: &ReaderOptions,
    limits: Option<&Limits>,
    stop: &dyn Stop,
) -> Result<Vec<Barcode>, ScanError> {
    if let Some(limits) = limits {
        limits.check(frame.width(), frame.height())?;
    }
    match resolve_video_format(frame.pixel_format()) {
        Some(mapping) => decode_mapped(decoder, frame, mapping, options, stop),
        None => {
            let image = convert_frame(frame)?;
            decode_image(decoder, &image, options, limits, stop)
        }
    }
}

/// Full conversion for frames without a direct layout.
pub(crate) fn convert_frame(frame: &dyn VideoFrame) -> Result<StillImage<'static>, ScanError> {
    debug!(format = %frame.pixel_format(), "no direct layout, converting frame");
    frame.to_image().ok_or_else(|| {
        ScanError::ConversionFailed(format!(
            "{} frame {}x{} has no image conversion",
            frame.pixel_format(),
            frame.width(),
            frame.height()
        ))
    })
}

/// Decode a frame whose format resolved directly. The mapping guard is
/// released before this returns, on success and on every error path.
pub(crate) fn decode_mapped<D: BarcodeDecoder + ?Sized>(
    decoder: &D,
    frame: &dyn VideoFrame,
    mapping: LayoutMapping,
    options: &ReaderOptions,
    stop: &dyn Stop,
) -> Result<Vec<Barcode>, ScanError> {
    stop.check()?;
    let mapped = frame.map()?;
    let plane = mapped
        .plane(0)
        .ok_or_else(|| ScanError::MapFailed("frame has no planes".into()))?;
    let data = plane
        .data
        .get(mapping.offset..)
        .ok_or(ScanError::BufferTooSmall {
            needed: mapping.offset,
            actual: plane.data.len(),
        })?;
    let buffer = FrameBuffer::new(
        data,
        frame.width(),
        frame.height(),
        mapping.layout,
        plane.bytes_per_line,
        mapping.pixel_stride,
    )?;
    let found = decoder.decode(&buffer, options, stop)?;
    Ok(limit_results(found, options))
}

fn limit_results(mut found: Vec<Barcode>, options: &ReaderOptions) -> Vec<Barcode> {
    found.retain(Barcode::is_valid);
    let max = usize::from(options.max_number_of_symbols());
    if max > 0 {
        found.truncate(max);
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barcode::{ContentType, Position};
    use crate::options::BarcodeFormat;
    use crate::still::ImageFormat;
    use crate::video::{CpuFrame, MappedFrame, MappedPlane, VideoPixelFormat};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Reports one barcode per bright pixel in the first row and records what it saw.
    #[derive(Default)]
    struct BrightPixelDecoder {
        seen: Mutex<Vec<(PixelLayout, usize, Vec<u8>)>>,
    }

    impl BarcodeDecoder for BrightPixelDecoder {
        fn decode(
            &self,
            buffer: &FrameBuffer<'_>,
            _options: &ReaderOptions,
            _stop: &dyn Stop,
        ) -> Result<Vec<Barcode>, ScanError> {
            let lum = buffer.luminance().into_owned();
            self.seen
                .lock()
                .unwrap()
                .push((buffer.layout(), buffer.pixel_stride(), lum.clone()));
            Ok(lum[..buffer.width() as usize]
                .iter()
                .filter(|&&v| v > 128)
                .map(|v| {
                    Barcode::new(
                        BarcodeFormat::QrCode,
                        v.to_string(),
                        vec![*v],
                        ContentType::Text,
                        Position::default(),
                    )
                })
                .collect())
        }
    }

    #[test]
    fn direct_layout_is_zero_copy_into_decoder() {
        let decoder = BrightPixelDecoder::default();
        let data = [200u8, 10, 220, 230];
        let img = StillImage::from_gray(&data, 4, 1).unwrap();
        let found = read_barcodes(&decoder, &img, &ReaderOptions::default());
        assert_eq!(found.len(), 3);
        let seen = decoder.seen.lock().unwrap();
        assert_eq!(seen[0].0, PixelLayout::Lum);
    }

    #[test]
    fn unsupported_still_format_is_converted_to_gray() {
        let decoder = BrightPixelDecoder::default();
        let data = [255u8, 255, 255, 0, 0, 0];
        let img = StillImage::new(&data, 2, 1, ImageFormat::Bgr888, 6).unwrap();
        let found = read_barcodes(&decoder, &img, &ReaderOptions::default());
        assert_eq!(found.len(), 1);
        assert_eq!(decoder.seen.lock().unwrap()[0].2, vec![255, 0]);
    }

    #[test]
    fn single_result_contract() {
        let decoder = BrightPixelDecoder::default();
        let data = [200u8, 210, 220];
        let img = StillImage::from_gray(&data, 3, 1).unwrap();
        let one = read_barcode(&decoder, &img, &ReaderOptions::default());
        assert!(one.is_valid());
        assert_eq!(one.text(), "200");

        let dark = [0u8; 3];
        let img = StillImage::from_gray(&dark, 3, 1).unwrap();
        let none = read_barcode(&decoder, &img, &ReaderOptions::default());
        assert!(!none.is_valid());
        assert_eq!(none, Barcode::default());
    }

    #[test]
    fn max_symbols_truncates() {
        let decoder = BrightPixelDecoder::default();
        let data = [200u8, 210, 220];
        let img = StillImage::from_gray(&data, 3, 1).unwrap();
        let opts = ReaderOptions::default().with_max_number_of_symbols(2);
        assert_eq!(read_barcodes(&decoder, &img, &opts).len(), 2);
        let unlimited = ReaderOptions::default().with_max_number_of_symbols(0);
        assert_eq!(read_barcodes(&decoder, &img, &unlimited).len(), 3);
    }

    #[test]
    fn uyvy_frame_reads_luma_bytes() {
        let decoder = BrightPixelDecoder::default();
        let plane = vec![0u8, 200, 0, 10, 0, 210, 0, 20];
        let frame = CpuFrame::new(VideoPixelFormat::Uyvy, 4, 1).with_plane(plane, 8);
        let found = read_barcodes_frame(&decoder, &frame, &ReaderOptions::default());
        assert_eq!(found.len(), 2);
        let seen = decoder.seen.lock().unwrap();
        assert_eq!(seen[0].1, 2);
        assert_eq!(seen[0].2, vec![200, 10, 210, 20]);
    }

    #[test]
    fn unconvertible_frame_is_distinguishable_and_absorbed() {
        let decoder = BrightPixelDecoder::default();
        let frame = CpuFrame::new(VideoPixelFormat::Jpeg, 2, 2).with_plane(vec![0u8; 8], 4);
        let request = ScanRequest::new(&decoder);
        assert!(matches!(
            request.try_read_frame(&frame, &Unstoppable),
            Err(ScanError::ConversionFailed(_))
        ));
        assert!(request.read_barcodes_frame(&frame).is_empty());
        assert!(!request.read_barcode_frame(&frame).is_valid());
        assert!(decoder.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn oversized_frame_without_plane_data_is_not_found() {
        let decoder = BrightPixelDecoder::default();
        let frame = CpuFrame::new(VideoPixelFormat::Yuv420P10, u32::MAX, u32::MAX)
            .with_plane(vec![0u8; 16], 8);
        let request = ScanRequest::new(&decoder);
        assert!(matches!(
            request.try_read_frame(&frame, &Unstoppable),
            Err(ScanError::ConversionFailed(_))
        ));
        assert!(read_barcodes_frame(&decoder, &frame, &ReaderOptions::default()).is_empty());
        assert!(decoder.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn converted_frame_is_scanned() {
        let decoder = BrightPixelDecoder::default();
        let frame =
            CpuFrame::new(VideoPixelFormat::Rgba8888, 1, 1).with_plane(vec![255u8, 255, 255, 255], 4);
        let found = read_barcodes_frame(&decoder, &frame, &ReaderOptions::default());
        assert_eq!(found.len(), 1);
    }

    struct UnmappableFrame;

    impl VideoFrame for UnmappableFrame {
        fn pixel_format(&self) -> VideoPixelFormat {
            VideoPixelFormat::Y8
        }
        fn width(&self) -> u32 {
            4
        }
        fn height(&self) -> u32 {
            4
        }
        fn map(&self) -> Result<MappedFrame<'_>, ScanError> {
            Err(ScanError::MapFailed("device buffer busy".into()))
        }
    }

    #[test]
    fn unmappable_frame_degrades_to_not_found() {
        let decoder = BrightPixelDecoder::default();
        let request = ScanRequest::new(&decoder);
        assert!(matches!(
            request.try_read_frame(&UnmappableFrame, &Unstoppable),
            Err(ScanError::MapFailed(_))
        ));
        assert!(request.read_barcodes_frame(&UnmappableFrame).is_empty());
    }

    struct CountingFrame {
        data: Vec<u8>,
        releases: &'static AtomicUsize,
    }

    impl VideoFrame for CountingFrame {
        fn pixel_format(&self) -> VideoPixelFormat {
            VideoPixelFormat::Y8
        }
        fn width(&self) -> u32 {
            4
        }
        fn height(&self) -> u32 {
            2
        }
        fn map(&self) -> Result<MappedFrame<'_>, ScanError> {
            let releases = self.releases;
            Ok(MappedFrame::new(vec![MappedPlane {
                data: &self.data,
                bytes_per_line: 4,
            }])
            .on_release(move || {
                releases.fetch_add(1, Ordering::SeqCst);
            }))
        }
    }

    #[test]
    fn mapping_is_released_on_success_and_failure() {
        static RELEASES: AtomicUsize = AtomicUsize::new(0);
        let decoder = BrightPixelDecoder::default();

        let good = CountingFrame {
            data: vec![0u8; 8],
            releases: &RELEASES,
        };
        read_barcodes_frame(&decoder, &good, &ReaderOptions::default());
        assert_eq!(RELEASES.load(Ordering::SeqCst), 1);

        // Too short for 4x2: FrameBuffer validation fails after mapping.
        let short = CountingFrame {
            data: vec![0u8; 5],
            releases: &RELEASES,
        };
        assert!(read_barcodes_frame(&decoder, &short, &ReaderOptions::default()).is_empty());
        assert_eq!(RELEASES.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn limits_reject_before_decoding() {
        let decoder = BrightPixelDecoder::default();
        let data = [255u8; 16];
        let img = StillImage::from_gray(&data, 4, 4).unwrap();
        let limits = Limits::max_pixels(8);
        let request = ScanRequest::new(&decoder).with_limits(&limits);
        assert!(matches!(
            request.try_read_image(&img, &Unstoppable),
            Err(ScanError::LimitExceeded(_))
        ));
        assert!(decoder.seen.lock().unwrap().is_empty());
    }
}
