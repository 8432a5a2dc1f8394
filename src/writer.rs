//! Barcode generation.

use std::path::{Path, PathBuf};

use rxing::Writer;
use tracing::debug;

use crate::backend::to_rxing;
use crate::error::ScanError;
use crate::options::BarcodeFormat;
use crate::still::StillImage;

const DEFAULT_SIZE: u32 = 256;
const MAX_FILE_STEM: usize = 64;

/// Render `text` as a barcode into an 8-bit grayscale image.
///
/// The image is at least `width` x `height`; symbologies with a fixed minimum
/// size may come out larger.
pub fn write_barcode(
    text: &str,
    format: BarcodeFormat,
    width: u32,
    height: u32,
) -> Result<StillImage<'static>, ScanError> {
    if text.is_empty() {
        return Err(ScanError::EmptyContent);
    }
    let target = to_rxing(format)
        .ok_or_else(|| ScanError::UnsupportedBarcodeFormat(format.name().to_owned()))?;
    let width_i = i32::try_from(width).map_err(|_| ScanError::InvalidDimensions { width, height })?;
    let height_i =
        i32::try_from(height).map_err(|_| ScanError::InvalidDimensions { width, height })?;
    let matrix = rxing::MultiFormatWriter::default()
        .encode(text, &target, width_i, height_i)
        .map_err(|e| ScanError::Encode(format!("{e:?}")))?;

    let (w, h) = (matrix.getWidth(), matrix.getHeight());
    let mut pixels = Vec::with_capacity(w as usize * h as usize);
    for y in 0..h {
        for x in 0..w {
            pixels.push(if matrix.get(x, y) { 0 } else { 255 });
        }
    }
    StillImage::owned(
        pixels,
        w,
        h,
        crate::still::ImageFormat::Grayscale8,
        w as usize,
    )
}

/// Generates barcode images and saves them as PNG files.
#[derive(Clone, Debug)]
pub struct BarcodeWriter {
    output_dir: PathBuf,
    width: u32,
    height: u32,
    image_url: String,
}

impl BarcodeWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            width: DEFAULT_SIZE,
            height: DEFAULT_SIZE,
            image_url: String::new(),
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `file://` URL of the most recently saved image, empty before the first save.
    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    /// Returns `true` only if the URL changed.
    pub fn set_image_url(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.image_url == url {
            return false;
        }
        self.image_url = url;
        true
    }

    /// Generate a barcode for `text` in the named format and save it into the
    /// output directory as `<sanitized text>.png`.
    pub fn write_and_save(&mut self, format_name: &str, text: &str) -> Result<PathBuf, ScanError> {
        if format_name.trim().is_empty() || text.is_empty() {
            return Err(ScanError::EmptyContent);
        }
        let format = BarcodeFormat::from_name(format_name);
        if format == BarcodeFormat::None {
            return Err(ScanError::UnsupportedBarcodeFormat(format_name.to_owned()));
        }
        let image = write_barcode(text, format, self.width, self.height)?;

        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| ScanError::Save(format!("{}: {e}", self.output_dir.display())))?;
        let path = self.output_dir.join(format!("{}.png", file_stem(text)));
        let gray = image::GrayImage::from_raw(image.width(), image.height(), image.pixels().to_vec())
            .ok_or_else(|| ScanError::Save("pixel buffer does not match image size".into()))?;
        gray.save(&path)
            .map_err(|e| ScanError::Save(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), %format, "saved barcode image");

        self.set_image_url(format!("file://{}", path.display()));
        Ok(path)
    }
}

fn file_stem(text: &str) -> String {
    let stem: String = text
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(MAX_FILE_STEM)
        .collect();
    if stem.trim_matches('_').is_empty() {
        "barcode".to_owned()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("zenscan-{name}-{}", std::process::id()))
    }

    #[test]
    fn qr_image_is_black_and_white() {
        let img = write_barcode("HELLO123", BarcodeFormat::QrCode, 200, 200).unwrap();
        assert!(img.width() >= 200 && img.height() >= 200);
        assert!(img.pixels().iter().all(|&p| p == 0 || p == 255));
        assert!(img.pixels().contains(&0));
        assert!(img.pixels().contains(&255));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            write_barcode("", BarcodeFormat::QrCode, 100, 100),
            Err(ScanError::EmptyContent)
        ));
        let mut writer = BarcodeWriter::new(scratch_dir("empty"));
        assert!(matches!(writer.write_and_save("", "x"), Err(ScanError::EmptyContent)));
        assert!(matches!(
            writer.write_and_save("QRCode", ""),
            Err(ScanError::EmptyContent)
        ));
        assert!(writer.image_url().is_empty());
    }

    #[test]
    fn unknown_or_unwritable_format_is_rejected() {
        let mut writer = BarcodeWriter::new(scratch_dir("unknown"));
        assert!(matches!(
            writer.write_and_save("Hologram", "x"),
            Err(ScanError::UnsupportedBarcodeFormat(_))
        ));
        assert!(matches!(
            write_barcode("x", BarcodeFormat::RmqrCode, 100, 100),
            Err(ScanError::UnsupportedBarcodeFormat(_))
        ));
    }

    #[test]
    fn saves_png_and_updates_url() {
        let dir = scratch_dir("save");
        let mut writer = BarcodeWriter::new(&dir).with_size(120, 120);
        let path = writer.write_and_save("QR Code", "a/b c").unwrap();
        assert_eq!(path, dir.join("a_b_c.png"));
        assert!(path.exists());
        assert_eq!(writer.image_url(), format!("file://{}", path.display()));
        assert!(!writer.set_image_url(writer.image_url().to_owned()));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn file_stems() {
        assert_eq!(file_stem("HELLO123"), "HELLO123");
        assert_eq!(file_stem("///"), "barcode");
        assert_eq!(file_stem(&"x".repeat(100)).len(), MAX_FILE_STEM);
    }
}
