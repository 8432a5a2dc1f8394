use crate::error::ScanError;

/// Resource limits applied to frames and images before they are scanned.
///
/// All fields default to `None` (no limit). A violation is absorbed like any
/// other scan failure: the submission reports "no barcode found".
#[derive(Clone, Debug, Default)]
pub struct Limits {
    pub max_width: Option<u64>,
    pub max_height: Option<u64>,
    /// Maximum pixel count (width * height).
    pub max_pixels: Option<u64>,
    /// Maximum bytes allocated when a frame has to be converted before decoding.
    pub max_memory_bytes: Option<u64>,
}

impl Limits {
    /// Limits with only a pixel-count cap.
    pub fn max_pixels(pixels: u64) -> Self {
        Self {
            max_pixels: Some(pixels),
            ..Self::default()
        }
    }

    /// Check dimensions against limits. Returns Ok(()) or LimitExceeded error.
    pub(crate) fn check(&self, width: u32, height: u32) -> Result<(), ScanError> {
        if let Some(max_w) = self.max_width {
            if u64::from(width) > max_w {
                return Err(ScanError::LimitExceeded(format!(
                    "width {width} exceeds limit {max_w}"
                )));
            }
        }
        if let Some(max_h) = self.max_height {
            if u64::from(height) > max_h {
                return Err(ScanError::LimitExceeded(format!(
                    "height {height} exceeds limit {max_h}"
                )));
            }
        }
        if let Some(max_px) = self.max_pixels {
            let pixels = u64::from(width) * u64::from(height);
            if pixels > max_px {
                return Err(ScanError::LimitExceeded(format!(
                    "pixel count {pixels} exceeds limit {max_px}"
                )));
            }
        }
        Ok(())
    }

    /// Check that a conversion allocation is within memory limits.
    pub(crate) fn check_memory(&self, bytes: usize) -> Result<(), ScanError> {
        if let Some(max_mem) = self.max_memory_bytes {
            if bytes as u64 > max_mem {
                return Err(ScanError::LimitExceeded(format!(
                    "allocation {bytes} bytes exceeds memory limit {max_mem}"
                )));
            }
        }
        Ok(())
    }
}
