use enough::StopReason;

/// Errors from frame adaptation, decoding, and barcode generation.
///
/// The read entry points without a `try_` prefix and the
/// [`Dispatcher`](crate::Dispatcher) never surface these; they degrade to
/// "no barcode found" and log the error instead.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ScanError {
    #[error("pixel format conversion failed: {0}")]
    ConversionFailed(String),

    #[error("could not map frame memory: {0}")]
    MapFailed(String),

    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    #[error("row stride {stride} is smaller than the {min} bytes one row needs")]
    StrideTooSmall { stride: usize, min: usize },

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("barcode format {0} is not supported by this backend")]
    UnsupportedBarcodeFormat(String),

    #[error("cannot generate a barcode from empty content")]
    EmptyContent,

    #[error("barcode encoding failed: {0}")]
    Encode(String),

    #[error("could not save barcode image: {0}")]
    Save(String),

    /// Failure reported by a [`BarcodeDecoder`](crate::BarcodeDecoder) implementation.
    #[error("decoder failure: {0}")]
    Decoder(String),

    #[error("operation cancelled")]
    Cancelled(StopReason),
}

impl From<StopReason> for ScanError {
    fn from(r: StopReason) -> Self {
        ScanError::Cancelled(r)
    }
}
