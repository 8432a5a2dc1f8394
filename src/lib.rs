//! # zenscan
//!
//! Pixel-format negotiation and single-flight barcode decode dispatch for
//! camera frames and still images.
//!
//! ## Zero-Copy Scanning
//!
//! Frames whose pixel format maps directly onto a layout the decoder reads
//! (packed RGB variants, 8-bit luma planes, interleaved YUV with a luma
//! stride) are handed to the decoder as a borrowed [`FrameBuffer`] over the
//! mapped frame memory. Only formats without a direct mapping are converted,
//! and the still-image path normalizes those to 8-bit grayscale.
//!
//! ## Dispatch
//!
//! [`Dispatcher`] owns the reader configuration and an observer. It runs at
//! most one decode at a time on the rayon pool; a frame submitted while a
//! decode is running is dropped. Outcomes are delivered on the owner's thread
//! through [`Dispatcher::process_events`] or [`Dispatcher::wait_for_event`].
//!
//! ## Features
//!
//! - `rxing` (default): [`RxingDecoder`] and the barcode writer
//! - `rgb`: [`StillImage`] from RGB8/RGBA8 pixel slices
//! - `imgref`: [`StillImage`] from `ImgRef` 2D buffers
//!
//! ## Usage
//!
//! ```no_run
//! # #[cfg(feature = "rxing")]
//! # {
//! use zenscan::{Barcode, Dispatcher, RxingDecoder, ScanObserver, StillImage, Submission};
//! use std::time::Duration;
//!
//! struct Print;
//!
//! impl ScanObserver for Print {
//!     fn barcode_found(&mut self, barcode: &Barcode) {
//!         println!("{}: {}", barcode.format_name(), barcode.text());
//!     }
//!     fn barcode_not_found(&mut self) {}
//! }
//!
//! let pixels: &[u8] = &[]; // your 8-bit grayscale frame
//! let mut dispatcher = Dispatcher::new(RxingDecoder::new(), Print);
//! let image = StillImage::from_gray(pixels, 640, 480)?;
//! if dispatcher.submit_image(image) == Submission::Accepted {
//!     dispatcher.wait_for_event(Duration::from_secs(1));
//! }
//! # }
//! # Ok::<(), zenscan::ScanError>(())
//! ```

#![forbid(unsafe_code)]

mod barcode;
mod buffer;
mod dispatch;
mod error;
mod limits;
mod options;
mod pixel;
mod read;
mod resolve;
mod still;
mod stop;
mod video;

#[cfg(feature = "rxing")]
mod backend;
#[cfg(feature = "rxing")]
mod writer;

// Re-exports
pub use barcode::{Barcode, ContentType, Point, Position};
pub use buffer::FrameBuffer;
pub use dispatch::{Dispatcher, DispatcherBuilder, ScanObserver, Submission};
pub use enough::{Stop, StopReason, Unstoppable};
pub use error::ScanError;
pub use limits::Limits;
pub use options::{BarcodeFormat, BarcodeFormats, ReaderOption, ReaderOptions, TextMode};
pub use pixel::{Endian, PixelLayout};
pub use read::{
    BarcodeDecoder, ScanRequest, read_barcode, read_barcode_frame, read_barcodes,
    read_barcodes_frame, try_read_barcodes_frame, try_read_barcodes_image,
};
pub use resolve::{
    LayoutMapping, resolve_image_format, resolve_image_format_for, resolve_video_format,
    resolve_video_format_for,
};
pub use still::{ImageFormat, StillImage};
pub use stop::StopToken;
pub use video::{CpuFrame, MappedFrame, MappedPlane, VideoFrame, VideoPixelFormat};

#[cfg(feature = "rxing")]
pub use backend::RxingDecoder;
#[cfg(feature = "rxing")]
pub use writer::{BarcodeWriter, write_barcode};
