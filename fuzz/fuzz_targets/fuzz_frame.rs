#![no_main]
use libfuzzer_sys::fuzz_target;
use zenscan::{
    Barcode, BarcodeDecoder, CpuFrame, FrameBuffer, ReaderOptions, ScanError, Stop,
    VideoPixelFormat,
};

/// Touches every byte the buffer claims to cover.
struct Sum;

impl BarcodeDecoder for Sum {
    fn decode(
        &self,
        buffer: &FrameBuffer<'_>,
        _options: &ReaderOptions,
        _stop: &dyn Stop,
    ) -> Result<Vec<Barcode>, ScanError> {
        let _ = buffer.luminance().iter().map(|&v| u64::from(v)).sum::<u64>();
        Ok(Vec::new())
    }
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 13 {
        return;
    }
    let format = VideoPixelFormat::ALL[data[0] as usize % VideoPixelFormat::ALL.len()];
    // Full u32 range, including sizes far beyond the plane data.
    let width = u32::from_le_bytes([data[1], data[2], data[3], data[4]]);
    let height = u32::from_le_bytes([data[5], data[6], data[7], data[8]]);
    let stride = u32::from_le_bytes([data[9], data[10], data[11], data[12]]) as usize;
    let frame = CpuFrame::new(format, width, height).with_plane(data[13..].to_vec(), stride);

    // Any geometry must either scan or be rejected, never panic.
    let _ = zenscan::try_read_barcodes_frame(
        &Sum,
        &frame,
        &ReaderOptions::default(),
        &enough::Unstoppable,
    );
});
