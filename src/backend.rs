//! [`BarcodeDecoder`] backed by rxing.

use std::collections::{HashMap, HashSet};

use enough::Stop;
use rxing::{
    DecodeHintType, DecodeHintValue, DecodingHintDictionary, RXingResult, RXingResultMetadataType,
    RXingResultMetadataValue,
};
use tracing::debug;

use crate::barcode::{Barcode, ContentType, Point, Position};
use crate::buffer::FrameBuffer;
use crate::error::ScanError;
use crate::options::{BarcodeFormat, BarcodeFormats, ReaderOptions};
use crate::read::BarcodeDecoder;

/// Inputs at least this large on their short side get a half-resolution pass.
const DOWNSCALE_MIN_SIDE: u32 = 500;

/// Decoder using rxing's luma detectors.
///
/// Formats rxing has no reader for (DataBar Limited, Micro QR, rMQR,
/// DX film edge) are never reported.
#[derive(Clone, Copy, Debug, Default)]
pub struct RxingDecoder;

impl RxingDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl BarcodeDecoder for RxingDecoder {
    fn decode(
        &self,
        buffer: &FrameBuffer<'_>,
        options: &ReaderOptions,
        stop: &dyn Stop,
    ) -> Result<Vec<Barcode>, ScanError> {
        let Some(mut hints) = hints_for(options) else {
            debug!(formats = ?options.formats(), "no requested format has an rxing reader");
            return Ok(Vec::new());
        };
        let width = buffer.width();
        let height = buffer.height();
        let luma = buffer.luminance().into_owned();

        stop.check()?;
        let found = detect(luma.clone(), width, height, options, &mut hints);
        if !found.is_empty() {
            return Ok(convert(found, options, |p| p));
        }

        if options.try_rotate() {
            stop.check()?;
            let rotated = rotate_90(&luma, width, height);
            let found = detect(rotated, height, width, options, &mut hints);
            if !found.is_empty() {
                let last_row = height as f32 - 1.0;
                return Ok(convert(found, options, |(x, y)| (y, last_row - x)));
            }
        }

        if options.try_downscale() && width.min(height) >= DOWNSCALE_MIN_SIDE {
            stop.check()?;
            let (half, hw, hh) = downscale_half(&luma, width, height);
            let found = detect(half, hw, hh, options, &mut hints);
            if !found.is_empty() {
                return Ok(convert(found, options, |(x, y)| (x * 2.0, y * 2.0)));
            }
        }

        Ok(Vec::new())
    }
}

fn hints_for(options: &ReaderOptions) -> Option<DecodingHintDictionary> {
    let mut hints: DecodingHintDictionary = HashMap::new();
    hints.insert(
        DecodeHintType::TRY_HARDER,
        DecodeHintValue::TryHarder(options.try_harder()),
    );
    hints.insert(
        DecodeHintType::PURE_BARCODE,
        DecodeHintValue::PureBarcode(options.is_pure()),
    );
    hints.insert(
        DecodeHintType::ALSO_INVERTED,
        DecodeHintValue::AlsoInverted(options.try_invert()),
    );
    if !options.formats().is_empty() {
        let possible: HashSet<rxing::BarcodeFormat> =
            options.formats().formats().filter_map(to_rxing).collect();
        if possible.is_empty() {
            return None;
        }
        hints.insert(
            DecodeHintType::POSSIBLE_FORMATS,
            DecodeHintValue::PossibleFormats(possible),
        );
    }
    Some(hints)
}

fn detect(
    luma: Vec<u8>,
    width: u32,
    height: u32,
    options: &ReaderOptions,
    hints: &mut DecodingHintDictionary,
) -> Vec<RXingResult> {
    let result = if options.max_number_of_symbols() == 1 {
        rxing::helpers::detect_in_luma_with_hints(luma, width, height, None, hints).map(|r| vec![r])
    } else {
        rxing::helpers::detect_multiple_in_luma_with_hints(luma, width, height, hints)
    };
    match result {
        Ok(found) => found,
        Err(e) => {
            debug!(error = ?e, width, height, "rxing found nothing");
            Vec::new()
        }
    }
}

fn convert(
    found: Vec<RXingResult>,
    options: &ReaderOptions,
    map_point: impl Fn((f32, f32)) -> (f32, f32),
) -> Vec<Barcode> {
    found
        .iter()
        .filter_map(|r| {
            let format = from_rxing(r.getBarcodeFormat());
            if format == BarcodeFormat::None || !options.formats().allows(format) {
                return None;
            }
            let points: Vec<(f32, f32)> = r
                .getPoints()
                .iter()
                .map(|p| map_point((p.x, p.y)))
                .collect();
            let bytes = r.getText().as_bytes().to_vec();
            let symbology = symbology_identifier(r);
            Some(Barcode::new(
                format,
                options.text_mode().render(r.getText(), &bytes, symbology),
                bytes.clone(),
                ContentType::detect(&bytes, symbology),
                position_from(&points),
            ))
        })
        .collect()
}

fn symbology_identifier(result: &RXingResult) -> Option<&str> {
    match result
        .getRXingResultMetadata()
        .get(&RXingResultMetadataType::SYMBOLOGY_IDENTIFIER)?
    {
        RXingResultMetadataValue::SymbologyIdentifier(id) => Some(id.as_str()),
        _ => None,
    }
}

/// Build a quadrilateral from the points a reader reported.
///
/// Matrix readers report four corners. QR finder results arrive as three
/// points (bottom-left, top-left, top-right); the fourth corner completes the
/// parallelogram. Linear readers report the two ends of the scan line.
fn position_from(points: &[(f32, f32)]) -> Position {
    let pt = |(x, y): (f32, f32)| Point::new(x.round() as i32, y.round() as i32);
    match *points {
        [a, b, c, d, ..] => Position::new([pt(a), pt(b), pt(c), pt(d)]),
        [bl, tl, tr] => {
            let br = (tr.0 + bl.0 - tl.0, tr.1 + bl.1 - tl.1);
            Position::new([pt(tl), pt(tr), pt(br), pt(bl)])
        }
        [a, b] => Position::new([pt(a), pt(b), pt(b), pt(a)]),
        [a] => Position::new([pt(a); 4]),
        [] => Position::default(),
    }
}

/// Rotate clockwise by 90 degrees. The result is `height` wide.
fn rotate_90(luma: &[u8], width: u32, height: u32) -> Vec<u8> {
    let (w, h) = (width as usize, height as usize);
    let mut out = vec![0u8; w * h];
    for yr in 0..w {
        for xr in 0..h {
            out[yr * h + xr] = luma[(h - 1 - xr) * w + yr];
        }
    }
    out
}

fn downscale_half(luma: &[u8], width: u32, height: u32) -> (Vec<u8>, u32, u32) {
    let (w, hw, hh) = (width as usize, (width / 2) as usize, (height / 2) as usize);
    let mut out = Vec::with_capacity(hw * hh);
    for y in 0..hh {
        let top = &luma[2 * y * w..];
        let bottom = &luma[(2 * y + 1) * w..];
        for x in 0..hw {
            let sum = u16::from(top[2 * x])
                + u16::from(top[2 * x + 1])
                + u16::from(bottom[2 * x])
                + u16::from(bottom[2 * x + 1]);
            out.push(((sum + 2) / 4) as u8);
        }
    }
    (out, hw as u32, hh as u32)
}

pub(crate) fn to_rxing(format: BarcodeFormat) -> Option<rxing::BarcodeFormat> {
    use rxing::BarcodeFormat as R;
    Some(match format {
        BarcodeFormat::Aztec => R::AZTEC,
        BarcodeFormat::Codabar => R::CODABAR,
        BarcodeFormat::Code39 => R::CODE_39,
        BarcodeFormat::Code93 => R::CODE_93,
        BarcodeFormat::Code128 => R::CODE_128,
        BarcodeFormat::DataMatrix => R::DATA_MATRIX,
        BarcodeFormat::Ean8 => R::EAN_8,
        BarcodeFormat::Ean13 => R::EAN_13,
        BarcodeFormat::Itf => R::ITF,
        BarcodeFormat::MaxiCode => R::MAXICODE,
        BarcodeFormat::Pdf417 => R::PDF_417,
        BarcodeFormat::QrCode => R::QR_CODE,
        BarcodeFormat::DataBar => R::RSS_14,
        BarcodeFormat::DataBarExpanded => R::RSS_EXPANDED,
        BarcodeFormat::UpcA => R::UPC_A,
        BarcodeFormat::UpcE => R::UPC_E,
        _ => return None,
    })
}

fn from_rxing(format: &rxing::BarcodeFormat) -> BarcodeFormat {
    use rxing::BarcodeFormat as R;
    match format {
        R::AZTEC => BarcodeFormat::Aztec,
        R::CODABAR => BarcodeFormat::Codabar,
        R::CODE_39 => BarcodeFormat::Code39,
        R::CODE_93 => BarcodeFormat::Code93,
        R::CODE_128 => BarcodeFormat::Code128,
        R::DATA_MATRIX => BarcodeFormat::DataMatrix,
        R::EAN_8 => BarcodeFormat::Ean8,
        R::EAN_13 => BarcodeFormat::Ean13,
        R::ITF => BarcodeFormat::Itf,
        R::MAXICODE => BarcodeFormat::MaxiCode,
        R::PDF_417 => BarcodeFormat::Pdf417,
        R::QR_CODE => BarcodeFormat::QrCode,
        R::RSS_14 => BarcodeFormat::DataBar,
        R::RSS_EXPANDED => BarcodeFormat::DataBarExpanded,
        R::UPC_A => BarcodeFormat::UpcA,
        R::UPC_E => BarcodeFormat::UpcE,
        _ => BarcodeFormat::None,
    }
}
