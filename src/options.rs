//! Reader configuration.

use std::fmt;
use std::str::FromStr;

/// A single barcode symbology. `None` marks "no valid barcode" and unknown names.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum BarcodeFormat {
    #[default]
    None = 0,
    Aztec = 1 << 0,
    Codabar = 1 << 1,
    Code39 = 1 << 2,
    Code93 = 1 << 3,
    Code128 = 1 << 4,
    DataBar = 1 << 5,
    DataBarExpanded = 1 << 6,
    DataMatrix = 1 << 7,
    Ean8 = 1 << 8,
    Ean13 = 1 << 9,
    Itf = 1 << 10,
    MaxiCode = 1 << 11,
    Pdf417 = 1 << 12,
    QrCode = 1 << 13,
    UpcA = 1 << 14,
    UpcE = 1 << 15,
    MicroQrCode = 1 << 16,
    RmqrCode = 1 << 17,
    DxFilmEdge = 1 << 18,
    DataBarLimited = 1 << 19,
}

impl BarcodeFormat {
    /// Every real symbology, excluding `None`.
    pub const ALL: [BarcodeFormat; 20] = [
        Self::Aztec,
        Self::Codabar,
        Self::Code39,
        Self::Code93,
        Self::Code128,
        Self::DataBar,
        Self::DataBarExpanded,
        Self::DataMatrix,
        Self::Ean8,
        Self::Ean13,
        Self::Itf,
        Self::MaxiCode,
        Self::Pdf417,
        Self::QrCode,
        Self::UpcA,
        Self::UpcE,
        Self::MicroQrCode,
        Self::RmqrCode,
        Self::DxFilmEdge,
        Self::DataBarLimited,
    ];

    /// Display name, e.g. `"QRCode"` or `"EAN-13"`.
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Aztec => "Aztec",
            Self::Codabar => "Codabar",
            Self::Code39 => "Code39",
            Self::Code93 => "Code93",
            Self::Code128 => "Code128",
            Self::DataBar => "DataBar",
            Self::DataBarExpanded => "DataBarExpanded",
            Self::DataMatrix => "DataMatrix",
            Self::Ean8 => "EAN-8",
            Self::Ean13 => "EAN-13",
            Self::Itf => "ITF",
            Self::MaxiCode => "MaxiCode",
            Self::Pdf417 => "PDF417",
            Self::QrCode => "QRCode",
            Self::UpcA => "UPC-A",
            Self::UpcE => "UPC-E",
            Self::MicroQrCode => "MicroQRCode",
            Self::RmqrCode => "rMQRCode",
            Self::DxFilmEdge => "DXFilmEdge",
            Self::DataBarLimited => "DataBarLimited",
        }
    }

    /// Parse a display name, ignoring case, `-`, `_`, and spaces.
    ///
    /// Unknown names yield [`BarcodeFormat::None`].
    pub fn from_name(name: &str) -> BarcodeFormat {
        let wanted = normalize(name);
        Self::ALL
            .into_iter()
            .find(|f| normalize(f.name()) == wanted)
            .unwrap_or(BarcodeFormat::None)
    }

    pub fn bits(self) -> u32 {
        self as u32
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' ' | '[' | ']'))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl fmt::Display for BarcodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BarcodeFormat {
    type Err = core::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

bitflags::bitflags! {
    /// Set of enabled symbologies. Empty means "try every format".
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct BarcodeFormats: u32 {
        const AZTEC = 1 << 0;
        const CODABAR = 1 << 1;
        const CODE39 = 1 << 2;
        const CODE93 = 1 << 3;
        const CODE128 = 1 << 4;
        const DATA_BAR = 1 << 5;
        const DATA_BAR_EXPANDED = 1 << 6;
        const DATA_MATRIX = 1 << 7;
        const EAN8 = 1 << 8;
        const EAN13 = 1 << 9;
        const ITF = 1 << 10;
        const MAXI_CODE = 1 << 11;
        const PDF417 = 1 << 12;
        const QR_CODE = 1 << 13;
        const UPC_A = 1 << 14;
        const UPC_E = 1 << 15;
        const MICRO_QR_CODE = 1 << 16;
        const RMQR_CODE = 1 << 17;
        const DX_FILM_EDGE = 1 << 18;
        const DATA_BAR_LIMITED = 1 << 19;

        const LINEAR_CODES = Self::CODABAR.bits() | Self::CODE39.bits() | Self::CODE93.bits()
            | Self::CODE128.bits() | Self::EAN8.bits() | Self::EAN13.bits() | Self::ITF.bits()
            | Self::DATA_BAR.bits() | Self::DATA_BAR_EXPANDED.bits() | Self::DATA_BAR_LIMITED.bits()
            | Self::DX_FILM_EDGE.bits() | Self::UPC_A.bits() | Self::UPC_E.bits();
        const MATRIX_CODES = Self::AZTEC.bits() | Self::DATA_MATRIX.bits() | Self::MAXI_CODE.bits()
            | Self::PDF417.bits() | Self::QR_CODE.bits() | Self::MICRO_QR_CODE.bits()
            | Self::RMQR_CODE.bits();
    }
}

impl BarcodeFormats {
    /// Whether `format` is enabled. An empty set enables everything.
    pub fn allows(self, format: BarcodeFormat) -> bool {
        self.is_empty() || self.contains(format.into())
    }

    /// Individual formats in the set, in bit order.
    pub fn formats(self) -> impl Iterator<Item = BarcodeFormat> {
        BarcodeFormat::ALL
            .into_iter()
            .filter(move |f| self.contains(BarcodeFormats::from(*f)))
    }

    /// Parse a list such as `"QRCode, EAN-13|Code128"`. Unknown names are skipped.
    pub fn parse_list(list: &str) -> BarcodeFormats {
        list.split(|c: char| matches!(c, ',' | '|' | ' '))
            .filter(|s| !s.is_empty())
            .map(BarcodeFormat::from_name)
            .fold(BarcodeFormats::empty(), |acc, f| acc | f.into())
    }
}

impl From<BarcodeFormat> for BarcodeFormats {
    fn from(format: BarcodeFormat) -> Self {
        BarcodeFormats::from_bits_truncate(format.bits())
    }
}

/// How decoded content is rendered into [`Barcode::text`](crate::Barcode::text).
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextMode {
    /// Content as decoded.
    Plain,
    /// Symbology identifier followed by the content, with `\` doubled so
    /// ECI designators (`\NNNNNN`) stay unambiguous.
    Eci,
    /// Human readable interpretation.
    #[default]
    Hri,
    /// Payload bytes as uppercase hex.
    Hex,
    /// Content with control characters escaped as `<U+XXXX>`.
    Escaped,
}

impl TextMode {
    /// Render decoded content for this mode. `symbology_identifier` is the
    /// AIM identifier (`]Q1`, `]C0`, ...) when the reader reports one.
    pub fn render(self, text: &str, bytes: &[u8], symbology_identifier: Option<&str>) -> String {
        match self {
            TextMode::Plain | TextMode::Hri => text.to_owned(),
            TextMode::Eci => {
                let mut out = symbology_identifier.unwrap_or_default().to_owned();
                out.push_str(&text.replace('\\', "\\\\"));
                out
            }
            TextMode::Hex => hex::encode_upper(bytes),
            TextMode::Escaped => {
                let mut out = String::with_capacity(text.len());
                for c in text.chars() {
                    if c.is_control() {
                        out.push_str(&format!("<U+{:04X}>", c as u32));
                    } else {
                        out.push(c);
                    }
                }
                out
            }
        }
    }
}

/// Identifies one field of [`ReaderOptions`] in change notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReaderOption {
    Formats,
    TryHarder,
    TryRotate,
    TryInvert,
    TryDownscale,
    IsPure,
    MaxNumberOfSymbols,
    TextMode,
}

/// Decoder configuration.
///
/// `set_*` methods return `true` only when the stored value changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReaderOptions {
    formats: BarcodeFormats,
    try_harder: bool,
    try_rotate: bool,
    try_invert: bool,
    try_downscale: bool,
    is_pure: bool,
    max_number_of_symbols: u8,
    text_mode: TextMode,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            formats: BarcodeFormats::empty(),
            try_harder: true,
            try_rotate: true,
            try_invert: true,
            try_downscale: true,
            is_pure: false,
            max_number_of_symbols: 255,
            text_mode: TextMode::Hri,
        }
    }
}

macro_rules! option_accessors {
    ($($field:ident, $setter:ident, $with:ident, $ty:ty;)*) => {
        $(
            pub fn $field(&self) -> $ty {
                self.$field
            }

            pub fn $setter(&mut self, value: $ty) -> bool {
                if self.$field == value {
                    return false;
                }
                self.$field = value;
                true
            }

            pub fn $with(mut self, value: $ty) -> Self {
                self.$field = value;
                self
            }
        )*
    };
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    option_accessors! {
        formats, set_formats, with_formats, BarcodeFormats;
        try_harder, set_try_harder, with_try_harder, bool;
        try_rotate, set_try_rotate, with_try_rotate, bool;
        try_invert, set_try_invert, with_try_invert, bool;
        try_downscale, set_try_downscale, with_try_downscale, bool;
        is_pure, set_is_pure, with_is_pure, bool;
        max_number_of_symbols, set_max_number_of_symbols, with_max_number_of_symbols, u8;
        text_mode, set_text_mode, with_text_mode, TextMode;
    }

    /// Copy every field of `other` into `self`, reporting which ones changed.
    pub fn assign(&mut self, other: &ReaderOptions) -> Vec<ReaderOption> {
        let mut changed = Vec::new();
        if self.set_formats(other.formats) {
            changed.push(ReaderOption::Formats);
        }
        if self.set_try_harder(other.try_harder) {
            changed.push(ReaderOption::TryHarder);
        }
        if self.set_try_rotate(other.try_rotate) {
            changed.push(ReaderOption::TryRotate);
        }
        if self.set_try_invert(other.try_invert) {
            changed.push(ReaderOption::TryInvert);
        }
        if self.set_try_downscale(other.try_downscale) {
            changed.push(ReaderOption::TryDownscale);
        }
        if self.set_is_pure(other.is_pure) {
            changed.push(ReaderOption::IsPure);
        }
        if self.set_max_number_of_symbols(other.max_number_of_symbols) {
            changed.push(ReaderOption::MaxNumberOfSymbols);
        }
        if self.set_text_mode(other.text_mode) {
            changed.push(ReaderOption::TextMode);
        }
        changed
    }
}
