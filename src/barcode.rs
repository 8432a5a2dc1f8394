use std::fmt;

use crate::options::BarcodeFormat;

/// Kind of content a barcode carries.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ContentType {
    #[default]
    Text,
    Binary,
    Mixed,
    Gs1,
    Iso15434,
    UnknownEci,
}

impl ContentType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Binary => "Binary",
            Self::Mixed => "Mixed",
            Self::Gs1 => "GS1",
            Self::Iso15434 => "ISO15434",
            Self::UnknownEci => "UnknownECI",
        }
    }

    /// Classify a payload: an ISO 15434 envelope (`[)>` followed by RS),
    /// printable UTF-8 as text, no printable content as binary, anything in
    /// between as mixed.
    pub fn classify(bytes: &[u8]) -> ContentType {
        if bytes.starts_with(ISO15434_HEADER) {
            return ContentType::Iso15434;
        }
        let Ok(text) = std::str::from_utf8(bytes) else {
            return ContentType::Binary;
        };
        let controls = text
            .chars()
            .filter(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
            .count();
        match controls {
            0 => ContentType::Text,
            n if n == text.chars().count() => ContentType::Binary,
            _ => ContentType::Mixed,
        }
    }

    /// Content type implied by an AIM symbology identifier such as `]C1`.
    ///
    /// Only GS1 is signalled this way. Readers that do not report ECI
    /// designators never yield [`ContentType::UnknownEci`].
    pub fn from_symbology_identifier(id: &str) -> Option<ContentType> {
        GS1_IDENTIFIERS.contains(&id).then_some(ContentType::Gs1)
    }

    /// Symbology identifier first, then the payload itself.
    pub fn detect(bytes: &[u8], symbology_identifier: Option<&str>) -> ContentType {
        symbology_identifier
            .and_then(Self::from_symbology_identifier)
            .unwrap_or_else(|| Self::classify(bytes))
    }
}

const ISO15434_HEADER: &[u8] = b"[)>\x1e";

/// FNC1-in-first-position modifiers: Code 128, DataBar, Data Matrix (with and
/// without ECI), QR (with and without ECI), Aztec, DotCode.
const GS1_IDENTIFIERS: [&str; 8] = ["]C1", "]e0", "]d2", "]d5", "]Q3", "]Q4", "]z1", "]J1"];

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Integer pixel coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.x, self.y)
    }
}

/// Quadrilateral around a symbol, corners in the order the decoder reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_right: Point,
    pub bottom_left: Point,
}

impl Position {
    pub const fn new(corners: [Point; 4]) -> Self {
        Self {
            top_left: corners[0],
            top_right: corners[1],
            bottom_right: corners[2],
            bottom_left: corners[3],
        }
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Axis-aligned bounds as (min, max).
    pub fn bounds(&self) -> (Point, Point) {
        let c = self.corners();
        let min = Point::new(
            c.iter().map(|p| p.x).min().unwrap_or_default(),
            c.iter().map(|p| p.y).min().unwrap_or_default(),
        );
        let max = Point::new(
            c.iter().map(|p| p.x).max().unwrap_or_default(),
            c.iter().map(|p| p.y).max().unwrap_or_default(),
        );
        (min, max)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.top_left, self.top_right, self.bottom_right, self.bottom_left
        )
    }
}

/// A decoded barcode.
///
/// `Barcode::default()` is the invalid barcode returned when nothing was found.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Barcode {
    format: BarcodeFormat,
    text: String,
    bytes: Vec<u8>,
    content_type: ContentType,
    position: Position,
}

impl Barcode {
    pub fn new(
        format: BarcodeFormat,
        text: String,
        bytes: Vec<u8>,
        content_type: ContentType,
        position: Position,
    ) -> Self {
        Self {
            format,
            text,
            bytes,
            content_type,
            position,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.format != BarcodeFormat::None
    }

    pub fn format(&self) -> BarcodeFormat {
        self.format
    }

    pub fn format_name(&self) -> &'static str {
        self.format.name()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn content_type_name(&self) -> &'static str {
        self.content_type.name()
    }

    pub fn position(&self) -> &Position {
        &self.position
    }
}
