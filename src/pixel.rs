/// Canonical buffer layout the decoder consumes.
///
/// Channel names follow the in-memory byte sequence, not the name of the
/// source pixel format: a `Bgra` buffer stores blue at byte 0.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelLayout {
    /// Single 8-bit luminance channel.
    Lum,
    /// 3 bytes: R, G, B.
    Rgb,
    /// 4 bytes: R, G, B, A.
    Rgba,
    /// 4 bytes: A, R, G, B.
    Argb,
    /// 4 bytes: B, G, R, A.
    Bgra,
    /// 4 bytes: A, B, G, R.
    Abgr,
}

impl PixelLayout {
    /// Bytes per pixel for this layout.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Lum => 1,
            Self::Rgb => 3,
            Self::Rgba | Self::Argb | Self::Bgra | Self::Abgr => 4,
        }
    }

    /// Byte offsets of the red, green and blue channels within one pixel.
    ///
    /// `None` for [`PixelLayout::Lum`].
    pub fn rgb_offsets(&self) -> Option<[usize; 3]> {
        match self {
            Self::Lum => None,
            Self::Rgb | Self::Rgba => Some([0, 1, 2]),
            Self::Argb => Some([1, 2, 3]),
            Self::Bgra => Some([2, 1, 0]),
            Self::Abgr => Some([3, 2, 1]),
        }
    }
}

/// Host byte order, which decides how packed 32-bit words land in memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    /// Byte order of the target this crate was compiled for.
    pub const NATIVE: Endian = if cfg!(target_endian = "big") {
        Endian::Big
    } else {
        Endian::Little
    };
}

/// Integer luma approximation: .299R + .587G + .114B with rounding.
#[inline]
pub(crate) fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((306 * u32::from(r) + 601 * u32::from(g) + 117 * u32::from(b) + 0x200) >> 10) as u8
}
