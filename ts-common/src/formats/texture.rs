//! TSTEXT texture format (.ts_tex)
//!
//! # Layout
//! ```text
//! 0x00: tag "TSTEXT"
//! 0x06: width i32
//! 0x0A: height i32
//! 0x0E: format i32 (TextureFormat ordinal)
//! 0x12: data_len i32
//! 0x16: data (RGBA32 pixels or pre-encoded surface blocks)
//! ```

/// Pixel layout of a converted texture.
///
/// The discriminant is the ordinal written to the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum TextureFormat {
    Rgba32 = 0,
    Bgra32 = 1,
    Bgr565 = 2,
    Bgra5551 = 3,
    Bgra4444 = 4,
    Dxt1 = 5,
    Dxt3 = 6,
    Dxt5 = 7,
}

impl TextureFormat {
    pub const ALL: [TextureFormat; 8] = [
        TextureFormat::Rgba32,
        TextureFormat::Bgra32,
        TextureFormat::Bgr565,
        TextureFormat::Bgra5551,
        TextureFormat::Bgra4444,
        TextureFormat::Dxt1,
        TextureFormat::Dxt3,
        TextureFormat::Dxt5,
    ];

    pub fn ordinal(self) -> i32 {
        self as i32
    }

    pub fn from_ordinal(value: i32) -> Option<Self> {
        Self::ALL.get(usize::try_from(value).ok()?).copied()
    }

    /// Block-compressed formats are carried verbatim from the source
    pub fn is_block_compressed(self) -> bool {
        matches!(self, Self::Dxt1 | Self::Dxt3 | Self::Dxt5)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Rgba32 => "RGBA32",
            Self::Bgra32 => "BGRA32",
            Self::Bgr565 => "BGR565",
            Self::Bgra5551 => "BGRA5551",
            Self::Bgra4444 => "BGRA4444",
            Self::Dxt1 => "DXT1",
            Self::Dxt3 => "DXT3",
            Self::Dxt5 => "DXT5",
        }
    }
}

impl std::fmt::Display for TextureFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded texture ready for the TSTEXT container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    pub width: i32,
    pub height: i32,
    pub format: TextureFormat,
    pub data: Vec<u8>,
}

impl TextureImage {
    pub fn new(width: i32, height: i32, format: TextureFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format,
            data,
        }
    }

    /// Calculate RGBA32 pixel data size (4 bytes per pixel)
    pub fn rgba32_size(&self) -> usize {
        self.width.max(0) as usize * self.height.max(0) as usize * 4
    }
}
