//! Scenery material flags carried by every converted primitive
//!
//! # Bit layout
//! ```text
//! 0x001        diffuse lighting
//! 0x002        alpha test
//! 0x00C mask   blend mode     (none, blend, add, mask)
//! 0x070 mask   shader kind    (image, dark shade, half bright, full bright, vegetation)
//! 0x180 mask   specular level (0, 25, 750)
//! 0x600 mask   address mode   (wrap, mirror, clamp, border)
//! 0x800        night texture
//! ```

bitflags::bitflags! {
    /// Material options derived from a primitive's shader and lighting state
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MaterialFlags: u32 {
        const DIFFUSE = 0x001;
        const ALPHA_TEST = 0x002;

        const BLEND = 0x004;
        const ADD = 0x008;
        const BLEND_MASK = 0x00C;

        const SHADER_DARK_SHADE = 0x010;
        const SHADER_HALF_BRIGHT = 0x020;
        const SHADER_FULL_BRIGHT = 0x030;
        const SHADER_VEGETATION = 0x040;
        const SHADER_MASK = 0x070;

        const SPECULAR_25 = 0x080;
        const SPECULAR_750 = 0x100;
        const SPECULAR_MASK = 0x180;

        const ADDRESS_MIRROR = 0x200;
        const ADDRESS_CLAMP = 0x400;
        const ADDRESS_BORDER = 0x600;
        const ADDRESS_MASK = 0x600;

        const NIGHT_TEXTURE = 0x800;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    None,
    Blend,
    Add,
    Mask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderKind {
    Image,
    DarkShade,
    HalfBright,
    FullBright,
    Vegetation,
    /// Bit pattern outside the named kinds (only reachable by OR-ing kinds)
    Other(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecularLevel {
    Zero,
    Level25,
    Level750,
    /// Both specular bits set
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureAddressMode {
    Wrap,
    Mirror,
    Clamp,
    Border,
}

impl MaterialFlags {
    /// Value written to the container
    pub fn value(self) -> i32 {
        self.bits() as i32
    }

    pub fn from_value(value: i32) -> Self {
        Self::from_bits_retain(value as u32)
    }

    pub fn blend_mode(self) -> BlendMode {
        match self.bits() & Self::BLEND_MASK.bits() {
            0x000 => BlendMode::None,
            0x004 => BlendMode::Blend,
            0x008 => BlendMode::Add,
            _ => BlendMode::Mask,
        }
    }

    pub fn shader_kind(self) -> ShaderKind {
        match self.bits() & Self::SHADER_MASK.bits() {
            0x000 => ShaderKind::Image,
            0x010 => ShaderKind::DarkShade,
            0x020 => ShaderKind::HalfBright,
            0x030 => ShaderKind::FullBright,
            0x040 => ShaderKind::Vegetation,
            other => ShaderKind::Other(other),
        }
    }

    pub fn specular_level(self) -> SpecularLevel {
        match self.bits() & Self::SPECULAR_MASK.bits() {
            0x000 => SpecularLevel::Zero,
            0x080 => SpecularLevel::Level25,
            0x100 => SpecularLevel::Level750,
            _ => SpecularLevel::Other,
        }
    }

    pub fn address_mode(self) -> TextureAddressMode {
        match self.bits() & Self::ADDRESS_MASK.bits() {
            0x000 => TextureAddressMode::Wrap,
            0x200 => TextureAddressMode::Mirror,
            0x400 => TextureAddressMode::Clamp,
            _ => TextureAddressMode::Border,
        }
    }
}
