//! Material flag derivation for shape primitives
//!
//! Flags are a pure function of the primitive's shader name, alpha test mode
//! and vertex light material index. Unknown inputs contribute no bits.

use ts_common::MaterialFlags;

/// Shader names with fixed blend/diffuse options
const SHADER_TABLE: [(&str, MaterialFlags); 6] = [
    ("Tex", MaterialFlags::empty()),
    ("TexDiff", MaterialFlags::DIFFUSE),
    ("BlendATex", MaterialFlags::BLEND),
    ("BlendATexDiff", MaterialFlags::BLEND.union(MaterialFlags::DIFFUSE)),
    ("AddATex", MaterialFlags::ADD),
    ("AddATexDiff", MaterialFlags::ADD.union(MaterialFlags::DIFFUSE)),
];

/// Vertex light modes, indexed by `12 + light material index`
const LIGHT_MODE_TABLE: [MaterialFlags; 8] = [
    MaterialFlags::SHADER_DARK_SHADE,
    MaterialFlags::SHADER_HALF_BRIGHT,
    MaterialFlags::SHADER_VEGETATION,
    MaterialFlags::SHADER_VEGETATION,
    MaterialFlags::SHADER_FULL_BRIGHT,
    MaterialFlags::SPECULAR_750,
    MaterialFlags::SPECULAR_25,
    MaterialFlags::empty(),
];

const LIGHT_MODE_BASE: i64 = 12;

pub fn shader_flags(shader_name: &str) -> MaterialFlags {
    SHADER_TABLE
        .iter()
        .find(|(name, _)| *name == shader_name)
        .map_or(MaterialFlags::empty(), |(_, flags)| *flags)
}

pub fn light_mode_flags(light_mat_index: i32) -> MaterialFlags {
    usize::try_from(LIGHT_MODE_BASE + i64::from(light_mat_index))
        .ok()
        .and_then(|slot| LIGHT_MODE_TABLE.get(slot))
        .copied()
        .unwrap_or(MaterialFlags::empty())
}

pub fn derive_material_flags(
    shader_name: &str,
    alpha_test_mode: i32,
    light_mat_index: i32,
) -> MaterialFlags {
    let mut flags = shader_flags(shader_name) | light_mode_flags(light_mat_index);
    if alpha_test_mode == 1 {
        flags |= MaterialFlags::ALPHA_TEST;
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use ts_common::{BlendMode, ShaderKind, SpecularLevel};

    #[test]
    fn test_shader_table() {
        assert_eq!(shader_flags("Tex"), MaterialFlags::empty());
        assert_eq!(shader_flags("TexDiff"), MaterialFlags::DIFFUSE);
        assert_eq!(shader_flags("BlendATexDiff").blend_mode(), BlendMode::Blend);
        assert_eq!(shader_flags("AddATexDiff").value(), 0x009);
        assert_eq!(shader_flags("texdiff"), MaterialFlags::empty());
    }

    #[test]
    fn test_light_modes() {
        assert_eq!(light_mode_flags(-12).shader_kind(), ShaderKind::DarkShade);
        assert_eq!(light_mode_flags(-11).shader_kind(), ShaderKind::HalfBright);
        assert_eq!(light_mode_flags(-10).shader_kind(), ShaderKind::Vegetation);
        assert_eq!(light_mode_flags(-9).shader_kind(), ShaderKind::Vegetation);
        assert_eq!(light_mode_flags(-8).shader_kind(), ShaderKind::FullBright);
        assert_eq!(light_mode_flags(-7).specular_level(), SpecularLevel::Level750);
        assert_eq!(light_mode_flags(-6).specular_level(), SpecularLevel::Level25);
        assert_eq!(light_mode_flags(-5), MaterialFlags::empty());
    }

    #[test]
    fn test_out_of_range_light_index_contributes_nothing() {
        assert_eq!(light_mode_flags(-13), MaterialFlags::empty());
        assert_eq!(light_mode_flags(0), MaterialFlags::empty());
        assert_eq!(light_mode_flags(i32::MIN), MaterialFlags::empty());
        assert_eq!(light_mode_flags(i32::MAX), MaterialFlags::empty());
    }

    #[test]
    fn test_derive_combines_all_sources() {
        let flags = derive_material_flags("BlendATexDiff", 1, -8);
        assert_eq!(
            flags,
            MaterialFlags::BLEND
                | MaterialFlags::DIFFUSE
                | MaterialFlags::ALPHA_TEST
                | MaterialFlags::SHADER_FULL_BRIGHT
        );
        assert_eq!(flags.value(), 0x037);
    }

    #[test]
    fn test_unknown_shader_still_gets_light_bits() {
        let flags = derive_material_flags("Mystery", 0, -12);
        assert_eq!(flags, MaterialFlags::SHADER_DARK_SHADE);
    }

    #[test]
    fn test_alpha_test_only_for_mode_one() {
        assert!(!derive_material_flags("Tex", 0, 0).contains(MaterialFlags::ALPHA_TEST));
        assert!(derive_material_flags("Tex", 1, 0).contains(MaterialFlags::ALPHA_TEST));
        assert!(!derive_material_flags("Tex", 2, 0).contains(MaterialFlags::ALPHA_TEST));
    }
}
