//! MSTS text shape (`.s`) reader
//!
//! Accepted encodings:
//! - UTF-16LE with a byte-order mark (the usual form)
//! - UTF-8 / ASCII
//! - `SIMISA@F` compressed, inflating to either of the above
//!
//! The text starts with `SIMISA@@@@@@@@@@JINX0s1t______`. Binary shapes
//! (`JINX0s1b`) are rejected.

mod parser;
mod reader;
mod types;

pub use parser::{Block, Fields, Item, Token, parse_tree, tokenize};
pub use types::*;

use std::io::Read;
use std::path::Path;

use crate::error::{ConvertError, Result};
use crate::simis;

const SIMIS_TEXT_PREFIX: &str = "SIMISA@@@@@@@@@@";
const JINX_PREFIX: &str = "JINX0";
const JINX_TEXT: &str = "JINX0s1t";
const JINX_BINARY: &[u8] = b"JINX0s1b";

const UTF16LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

pub fn read_shape_file(path: &Path) -> Result<Shape> {
    let bytes = std::fs::read(path)?;
    parse_shape(&bytes)
}

/// Parse a complete `.s` file
pub fn parse_shape(bytes: &[u8]) -> Result<Shape> {
    let text = shape_text(bytes)?;
    let tokens = tokenize(&text)?;
    let tree = parse_tree(&tokens)?;
    reader::build_shape(&tree)
}

/// Decode the file to text and strip the SIMIS/JINX header
pub fn shape_text(bytes: &[u8]) -> Result<String> {
    let text = if bytes.starts_with(simis::SIGNATURE_COMPRESSED) {
        let mut payload = Vec::new();
        simis::open_payload(bytes)?.read_to_end(&mut payload)?;
        decode_text(&payload)?
    } else {
        decode_text(bytes)?
    };

    let body = text.trim_start_matches('\u{feff}').trim_start();
    let body = body.strip_prefix(SIMIS_TEXT_PREFIX).unwrap_or(body).trim_start();

    if !body.starts_with(JINX_PREFIX) {
        return Err(ConvertError::InvalidSignature {
            expected: JINX_TEXT,
            found: body.chars().take(16).collect(),
        });
    }
    if !body.starts_with(JINX_TEXT) {
        let found: String = body.chars().take(8).collect();
        return Err(ConvertError::UnsupportedShapeEncoding(format!(
            "{found} (only text shapes are supported)"
        )));
    }

    // Drop the JINX marker word
    let rest = body.find(char::is_whitespace).map_or("", |end| &body[end..]);
    Ok(rest.to_string())
}

fn decode_text(bytes: &[u8]) -> Result<String> {
    if let Some(utf16) = bytes.strip_prefix(&UTF16LE_BOM) {
        if utf16.len() % 2 != 0 {
            return Err(ConvertError::UnsupportedShapeEncoding(
                "odd-length UTF-16 text".to_string(),
            ));
        }
        let units = utf16.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]]));
        return char::decode_utf16(units)
            .collect::<std::result::Result<String, _>>()
            .map_err(|e| ConvertError::UnsupportedShapeEncoding(format!("invalid UTF-16: {e}")));
    }

    let bytes = bytes.strip_prefix(&UTF8_BOM).unwrap_or(bytes);
    if contains_at_header(bytes, JINX_BINARY) {
        return Err(ConvertError::UnsupportedShapeEncoding(
            "JINX0s1b (only text shapes are supported)".to_string(),
        ));
    }
    String::from_utf8(bytes.to_vec())
        .map_err(|_| ConvertError::UnsupportedShapeEncoding("not UTF-8 or UTF-16 text".to_string()))
}

/// Binary payloads are not valid text, so look for their marker first
fn contains_at_header(bytes: &[u8], marker: &[u8]) -> bool {
    let header = &bytes[..bytes.len().min(32)];
    header.windows(marker.len()).any(|w| w == marker)
}

/// Small two-matrix shape used by unit tests
#[cfg(test)]
pub(crate) const SAMPLE_SHAPE: &str = r#"SIMISA@@@@@@@@@@JINX0s1t______

shape (
	shape_header ( 00000000 00000000 )
	volumes ( 1
		vol_sphere (
			vector ( 0 1.5 0 ) 12.5
		)
	)
	shader_names ( 2
		named_shader ( TexDiff )
		named_shader ( BlendATexDiff )
	)
	texture_filter_names ( 1
		named_filter_mode ( MipLinear )
	)
	points ( 3
		point ( 0 0 0 )
		point ( 1 0 0 )
		point ( 0 1 0 )
	)
	uv_points ( 2
		uv_point ( 0 0 )
		uv_point ( 1 1 )
	)
	normals ( 1
		vector ( 0 0 1 )
	)
	sort_vectors ( 0 )
	colours ( 0 )
	matrices ( 2
		matrix MAIN ( 1 0 0 0 1 0 0 0 1 0 0 0 )
		matrix WHEEL ( 1 0 0 0 1 0 0 0 1 2 3 4 )
	)
	images ( 1
		image ( "textures\wall.ace" )
	)
	textures ( 1
		texture ( 0 0 0 ff000000 )
	)
	light_materials ( 0 )
	light_model_cfgs ( 1
		light_model_cfg ( 00000000
			uv_ops ( 1
				uv_op_copy ( 1 0 )
			)
		)
	)
	vtx_states ( 2
		vtx_state ( 00000000 0 -5 0 00000002 )
		vtx_state ( 00000000 1 -8 0 00000002 )
	)
	prim_states ( 2
		prim_state ( 00000000 0
			tex_idxs ( 1 0 ) 0 0 0 0 1
		)
		prim_state WHEEL_PRIM ( 00000000 1
			tex_idxs ( 1 0 ) 0 1 1 0 1
		)
	)
	lod_controls ( 1
		lod_control (
			distance_levels_header ( 0 )
			distance_levels ( 1
				distance_level (
					distance_level_header (
						dlevel_selection ( 2000 )
						hierarchy ( 2 -1 0 )
					)
					sub_objects ( 1
						sub_object (
							sub_object_header ( 00000400 -1 -1 000001d2 000001c4 )
							vertices ( 3
								vertex ( 00000000 0 0 ffffffff ff000000
									vertex_uvs ( 1 0 )
								)
								vertex ( 00000000 1 0 ffffffff ff000000
									vertex_uvs ( 1 1 )
								)
								vertex ( 00000000 2 0 ffffffff ff000000
									vertex_uvs ( 0 )
								)
							)
							vertex_sets ( 1
								vertex_set ( 0 0 3 )
							)
							primitives ( 3
								prim_state_idx ( 0 )
								indexed_trilist (
									vertex_idxs ( 3 0 1 2 )
									normal_idxs ( 1 0 3 )
									flags ( 1 00000000 )
								)
								prim_state_idx ( 1 )
								indexed_trilist (
									vertex_idxs ( 6 0 1 2 2 1 0 )
									normal_idxs ( 2 0 3 0 3 )
									flags ( 2 00000000 00000000 )
								)
							)
						)
					)
				)
			)
		)
	)
	animations ( 1
		animation ( 2 30
			anim_nodes ( 2
				anim_node MAIN (
					controllers ( 0 )
				)
				anim_node WHEEL (
					controllers ( 2
						tcb_rot ( 2
							slerp_rot ( 0 0 0 0 1 )
							tcb_key ( 1 0 0.7071 0 0.7071 0 0 0 0 0 )
						)
						linear_pos ( 2
							linear_key ( 0 2 3 4 )
							linear_key ( 1 2 3 4 )
						)
					)
				)
			)
		)
	)
)
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn utf16(text: &str) -> Vec<u8> {
        let mut bytes = UTF16LE_BOM.to_vec();
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_sample_tables() {
        let shape = parse_shape(SAMPLE_SHAPE.as_bytes()).unwrap();

        assert_eq!(shape.volumes[0].radius, 12.5);
        assert_eq!(shape.shader_names, vec!["TexDiff", "BlendATexDiff"]);
        assert_eq!(shape.points.len(), 3);
        assert_eq!(shape.uv_points.len(), 2);
        assert_eq!(shape.normals, vec![Vec3::Z]);
        assert_eq!(shape.matrices[1].name, "WHEEL");
        assert_eq!(shape.matrices[1].translation, Vec3::new(2.0, 3.0, 4.0));
        assert_eq!(shape.images, vec!["textures\\wall.ace"]);
        assert_eq!(shape.textures[0].border_colour, 0xff00_0000);
        assert_eq!(shape.light_model_cfgs.len(), 1);
        assert_eq!(shape.vtx_states[1].matrix_index, 1);
        assert_eq!(shape.vtx_states[1].light_mat_index, -8);
        assert_eq!(shape.prim_states[0].name, None);
        assert_eq!(shape.prim_states[1].name.as_deref(), Some("WHEEL_PRIM"));
        assert_eq!(shape.prim_states[1].vtx_state_index, 1);
        assert_eq!(shape.prim_states[1].alpha_test_mode, 1);
    }

    #[test]
    fn test_sample_lods_and_primitives() {
        let shape = parse_shape(SAMPLE_SHAPE.as_bytes()).unwrap();
        let level = shape.distance_levels().next().unwrap();

        assert_eq!(level.selection, 2000.0);
        assert_eq!(level.hierarchy, vec![-1, 0]);

        let sub = &level.sub_objects[0];
        assert_eq!(sub.vertices.len(), 3);
        assert_eq!(sub.vertices[1].uv_indices, vec![1]);
        assert!(sub.vertices[2].uv_indices.is_empty());
        assert_eq!(sub.vertices[0].colour1, 0xffff_ffff);

        assert_eq!(sub.primitives.len(), 2);
        assert_eq!(sub.primitives[0].prim_state_index, 0);
        assert_eq!(sub.primitives[0].triangles, vec![[0, 1, 2]]);
        assert_eq!(sub.primitives[1].prim_state_index, 1);
        assert_eq!(sub.primitives[1].triangles, vec![[0, 1, 2], [2, 1, 0]]);
    }

    #[test]
    fn test_sample_animation() {
        let shape = parse_shape(SAMPLE_SHAPE.as_bytes()).unwrap();
        let clip = &shape.animations[0];

        assert_eq!((clip.frame_count, clip.frame_rate), (2, 30));
        assert_eq!(clip.nodes[0].name, "MAIN");
        assert!(clip.nodes[0].controllers.is_empty());

        let ShapeController::TcbRotation(keys) = &clip.nodes[1].controllers[0] else {
            panic!("expected a rotation controller");
        };
        assert!(matches!(keys[0], ShapeKey::Slerp { frame: 0, .. }));
        assert!(matches!(keys[1], ShapeKey::Tcb { frame: 1, .. }));
        assert!(matches!(
            clip.nodes[1].controllers[1],
            ShapeController::LinearPosition(_)
        ));
    }

    #[test]
    fn test_utf16_text() {
        let shape = parse_shape(&utf16(SAMPLE_SHAPE)).unwrap();
        assert_eq!(shape.matrices.len(), 2);
    }

    #[test]
    fn test_compressed_text() {
        use flate2::Compression;
        use flate2::write::DeflateEncoder;
        use std::io::Write;

        let payload = utf16("JINX0s1t______\r\nshape ( points ( 1 point ( 1 2 3 ) ) )");
        let mut bytes = b"SIMISA@F".to_vec();
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(b"@@@@");
        bytes.extend_from_slice(&[0x78, 0x9C]);
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&payload).unwrap();
        bytes.extend_from_slice(&encoder.finish().unwrap());

        let shape = parse_shape(&bytes).unwrap();
        assert_eq!(shape.points, vec![Vec3::new(1.0, 2.0, 3.0)]);
    }

    #[test]
    fn test_binary_shape_rejected() {
        let mut bytes = b"SIMISA@@@@@@@@@@JINX0s1b______".to_vec();
        bytes.extend_from_slice(&[0x00, 0xFF, 0x80, 0x81]);
        assert!(matches!(
            parse_shape(&bytes),
            Err(ConvertError::UnsupportedShapeEncoding(_))
        ));

        assert!(matches!(
            parse_shape(&utf16("SIMISA@@@@@@@@@@JINX0s1b______")),
            Err(ConvertError::UnsupportedShapeEncoding(_))
        ));
    }

    #[test]
    fn test_missing_jinx_header() {
        assert!(matches!(
            parse_shape(b"shape ( )"),
            Err(ConvertError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn test_unknown_key_kind_is_syntax_error() {
        let text = "JINX0s1t______ shape ( animations ( 1 animation ( 1 30 anim_nodes ( 1 \
                    anim_node N ( controllers ( 1 tcb_rot ( 1 bezier_key ( 0 0 0 0 1 ) ) ) ) ) ) ) )";
        assert!(matches!(
            parse_shape(text.as_bytes()),
            Err(ConvertError::ShapeSyntax(_))
        ));
    }

    #[test]
    fn test_unknown_controller_kept_with_its_name() {
        let text = "JINX0s1t______ shape ( animations ( 1 animation ( 1 30 anim_nodes ( 1 \
                    anim_node N ( controllers ( 1 scale_ctl ( 1 linear_key ( 0 1 1 1 ) ) ) ) ) ) ) )";
        let shape = parse_shape(text.as_bytes()).unwrap();
        match &shape.animations[0].nodes[0].controllers[0] {
            ShapeController::Other { kind, keys } => {
                assert_eq!(kind, "scale_ctl");
                assert_eq!(keys.len(), 1);
            }
            other => panic!("unexpected controller {other:?}"),
        }
    }

    #[test]
    fn test_trilist_without_state_is_syntax_error() {
        let text = "JINX0s1t______ shape ( lod_controls ( 1 lod_control ( distance_levels ( 1 \
                    distance_level ( distance_level_header ( dlevel_selection ( 1 ) hierarchy ( 0 ) ) \
                    sub_objects ( 1 sub_object ( primitives ( 1 indexed_trilist ( vertex_idxs ( 3 0 1 2 ) ) ) ) ) ) ) ) ) )";
        assert!(matches!(
            parse_shape(text.as_bytes()),
            Err(ConvertError::ShapeSyntax(_))
        ));
    }
}
