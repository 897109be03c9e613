//! Builds a [`Shape`] from the parsed block tree

use glam::{Quat, Vec3};

use super::parser::{Block, Fields};
use super::types::*;
use crate::error::{ConvertError, Result};

pub fn build_shape(root: &Block) -> Result<Shape> {
    let shape = root.require("shape")?;

    Ok(Shape {
        volumes: list(shape, "volumes", "vol_sphere", read_volume)?,
        shader_names: list(shape, "shader_names", "named_shader", |b| {
            Ok(b.fields().word()?.to_string())
        })?,
        points: list(shape, "points", "point", |b| b.fields().vec3())?,
        uv_points: list(shape, "uv_points", "uv_point", |b| b.fields().vec2())?,
        normals: list(shape, "normals", "vector", |b| b.fields().vec3())?,
        matrices: list(shape, "matrices", "matrix", read_matrix)?,
        images: list(shape, "images", "image", |b| Ok(b.fields().word()?.to_string()))?,
        textures: list(shape, "textures", "texture", read_texture)?,
        light_model_cfgs: list(shape, "light_model_cfgs", "light_model_cfg", |b| {
            Ok(LightModelCfg {
                flags: b.fields().hex()?,
            })
        })?,
        vtx_states: list(shape, "vtx_states", "vtx_state", read_vtx_state)?,
        prim_states: list(shape, "prim_states", "prim_state", read_prim_state)?,
        lod_controls: list(shape, "lod_controls", "lod_control", read_lod_control)?,
        animations: list(shape, "animations", "animation", read_animation)?,
    })
}

/// Items named `item` inside the optional block `name`
fn list<T>(
    parent: &Block,
    name: &str,
    item: &str,
    read: impl Fn(&Block) -> Result<T>,
) -> Result<Vec<T>> {
    match parent.child(name) {
        Some(block) => block.children(item).map(read).collect(),
        None => Ok(Vec::new()),
    }
}

fn read_volume(block: &Block) -> Result<VolumeSphere> {
    let mut fields = block.fields();
    let centre = fields.block("vector")?.fields().vec3()?;
    let radius = fields.f32()?;
    Ok(VolumeSphere { centre, radius })
}

fn read_matrix(block: &Block) -> Result<ShapeMatrix> {
    let name = block.require_label()?.to_string();
    let mut fields = block.fields();
    let rows = [fields.vec3()?, fields.vec3()?, fields.vec3()?];
    let translation = fields.vec3()?;
    Ok(ShapeMatrix {
        name,
        rows,
        translation,
    })
}

fn read_texture(block: &Block) -> Result<ShapeTexture> {
    let mut fields = block.fields();
    let image_index = fields.i32()?;
    let filter_mode = fields.i32()?;
    let mip_bias = if fields.is_empty() { 0.0 } else { fields.f32()? };
    let border_colour = if fields.is_empty() { 0 } else { fields.hex()? };
    Ok(ShapeTexture {
        image_index,
        filter_mode,
        mip_bias,
        border_colour,
    })
}

fn read_vtx_state(block: &Block) -> Result<VtxState> {
    let mut fields = block.fields();
    Ok(VtxState {
        flags: fields.hex()?,
        matrix_index: fields.i32()?,
        light_mat_index: fields.i32()?,
        light_cfg_index: fields.i32()?,
        light_flags: fields.hex()?,
    })
}

fn read_prim_state(block: &Block) -> Result<PrimState> {
    let mut fields = block.fields();
    let flags = fields.hex()?;
    let shader_index = fields.i32()?;
    let tex_idxs = fields.block("tex_idxs")?.fields().counted(Fields::i32)?;

    Ok(PrimState {
        name: block.label.clone(),
        flags,
        shader_index,
        tex_idxs,
        z_bias: fields.f32()?,
        vtx_state_index: fields.i32()?,
        alpha_test_mode: fields.i32()?,
        light_cfg_index: fields.i32()?,
        z_buffer_mode: fields.i32()?,
    })
}

fn read_lod_control(block: &Block) -> Result<LodControl> {
    Ok(LodControl {
        distance_levels: list(block, "distance_levels", "distance_level", read_distance_level)?,
    })
}

fn read_distance_level(block: &Block) -> Result<DistanceLevel> {
    let header = block.require("distance_level_header")?;
    let selection = header.require("dlevel_selection")?.fields().f32()?;
    let hierarchy = header.require("hierarchy")?.fields().counted(Fields::i32)?;

    Ok(DistanceLevel {
        selection,
        hierarchy,
        sub_objects: list(block, "sub_objects", "sub_object", read_sub_object)?,
    })
}

fn read_sub_object(block: &Block) -> Result<ShapeSubObject> {
    Ok(ShapeSubObject {
        vertices: list(block, "vertices", "vertex", read_vertex)?,
        primitives: match block.child("primitives") {
            Some(primitives) => read_primitives(primitives)?,
            None => Vec::new(),
        },
    })
}

fn read_vertex(block: &Block) -> Result<ShapeVertex> {
    let mut fields = block.fields();
    let flags = fields.hex()?;
    let point_index = fields.i32()?;
    let normal_index = fields.i32()?;
    let colour1 = fields.hex()?;
    let colour2 = fields.hex()?;
    let uv_indices = match block.child("vertex_uvs") {
        Some(uvs) => uvs.fields().counted(Fields::i32)?,
        None => Vec::new(),
    };

    Ok(ShapeVertex {
        flags,
        point_index,
        normal_index,
        colour1,
        colour2,
        uv_indices,
    })
}

/// `prim_state_idx` sets the state for every `indexed_trilist` after it
fn read_primitives(block: &Block) -> Result<Vec<ShapePrimitive>> {
    let mut primitives = Vec::new();
    let mut prim_state_index = None;

    for child in block.blocks() {
        match child.name.to_ascii_lowercase().as_str() {
            "prim_state_idx" => prim_state_index = Some(child.fields().i32()?),
            "indexed_trilist" => {
                let prim_state_index = prim_state_index.ok_or_else(|| {
                    ConvertError::syntax("'indexed_trilist' before any 'prim_state_idx'")
                })?;
                let indices = child
                    .require("vertex_idxs")?
                    .fields()
                    .counted(Fields::u32)?;
                if indices.len() % 3 != 0 {
                    return Err(ConvertError::syntax(format!(
                        "'vertex_idxs' holds {} indices, not whole triangles",
                        indices.len()
                    )));
                }
                let triangles = indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect();
                primitives.push(ShapePrimitive {
                    prim_state_index,
                    triangles,
                });
            }
            _ => {}
        }
    }

    Ok(primitives)
}

fn read_animation(block: &Block) -> Result<ShapeAnimation> {
    let mut fields = block.fields();
    Ok(ShapeAnimation {
        frame_count: fields.i32()?,
        frame_rate: fields.i32()?,
        nodes: list(block, "anim_nodes", "anim_node", read_anim_node)?,
    })
}

fn read_anim_node(block: &Block) -> Result<ShapeAnimNode> {
    let controllers = match block.child("controllers") {
        Some(controllers) => controllers
            .blocks()
            .map(read_controller)
            .collect::<Result<_>>()?,
        None => Vec::new(),
    };

    Ok(ShapeAnimNode {
        name: block.require_label()?.to_string(),
        controllers,
    })
}

fn read_controller(block: &Block) -> Result<ShapeController> {
    let keys = block.blocks().map(read_key).collect::<Result<Vec<_>>>()?;
    Ok(match block.name.to_ascii_lowercase().as_str() {
        "tcb_rot" => ShapeController::TcbRotation(keys),
        "linear_pos" => ShapeController::LinearPosition(keys),
        _ => ShapeController::Other {
            kind: block.name.clone(),
            keys,
        },
    })
}

fn read_key(block: &Block) -> Result<ShapeKey> {
    let mut fields = block.fields();
    let frame = fields.i32()?;

    match block.name.to_ascii_lowercase().as_str() {
        "slerp_rot" => Ok(ShapeKey::Slerp {
            frame,
            rotation: read_quat(&mut fields)?,
        }),
        "tcb_key" => Ok(ShapeKey::Tcb {
            frame,
            rotation: read_quat(&mut fields)?,
            tension: fields.f32()?,
            continuity: fields.f32()?,
            bias: fields.f32()?,
            ease_in: fields.f32()?,
            ease_out: fields.f32()?,
        }),
        "linear_key" => Ok(ShapeKey::Linear {
            frame,
            position: fields.vec3()?,
        }),
        other => Err(ConvertError::syntax(format!("unknown key kind '{other}'"))),
    }
}

fn read_quat(fields: &mut Fields<'_>) -> Result<Quat> {
    let xyz: Vec3 = fields.vec3()?;
    let w = fields.f32()?;
    Ok(Quat::from_xyzw(xyz.x, xyz.y, xyz.z, w))
}
