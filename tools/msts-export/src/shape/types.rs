//! Source shape model, as read from an MSTS `.s` file
//!
//! Indices are kept exactly as the file states them. They are resolved (and
//! validated) by the transcoders, not by the reader.

use glam::{Quat, Vec2, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeSphere {
    pub centre: Vec3,
    pub radius: f32,
}

/// Named transform: 3×3 basis rows followed by the translation
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeMatrix {
    pub name: String,
    pub rows: [Vec3; 3],
    pub translation: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeTexture {
    pub image_index: i32,
    pub filter_mode: i32,
    pub mip_bias: f32,
    pub border_colour: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightModelCfg {
    pub flags: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VtxState {
    pub flags: u32,
    pub matrix_index: i32,
    pub light_mat_index: i32,
    pub light_cfg_index: i32,
    pub light_flags: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimState {
    pub name: Option<String>,
    pub flags: u32,
    pub shader_index: i32,
    pub tex_idxs: Vec<i32>,
    pub z_bias: f32,
    pub vtx_state_index: i32,
    pub alpha_test_mode: i32,
    pub light_cfg_index: i32,
    pub z_buffer_mode: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeVertex {
    pub flags: u32,
    pub point_index: i32,
    pub normal_index: i32,
    pub colour1: u32,
    pub colour2: u32,
    pub uv_indices: Vec<i32>,
}

/// One `indexed_trilist` with the primitive state in force where it appears
#[derive(Debug, Clone, PartialEq)]
pub struct ShapePrimitive {
    pub prim_state_index: i32,
    pub triangles: Vec<[u32; 3]>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShapeSubObject {
    pub vertices: Vec<ShapeVertex>,
    pub primitives: Vec<ShapePrimitive>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DistanceLevel {
    pub selection: f32,
    pub hierarchy: Vec<i32>,
    pub sub_objects: Vec<ShapeSubObject>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LodControl {
    pub distance_levels: Vec<DistanceLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeKey {
    Slerp {
        frame: i32,
        rotation: Quat,
    },
    Tcb {
        frame: i32,
        rotation: Quat,
        tension: f32,
        continuity: f32,
        bias: f32,
        ease_in: f32,
        ease_out: f32,
    },
    Linear {
        frame: i32,
        position: Vec3,
    },
}

/// Controller block as found in the file. Kinds other than `tcb_rot` and
/// `linear_pos` keep their block name.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeController {
    TcbRotation(Vec<ShapeKey>),
    LinearPosition(Vec<ShapeKey>),
    Other { kind: String, keys: Vec<ShapeKey> },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShapeAnimNode {
    pub name: String,
    pub controllers: Vec<ShapeController>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShapeAnimation {
    pub frame_count: i32,
    pub frame_rate: i32,
    pub nodes: Vec<ShapeAnimNode>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Shape {
    pub volumes: Vec<VolumeSphere>,
    pub shader_names: Vec<String>,
    pub points: Vec<Vec3>,
    pub uv_points: Vec<Vec2>,
    pub normals: Vec<Vec3>,
    pub matrices: Vec<ShapeMatrix>,
    pub images: Vec<String>,
    pub textures: Vec<ShapeTexture>,
    pub light_model_cfgs: Vec<LightModelCfg>,
    pub vtx_states: Vec<VtxState>,
    pub prim_states: Vec<PrimState>,
    pub lod_controls: Vec<LodControl>,
    pub animations: Vec<ShapeAnimation>,
}

impl Shape {
    /// Distance levels of every LOD control, in file order
    pub fn distance_levels(&self) -> impl Iterator<Item = &DistanceLevel> {
        self.lod_controls.iter().flat_map(|c| &c.distance_levels)
    }
}
