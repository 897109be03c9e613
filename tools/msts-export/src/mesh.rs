//! Scene graph extraction and mesh transcoding
//!
//! Flattens the shape's LOD controls, sub-objects and indexed trilists into
//! [`Lod`] records with resolved vertices, 16-bit triangle lists and
//! derived material flags.

use glam::{Mat4, Vec2};
use ts_common::{HierarchyNode, Lod, MaterialFlags, Primitive, SubObject, Vertex};

use crate::error::{ConvertError, Result};
use crate::material::derive_material_flags;
use crate::shape::{DistanceLevel, PrimState, Shape, ShapeMatrix, ShapePrimitive, ShapeSubObject, ShapeVertex};

/// Bounding sphere radius used when a shape declares no volume
pub const DEFAULT_SPHERE_RADIUS: f32 = 100.0;

/// Extension given to converted texture references
pub const TEXTURE_EXTENSION: &str = "ts_tex";

/// 3×3 basis rows plus translation row as a 4×4 transform (w = 0, 0, 0, 1)
pub fn matrix_from_shape(matrix: &ShapeMatrix) -> Mat4 {
    let [x, y, z] = matrix.rows;
    Mat4::from_cols(
        x.extend(0.0),
        y.extend(0.0),
        z.extend(0.0),
        matrix.translation.extend(1.0),
    )
}

/// Copy the named transforms, preserving order
pub fn extract_hierarchy(shape: &Shape) -> Vec<HierarchyNode> {
    shape
        .matrices
        .iter()
        .map(|m| HierarchyNode::new(m.name.clone(), matrix_from_shape(m)))
        .collect()
}

/// File name without directory (either separator) or extension
pub fn file_stem(path: &str) -> &str {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match name.rfind('.') {
        Some(dot) => &name[..dot],
        None => name,
    }
}

/// Replace (or add) the extension, keeping any directory part
pub fn with_extension(path: &str, extension: &str) -> String {
    let name_start = path.rfind(['/', '\\']).map_or(0, |i| i + 1);
    let base = match path[name_start..].rfind('.') {
        Some(dot) => &path[..name_start + dot],
        None => path,
    };
    format!("{base}.{extension}")
}

pub fn material_name(output_stem: &str, texture: &str, flags: MaterialFlags, run_id: u32) -> String {
    format!("{output_stem}{}{}{run_id}", file_stem(texture), flags.value())
}

/// Resolve a file index against one of the shape tables
pub(crate) fn lookup<'a, T>(table: &'static str, items: &'a [T], index: i32) -> Result<&'a T> {
    usize::try_from(index)
        .ok()
        .and_then(|i| items.get(i))
        .ok_or(ConvertError::MissingReference {
            table,
            index: index.into(),
            len: items.len(),
        })
}

/// Converts the LODs of one shape
pub struct MeshTranscoder<'a> {
    shape: &'a Shape,
    output_stem: &'a str,
    run_id: u32,
}

impl<'a> MeshTranscoder<'a> {
    /// `output_stem` and `run_id` go into every material name
    pub fn new(shape: &'a Shape, output_stem: &'a str, run_id: u32) -> Self {
        Self {
            shape,
            output_stem,
            run_id,
        }
    }

    pub fn sphere_radius(&self) -> f32 {
        self.shape
            .volumes
            .first()
            .map_or(DEFAULT_SPHERE_RADIUS, |v| v.radius)
    }

    pub fn transcode_lods(&self) -> Result<Vec<Lod>> {
        self.shape
            .distance_levels()
            .map(|level| self.transcode_lod(level))
            .collect()
    }

    fn transcode_lod(&self, level: &DistanceLevel) -> Result<Lod> {
        let sub_objects = level
            .sub_objects
            .iter()
            .map(|sub| self.transcode_sub_object(sub))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            "LOD {}: {} sub-objects",
            level.selection,
            sub_objects.len()
        );

        Ok(Lod {
            distance: level.selection,
            sphere_radius: self.sphere_radius(),
            sub_objects,
            hierarchy: level.hierarchy.clone(),
        })
    }

    fn transcode_sub_object(&self, sub: &ShapeSubObject) -> Result<SubObject> {
        Ok(SubObject {
            vertices: sub
                .vertices
                .iter()
                .map(|v| self.transcode_vertex(v))
                .collect::<Result<_>>()?,
            primitives: sub
                .primitives
                .iter()
                .map(|p| self.transcode_primitive(p))
                .collect::<Result<_>>()?,
        })
    }

    fn transcode_vertex(&self, vertex: &ShapeVertex) -> Result<Vertex> {
        let position = *lookup("points", &self.shape.points, vertex.point_index)?;
        let normal = *lookup("normals", &self.shape.normals, vertex.normal_index)?;
        let tex_coord = match vertex.uv_indices.first() {
            Some(&uv) => *lookup("uv_points", &self.shape.uv_points, uv)?,
            None => Vec2::ZERO,
        };

        Ok(Vertex {
            position,
            normal,
            tex_coord,
        })
    }

    fn transcode_primitive(&self, primitive: &ShapePrimitive) -> Result<Primitive> {
        let shape = self.shape;
        let prim_state = lookup("prim_states", &shape.prim_states, primitive.prim_state_index)?;
        let vtx_state = lookup("vtx_states", &shape.vtx_states, prim_state.vtx_state_index)?;
        let shader = lookup("shader_names", &shape.shader_names, prim_state.shader_index)?;

        let flags = derive_material_flags(
            shader,
            prim_state.alpha_test_mode,
            vtx_state.light_mat_index,
        );
        let texture = self.texture_reference(prim_state)?;

        let indices = primitive
            .triangles
            .iter()
            .flatten()
            .map(|&index| u16::try_from(index).map_err(|_| ConvertError::IndexOverflow(index)))
            .collect::<Result<Vec<u16>>>()?;

        Ok(Primitive {
            hierarchy_index: vtx_state.matrix_index,
            indices,
            material_name: material_name(self.output_stem, &texture, flags, self.run_id),
            texture,
            flags,
        })
    }

    /// First texture of the primitive state as a converted file name,
    /// empty when the state has no textures
    pub fn texture_reference(&self, prim_state: &PrimState) -> Result<String> {
        let Some(&tex_idx) = prim_state.tex_idxs.first() else {
            return Ok(String::new());
        };
        let texture = lookup("textures", &self.shape.textures, tex_idx)?;
        let image = lookup("images", &self.shape.images, texture.image_index)?;
        Ok(with_extension(image, TEXTURE_EXTENSION))
    }
}
