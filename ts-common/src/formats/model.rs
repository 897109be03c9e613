//! TSMODL model format (.ts_model)
//!
//! # Layout
//! ```text
//! tag "TSMODL"
//! version i32
//! matrix_count i32
//! matrices       16 × f32 each (basis rows, then translation row)
//! matrix names   u16-prefixed UTF-8, matrix_count entries
//! lod_count i32
//!   distance f32, sphere_radius f32
//!   sub_object_count i32
//!     vertex_count i32, vertices (8 × f32: position, normal, uv)
//!     primitive_count i32
//!       hierarchy_index i32, index_count i32, indices u16...
//!       texture string, material_name string, flags i32
//!   hierarchy_len i32, hierarchy i32...
//! animation_count i32
//!   (see `animation` module)
//! ```

use glam::{Mat4, Vec2, Vec3};

use super::{AnimationClip, MODEL_VERSION, MaterialFlags};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coord: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    /// Index into the model hierarchy of the node this primitive follows
    pub hierarchy_index: i32,
    /// Triangle list, three indices per triangle
    pub indices: Vec<u16>,
    /// Converted texture reference, empty when untextured
    pub texture: String,
    pub material_name: String,
    pub flags: MaterialFlags,
}

impl Primitive {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubObject {
    pub vertices: Vec<Vertex>,
    pub primitives: Vec<Primitive>,
}

/// One distance-switched level of detail
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Lod {
    pub distance: f32,
    pub sphere_radius: f32,
    pub sub_objects: Vec<SubObject>,
    /// Parent index per hierarchy node, -1 for roots
    pub hierarchy: Vec<i32>,
}

/// Named local transform of the scene graph.
///
/// The matrix uses column vectors, so its column array is the row-major
/// layout of the source (row vector) matrix with translation in row 4.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyNode {
    pub name: String,
    pub transform: Mat4,
}

impl HierarchyNode {
    pub fn new(name: impl Into<String>, transform: Mat4) -> Self {
        Self {
            name: name.into(),
            transform,
        }
    }

    /// The 16 floats in container order
    pub fn row_major(&self) -> [f32; 16] {
        self.transform.to_cols_array()
    }

    pub fn from_row_major(name: impl Into<String>, values: &[f32; 16]) -> Self {
        Self::new(name, Mat4::from_cols_array(values))
    }
}

/// Flattened model ready for the TSMODL container
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedModel {
    pub version: i32,
    pub hierarchy: Vec<HierarchyNode>,
    pub lods: Vec<Lod>,
    pub animations: Vec<AnimationClip>,
}

impl Default for ConvertedModel {
    fn default() -> Self {
        Self {
            version: MODEL_VERSION,
            hierarchy: Vec::new(),
            lods: Vec::new(),
            animations: Vec::new(),
        }
    }
}

impl ConvertedModel {
    /// Look up a hierarchy node name by primitive hierarchy index
    pub fn node_name(&self, index: i32) -> Option<&str> {
        let index = usize::try_from(index).ok()?;
        self.hierarchy.get(index).map(|n| n.name.as_str())
    }

    pub fn primitive_count(&self) -> usize {
        self.lods
            .iter()
            .flat_map(|lod| &lod.sub_objects)
            .map(|sub| sub.primitives.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_translation_in_last_row() {
        let node = HierarchyNode::new("MAIN", Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)));
        let values = node.row_major();
        assert_eq!(&values[12..16], &[1.0, 2.0, 3.0, 1.0]);
        assert_eq!(&values[0..4], &[1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_row_major_roundtrip() {
        let values: [f32; 16] = std::array::from_fn(|i| i as f32);
        let node = HierarchyNode::from_row_major("n", &values);
        assert_eq!(node.row_major(), values);
    }

    #[test]
    fn test_node_name_lookup() {
        let model = ConvertedModel {
            hierarchy: vec![HierarchyNode::new("MAIN", Mat4::IDENTITY)],
            ..Default::default()
        };
        assert_eq!(model.node_name(0), Some("MAIN"));
        assert_eq!(model.node_name(1), None);
        assert_eq!(model.node_name(-1), None);
    }
}
