//! Binary container reader
//!
//! Reads `.ts_tex` and `.ts_model` files back into the converted-asset model.

use byteorder::{LittleEndian, ReadBytesExt};
use glam::{Quat, Vec2, Vec3};
use std::io::Read;

use crate::error::FormatError;
use crate::formats::{
    AnimationClip, AnimationNode, Controller, ConvertedModel, HierarchyNode, Keyframe, Lod,
    MODEL_TAG, MaterialFlags, Primitive, SubObject, TEXTURE_TAG, TcbKey, TextureFormat,
    TextureImage, Vertex,
};

type Result<T> = std::result::Result<T, FormatError>;

/// Upper bound on speculative preallocation for counted collections
const MAX_PREALLOC: usize = 4096;

/// Reader for the TSTEXT / TSMODL containers
pub struct TsReader<R: Read> {
    reader: R,
}

impl<R: Read> TsReader<R> {
    /// Create a new container reader
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read a complete texture container (tag included)
    pub fn read_texture(&mut self) -> Result<TextureImage> {
        self.expect_tag(TEXTURE_TAG, "TSTEXT")?;

        let width = self.reader.read_i32::<LittleEndian>()?;
        let height = self.reader.read_i32::<LittleEndian>()?;
        let ordinal = self.reader.read_i32::<LittleEndian>()?;
        let format =
            TextureFormat::from_ordinal(ordinal).ok_or(FormatError::UnknownTextureFormat(ordinal))?;

        let len = self.read_count("texture data")?;
        let data = self.read_bytes(len)?;

        Ok(TextureImage {
            width,
            height,
            format,
            data,
        })
    }

    /// Read a complete model container (tag included)
    pub fn read_model(&mut self) -> Result<ConvertedModel> {
        self.expect_tag(MODEL_TAG, "TSMODL")?;
        let version = self.reader.read_i32::<LittleEndian>()?;

        let matrix_count = self.read_count("matrix")?;
        let mut matrices = Vec::with_capacity(matrix_count.min(MAX_PREALLOC));
        for _ in 0..matrix_count {
            let mut values = [0.0f32; 16];
            self.reader.read_f32_into::<LittleEndian>(&mut values)?;
            matrices.push(values);
        }
        let mut hierarchy = Vec::with_capacity(matrices.len());
        for values in &matrices {
            let name = self.read_string()?;
            hierarchy.push(HierarchyNode::from_row_major(name, values));
        }

        let lod_count = self.read_count("lod")?;
        let mut lods = Vec::with_capacity(lod_count.min(MAX_PREALLOC));
        for _ in 0..lod_count {
            lods.push(self.read_lod()?);
        }

        let animation_count = self.read_count("animation")?;
        let mut animations = Vec::with_capacity(animation_count.min(MAX_PREALLOC));
        for _ in 0..animation_count {
            animations.push(self.read_animation()?);
        }

        Ok(ConvertedModel {
            version,
            hierarchy,
            lods,
            animations,
        })
    }

    fn read_lod(&mut self) -> Result<Lod> {
        let distance = self.reader.read_f32::<LittleEndian>()?;
        let sphere_radius = self.reader.read_f32::<LittleEndian>()?;

        let sub_object_count = self.read_count("sub-object")?;
        let mut sub_objects = Vec::with_capacity(sub_object_count.min(MAX_PREALLOC));
        for _ in 0..sub_object_count {
            sub_objects.push(self.read_sub_object()?);
        }

        let hierarchy_len = self.read_count("hierarchy")?;
        let mut hierarchy = Vec::with_capacity(hierarchy_len.min(MAX_PREALLOC));
        for _ in 0..hierarchy_len {
            hierarchy.push(self.reader.read_i32::<LittleEndian>()?);
        }

        Ok(Lod {
            distance,
            sphere_radius,
            sub_objects,
            hierarchy,
        })
    }

    fn read_sub_object(&mut self) -> Result<SubObject> {
        let vertex_count = self.read_count("vertex")?;
        let mut vertices = Vec::with_capacity(vertex_count.min(MAX_PREALLOC));
        for _ in 0..vertex_count {
            vertices.push(Vertex {
                position: self.read_vec3()?,
                normal: self.read_vec3()?,
                tex_coord: self.read_vec2()?,
            });
        }

        let primitive_count = self.read_count("primitive")?;
        let mut primitives = Vec::with_capacity(primitive_count.min(MAX_PREALLOC));
        for _ in 0..primitive_count {
            primitives.push(self.read_primitive()?);
        }

        Ok(SubObject {
            vertices,
            primitives,
        })
    }

    fn read_primitive(&mut self) -> Result<Primitive> {
        let hierarchy_index = self.reader.read_i32::<LittleEndian>()?;
        let index_count = self.read_count("index")?;
        let mut indices = Vec::with_capacity(index_count.min(MAX_PREALLOC));
        for _ in 0..index_count {
            indices.push(self.reader.read_u16::<LittleEndian>()?);
        }
        let texture = self.read_string()?;
        let material_name = self.read_string()?;
        let flags = MaterialFlags::from_value(self.reader.read_i32::<LittleEndian>()?);

        Ok(Primitive {
            hierarchy_index,
            indices,
            texture,
            material_name,
            flags,
        })
    }

    fn read_animation(&mut self) -> Result<AnimationClip> {
        let frame_count = self.reader.read_i32::<LittleEndian>()?;
        let frame_rate = self.reader.read_i32::<LittleEndian>()?;

        let node_count = self.read_count("animation node")?;
        let mut nodes = Vec::with_capacity(node_count.min(MAX_PREALLOC));
        for _ in 0..node_count {
            let name = self.read_string()?;
            let controller_count = self.read_count("controller")?;
            let mut controllers = Vec::with_capacity(controller_count.min(MAX_PREALLOC));
            for _ in 0..controller_count {
                controllers.push(self.read_controller()?);
            }
            nodes.push(AnimationNode { name, controllers });
        }

        Ok(AnimationClip {
            frame_count,
            frame_rate,
            nodes,
        })
    }

    fn read_controller(&mut self) -> Result<Controller> {
        let kind = self.reader.read_u8()?;
        let key_count = self.read_count("keyframe")?;
        let mut keys = Vec::with_capacity(key_count.min(MAX_PREALLOC));
        for _ in 0..key_count {
            keys.push(self.read_keyframe()?);
        }
        Controller::from_kind(kind, keys).ok_or(FormatError::UnknownControllerKind(kind))
    }

    fn read_keyframe(&mut self) -> Result<Keyframe> {
        let frame = self.reader.read_i32::<LittleEndian>()?;
        let kind = self.reader.read_u8()?;
        match kind {
            Keyframe::KIND_LINEAR => Ok(Keyframe::Linear {
                frame,
                position: self.read_vec3()?,
            }),
            Keyframe::KIND_SLERP => Ok(Keyframe::Slerp {
                frame,
                rotation: self.read_quat()?,
            }),
            Keyframe::KIND_TCB => {
                let rotation = self.read_quat()?;
                let mut shape = [0.0f32; 5];
                self.reader.read_f32_into::<LittleEndian>(&mut shape)?;
                Ok(Keyframe::Tcb(TcbKey {
                    frame,
                    rotation,
                    tension: shape[0],
                    continuity: shape[1],
                    bias: shape[2],
                    ease_in: shape[3],
                    ease_out: shape[4],
                }))
            }
            other => Err(FormatError::UnknownKeyKind(other)),
        }
    }

    fn expect_tag(&mut self, tag: &[u8; 6], expected: &'static str) -> Result<()> {
        let mut found = [0u8; 6];
        self.reader.read_exact(&mut found)?;
        if &found != tag {
            return Err(FormatError::InvalidSignature {
                expected,
                found: String::from_utf8_lossy(&found).into_owned(),
            });
        }
        Ok(())
    }

    /// Read a u16 length-prefixed UTF-8 string
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.reader.read_u16::<LittleEndian>()? as usize;
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8(bytes)?)
    }

    fn read_count(&mut self, what: &'static str) -> Result<usize> {
        let count = self.reader.read_i32::<LittleEndian>()?;
        usize::try_from(count).map_err(|_| FormatError::InvalidCount { what, count })
    }

    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(len.min(MAX_PREALLOC * 16));
        let read = (&mut self.reader).take(len as u64).read_to_end(&mut bytes)?;
        if read != len {
            return Err(FormatError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("expected {len} bytes, found {read}"),
            )));
        }
        Ok(bytes)
    }

    fn read_vec2(&mut self) -> Result<Vec2> {
        let x = self.reader.read_f32::<LittleEndian>()?;
        let y = self.reader.read_f32::<LittleEndian>()?;
        Ok(Vec2::new(x, y))
    }

    fn read_vec3(&mut self) -> Result<Vec3> {
        let x = self.reader.read_f32::<LittleEndian>()?;
        let y = self.reader.read_f32::<LittleEndian>()?;
        let z = self.reader.read_f32::<LittleEndian>()?;
        Ok(Vec3::new(x, y, z))
    }

    fn read_quat(&mut self) -> Result<Quat> {
        let mut values = [0.0f32; 4];
        self.reader.read_f32_into::<LittleEndian>(&mut values)?;
        Ok(Quat::from_array(values))
    }
}
