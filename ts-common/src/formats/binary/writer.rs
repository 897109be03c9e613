//! Binary container writer

use byteorder::{LittleEndian, WriteBytesExt};
use glam::{Quat, Vec2, Vec3};
use std::io::Write;

use super::MAX_STRING_LEN;
use crate::error::FormatError;
use crate::formats::{
    AnimationClip, Controller, ConvertedModel, Keyframe, Lod, MODEL_TAG, Primitive, SubObject,
    TEXTURE_TAG, TextureImage, Vertex,
};

type Result<T> = std::result::Result<T, FormatError>;

/// Writer for the TSTEXT / TSMODL containers
pub struct TsWriter<W: Write> {
    writer: W,
}

impl<W: Write> TsWriter<W> {
    /// Create a new container writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write a complete texture container (tag included)
    pub fn write_texture(&mut self, texture: &TextureImage) -> Result<()> {
        self.writer.write_all(TEXTURE_TAG)?;
        self.writer.write_i32::<LittleEndian>(texture.width)?;
        self.writer.write_i32::<LittleEndian>(texture.height)?;
        self.writer.write_i32::<LittleEndian>(texture.format.ordinal())?;
        self.write_count("texture data", texture.data.len())?;
        self.writer.write_all(&texture.data)?;
        Ok(())
    }

    /// Write a complete model container (tag included)
    pub fn write_model(&mut self, model: &ConvertedModel) -> Result<()> {
        self.writer.write_all(MODEL_TAG)?;
        self.writer.write_i32::<LittleEndian>(model.version)?;

        // Matrices first, then their names in the same order
        self.write_count("matrix", model.hierarchy.len())?;
        for node in &model.hierarchy {
            for value in node.row_major() {
                self.writer.write_f32::<LittleEndian>(value)?;
            }
        }
        for node in &model.hierarchy {
            self.write_string(&node.name)?;
        }

        self.write_count("lod", model.lods.len())?;
        for lod in &model.lods {
            self.write_lod(lod)?;
        }

        self.write_count("animation", model.animations.len())?;
        for clip in &model.animations {
            self.write_animation(clip)?;
        }

        Ok(())
    }

    fn write_lod(&mut self, lod: &Lod) -> Result<()> {
        self.writer.write_f32::<LittleEndian>(lod.distance)?;
        self.writer.write_f32::<LittleEndian>(lod.sphere_radius)?;

        self.write_count("sub-object", lod.sub_objects.len())?;
        for sub_object in &lod.sub_objects {
            self.write_sub_object(sub_object)?;
        }

        self.write_count("hierarchy", lod.hierarchy.len())?;
        for parent in &lod.hierarchy {
            self.writer.write_i32::<LittleEndian>(*parent)?;
        }
        Ok(())
    }

    fn write_sub_object(&mut self, sub_object: &SubObject) -> Result<()> {
        self.write_count("vertex", sub_object.vertices.len())?;
        for vertex in &sub_object.vertices {
            self.write_vertex(vertex)?;
        }

        self.write_count("primitive", sub_object.primitives.len())?;
        for primitive in &sub_object.primitives {
            self.write_primitive(primitive)?;
        }
        Ok(())
    }

    fn write_vertex(&mut self, vertex: &Vertex) -> Result<()> {
        self.write_vec3(vertex.position)?;
        self.write_vec3(vertex.normal)?;
        self.write_vec2(vertex.tex_coord)?;
        Ok(())
    }

    fn write_primitive(&mut self, primitive: &Primitive) -> Result<()> {
        self.writer.write_i32::<LittleEndian>(primitive.hierarchy_index)?;
        // Count is in indices, three per triangle
        self.write_count("index", primitive.indices.len())?;
        for index in &primitive.indices {
            self.writer.write_u16::<LittleEndian>(*index)?;
        }
        self.write_string(&primitive.texture)?;
        self.write_string(&primitive.material_name)?;
        self.writer.write_i32::<LittleEndian>(primitive.flags.value())?;
        Ok(())
    }

    fn write_animation(&mut self, clip: &AnimationClip) -> Result<()> {
        self.writer.write_i32::<LittleEndian>(clip.frame_count)?;
        self.writer.write_i32::<LittleEndian>(clip.frame_rate)?;

        self.write_count("animation node", clip.nodes.len())?;
        for node in &clip.nodes {
            self.write_string(&node.name)?;
            self.write_count("controller", node.controllers.len())?;
            for controller in &node.controllers {
                self.write_controller(controller)?;
            }
        }
        Ok(())
    }

    fn write_controller(&mut self, controller: &Controller) -> Result<()> {
        self.writer.write_u8(controller.kind())?;
        let keys = controller.keys();
        self.write_count("keyframe", keys.len())?;
        for key in keys {
            self.writer.write_i32::<LittleEndian>(key.frame())?;
            self.writer.write_u8(key.kind())?;
            match key {
                Keyframe::Linear { position, .. } => self.write_vec3(*position)?,
                Keyframe::Slerp { rotation, .. } => self.write_quat(*rotation)?,
                Keyframe::Tcb(tcb) => {
                    self.write_quat(tcb.rotation)?;
                    for value in [tcb.tension, tcb.continuity, tcb.bias, tcb.ease_in, tcb.ease_out] {
                        self.writer.write_f32::<LittleEndian>(value)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Write a u16 length-prefixed UTF-8 string
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        if bytes.len() > MAX_STRING_LEN {
            return Err(FormatError::StringTooLong { len: bytes.len() });
        }
        self.writer.write_u16::<LittleEndian>(bytes.len() as u16)?;
        self.writer.write_all(bytes)?;
        Ok(())
    }

    fn write_count(&mut self, what: &'static str, len: usize) -> Result<()> {
        let count = i32::try_from(len).map_err(|_| FormatError::CountOverflow { what, len })?;
        self.writer.write_i32::<LittleEndian>(count)?;
        Ok(())
    }

    fn write_vec2(&mut self, v: Vec2) -> Result<()> {
        self.writer.write_f32::<LittleEndian>(v.x)?;
        self.writer.write_f32::<LittleEndian>(v.y)?;
        Ok(())
    }

    fn write_vec3(&mut self, v: Vec3) -> Result<()> {
        self.writer.write_f32::<LittleEndian>(v.x)?;
        self.writer.write_f32::<LittleEndian>(v.y)?;
        self.writer.write_f32::<LittleEndian>(v.z)?;
        Ok(())
    }

    fn write_quat(&mut self, q: Quat) -> Result<()> {
        for value in q.to_array() {
            self.writer.write_f32::<LittleEndian>(value)?;
        }
        Ok(())
    }

    /// Consume the writer and return the inner writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Serialise a texture container into a fresh buffer
pub fn texture_to_bytes(texture: &TextureImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(TEXTURE_TAG.len() + 16 + texture.data.len());
    TsWriter::new(&mut buffer).write_texture(texture)?;
    Ok(buffer)
}

/// Serialise a model container into a fresh buffer
pub fn model_to_bytes(model: &ConvertedModel) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    TsWriter::new(&mut buffer).write_model(model)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{MaterialFlags, TextureFormat};

    #[test]
    fn test_texture_layout() {
        let texture = TextureImage::new(2, 1, TextureFormat::Dxt1, vec![0xAA; 8]);
        let bytes = texture_to_bytes(&texture).unwrap();

        assert_eq!(&bytes[0..6], b"TSTEXT");
        assert_eq!(&bytes[6..10], &2i32.to_le_bytes());
        assert_eq!(&bytes[10..14], &1i32.to_le_bytes());
        assert_eq!(&bytes[14..18], &5i32.to_le_bytes());
        assert_eq!(&bytes[18..22], &8i32.to_le_bytes());
        assert_eq!(&bytes[22..], &[0xAA; 8]);
    }

    #[test]
    fn test_string_length_limit() {
        let mut buffer = Vec::new();
        let mut writer = TsWriter::new(&mut buffer);

        let max = "a".repeat(MAX_STRING_LEN);
        writer.write_string(&max).unwrap();

        let too_long = "a".repeat(MAX_STRING_LEN + 1);
        let err = writer.write_string(&too_long).unwrap_err();
        assert!(matches!(err, FormatError::StringTooLong { len } if len == MAX_STRING_LEN + 1));

        assert_eq!(buffer.len(), 2 + MAX_STRING_LEN);
        assert_eq!(&buffer[0..2], &[0xFF, 0xFF]);
    }

    #[test]
    fn test_string_length_counts_utf8_bytes() {
        let mut buffer = Vec::new();
        TsWriter::new(&mut buffer).write_string("é").unwrap();
        assert_eq!(buffer, vec![2, 0, 0xC3, 0xA9]);
    }

    #[test]
    fn test_primitive_material_name_too_long_fails_model() {
        let model = ConvertedModel {
            lods: vec![Lod {
                sub_objects: vec![SubObject {
                    vertices: Vec::new(),
                    primitives: vec![Primitive {
                        hierarchy_index: 0,
                        indices: vec![0, 1, 2],
                        texture: String::new(),
                        material_name: "m".repeat(70_000),
                        flags: MaterialFlags::empty(),
                    }],
                }],
                ..Default::default()
            }],
            ..Default::default()
        };

        assert!(matches!(
            model_to_bytes(&model),
            Err(FormatError::StringTooLong { len: 70_000 })
        ));
    }
}
