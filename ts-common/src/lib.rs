//! Shared container types for the MSTS asset converter
//!
//! This crate provides the converted-asset model shared between:
//! - `msts-export` (asset pipeline)
//! - engine-side loaders reading `.ts_tex` / `.ts_model` files
//!
//! # Modules
//!
//! - [`formats`] - TSTEXT/TSMODL data model and the binary reader/writer
//! - [`error`] - container encode/decode errors

pub mod error;
pub mod formats;

pub use error::FormatError;

// Re-export commonly used format items
pub use formats::{
    AnimationClip, AnimationNode, BlendMode, Controller, ConvertedModel, HierarchyNode, Keyframe,
    Lod, MODEL_TAG, MODEL_VERSION, MAX_STRING_LEN, MaterialFlags, Primitive, ShaderKind,
    SpecularLevel, SubObject, TEXTURE_TAG, TcbKey, TextureAddressMode, TextureFormat,
    TextureImage, TsReader, TsWriter, Vertex, model_to_bytes, texture_to_bytes,
};
