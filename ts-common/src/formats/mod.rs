//! TSTEXT / TSMODL converted-asset formats
//!
//! Both containers start with a 6-byte ASCII tag followed by little-endian
//! fixed-width fields. Strings carry a u16 length prefix, collections an
//! i32 count prefix.
//!
//! The in-memory model lives in [`texture`], [`model`], [`material`] and
//! [`animation`]; [`binary`] holds the writer and reader.

pub mod animation;
pub mod binary;
pub mod material;
pub mod model;
pub mod texture;

pub use animation::*;
pub use binary::{MAX_STRING_LEN, TsReader, TsWriter, model_to_bytes, texture_to_bytes};
pub use material::*;
pub use model::*;
pub use texture::*;

/// Tag opening every `.ts_tex` file
pub const TEXTURE_TAG: &[u8; 6] = b"TSTEXT";

/// Tag opening every `.ts_model` file
pub const MODEL_TAG: &[u8; 6] = b"TSMODL";

/// Version written after the model tag
pub const MODEL_VERSION: i32 = 1;
