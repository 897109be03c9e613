//! Binary container format (.ts_tex / .ts_model)
//!
//! # File Structure
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Tag (6 bytes, "TSTEXT" or "TSMODL")  │
//! ├──────────────────────────────────────┤
//! │ Body (little-endian, see formats)    │
//! │ ├─ integers: i32 / u16 / u8          │
//! │ ├─ floats: f32                       │
//! │ ├─ strings: u16 length + UTF-8       │
//! │ └─ collections: i32 count + items    │
//! └──────────────────────────────────────┘
//! ```

mod reader;
mod writer;

pub use reader::TsReader;
pub use writer::{TsWriter, model_to_bytes, texture_to_bytes};

/// Longest string the u16 length prefix can describe
pub const MAX_STRING_LEN: usize = u16::MAX as usize;
