//! msts-export library
//!
//! Converts Microsoft Train Simulator assets (ACE textures, text shapes) to
//! TSTEXT/TSMODL containers. The binary wraps these functions; the batch
//! driver runs them in parallel.

pub mod ace;
pub mod animation;
pub mod batch;
pub mod config;
pub mod convert;
pub mod error;
pub mod info;
pub mod material;
pub mod mesh;
pub mod optimize;
pub mod run_id;
pub mod shape;
pub mod simis;

pub use config::{ConvertConfig, Verbosity};
pub use error::ConvertError;
pub use run_id::RunIds;

// Re-export key conversion entry points
pub use batch::{BatchJob, BatchReport, collect_jobs, convert_batch};
pub use convert::{
    build_model, convert_shape, convert_shape_textures, convert_shape_to_memory,
    convert_texture, convert_texture_to_memory,
};

// Re-export the container model for callers that only link this crate
pub use ts_common::{ConvertedModel, TextureFormat, TextureImage};
