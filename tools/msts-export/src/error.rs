//! Conversion errors
//!
//! Every variant is fatal for the asset being converted. Batch drivers catch
//! them per asset and continue with the next one.

use std::io;
use ts_common::FormatError;

use crate::ace::ChannelId;

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("invalid signature: expected {expected}, found {found:?}")]
    InvalidSignature {
        expected: &'static str,
        found: String,
    },

    #[error("unsupported surface format 0x{0:02X}")]
    UnsupportedSurfaceFormat(i32),

    #[error("unsupported color channel size {0}")]
    UnsupportedChannelSize(u64),

    #[error("unknown color channel type {0}")]
    UnknownChannelType(u64),

    #[error("planar texture has no {0:?} channel")]
    MissingRequiredChannel(ChannelId),

    #[error("invalid texture dimensions {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },

    #[error("invalid {what} length {len}")]
    InvalidLength { what: &'static str, len: i64 },

    /// A shape index that does not resolve against its table
    #[error("{table} index {index} out of range ({len} entries)")]
    MissingReference {
        table: &'static str,
        index: i64,
        len: usize,
    },

    #[error("vertex index {0} does not fit in 16 bits")]
    IndexOverflow(u32),

    #[error("shape syntax error: {0}")]
    ShapeSyntax(String),

    #[error("unsupported shape encoding: {0}")]
    UnsupportedShapeEncoding(String),

    /// Container serialisation failure (includes `StringTooLong`)
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ConvertError {
    pub(crate) fn syntax(message: impl Into<String>) -> Self {
        Self::ShapeSyntax(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
