//! Container encode/decode errors

use std::io;

/// Errors raised while writing or reading a TSTEXT/TSMODL container.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// A string does not fit the 16-bit length prefix.
    #[error("string of {len} bytes exceeds the 65535 byte limit")]
    StringTooLong { len: usize },

    #[error("invalid container tag: expected {expected}, found {found:?}")]
    InvalidSignature {
        expected: &'static str,
        found: String,
    },

    #[error("unknown texture format ordinal {0}")]
    UnknownTextureFormat(i32),

    #[error("unknown controller kind {0}")]
    UnknownControllerKind(u8),

    #[error("unknown keyframe kind {0}")]
    UnknownKeyKind(u8),

    /// A negative count or length prefix.
    #[error("invalid {what} count {count}")]
    InvalidCount { what: &'static str, count: i32 },

    #[error("{what} count {len} does not fit a 32-bit prefix")]
    CountOverflow { what: &'static str, len: usize },

    #[error("string is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
