//! SIMIS container header shared by ACE textures and compressed shapes
//!
//! # Layout
//! ```text
//! Compressed:   "SIMISA@F" length:u32 "@@@@" zlib_header:u16 deflate...
//! Uncompressed: "SIMISA@@" "@@@@@@@@" payload...
//! ```
//!
//! The zlib header is checked against the mask `0x20FF == 0x0078` (deflate
//! method, no preset dictionary); the deflate stream after it is inflated
//! without the zlib trailer check.

use byteorder::{LittleEndian, ReadBytesExt};
use flate2::read::DeflateDecoder;
use std::io::{self, Read};

use crate::error::{ConvertError, Result};

pub const SIGNATURE_COMPRESSED: &[u8; 8] = b"SIMISA@F";
pub const SIGNATURE_UNCOMPRESSED: &[u8; 8] = b"SIMISA@@";

const COMPRESSED_MARKER: &[u8; 4] = b"@@@@";
const UNCOMPRESSED_MARKER: &[u8; 8] = b"@@@@@@@@";

const ZLIB_HEADER_MASK: u16 = 0x20FF;
const ZLIB_HEADER_DEFLATE: u16 = 0x0078;

/// Forward-only view over a SIMIS payload
pub enum SimisPayload<R: Read> {
    Plain(R),
    Deflate(DeflateDecoder<R>),
}

impl<R: Read> SimisPayload<R> {
    pub fn is_compressed(&self) -> bool {
        matches!(self, Self::Deflate(_))
    }
}

impl<R: Read> Read for SimisPayload<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Plain(reader) => reader.read(buf),
            Self::Deflate(decoder) => decoder.read(buf),
        }
    }
}

/// Validate the SIMIS header and return a reader positioned at the payload
pub fn open_payload<R: Read>(mut reader: R) -> Result<SimisPayload<R>> {
    let mut signature = [0u8; 8];
    reader.read_exact(&mut signature)?;

    match &signature {
        SIGNATURE_COMPRESSED => {
            // Uncompressed length, not needed for a streaming inflate
            let _length = reader.read_u32::<LittleEndian>()?;

            let mut marker = [0u8; 4];
            reader.read_exact(&mut marker)?;
            if &marker != COMPRESSED_MARKER {
                return Err(invalid_signature("@@@@", &marker));
            }

            let zlib = reader.read_u16::<LittleEndian>()?;
            if zlib & ZLIB_HEADER_MASK != ZLIB_HEADER_DEFLATE {
                return Err(ConvertError::InvalidSignature {
                    expected: "zlib header xx78",
                    found: format!("0x{zlib:04X}"),
                });
            }

            Ok(SimisPayload::Deflate(DeflateDecoder::new(reader)))
        }
        SIGNATURE_UNCOMPRESSED => {
            let mut marker = [0u8; 8];
            reader.read_exact(&mut marker)?;
            if &marker != UNCOMPRESSED_MARKER {
                return Err(invalid_signature("@@@@@@@@", &marker));
            }
            Ok(SimisPayload::Plain(reader))
        }
        other => Err(invalid_signature("SIMISA@F or SIMISA@@", other)),
    }
}

fn invalid_signature(expected: &'static str, found: &[u8]) -> ConvertError {
    ConvertError::InvalidSignature {
        expected,
        found: String::from_utf8_lossy(found).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::DeflateEncoder;
    use std::io::Write;

    fn compressed(payload: &[u8], zlib: [u8; 2]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(SIGNATURE_COMPRESSED);
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(b"@@@@");
        bytes.extend_from_slice(&zlib);
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(payload).unwrap();
        bytes.extend_from_slice(&encoder.finish().unwrap());
        bytes
    }

    #[test]
    fn test_uncompressed_payload() {
        let mut bytes = b"SIMISA@@@@@@@@@@".to_vec();
        bytes.extend_from_slice(b"payload");

        let mut payload = open_payload(bytes.as_slice()).unwrap();
        assert!(!payload.is_compressed());
        let mut out = Vec::new();
        payload.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"payload");
    }

    #[test]
    fn test_compressed_payload() {
        let bytes = compressed(b"hello deflate", [0x78, 0x9C]);
        let mut payload = open_payload(bytes.as_slice()).unwrap();
        assert!(payload.is_compressed());
        let mut out = Vec::new();
        payload.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hello deflate");
    }

    #[test]
    fn test_zlib_header_mask() {
        // 0x0178 and 0xDA78 pass the mask, 0x2078 (preset dictionary) does not
        assert!(open_payload(compressed(b"x", [0x78, 0x01]).as_slice()).is_ok());
        assert!(open_payload(compressed(b"x", [0x78, 0xDA]).as_slice()).is_ok());
        assert!(matches!(
            open_payload(compressed(b"x", [0x78, 0x20]).as_slice()),
            Err(ConvertError::InvalidSignature { .. })
        ));
        assert!(matches!(
            open_payload(compressed(b"x", [0x08, 0x01]).as_slice()),
            Err(ConvertError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn test_bad_signatures() {
        assert!(matches!(
            open_payload(b"SIMISA@X@@@@@@@@".as_slice()),
            Err(ConvertError::InvalidSignature { .. })
        ));
        assert!(matches!(
            open_payload(b"SIMISA@@@@@@@@@X".as_slice()),
            Err(ConvertError::InvalidSignature { expected: "@@@@@@@@", .. })
        ));

        let mut bad_marker = compressed(b"x", [0x78, 0x9C]);
        bad_marker[12] = b'#';
        assert!(matches!(
            open_payload(bad_marker.as_slice()),
            Err(ConvertError::InvalidSignature { expected: "@@@@", .. })
        ));
    }

    #[test]
    fn test_truncated_header_is_io_error() {
        assert!(matches!(
            open_payload(b"SIMI".as_slice()),
            Err(ConvertError::Io(_))
        ));
    }
}
