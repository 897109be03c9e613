//! ACE texture decoder
//!
//! # Layout (after the SIMIS header, see [`crate::simis`])
//! ```text
//! marker        01 00 00 00
//! options       u32 (bit 0 mipmaps, bit 4 raw data)
//! width         i32
//! height        i32
//! surface       i32 (raw path surface format code)
//! channel_count i32
//! reserved      128 bytes
//! channels      channel_count × { size: u64, id: u64 }
//!
//! raw path:     mip offsets (mip_count × 4), length i32, payload
//! planar path:  scanline offsets (per mip: 4 × height / 2^mip),
//!               then per row, per channel: packed (1-bit) or plain (8-bit) bytes
//! ```
//!
//! The raw path keeps the block-compressed or packed payload verbatim. The
//! planar path expands every channel and composes an RGBA32 image.

use byteorder::{LittleEndian, ReadBytesExt};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use ts_common::{TextureFormat, TextureImage};

use crate::error::{ConvertError, Result};
use crate::simis;

const FORMAT_MARKER: [u8; 4] = [0x01, 0x00, 0x00, 0x00];
const RESERVED_LEN: u64 = 128;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AceOptions: u32 {
        const MIP_MAPS = 0x01;
        const RAW_DATA = 0x10;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChannelId {
    Mask = 2,
    Red = 3,
    Green = 4,
    Blue = 5,
    Alpha = 6,
}

impl ChannelId {
    pub fn from_tag(tag: u64) -> Option<Self> {
        match tag {
            2 => Some(Self::Mask),
            3 => Some(Self::Red),
            4 => Some(Self::Green),
            5 => Some(Self::Blue),
            6 => Some(Self::Alpha),
            _ => None,
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelDescriptor {
    /// Bits per pixel, 1 or 8
    pub bits: u8,
    pub id: ChannelId,
}

impl ChannelDescriptor {
    /// Bytes one scanline of this channel occupies for the given width
    pub fn row_len(&self, width: usize) -> usize {
        if self.bits == 1 { width.div_ceil(8) } else { width }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AceHeader {
    pub options: AceOptions,
    pub width: i32,
    pub height: i32,
    pub surface_format: i32,
    pub channels: Vec<ChannelDescriptor>,
}

impl AceHeader {
    pub fn mip_count(&self) -> u32 {
        mip_count(self.width, self.options.contains(AceOptions::MIP_MAPS))
    }

    pub fn has_channel(&self, id: ChannelId) -> bool {
        self.channels.iter().any(|c| c.id == id)
    }
}

/// Raw-path surface code to container format
pub fn surface_format(code: i32) -> Option<TextureFormat> {
    match code {
        0x0E => Some(TextureFormat::Bgr565),
        0x10 => Some(TextureFormat::Bgra5551),
        0x11 => Some(TextureFormat::Bgra4444),
        0x12 => Some(TextureFormat::Dxt1),
        0x14 => Some(TextureFormat::Dxt3),
        0x16 => Some(TextureFormat::Dxt5),
        _ => None,
    }
}

/// `1 + floor(log2(width))` with mipmaps, otherwise 1
pub fn mip_count(width: i32, mip_maps: bool) -> u32 {
    if !mip_maps {
        return 1;
    }
    let width = u32::try_from(width).unwrap_or(0);
    1 + width.checked_ilog2().unwrap_or(0)
}

/// Expand a 1-bit scanline MSB-first into one 0x00/0xFF byte per pixel
pub fn unpack_bits(packed: &[u8], width: usize) -> Vec<u8> {
    (0..width)
        .map(|x| {
            let bit = (packed[x / 8] >> (7 - (x % 8))) & 1;
            bit * 0xFF
        })
        .collect()
}

/// Decodes ACE containers into [`TextureImage`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct TextureDecoder;

impl TextureDecoder {
    pub fn new() -> Self {
        Self
    }

    pub fn decode_file(&self, path: &Path) -> Result<TextureImage> {
        let file = File::open(path)?;
        self.decode(BufReader::new(file))
    }

    /// Decode a full ACE file (SIMIS header included)
    pub fn decode<R: Read>(&self, reader: R) -> Result<TextureImage> {
        let mut payload = simis::open_payload(reader)?;
        let header = self.read_header(&mut payload)?;

        if header.options.contains(AceOptions::RAW_DATA) {
            self.decode_raw(&header, &mut payload)
        } else {
            self.decode_planar(&header, &mut payload)
        }
    }

    /// Read the header and channel descriptors from an inflated payload
    pub fn read_header<R: Read>(&self, reader: &mut R) -> Result<AceHeader> {
        let mut marker = [0u8; 4];
        reader.read_exact(&mut marker)?;
        if marker != FORMAT_MARKER {
            return Err(ConvertError::InvalidSignature {
                expected: "01 00 00 00",
                found: format!("{marker:02X?}"),
            });
        }

        let options = AceOptions::from_bits_retain(reader.read_u32::<LittleEndian>()?);
        let width = reader.read_i32::<LittleEndian>()?;
        let height = reader.read_i32::<LittleEndian>()?;
        let surface_format = reader.read_i32::<LittleEndian>()?;
        let channel_count = reader.read_i32::<LittleEndian>()?;
        skip(reader, RESERVED_LEN)?;

        if width < 0 || height < 0 {
            return Err(ConvertError::InvalidDimensions { width, height });
        }
        let channel_count = usize::try_from(channel_count).map_err(|_| ConvertError::InvalidLength {
            what: "channel count",
            len: channel_count.into(),
        })?;
        if options.contains(AceOptions::RAW_DATA) && self::surface_format(surface_format).is_none() {
            return Err(ConvertError::UnsupportedSurfaceFormat(surface_format));
        }

        let mut channels = Vec::with_capacity(channel_count.min(8));
        for _ in 0..channel_count {
            let size = reader.read_u64::<LittleEndian>()?;
            let bits = match size {
                1 => 1,
                8 => 8,
                other => return Err(ConvertError::UnsupportedChannelSize(other)),
            };
            let tag = reader.read_u64::<LittleEndian>()?;
            let id = ChannelId::from_tag(tag).ok_or(ConvertError::UnknownChannelType(tag))?;

            tracing::debug!("Channel {:?}: {} bit", id, bits);
            channels.push(ChannelDescriptor { bits, id });
        }

        let header = AceHeader {
            options,
            width,
            height,
            surface_format,
            channels,
        };

        if header.has_channel(ChannelId::Alpha) {
            tracing::debug!("Alpha: 8 bit");
        } else if header.has_channel(ChannelId::Mask) {
            tracing::debug!("Alpha: 1 bit");
        }

        Ok(header)
    }

    fn decode_raw<R: Read>(&self, header: &AceHeader, reader: &mut R) -> Result<TextureImage> {
        let format = surface_format(header.surface_format)
            .ok_or(ConvertError::UnsupportedSurfaceFormat(header.surface_format))?;

        skip(reader, u64::from(header.mip_count()) * 4)?;

        let len = reader.read_i32::<LittleEndian>()?;
        let len = u64::try_from(len).map_err(|_| ConvertError::InvalidLength {
            what: "surface data",
            len: len.into(),
        })?;
        let data = read_exact_vec(reader, len)?;

        Ok(TextureImage::new(header.width, header.height, format, data))
    }

    fn decode_planar<R: Read>(&self, header: &AceHeader, reader: &mut R) -> Result<TextureImage> {
        for required in [ChannelId::Red, ChannelId::Green, ChannelId::Blue] {
            if !header.has_channel(required) {
                return Err(ConvertError::MissingRequiredChannel(required));
            }
        }

        let height = u64::try_from(header.height).unwrap_or(0);
        for mip in 0..header.mip_count() {
            skip(reader, (4 * height) >> mip)?;
        }

        let width = usize::try_from(header.width).unwrap_or(0);
        let rows = usize::try_from(header.height).unwrap_or(0);
        let total = width
            .checked_mul(rows)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or(ConvertError::InvalidDimensions {
                width: header.width,
                height: header.height,
            })?;

        let mut data = Vec::with_capacity(total.min(1 << 24));
        let mut planes: [Option<Vec<u8>>; 7] = Default::default();

        for _ in 0..rows {
            for channel in &header.channels {
                // Sized by what the stream delivers, not by the header width
                let packed = read_exact_vec(reader, channel.row_len(width) as u64)?;
                let plane = if channel.bits == 1 {
                    unpack_bits(&packed, width)
                } else {
                    packed
                };
                planes[channel.id.slot()] = Some(plane);
            }

            let [red, green, blue] = [ChannelId::Red, ChannelId::Green, ChannelId::Blue]
                .map(|id| planes[id.slot()].as_deref().unwrap_or(&[]));
            let alpha = planes[ChannelId::Alpha.slot()]
                .as_deref()
                .or(planes[ChannelId::Mask.slot()].as_deref());

            for x in 0..width {
                data.extend_from_slice(&[
                    red[x],
                    green[x],
                    blue[x],
                    alpha.map_or(0xFF, |a| a[x]),
                ]);
            }
        }

        Ok(TextureImage::new(
            header.width,
            header.height,
            TextureFormat::Rgba32,
            data,
        ))
    }
}

/// Discard `len` bytes of a forward-only stream
fn skip<R: Read>(reader: &mut R, len: u64) -> io::Result<()> {
    let skipped = io::copy(&mut reader.take(len), &mut io::sink())?;
    if skipped < len {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    Ok(())
}

fn read_exact_vec<R: Read>(reader: &mut R, len: u64) -> io::Result<Vec<u8>> {
    let mut data = Vec::new();
    reader.take(len).read_to_end(&mut data)?;
    if (data.len() as u64) < len {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use flate2::Compression;
    use flate2::write::DeflateEncoder;
    use std::io::Write;

    fn header(options: AceOptions, width: i32, height: i32, surface: i32, channels: &[(u64, u64)]) -> Vec<u8> {
        let mut bytes = FORMAT_MARKER.to_vec();
        bytes.write_u32::<LittleEndian>(options.bits()).unwrap();
        bytes.write_i32::<LittleEndian>(width).unwrap();
        bytes.write_i32::<LittleEndian>(height).unwrap();
        bytes.write_i32::<LittleEndian>(surface).unwrap();
        bytes.write_i32::<LittleEndian>(channels.len() as i32).unwrap();
        bytes.extend_from_slice(&[0u8; 128]);
        for &(size, id) in channels {
            bytes.write_u64::<LittleEndian>(size).unwrap();
            bytes.write_u64::<LittleEndian>(id).unwrap();
        }
        bytes
    }

    fn uncompressed(payload: &[u8]) -> Vec<u8> {
        let mut bytes = b"SIMISA@@@@@@@@@@".to_vec();
        bytes.extend_from_slice(payload);
        bytes
    }

    fn compressed(payload: &[u8]) -> Vec<u8> {
        let mut bytes = b"SIMISA@F".to_vec();
        bytes.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
        bytes.extend_from_slice(b"@@@@");
        bytes.extend_from_slice(&[0x78, 0x01]);
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(payload).unwrap();
        bytes.extend_from_slice(&encoder.finish().unwrap());
        bytes
    }

    fn decode(bytes: &[u8]) -> Result<TextureImage> {
        TextureDecoder::default().decode(bytes)
    }

    #[test]
    fn test_mip_count() {
        assert_eq!(mip_count(256, true), 9);
        assert_eq!(mip_count(256, false), 1);
        assert_eq!(mip_count(1, true), 1);
        assert_eq!(mip_count(300, true), 9);
        assert_eq!(mip_count(0, true), 1);
    }

    #[test]
    fn test_surface_table() {
        assert_eq!(surface_format(0x0E), Some(TextureFormat::Bgr565));
        assert_eq!(surface_format(0x12), Some(TextureFormat::Dxt1));
        assert_eq!(surface_format(0x16), Some(TextureFormat::Dxt5));
        assert_eq!(surface_format(0x13), None);
    }

    #[test]
    fn test_unpack_bits_msb_first() {
        let unpacked = unpack_bits(&[0b1010_0000, 0b1000_0000], 10);
        assert_eq!(
            unpacked,
            vec![0xFF, 0x00, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0x00]
        );
        assert!(unpack_bits(&[0x5A, 0xC3], 16).iter().all(|&b| b == 0x00 || b == 0xFF));
    }

    #[test]
    fn test_raw_dxt1_compressed() {
        let mut payload = header(AceOptions::RAW_DATA, 4, 4, 0x12, &[]);
        payload.write_u32::<LittleEndian>(0).unwrap(); // one mip offset
        payload.write_i32::<LittleEndian>(8).unwrap();
        payload.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);

        let image = decode(&compressed(&payload)).unwrap();
        assert_eq!(image.format, TextureFormat::Dxt1);
        assert_eq!((image.width, image.height), (4, 4));
        assert_eq!(image.data, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_raw_skips_mip_table() {
        let options = AceOptions::RAW_DATA | AceOptions::MIP_MAPS;
        let mut payload = header(options, 4, 4, 0x14, &[]);
        payload.extend_from_slice(&[0xEE; 3 * 4]); // mip count 3
        payload.write_i32::<LittleEndian>(2).unwrap();
        payload.extend_from_slice(&[9, 9]);

        let image = decode(&uncompressed(&payload)).unwrap();
        assert_eq!(image.format, TextureFormat::Dxt3);
        assert_eq!(image.data, vec![9, 9]);
    }

    #[test]
    fn test_raw_unsupported_surface() {
        let mut payload = header(AceOptions::RAW_DATA, 4, 4, 0x42, &[]);
        payload.extend_from_slice(&[0; 8]);
        assert!(matches!(
            decode(&uncompressed(&payload)),
            Err(ConvertError::UnsupportedSurfaceFormat(0x42))
        ));
    }

    #[test]
    fn test_raw_surface_checked_before_channels() {
        // Channel table is garbage; the surface code must be rejected first
        let payload = header(AceOptions::RAW_DATA, 4, 4, 0x13, &[(3, 3)]);
        assert!(matches!(
            decode(&uncompressed(&payload)),
            Err(ConvertError::UnsupportedSurfaceFormat(0x13))
        ));
    }

    #[test]
    fn test_planar_rgba() {
        let channels = [(8, 3), (8, 4), (8, 5), (8, 6)];
        let mut payload = header(AceOptions::empty(), 2, 1, 0, &channels);
        payload.extend_from_slice(&[0; 4]); // scanline table, one row
        payload.extend_from_slice(&[10, 11]); // red
        payload.extend_from_slice(&[20, 21]); // green
        payload.extend_from_slice(&[30, 31]); // blue
        payload.extend_from_slice(&[40, 41]); // alpha

        let image = decode(&uncompressed(&payload)).unwrap();
        assert_eq!(image.format, TextureFormat::Rgba32);
        assert_eq!(image.data, vec![10, 20, 30, 40, 11, 21, 31, 41]);
    }

    #[test]
    fn test_planar_mask_supplies_alpha() {
        let channels = [(8, 3), (8, 4), (8, 5), (1, 2)];
        let mut payload = header(AceOptions::empty(), 3, 2, 0, &channels);
        payload.extend_from_slice(&[0; 8]); // scanline table, two rows
        for row in 0..2u8 {
            payload.extend_from_slice(&[row, row, row]);
            payload.extend_from_slice(&[1, 1, 1]);
            payload.extend_from_slice(&[2, 2, 2]);
            payload.push(if row == 0 { 0b1010_0000 } else { 0b0100_0000 });
        }

        let image = decode(&uncompressed(&payload)).unwrap();
        let alphas: Vec<u8> = image.data.chunks(4).map(|p| p[3]).collect();
        assert_eq!(alphas, vec![0xFF, 0x00, 0xFF, 0x00, 0xFF, 0x00]);
        assert_eq!(&image.data[12..15], &[1, 1, 2]);
    }

    #[test]
    fn test_planar_without_alpha_is_opaque() {
        let channels = [(8, 3), (8, 4), (8, 5)];
        let mut payload = header(AceOptions::empty(), 1, 1, 0, &channels);
        payload.extend_from_slice(&[0; 4]);
        payload.extend_from_slice(&[7, 8, 9]);

        let image = decode(&uncompressed(&payload)).unwrap();
        assert_eq!(image.data, vec![7, 8, 9, 0xFF]);
    }

    #[test]
    fn test_planar_scanline_table_per_mip() {
        let channels = [(8, 3), (8, 4), (8, 5)];
        let mut payload = header(AceOptions::MIP_MAPS, 2, 2, 0, &channels);
        // mip count 2: 8 + 4 bytes of offsets
        payload.extend_from_slice(&[0xAA; 12]);
        payload.extend_from_slice(&[1, 2, 3, 4, 5, 6]);
        payload.extend_from_slice(&[7, 8, 9, 10, 11, 12]);

        let image = decode(&uncompressed(&payload)).unwrap();
        assert_eq!(&image.data[0..4], &[1, 3, 5, 0xFF]);
        assert_eq!(&image.data[12..16], &[8, 10, 12, 0xFF]);
    }

    #[test]
    fn test_planar_missing_blue() {
        let channels = [(8, 3), (8, 4), (8, 6)];
        let mut payload = header(AceOptions::empty(), 1, 1, 0, &channels);
        payload.extend_from_slice(&[0; 4 + 3]);
        assert!(matches!(
            decode(&uncompressed(&payload)),
            Err(ConvertError::MissingRequiredChannel(ChannelId::Blue))
        ));
    }

    #[test]
    fn test_channel_validation() {
        let payload = header(AceOptions::empty(), 1, 1, 0, &[(4, 3)]);
        assert!(matches!(
            decode(&uncompressed(&payload)),
            Err(ConvertError::UnsupportedChannelSize(4))
        ));

        let payload = header(AceOptions::empty(), 1, 1, 0, &[(8, 7)]);
        assert!(matches!(
            decode(&uncompressed(&payload)),
            Err(ConvertError::UnknownChannelType(7))
        ));

        // A size that only looks valid in its low byte
        let payload = header(AceOptions::empty(), 1, 1, 0, &[(0x108, 3)]);
        assert!(matches!(
            decode(&uncompressed(&payload)),
            Err(ConvertError::UnsupportedChannelSize(0x108))
        ));
    }

    #[test]
    fn test_bad_format_marker() {
        let mut payload = header(AceOptions::RAW_DATA, 1, 1, 0x12, &[]);
        payload[0] = 0x02;
        assert!(matches!(
            decode(&uncompressed(&payload)),
            Err(ConvertError::InvalidSignature { expected: "01 00 00 00", .. })
        ));
    }

    #[test]
    fn test_negative_dimensions() {
        let payload = header(AceOptions::RAW_DATA, -4, 4, 0x12, &[]);
        assert!(matches!(
            decode(&uncompressed(&payload)),
            Err(ConvertError::InvalidDimensions { width: -4, height: 4 })
        ));
    }

    #[test]
    fn test_truncated_payload() {
        let mut payload = header(AceOptions::RAW_DATA, 4, 4, 0x12, &[]);
        payload.write_u32::<LittleEndian>(0).unwrap();
        payload.write_i32::<LittleEndian>(8).unwrap();
        payload.extend_from_slice(&[1, 2, 3]);

        match decode(&uncompressed(&payload)) {
            Err(ConvertError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected EOF, got {other:?}"),
        }
    }

    #[test]
    fn test_planar_huge_width_truncated_is_eof() {
        let channels = [(8, 3), (8, 4), (8, 5)];
        let mut payload = header(AceOptions::empty(), i32::MAX, 1, 0, &channels);
        payload.extend_from_slice(&[0; 4]);
        payload.extend_from_slice(&[1, 2, 3, 4]);

        match decode(&uncompressed(&payload)) {
            Err(ConvertError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected EOF, got {other:?}"),
        }
    }

    #[test]
    fn test_channel_details_follow_subscriber_level() {
        let channels = [(8, 3), (8, 4), (8, 5), (1, 2)];
        let mut payload = header(AceOptions::empty(), 1, 1, 0, &channels);
        payload.extend_from_slice(&[0; 4]);
        payload.extend_from_slice(&[1, 2, 3, 0x80]);

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        let image = tracing::subscriber::with_default(subscriber, || decode(&uncompressed(&payload)));
        assert_eq!(image.unwrap().data, vec![1, 2, 3, 0xFF]);
    }
}
