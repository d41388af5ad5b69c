// src/bitmap.rs
//! The two-section bitmap container (plain uncompressed BMP).
//!
//! Layout, all fields little-endian:
//! 1. 14-byte file header: `BM`, total file size, two reserved words,
//!    payload offset.
//! 2. 40-byte metadata header: geometry block. A negative height marks a
//!    top-down payload.
//! 3. Palette, present iff bit count == 8: 256 blue/green/red/reserved
//!    quads.
//! 4. Pixel payload: 24-bit rows padded to 4-byte boundaries, 8-bit rows
//!    unpadded.
//!
//! Loading is transactional: everything is read into a staging
//! [`LoadedImage`] and only committed by the caller once the last read
//! succeeded, so a short read never disturbs the live image.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use log::{debug, warn};

use crate::buffer::{try_zeroed_u8, ImageFormat, Orientation, PixelDepth};
use crate::error::{Error, Result};
use crate::palette::{Palette, Rgb, PALETTE_LEN};

/// Size of the fixed file header.
pub const FILE_HEADER_LEN: usize = 14;
/// Size of the fixed geometry block.
pub const INFO_HEADER_LEN: usize = 40;
/// Size of a serialized 256-entry palette.
pub const PALETTE_BYTES: usize = PALETTE_LEN * 4;

const SIGNATURE: [u8; 2] = *b"BM";
const BI_RGB: u32 = 0;
/// Resolution stamped into saved headers, pixels per meter.
const DEFAULT_PPM: i32 = 100;

/// The 40-byte metadata header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfoHeader {
    pub header_size: u32,
    pub width: i32,
    /// Negative height = top-down payload.
    pub height: i32,
    pub planes: u16,
    pub bit_count: u16,
    pub compression: u32,
    pub image_size: u32,
    pub x_ppm: i32,
    pub y_ppm: i32,
    pub colors_used: u32,
    pub colors_important: u32,
}

impl InfoHeader {
    /// Builds the header describing an in-memory image.
    pub fn from_format(format: &ImageFormat) -> Self {
        let height = match format.orientation {
            Orientation::BottomUp => format.height,
            Orientation::TopDown => -format.height,
        };
        let palette_colors = if format.has_palette() {
            PALETTE_LEN as u32
        } else {
            0
        };
        Self {
            header_size: INFO_HEADER_LEN as u32,
            width: format.width,
            height,
            planes: 1,
            bit_count: format.bit_count(),
            compression: BI_RGB,
            image_size: 0,
            x_ppm: DEFAULT_PPM,
            y_ppm: DEFAULT_PPM,
            colors_used: palette_colors,
            colors_important: palette_colors,
        }
    }

    /// Interprets the header as an in-memory format. Deep mode never
    /// round-trips through the container; 8-bit payloads come back as
    /// plain indexed images.
    pub fn to_format(&self) -> Result<ImageFormat> {
        if self.width <= 0 || self.height == 0 {
            return Err(invalid_data("bitmap header has degenerate dimensions"));
        }
        let depth = match self.bit_count {
            8 => PixelDepth::Indexed8,
            24 => PixelDepth::Rgb24,
            other => {
                return Err(invalid_data(&format!(
                    "unsupported bitmap bit count {}",
                    other
                )))
            }
        };
        if self.compression != BI_RGB {
            return Err(invalid_data("compressed bitmaps are not supported"));
        }
        let orientation = if self.height > 0 {
            Orientation::BottomUp
        } else {
            Orientation::TopDown
        };
        Ok(ImageFormat::new(
            self.width,
            self.height.unsigned_abs() as i32,
            depth,
            orientation,
        ))
    }

    /// Bytes per payload row under the container's alignment rules.
    pub fn row_stride(&self) -> usize {
        match self.bit_count {
            8 => self.width as usize,
            _ => (self.width as usize * 3 + 3) & !3,
        }
    }

    /// Expected payload size for this geometry.
    pub fn payload_len(&self) -> usize {
        self.row_stride() * self.height.unsigned_abs() as usize
    }

    fn encode(&self) -> [u8; INFO_HEADER_LEN] {
        let mut buf = [0u8; INFO_HEADER_LEN];
        write_u32_le(&mut buf, 0, self.header_size);
        write_u32_le(&mut buf, 4, self.width as u32);
        write_u32_le(&mut buf, 8, self.height as u32);
        write_u16_le(&mut buf, 12, self.planes);
        write_u16_le(&mut buf, 14, self.bit_count);
        write_u32_le(&mut buf, 16, self.compression);
        write_u32_le(&mut buf, 20, self.image_size);
        write_u32_le(&mut buf, 24, self.x_ppm as u32);
        write_u32_le(&mut buf, 28, self.y_ppm as u32);
        write_u32_le(&mut buf, 32, self.colors_used);
        write_u32_le(&mut buf, 36, self.colors_important);
        buf
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < INFO_HEADER_LEN {
            return Err(invalid_data("bitmap metadata header truncated"));
        }
        Ok(Self {
            header_size: read_u32_le(buf, 0),
            width: read_u32_le(buf, 4) as i32,
            height: read_u32_le(buf, 8) as i32,
            planes: read_u16_le(buf, 12),
            bit_count: read_u16_le(buf, 14),
            compression: read_u32_le(buf, 16),
            image_size: read_u32_le(buf, 20),
            x_ppm: read_u32_le(buf, 24) as i32,
            y_ppm: read_u32_le(buf, 28) as i32,
            colors_used: read_u32_le(buf, 32),
            colors_important: read_u32_le(buf, 36),
        })
    }
}

/// A fully-read container, not yet committed to a store.
#[derive(Debug)]
pub struct LoadedImage {
    pub header: InfoHeader,
    pub palette: Option<Palette>,
    pub payload: Vec<u8>,
}

/// Reads a container file into a staging image.
///
/// The metadata-header size is derived from the payload offset and the
/// payload size from the total size, exactly as written; any short read or
/// inconsistent field aborts with [`Error::Io`] without touching live
/// state.
pub fn load(path: &Path) -> Result<LoadedImage> {
    let mut file = File::open(path)?;

    let mut file_header = [0u8; FILE_HEADER_LEN];
    file.read_exact(&mut file_header)?;
    if file_header[0..2] != SIGNATURE {
        return Err(invalid_data("missing BM signature"));
    }
    let total_size = read_u32_le(&file_header, 2) as usize;
    let payload_offset = read_u32_le(&file_header, 10) as usize;

    let meta_len = payload_offset
        .checked_sub(FILE_HEADER_LEN)
        .filter(|len| *len >= INFO_HEADER_LEN)
        .ok_or_else(|| invalid_data("payload offset inside the file header"))?;
    let payload_len = total_size
        .checked_sub(payload_offset)
        .ok_or_else(|| invalid_data("total size smaller than payload offset"))?;

    let mut meta = try_zeroed_u8(meta_len)?;
    file.read_exact(&mut meta)?;
    let header = InfoHeader::decode(&meta)?;

    let palette = if header.bit_count == 8 {
        let bytes = meta
            .get(INFO_HEADER_LEN..INFO_HEADER_LEN + PALETTE_BYTES)
            .ok_or_else(|| invalid_data("8-bit bitmap without a full palette"))?;
        Some(decode_palette(bytes))
    } else {
        None
    };

    let mut payload = try_zeroed_u8(payload_len)?;
    file.read_exact(&mut payload)?;

    debug!(
        "bitmap loaded: {}x{}x{} ({} payload bytes)",
        header.width,
        header.height.unsigned_abs(),
        header.bit_count,
        payload_len
    );
    Ok(LoadedImage {
        header,
        palette,
        payload,
    })
}

/// Writes a container file. The persisted copy is always normalized to
/// bottom-up orientation; the live buffer is never mutated.
pub fn save(
    path: &Path,
    header: &InfoHeader,
    palette: Option<&Palette>,
    payload: &[u8],
) -> Result<()> {
    let dib = encode_dib(header, palette, payload, true)?;
    let meta_len = dib.len() - payload.len();

    let mut file_header = [0u8; FILE_HEADER_LEN];
    file_header[0..2].copy_from_slice(&SIGNATURE);
    write_u32_le(&mut file_header, 2, (FILE_HEADER_LEN + dib.len()) as u32);
    write_u32_le(&mut file_header, 10, (FILE_HEADER_LEN + meta_len) as u32);

    let mut file = File::create(path)?;
    file.write_all(&file_header)?;
    file.write_all(&dib)?;
    file.flush()?;
    Ok(())
}

/// Builds the contiguous metadata+palette+payload block ("DIB") for a
/// container or for external clipboard glue. With `force_bottom_up` a
/// top-down image is flipped in the copy.
pub fn encode_dib(
    header: &InfoHeader,
    palette: Option<&Palette>,
    payload: &[u8],
    force_bottom_up: bool,
) -> Result<Vec<u8>> {
    if header.bit_count == 8 && palette.is_none() {
        return Err(invalid_data("8-bit image without a palette"));
    }
    let mut header = *header;
    let meta_len = INFO_HEADER_LEN + palette.map_or(0, |_| PALETTE_BYTES);

    let mut dib = try_zeroed_u8(meta_len + payload.len())?;
    dib[meta_len..].copy_from_slice(payload);
    if force_bottom_up && header.height < 0 {
        flip_vertical(&mut header, &mut dib[meta_len..]);
    }
    dib[..INFO_HEADER_LEN].copy_from_slice(&header.encode());
    if let Some(palette) = palette {
        encode_palette(palette, &mut dib[INFO_HEADER_LEN..meta_len]);
    }
    Ok(dib)
}

/// Reverses the payload's rows in place and toggles the stored height sign.
/// Applying it twice restores the original bytes and orientation.
pub fn flip_vertical(header: &mut InfoHeader, payload: &mut [u8]) {
    let stride = header.row_stride();
    let height = header.height.unsigned_abs() as usize;
    if stride == 0 || height == 0 {
        return;
    }
    if payload.len() < stride * height {
        warn!(
            "flip skipped: payload {} bytes, geometry needs {}",
            payload.len(),
            stride * height
        );
        return;
    }
    for y in 0..height / 2 {
        let opposite = height - 1 - y;
        let (upper, lower) = payload.split_at_mut(opposite * stride);
        upper[y * stride..y * stride + stride].swap_with_slice(&mut lower[..stride]);
    }
    header.height = -header.height;
}

fn encode_palette(palette: &Palette, out: &mut [u8]) {
    for (entry, quad) in palette.entries().iter().zip(out.chunks_exact_mut(4)) {
        quad[0] = entry.b;
        quad[1] = entry.g;
        quad[2] = entry.r;
        quad[3] = 0;
    }
}

fn decode_palette(bytes: &[u8]) -> Palette {
    let mut palette = Palette::default();
    for (i, quad) in bytes.chunks_exact(4).take(PALETTE_LEN).enumerate() {
        palette.set_entry(i as u8, Rgb::new(quad[2], quad[1], quad[0]));
    }
    palette
}

pub(crate) fn invalid_data(message: &str) -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message.to_string(),
    ))
}

fn read_u16_le(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

fn read_u32_le(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

fn write_u16_le(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn write_u32_le(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("image-pane-{}-{}.bmp", name, std::process::id()))
    }

    fn indexed_format(w: i32, h: i32, orientation: Orientation) -> ImageFormat {
        ImageFormat::new(w, h, PixelDepth::Indexed8, orientation)
    }

    #[test]
    fn header_encode_decode_round_trip() {
        let format = ImageFormat::new(5, 3, PixelDepth::Rgb24, Orientation::TopDown);
        let header = InfoHeader::from_format(&format);
        assert_eq!(header.height, -3);
        let decoded = InfoHeader::decode(&header.encode()).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(decoded.to_format().unwrap(), format);
    }

    #[test]
    fn stride_rules() {
        let h8 = InfoHeader::from_format(&indexed_format(5, 3, Orientation::TopDown));
        assert_eq!(h8.row_stride(), 5);
        let h24 = InfoHeader::from_format(&ImageFormat::new(
            5,
            3,
            PixelDepth::Rgb24,
            Orientation::BottomUp,
        ));
        assert_eq!(h24.row_stride(), 16);
        assert_eq!(h24.payload_len(), 48);
    }

    #[test]
    fn flip_vertical_is_an_involution() {
        let format = ImageFormat::new(3, 4, PixelDepth::Indexed8, Orientation::TopDown);
        let mut header = InfoHeader::from_format(&format);
        let original: Vec<u8> = (0..12).collect();
        let mut payload = original.clone();

        flip_vertical(&mut header, &mut payload);
        assert_eq!(header.height, 4);
        assert_eq!(&payload[0..3], &[9, 10, 11]);

        flip_vertical(&mut header, &mut payload);
        assert_eq!(header.height, -4);
        assert_eq!(payload, original);
    }

    #[test]
    fn flip_respects_24_bit_padding() {
        // Width 5 -> 16-byte stride, 1 pad byte per row.
        let format = ImageFormat::new(5, 2, PixelDepth::Rgb24, Orientation::TopDown);
        let mut header = InfoHeader::from_format(&format);
        let mut payload = vec![0u8; 32];
        payload[0] = 0xAA; // first pixel, row 0
        payload[16] = 0xBB; // first pixel, row 1
        flip_vertical(&mut header, &mut payload);
        assert_eq!(payload[0], 0xBB);
        assert_eq!(payload[16], 0xAA);
    }

    #[test]
    fn save_load_round_trip_indexed() {
        let path = temp_path("roundtrip8");
        let format = indexed_format(4, 4, Orientation::BottomUp);
        let header = InfoHeader::from_format(&format);
        let payload: Vec<u8> = (0..16).collect();
        let palette = Palette::preset(crate::palette::Colormap::RainbowHeat);

        save(&path, &header, Some(&palette), &payload).unwrap();
        let loaded = load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.header.bit_count, 8);
        assert_eq!(loaded.header.height, 4);
        assert_eq!(loaded.payload, payload);
        assert_eq!(loaded.palette.as_ref(), Some(&palette));
    }

    #[test]
    fn save_normalizes_top_down_to_bottom_up() {
        let path = temp_path("normalize");
        let format = indexed_format(2, 2, Orientation::TopDown);
        let header = InfoHeader::from_format(&format);
        let payload = vec![1u8, 2, 3, 4];

        save(&path, &header, Some(&Palette::default()), &payload).unwrap();
        let loaded = load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        // Persisted copy is bottom-up with flipped rows; the payload the
        // caller handed in is untouched.
        assert_eq!(loaded.header.height, 2);
        assert_eq!(loaded.payload, vec![3, 4, 1, 2]);
        assert_eq!(payload, vec![1, 2, 3, 4]);
    }

    #[test]
    fn load_rejects_bad_signature() {
        let path = temp_path("badsig");
        std::fs::write(&path, b"XXjunk").unwrap();
        let err = load(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn load_rejects_short_payload() {
        let path = temp_path("short");
        let format = indexed_format(4, 4, Orientation::BottomUp);
        let header = InfoHeader::from_format(&format);
        let payload: Vec<u8> = (0..16).collect();
        save(&path, &header, Some(&Palette::default()), &payload).unwrap();

        // Truncate inside the payload.
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 8]).unwrap();
        let err = load(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn palette_round_trips_bgr_order() {
        let mut palette = Palette::default();
        palette.set_entry(9, Rgb::new(10, 20, 30));
        let mut bytes = [0u8; PALETTE_BYTES];
        encode_palette(&palette, &mut bytes);
        assert_eq!(&bytes[9 * 4..9 * 4 + 4], &[30, 20, 10, 0]);
        let decoded = decode_palette(&bytes);
        assert_eq!(decoded.entry(9), Rgb::new(10, 20, 30));
    }
}
