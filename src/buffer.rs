// src/buffer.rs
//! Pixel buffer ownership and lifecycle.
//!
//! The store owns at most one active image at a time: its geometry, its
//! presentable bytes, the 16-bit source samples when the image is deep, and
//! the palette for indexed images. Backing memory is either engine-owned
//! (`Vec`-backed, dropped automatically on replacement) or caller-owned
//! (adopted as a raw pointer that the engine never frees).
//!
//! Every mutator reports whether the image *geometry* changed, which is what
//! the embedding glue uses to decide between a full re-layout and a
//! redraw-only update.
//!
//! All mutation and all reads happen under the pane's [`SyncGate`] lock; the
//! store itself contains no synchronization.
//!
//! [`SyncGate`]: crate::sync::SyncGate

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::palette::Palette;

/// Pixel depth of the active image.
///
/// `Mono16` is presented through an 8-bit shadow buffer computed by the tone
/// mapper; the 16-bit samples stay authoritative for readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelDepth {
    /// 8-bit palette-indexed samples.
    Indexed8,
    /// 16-bit mono samples behind an 8-bit indexed shadow.
    Mono16,
    /// 24-bit blue/green/red truecolor.
    Rgb24,
}

/// Row storage order of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// First row in memory is the top display row.
    TopDown,
    /// First row in memory is the bottom display row (native DIB order).
    BottomUp,
}

/// Geometry of the active image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageFormat {
    pub width: i32,
    pub height: i32,
    pub depth: PixelDepth,
    pub orientation: Orientation,
}

impl ImageFormat {
    /// # Panics
    /// Panics if `width` or `height` is not positive.
    pub fn new(width: i32, height: i32, depth: PixelDepth, orientation: Orientation) -> Self {
        assert!(
            width > 0 && height > 0,
            "image dimensions must be positive: {}x{}",
            width,
            height
        );
        Self {
            width,
            height,
            depth,
            orientation,
        }
    }

    /// Bit count of the *presentable* buffer (the shadow for deep images).
    pub fn bit_count(&self) -> u16 {
        match self.depth {
            PixelDepth::Indexed8 | PixelDepth::Mono16 => 8,
            PixelDepth::Rgb24 => 24,
        }
    }

    /// Whether 16-bit source samples sit behind the presentable buffer.
    pub fn is_deep(&self) -> bool {
        self.depth == PixelDepth::Mono16
    }

    /// Indexed images carry a palette in memory and in the container.
    pub fn has_palette(&self) -> bool {
        self.bit_count() == 8
    }

    /// Bytes per presentable row: 8-bit rows are unpadded, 24-bit rows are
    /// padded to a 4-byte boundary.
    pub fn row_stride(&self) -> usize {
        match self.bit_count() {
            8 => self.width as usize,
            _ => (self.width as usize * 3 + 3) & !3,
        }
    }

    /// Total presentable byte length.
    pub fn byte_len(&self) -> usize {
        self.row_stride() * self.height as usize
    }

    /// Number of samples (one per pixel).
    pub fn sample_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Size in bytes of the authoritative buffer a producer fills: the
    /// 16-bit source for deep images, the presentable bytes otherwise.
    pub fn source_len_bytes(&self) -> usize {
        if self.is_deep() {
            self.sample_count() * 2
        } else {
            self.byte_len()
        }
    }

    /// Byte offset of pixel `(x, y)` in the presentable buffer, with `y` in
    /// display (top-down) coordinates. Honors orientation and 24-bit row
    /// padding. `None` when out of bounds.
    pub fn pixel_offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        let row = match self.orientation {
            Orientation::TopDown => y as usize,
            Orientation::BottomUp => (self.height - 1 - y) as usize,
        };
        let base = row * self.row_stride();
        Some(match self.bit_count() {
            8 => base + x as usize,
            _ => base + x as usize * 3,
        })
    }

    /// Index of the sample for pixel `(x, y)` in a deep source buffer,
    /// display coordinates, same orientation rule as [`pixel_offset`].
    ///
    /// [`pixel_offset`]: ImageFormat::pixel_offset
    pub fn sample_index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        let row = match self.orientation {
            Orientation::TopDown => y as usize,
            Orientation::BottomUp => (self.height - 1 - y) as usize,
        };
        Some(row * self.width as usize + x as usize)
    }

    /// Geometry comparison that decides re-layout vs redraw: presentable bit
    /// count, dimensions and orientation. Depth changes that keep the
    /// presentable geometry (8-bit mono gaining a deep source) do not count.
    fn presentable_eq(&self, other: &ImageFormat) -> bool {
        self.bit_count() == other.bit_count()
            && self.width == other.width
            && self.height == other.height
            && self.orientation == other.orientation
    }
}

/// Value of one pixel, as read back from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelValue {
    /// Palette index of an 8-bit image.
    Indexed { index: u8 },
    /// Deep image: the tone-mapped display byte plus the authoritative
    /// 16-bit sample.
    Deep { mapped: u8, sample: u16 },
    /// Truecolor pixel in storage order.
    Rgb { b: u8, g: u8, r: u8 },
}

/// Presentable bytes: engine-owned or adopted from the caller.
enum Backing {
    Owned(Vec<u8>),
    External { ptr: *const u8, len: usize },
}

impl Backing {
    fn as_slice(&self) -> &[u8] {
        match self {
            Backing::Owned(v) => v,
            // SAFETY: the adoption contract requires the caller to keep the
            // memory valid for `len` bytes until it replaces the buffer, and
            // reads only happen under the pane lock.
            Backing::External { ptr, len } => unsafe { std::slice::from_raw_parts(*ptr, *len) },
        }
    }
}

/// Deep (16-bit) source samples: engine-owned or adopted.
enum DeepSource {
    Owned(Vec<u16>),
    External { ptr: *const u16, len: usize },
}

impl DeepSource {
    fn as_slice(&self) -> &[u16] {
        match self {
            DeepSource::Owned(v) => v,
            // SAFETY: same contract as Backing::External; the adopting call
            // additionally requires two-byte alignment.
            DeepSource::External { ptr, len } => unsafe { std::slice::from_raw_parts(*ptr, *len) },
        }
    }
}

/// Owner of the active pixel buffer, shadow source and palette.
pub struct BufferStore {
    format: Option<ImageFormat>,
    bits: Option<Backing>,
    deep: Option<DeepSource>,
    palette: Palette,
}

impl Default for BufferStore {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: the raw pointers inside `Backing`/`DeepSource` are only read, only
// under the pane's SyncGate lock, and the adoption contract makes the caller
// responsible for validity and for not writing concurrently with reads.
unsafe impl Send for BufferStore {}

impl BufferStore {
    pub fn new() -> Self {
        Self {
            format: None,
            bits: None,
            deep: None,
            palette: Palette::default(),
        }
    }

    /// Whether installing `format` would change the presentable geometry.
    pub fn geometry_changed(&self, format: &ImageFormat) -> bool {
        match &self.format {
            None => true,
            Some(current) => !current.presentable_eq(format),
        }
    }

    /// Allocates (or reuses) an engine-owned, zero-filled buffer for
    /// `format`. For deep formats a matching 16-bit source is allocated too.
    ///
    /// Returns whether the geometry changed. On allocation failure the
    /// operation aborts: with unchanged geometry the previous buffer is
    /// still valid, otherwise the buffer is left unset.
    pub fn allocate(&mut self, format: ImageFormat) -> Result<bool> {
        let changed = self.geometry_changed(&format);
        if changed {
            self.bits = None;
            self.deep = None;
            if format.has_palette() {
                self.palette = Palette::default();
            }
            debug!(
                "image geometry -> {}x{}x{} ({:?})",
                format.width,
                format.height,
                format.bit_count(),
                format.orientation
            );
        }
        if !format.is_deep() {
            self.deep = None;
        }
        self.format = Some(format);

        if !matches!(self.bits, Some(Backing::Owned(_))) {
            let bits = try_zeroed_u8(format.byte_len())?;
            self.bits = Some(Backing::Owned(bits));
        }
        if format.is_deep() && !matches!(self.deep, Some(DeepSource::Owned(_))) {
            let samples = try_zeroed_u16(format.sample_count())?;
            self.deep = Some(DeepSource::Owned(samples));
        }
        Ok(changed)
    }

    /// Adopts a caller-owned buffer without copying. The engine stores the
    /// pointer and never frees it.
    ///
    /// For deep formats `ptr` is the 16-bit source (`sample_count()`
    /// samples) and an engine-owned shadow is allocated; otherwise `ptr` is
    /// the presentable buffer (`byte_len()` bytes).
    ///
    /// Returns whether the geometry changed.
    ///
    /// # Safety
    /// The memory behind `ptr` must stay valid and unmodified-during-reads
    /// until the caller replaces or clears the buffer, must be at least the
    /// size stated above, and must be two-byte aligned for deep formats.
    pub unsafe fn adopt_external(&mut self, format: ImageFormat, ptr: *const u8) -> Result<bool> {
        let changed = self.geometry_changed(&format);
        if changed && format.has_palette() {
            self.palette = Palette::default();
        }
        if format.is_deep() {
            // Shadow first: a failed allocation leaves the previous image
            // fully intact.
            let shadow = try_zeroed_u8(format.byte_len())?;
            self.bits = Some(Backing::Owned(shadow));
            self.deep = Some(DeepSource::External {
                ptr: ptr as *const u16,
                len: format.sample_count(),
            });
        } else {
            self.bits = Some(Backing::External {
                ptr,
                len: format.byte_len(),
            });
            self.deep = None;
        }
        self.format = Some(format);
        Ok(changed)
    }

    /// Ensures geometry, then copies `src` byte-for-byte into the
    /// engine-owned buffer. The caller keeps ownership of `src`.
    ///
    /// For deep formats `src` holds native-endian 16-bit samples.
    ///
    /// # Panics
    /// Panics if `src.len()` differs from `format.source_len_bytes()`.
    pub fn copy_into(&mut self, format: ImageFormat, src: &[u8]) -> Result<bool> {
        assert_eq!(
            src.len(),
            format.source_len_bytes(),
            "source slice does not match the image geometry"
        );
        let changed = self.allocate(format)?;
        if format.is_deep() {
            match &mut self.deep {
                Some(DeepSource::Owned(dst)) => {
                    for (d, pair) in dst.iter_mut().zip(src.chunks_exact(2)) {
                        *d = u16::from_ne_bytes([pair[0], pair[1]]);
                    }
                }
                _ => unreachable!("allocate() guarantees an owned deep source"),
            }
        } else {
            match &mut self.bits {
                Some(Backing::Owned(dst)) => dst.copy_from_slice(src),
                _ => unreachable!("allocate() guarantees an owned buffer"),
            }
        }
        Ok(changed)
    }

    /// Typed variant of [`copy_into`] for deep sources.
    ///
    /// # Panics
    /// Panics if `format` is not deep or `src.len()` differs from
    /// `format.sample_count()`.
    ///
    /// [`copy_into`]: BufferStore::copy_into
    pub fn copy_into_samples(&mut self, format: ImageFormat, src: &[u16]) -> Result<bool> {
        assert!(format.is_deep(), "copy_into_samples needs a deep format");
        assert_eq!(
            src.len(),
            format.sample_count(),
            "sample slice does not match the image geometry"
        );
        let changed = self.allocate(format)?;
        match &mut self.deep {
            Some(DeepSource::Owned(dst)) => dst.copy_from_slice(src),
            _ => unreachable!("allocate() guarantees an owned deep source"),
        }
        Ok(changed)
    }

    /// Installs an image produced by the codec: engine-owned payload,
    /// optional palette, deep mode off. Returns whether geometry changed.
    pub(crate) fn install(
        &mut self,
        format: ImageFormat,
        palette: Option<Palette>,
        payload: Vec<u8>,
    ) -> bool {
        debug_assert_eq!(payload.len(), format.byte_len());
        let changed = self.geometry_changed(&format);
        self.bits = Some(Backing::Owned(payload));
        self.deep = None;
        if let Some(palette) = palette {
            self.palette = palette;
        }
        self.format = Some(format);
        changed
    }

    /// Drops the active image entirely.
    pub fn clear(&mut self) {
        self.format = None;
        self.bits = None;
        self.deep = None;
    }

    pub fn is_set(&self) -> bool {
        self.bits.is_some()
    }

    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    /// The presentable bytes the renderer blits (the shadow for deep
    /// images).
    pub fn display_bytes(&self) -> Option<&[u8]> {
        self.bits.as_ref().map(Backing::as_slice)
    }

    /// Mutable view of the engine-owned presentable bytes (the shadow for
    /// deep images). `None` for adopted (caller-owned) presentable buffers.
    pub fn shadow_mut(&mut self) -> Option<&mut [u8]> {
        match &mut self.bits {
            Some(Backing::Owned(v)) => Some(v.as_mut_slice()),
            _ => None,
        }
    }

    /// Authoritative 16-bit samples of a deep image.
    pub fn samples(&self) -> Option<&[u16]> {
        self.deep.as_ref().map(DeepSource::as_slice)
    }

    /// Size in bytes of the authoritative buffer (16-bit source for deep
    /// images), zero when unset.
    pub fn buffer_size_bytes(&self) -> usize {
        match (&self.format, &self.bits) {
            (Some(format), Some(_)) => format.source_len_bytes(),
            _ => 0,
        }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Replaces the palette. Ignored (with a log note) for images that do
    /// not carry one.
    pub fn set_palette(&mut self, palette: Palette) {
        match self.format {
            Some(format) if format.has_palette() => self.palette = palette,
            Some(_) => warn!("palette ignored for a truecolor image"),
            None => self.palette = palette,
        }
    }

    /// Recomputes the shadow buffer from the deep source through the tone
    /// mapper. No-op for images without a deep source.
    pub(crate) fn remap_shadow(&mut self, map: Option<&crate::tonemap::ToneMap>) {
        if let (Some(deep), Some(Backing::Owned(bits))) = (&self.deep, &mut self.bits) {
            crate::tonemap::remap(deep.as_slice(), bits.as_mut_slice(), map);
        }
    }

    /// Reads back the value of one pixel in display coordinates.
    pub fn pixel_value(&self, x: i32, y: i32) -> Option<PixelValue> {
        let format = self.format?;
        let bytes = self.display_bytes()?;
        let offset = format.pixel_offset(x, y)?;
        Some(match format.depth {
            PixelDepth::Indexed8 => PixelValue::Indexed {
                index: bytes[offset],
            },
            PixelDepth::Mono16 => {
                let index = format.sample_index(x, y)?;
                PixelValue::Deep {
                    mapped: bytes[offset],
                    sample: self.samples().map_or(0, |s| s[index]),
                }
            }
            PixelDepth::Rgb24 => PixelValue::Rgb {
                b: bytes[offset],
                g: bytes[offset + 1],
                r: bytes[offset + 2],
            },
        })
    }
}

pub(crate) fn try_zeroed_u8(len: usize) -> Result<Vec<u8>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| Error::allocation(len))?;
    v.resize(len, 0);
    Ok(v)
}

fn try_zeroed_u16(len: usize) -> Result<Vec<u16>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| Error::allocation(len * 2))?;
    v.resize(len, 0);
    Ok(v)
}
