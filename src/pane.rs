// src/pane.rs
//! The engine façade: one image pane.
//!
//! ## Threading Model
//! - **Producer**: any thread holding a [`ProducerHandle`] clone may feed
//!   buffers and tone-map parameters.
//! - **Renderer**: exactly one long-lived thread owns the [`ImagePane`]
//!   itself: the viewport, the overlay painter and load/save live there.
//!
//! Every buffer/geometry mutation and every renderer read goes through one
//! mutex ([`SyncGate`]); buffer pointer and geometry are one atomic unit.
//! The viewport is only ever touched on the renderer thread and needs no
//! lock. The one-shot [`ReadyLatch`] lets the instantiating thread block
//! until the renderer has its surface up; it plays no role afterwards.
//!
//! Mutators report a [`RedrawHint`] so the embedding can tell a full
//! re-layout (`RESIZE`) from a redraw-only update (`REPAINT`).
//!
//! [`SyncGate`]: crate::sync::SyncGate
//! [`ReadyLatch`]: crate::sync::ReadyLatch

use std::path::Path;
use std::sync::{Arc, MutexGuard};
use std::time::Duration;

use log::{debug, warn};

use crate::bitmap::{self, InfoHeader};
use crate::buffer::{BufferStore, ImageFormat, Orientation, PixelDepth, PixelValue};
use crate::config::PaneConfig;
use crate::error::{Error, Result};
use crate::geometry::Size;
use crate::overlay::{OverlayContext, OverlayPainter};
use crate::palette::{Colormap, Palette};
use crate::stats::FrameStats;
use crate::sync::{ReadyLatch, SyncGate};
use crate::tonemap::ToneMap;
use crate::viewport::{RedrawHint, Viewport};

/// State guarded by the pane's single lock.
struct SharedImage {
    store: BufferStore,
    tone_map: Option<ToneMap>,
    stats: FrameStats,
    colormap: Colormap,
    selected_row: Option<i32>,
}

impl SharedImage {
    /// Applies the configured colormap after a geometry change created or
    /// resized a palettized buffer, then refreshes the shadow.
    fn finish_update(&mut self, geometry_changed: bool, count_frame: bool) -> RedrawHint {
        if geometry_changed {
            if let Some(format) = self.store.format() {
                if format.has_palette() {
                    self.store.set_palette(Palette::preset(self.colormap));
                }
            }
        }
        self.store.remap_shadow(self.tone_map.as_ref());
        if count_frame {
            self.stats.record();
        }
        let mut hint = RedrawHint::REPAINT;
        if geometry_changed {
            hint |= RedrawHint::RESIZE;
        }
        hint
    }
}

struct Shared {
    gate: SyncGate<SharedImage>,
    ready: ReadyLatch,
}

/// An embeddable image-viewing surface.
///
/// Owned by the renderer thread; producers feed it through
/// [`ProducerHandle`] clones obtained from [`ImagePane::producer`].
pub struct ImagePane {
    shared: Arc<Shared>,
    viewport: Viewport,
    config: PaneConfig,
    overlay: Option<Box<dyn OverlayPainter>>,
}

impl ImagePane {
    pub fn new(config: PaneConfig) -> Self {
        let shared = Arc::new(Shared {
            gate: SyncGate::new(SharedImage {
                store: BufferStore::new(),
                tone_map: None,
                stats: FrameStats::new(),
                colormap: config.colormap,
                selected_row: None,
            }),
            ready: ReadyLatch::new(),
        });
        Self {
            shared,
            viewport: Viewport::new(config.zoom),
            config,
            overlay: None,
        }
    }

    /// Installs the overlay painter the renderer glue calls after blitting.
    pub fn set_overlay_painter(&mut self, painter: Box<dyn OverlayPainter>) {
        self.overlay = Some(painter);
    }

    pub fn config(&self) -> &PaneConfig {
        &self.config
    }

    /// A producer-side handle; clone freely across threads.
    pub fn producer(&self) -> ProducerHandle {
        ProducerHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Signals the one-shot latch: the renderer surface is up.
    pub fn mark_surface_ready(&self) {
        self.shared.ready.signal();
    }

    /// Renderer-side viewport state (single-threaded by contract).
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    /// Acquires the lock for a batch of renderer reads. Buffer pointer and
    /// geometry stay consistent for the lifetime of the guard.
    pub fn lock(&self) -> FrameGuard<'_> {
        FrameGuard {
            guard: self.shared.gate.lock(),
        }
    }

    /// Re-reads the image geometry into the viewport. The renderer glue
    /// calls this after a producer update reported `RESIZE`.
    pub fn sync_viewport(&mut self) -> RedrawHint {
        let size = {
            let img = self.shared.gate.lock();
            img.store
                .format()
                .map(|format| Size::new(format.width, format.height))
        };
        match size {
            Some(size) => self.viewport.set_image_size(size),
            None => RedrawHint::empty(),
        }
    }

    /// Remembers the image row the info tool last selected; feeds
    /// [`row_profile`](ImagePane::row_profile).
    pub fn select_row(&self, y: i32) {
        self.shared.gate.lock().selected_row = Some(y);
    }

    /// One image row normalized to `0.0..=1.0` for external plotting:
    /// the selected row when valid, the middle row otherwise. Mono images
    /// only; deep images read the authoritative 16-bit samples.
    pub fn row_profile(&self) -> Option<Vec<f64>> {
        let img = self.shared.gate.lock();
        let format = img.store.format()?;
        if format.bit_count() != 8 {
            return None;
        }
        let row = img
            .selected_row
            .filter(|&r| r >= 0 && r < format.height)
            .unwrap_or(format.height / 2);
        let mut profile = Vec::with_capacity(format.width as usize);
        if format.is_deep() {
            let samples = img.store.samples()?;
            for x in 0..format.width {
                let index = format.sample_index(x, row)?;
                profile.push(samples[index] as f64 / 65535.0);
            }
        } else {
            let bytes = img.store.display_bytes()?;
            for x in 0..format.width {
                let offset = format.pixel_offset(x, row)?;
                profile.push(bytes[offset] as f64 / 255.0);
            }
        }
        Some(profile)
    }

    /// Invokes the overlay painter, if any, with the current state.
    pub fn paint_overlay(&mut self) -> anyhow::Result<()> {
        let painter = match self.overlay.as_mut() {
            Some(painter) => painter,
            None => return Ok(()),
        };
        let img = self.shared.gate.lock();
        let ctx = OverlayContext {
            image_size: self.viewport.image_size(),
            display_rect: self.viewport.display_rect(),
            scale: self.viewport.scale(),
            offset: self.viewport.offset(),
            display_bytes: img.store.display_bytes(),
        };
        painter.draw_overlay(&ctx)
    }

    /// Loads a container file, replacing the active image. All-or-nothing:
    /// any read failure leaves the previous image untouched. Holds the pane
    /// lock for the whole read.
    pub fn load_bitmap(&mut self, path: &Path) -> Result<RedrawHint> {
        let changed = {
            let mut img = self.shared.gate.lock();
            let staged = bitmap::load(path)?;
            let format = staged.header.to_format()?;
            let mut payload = staged.payload;
            if payload.len() < format.byte_len() {
                return Err(bitmap::invalid_data("payload shorter than the geometry"));
            }
            payload.truncate(format.byte_len());
            img.store.install(format, staged.palette, payload)
        };
        debug!("bitmap loaded from {}", path.display());
        let mut hint = self.sync_viewport() | RedrawHint::REPAINT;
        if changed {
            hint |= RedrawHint::RESIZE;
        }
        Ok(hint)
    }

    /// Saves the presentable image as a container file, normalized to
    /// bottom-up on disk. The live buffer keeps its orientation. Holds the
    /// pane lock for the whole write.
    pub fn save_bitmap(&self, path: &Path) -> Result<()> {
        let img = self.shared.gate.lock();
        let format = img.store.format().ok_or(Error::NoImage)?;
        let bytes = img.store.display_bytes().ok_or(Error::NoImage)?;
        let header = InfoHeader::from_format(&format);
        let palette = if format.has_palette() {
            Some(img.store.palette())
        } else {
            None
        };
        bitmap::save(path, &header, palette, bytes)?;
        debug!("bitmap saved to {}", path.display());
        Ok(())
    }

    /// The contiguous metadata+palette+payload block, normalized to
    /// bottom-up, for external clipboard glue. The live buffer is not
    /// touched.
    pub fn create_dib(&self) -> Result<Vec<u8>> {
        let img = self.shared.gate.lock();
        let format = img.store.format().ok_or(Error::NoImage)?;
        let bytes = img.store.display_bytes().ok_or(Error::NoImage)?;
        let header = InfoHeader::from_format(&format);
        let palette = if format.has_palette() {
            Some(img.store.palette())
        } else {
            None
        };
        bitmap::encode_dib(&header, palette, bytes, true)
    }
}

/// Producer-facing handle; all methods lock the pane's gate with a
/// blocking, timeout-free acquire.
#[derive(Clone)]
pub struct ProducerHandle {
    shared: Arc<Shared>,
}

impl ProducerHandle {
    /// Allocates (or reuses) an engine-owned, zero-filled buffer.
    pub fn allocate_buffer(
        &self,
        width: i32,
        height: i32,
        depth: PixelDepth,
        orientation: Orientation,
    ) -> Result<RedrawHint> {
        let format = ImageFormat::new(width, height, depth, orientation);
        let mut img = self.shared.gate.lock();
        let changed = img.store.allocate(format)?;
        Ok(img.finish_update(changed, false))
    }

    /// Adopts a caller-owned buffer without copying; the engine never frees
    /// it.
    ///
    /// # Safety
    /// See [`BufferStore::adopt_external`]: `ptr` must stay valid (and not
    /// be written concurrently with engine reads) until replaced, cover the
    /// full buffer size for the geometry, and be two-byte aligned for
    /// [`PixelDepth::Mono16`].
    pub unsafe fn adopt_buffer_ptr(
        &self,
        width: i32,
        height: i32,
        ptr: *const u8,
        depth: PixelDepth,
        orientation: Orientation,
    ) -> Result<RedrawHint> {
        let format = ImageFormat::new(width, height, depth, orientation);
        let mut img = self.shared.gate.lock();
        let changed = img.store.adopt_external(format, ptr)?;
        Ok(img.finish_update(changed, true))
    }

    /// Ensures geometry, then copies `src` into the engine-owned buffer.
    /// The caller keeps ownership of `src`.
    ///
    /// # Panics
    /// Panics if `src.len()` does not match the buffer size implied by the
    /// geometry (`source_len_bytes`).
    pub fn copy_into_buffer(
        &self,
        width: i32,
        height: i32,
        src: &[u8],
        depth: PixelDepth,
        orientation: Orientation,
    ) -> Result<RedrawHint> {
        let format = ImageFormat::new(width, height, depth, orientation);
        let mut img = self.shared.gate.lock();
        let changed = img.store.copy_into(format, src)?;
        Ok(img.finish_update(changed, true))
    }

    /// Typed deep variant of [`copy_into_buffer`](ProducerHandle::copy_into_buffer).
    ///
    /// # Panics
    /// Panics if `src.len() != width * height`.
    pub fn copy_into_samples(
        &self,
        width: i32,
        height: i32,
        src: &[u16],
        orientation: Orientation,
    ) -> Result<RedrawHint> {
        let format = ImageFormat::new(width, height, PixelDepth::Mono16, orientation);
        let mut img = self.shared.gate.lock();
        let changed = img.store.copy_into_samples(format, src)?;
        Ok(img.finish_update(changed, true))
    }

    /// Enables windowed tone mapping and recomputes the shadow buffer.
    /// Fails with [`Error::NoImage`] when the active image has no 16-bit
    /// source.
    pub fn set_tone_map(
        &self,
        bottom: u16,
        top: u16,
        reverse: bool,
        direct_limit: u16,
    ) -> Result<RedrawHint> {
        let mut img = self.shared.gate.lock();
        let img = &mut *img;
        match img.store.format() {
            Some(format) if format.is_deep() => {}
            _ => return Err(Error::NoImage),
        }
        img.tone_map = Some(ToneMap::new(bottom, top, reverse, direct_limit));
        img.store.remap_shadow(img.tone_map.as_ref());
        Ok(RedrawHint::REPAINT)
    }

    /// Disables windowed tone mapping; the shadow falls back to linear
    /// truncation.
    pub fn clear_tone_map(&self) -> RedrawHint {
        let mut img = self.shared.gate.lock();
        img.tone_map = None;
        img.store.remap_shadow(None);
        RedrawHint::REPAINT
    }

    /// Installs a palette preset. Fails with [`Error::NoImage`] when no
    /// buffer is set; ignored (with a log note) for truecolor images.
    pub fn set_colormap(&self, map: Colormap) -> Result<RedrawHint> {
        let mut img = self.shared.gate.lock();
        let format = img.store.format().ok_or(Error::NoImage)?;
        img.colormap = map;
        if format.has_palette() {
            img.store.set_palette(Palette::preset(map));
        } else {
            warn!("colormap ignored for a truecolor image");
        }
        Ok(RedrawHint::REPAINT)
    }

    /// Tells the engine the producer wrote into an adopted buffer: refresh
    /// the shadow (for deep images), count the frame, request a repaint.
    pub fn refresh(&self) -> Result<RedrawHint> {
        let mut img = self.shared.gate.lock();
        let img = &mut *img;
        if !img.store.is_set() {
            return Err(Error::NoImage);
        }
        img.store.remap_shadow(img.tone_map.as_ref());
        img.stats.record();
        Ok(RedrawHint::REPAINT)
    }

    /// Blocks until the renderer marks its surface ready. `None` waits
    /// forever; a timeout maps to [`Error::Resource`]. Startup handshake
    /// only.
    pub fn wait_surface_ready(&self, timeout: Option<Duration>) -> Result<()> {
        self.shared.ready.wait(timeout)
    }
}

/// One batch of lock-guarded renderer reads.
///
/// Holding the guard keeps producers out; drop it as soon as the blit is
/// done.
pub struct FrameGuard<'a> {
    guard: MutexGuard<'a, SharedImage>,
}

impl FrameGuard<'_> {
    pub fn is_set(&self) -> bool {
        self.guard.store.is_set()
    }

    pub fn format(&self) -> Option<ImageFormat> {
        self.guard.store.format()
    }

    /// Image width, 0 when no image is set.
    pub fn width(&self) -> i32 {
        self.guard.store.format().map_or(0, |f| f.width)
    }

    /// Image height, 0 when no image is set.
    pub fn height(&self) -> i32 {
        self.guard.store.format().map_or(0, |f| f.height)
    }

    /// Presentable bit count, 0 when no image is set.
    pub fn bit_count(&self) -> u16 {
        self.guard.store.format().map_or(0, |f| f.bit_count())
    }

    pub fn orientation(&self) -> Option<Orientation> {
        self.guard.store.format().map(|f| f.orientation)
    }

    /// Presentable bytes to blit (the shadow for deep images).
    pub fn display_bytes(&self) -> Option<&[u8]> {
        self.guard.store.display_bytes()
    }

    /// Authoritative 16-bit samples of a deep image.
    pub fn samples(&self) -> Option<&[u16]> {
        self.guard.store.samples()
    }

    /// Size in bytes of the authoritative buffer.
    pub fn buffer_size_bytes(&self) -> usize {
        self.guard.store.buffer_size_bytes()
    }

    pub fn palette(&self) -> &Palette {
        self.guard.store.palette()
    }

    pub fn tone_map(&self) -> Option<ToneMap> {
        self.guard.tone_map
    }

    /// Per-pixel readout in display coordinates.
    pub fn pixel_value(&self, x: i32, y: i32) -> Option<PixelValue> {
        self.guard.store.pixel_value(x, y)
    }

    /// Instantaneous frame rate from the last producer update.
    pub fn fps(&self) -> f64 {
        self.guard.stats.current()
    }

    /// Sliding-average frame rate.
    pub fn fps_average(&self) -> f64 {
        self.guard.stats.average()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use test_log::test; // logging inside tests

    fn pane() -> ImagePane {
        ImagePane::new(PaneConfig::default())
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("image-pane-{}-{}.bmp", name, std::process::id()))
    }

    #[test]
    fn allocate_then_query_sizes() {
        let pane = pane();
        let producer = pane.producer();
        let hint = producer
            .allocate_buffer(4, 4, PixelDepth::Indexed8, Orientation::TopDown)
            .unwrap();
        assert!(hint.contains(RedrawHint::RESIZE));

        let frame = pane.lock();
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 4);
        assert_eq!(frame.bit_count(), 8);
        assert_eq!(frame.buffer_size_bytes(), 16);
        assert!(frame.display_bytes().unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn copy_into_scenario() {
        let pane = pane();
        let producer = pane.producer();
        producer
            .allocate_buffer(4, 4, PixelDepth::Indexed8, Orientation::TopDown)
            .unwrap();
        let src = [0xFFu8; 16];
        let hint = producer
            .copy_into_buffer(4, 4, &src, PixelDepth::Indexed8, Orientation::TopDown)
            .unwrap();
        assert!(!hint.contains(RedrawHint::RESIZE));
        assert_eq!(pane.lock().display_bytes().unwrap(), &src);
    }

    #[test]
    fn deep_midpoint_maps_near_128() {
        let pane = pane();
        let producer = pane.producer();
        let samples = vec![32768u16; 16];
        producer
            .copy_into_samples(4, 4, &samples, Orientation::TopDown)
            .unwrap();
        producer.set_tone_map(0, 65535, false, 0).unwrap();
        let frame = pane.lock();
        let mapped = frame.display_bytes().unwrap()[0] as i32;
        assert!((mapped - 128).abs() <= 1, "got {}", mapped);
        // The 16-bit source stays authoritative.
        assert_eq!(
            frame.pixel_value(0, 0),
            Some(PixelValue::Deep {
                mapped: mapped as u8,
                sample: 32768
            })
        );
    }

    #[test]
    fn tone_map_needs_a_deep_image() {
        let pane = pane();
        let producer = pane.producer();
        assert!(matches!(
            producer.set_tone_map(0, 100, false, 0),
            Err(Error::NoImage)
        ));
        producer
            .allocate_buffer(2, 2, PixelDepth::Indexed8, Orientation::TopDown)
            .unwrap();
        assert!(matches!(
            producer.set_tone_map(0, 100, false, 0),
            Err(Error::NoImage)
        ));
    }

    #[test]
    fn clear_tone_map_returns_to_truncation() {
        let pane = pane();
        let producer = pane.producer();
        let samples = vec![0x1234u16; 4];
        producer
            .copy_into_samples(2, 2, &samples, Orientation::TopDown)
            .unwrap();
        producer.set_tone_map(0, 0x2000, false, 0).unwrap();
        producer.clear_tone_map();
        assert_eq!(pane.lock().display_bytes().unwrap()[0], 0x12);
    }

    #[test]
    fn adopted_buffer_feeds_refresh() {
        let pane = pane();
        let producer = pane.producer();
        let mut backing = vec![0u8; 16];
        backing[5] = 9;
        unsafe {
            producer
                .adopt_buffer_ptr(
                    4,
                    4,
                    backing.as_ptr(),
                    PixelDepth::Indexed8,
                    Orientation::TopDown,
                )
                .unwrap();
        }
        assert_eq!(pane.lock().display_bytes().unwrap()[5], 9);
        // Producer writes into its own memory, then refreshes.
        backing[5] = 10;
        producer.refresh().unwrap();
        assert_eq!(pane.lock().display_bytes().unwrap()[5], 10);
    }

    #[test]
    fn refresh_without_image_is_an_error() {
        let pane = pane();
        assert!(matches!(pane.producer().refresh(), Err(Error::NoImage)));
    }

    #[test]
    fn geometry_change_applies_configured_colormap() {
        let mut config = PaneConfig::default();
        config.colormap = Colormap::RainbowHeat;
        let pane = ImagePane::new(config);
        pane.producer()
            .allocate_buffer(4, 4, PixelDepth::Indexed8, Orientation::TopDown)
            .unwrap();
        let frame = pane.lock();
        assert_eq!(
            frame.palette().entry(64),
            crate::palette::Rgb::new(0, 255, 255)
        );
    }

    #[test]
    fn save_load_round_trip_preserves_pixels_any_orientation() {
        for orientation in [Orientation::TopDown, Orientation::BottomUp] {
            let path = temp_path(match orientation {
                Orientation::TopDown => "pane-td",
                Orientation::BottomUp => "pane-bu",
            });
            let pane = pane();
            let producer = pane.producer();
            let src: Vec<u8> = (0..16).collect();
            producer
                .copy_into_buffer(4, 4, &src, PixelDepth::Indexed8, orientation)
                .unwrap();
            pane.save_bitmap(&path).unwrap();

            let mut restored = ImagePane::new(PaneConfig::default());
            restored.load_bitmap(&path).unwrap();
            std::fs::remove_file(&path).ok();

            let frame = restored.lock();
            assert_eq!(frame.width(), 4);
            // Saved files are bottom-up; compare pixels in display space.
            let original = pane.lock();
            for y in 0..4 {
                for x in 0..4 {
                    assert_eq!(
                        frame.pixel_value(x, y),
                        original.pixel_value(x, y),
                        "pixel ({}, {}) {:?}",
                        x,
                        y,
                        orientation
                    );
                }
            }
        }
    }

    #[test]
    fn failed_load_keeps_previous_image() {
        let path = temp_path("pane-truncated");
        let mut pane = pane();
        let producer = pane.producer();
        let src = [7u8; 16];
        producer
            .copy_into_buffer(4, 4, &src, PixelDepth::Indexed8, Orientation::TopDown)
            .unwrap();
        pane.save_bitmap(&path).unwrap();

        // Truncate the file, then try to load it over a different image.
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();
        producer
            .copy_into_buffer(2, 2, &[1, 2, 3, 4], PixelDepth::Indexed8, Orientation::TopDown)
            .unwrap();
        let err = pane.load_bitmap(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, Error::Io(_)));

        let frame = pane.lock();
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.display_bytes().unwrap(), &[1, 2, 3, 4]);
    }

    #[test]
    fn save_without_image_is_no_image() {
        let pane = pane();
        let err = pane.save_bitmap(&temp_path("pane-none")).unwrap_err();
        assert!(matches!(err, Error::NoImage));
    }

    #[test]
    fn row_profile_defaults_to_middle_row() {
        let pane = pane();
        let producer = pane.producer();
        let mut src = [0u8; 16];
        // Row 2 (middle of height 4) all at 51 -> 0.2.
        for x in 0..4 {
            src[8 + x] = 51;
        }
        producer
            .copy_into_buffer(4, 4, &src, PixelDepth::Indexed8, Orientation::TopDown)
            .unwrap();
        let profile = pane.row_profile().unwrap();
        assert_eq!(profile.len(), 4);
        assert!(profile.iter().all(|&v| (v - 0.2).abs() < 1e-9));
    }

    #[test]
    fn row_profile_none_for_truecolor() {
        let pane = pane();
        pane.producer()
            .allocate_buffer(4, 4, PixelDepth::Rgb24, Orientation::TopDown)
            .unwrap();
        assert!(pane.row_profile().is_none());
    }

    #[test]
    fn producer_and_renderer_race_safely() {
        let pane = pane();
        let producer = pane.producer();
        producer
            .allocate_buffer(8, 8, PixelDepth::Indexed8, Orientation::TopDown)
            .unwrap();

        let writer = std::thread::spawn(move || {
            for i in 0..200u8 {
                let src = [i; 64];
                producer
                    .copy_into_buffer(8, 8, &src, PixelDepth::Indexed8, Orientation::TopDown)
                    .unwrap();
            }
        });
        for _ in 0..200 {
            let frame = pane.lock();
            if let Some(bytes) = frame.display_bytes() {
                // Under the lock every byte is from the same producer write.
                let first = bytes[0];
                assert!(bytes.iter().all(|&b| b == first));
            }
        }
        writer.join().unwrap();
    }

    #[test]
    fn overlay_painter_sees_current_state() {
        struct Recorder {
            called: std::sync::mpsc::Sender<(f64, Option<usize>)>,
        }
        impl OverlayPainter for Recorder {
            fn draw_overlay(&mut self, ctx: &OverlayContext<'_>) -> anyhow::Result<()> {
                self.called
                    .send((ctx.scale, ctx.display_bytes.map(|b| b.len())))
                    .unwrap();
                Ok(())
            }
        }

        let (tx, rx) = std::sync::mpsc::channel();
        let mut pane = pane();
        pane.set_overlay_painter(Box::new(Recorder { called: tx }));
        pane.producer()
            .allocate_buffer(4, 4, PixelDepth::Indexed8, Orientation::TopDown)
            .unwrap();
        pane.paint_overlay().unwrap();
        assert_eq!(rx.try_recv().unwrap(), (100.0, Some(16)));
    }

    #[test]
    fn startup_handshake() {
        let pane = pane();
        let producer = pane.producer();
        let waiter = std::thread::spawn(move || {
            producer.wait_surface_ready(Some(Duration::from_secs(5)))
        });
        pane.mark_surface_ready();
        assert!(waiter.join().unwrap().is_ok());
    }
}
