// src/viewport.rs
//! Zoom/pan viewport state and coordinate transforms.
//!
//! The viewport maps between screen coordinates (client area handed to us
//! by the window glue) and image coordinates (pixels in the buffer). It is
//! mutated and read exclusively on the renderer thread in response to
//! input/resize events, so it carries no lock of its own.
//!
//! Scale is a percentage with a floor of 1%. Zoom steps move through
//! log-scale space (each unit step is a constant ~2.3% multiplicative
//! factor), so perceived zoom increments stay uniform across magnification
//! levels, with a snap to exactly 100% when within one percentage point.

use bitflags::bitflags;
use log::trace;

use crate::config::ZoomConfig;
use crate::geometry::{Point, Rect, Size};

/// Scale floor, percent.
const MIN_SCALE: f64 = 1.0;
/// Snap distance around 100%, in absolute percentage points.
const SCALE_SNAP: f64 = 1.0;
/// Scale at which the renderer should overlay numeric sample values
/// (8-bit buffers only).
const READOUT_MIN_SCALE: f64 = 3000.0;

bitflags! {
    /// What the caller must repaint after a viewport or buffer operation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RedrawHint: u8 {
        /// Image content must be redrawn.
        const REPAINT = 1 << 0;
        /// Geometry changed; the embedding should re-layout first.
        const RESIZE = 1 << 1;
        /// Background must be erased before repainting (exposed borders).
        const ERASE = 1 << 2;
    }
}

/// How the renderer should move pixels to the screen at the current scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPath {
    /// Unscaled direct copy (exactly 100%).
    DirectCopy,
    /// Resampled stretch blit.
    Stretch,
    /// Resampled stretch plus per-cell numeric sample overlay.
    StretchWithReadout,
}

/// Wheel-zoom speed selected by the glue's modifier keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelSpeed {
    Normal,
    /// Accelerated: four steps per notch.
    Fast,
    /// Fine: half a step per notch.
    Fine,
}

/// Zoom scale, pan offset and display-rect state for one pane.
#[derive(Debug)]
pub struct Viewport {
    scale: f64,
    prev_scale: f64,
    offset: Point,
    pan_origin: Point,
    client_rect: Rect,
    disp_rect: Rect,
    image_size: Size,
    zoom: ZoomConfig,
}

impl Viewport {
    pub fn new(zoom: ZoomConfig) -> Self {
        Self {
            scale: 100.0,
            prev_scale: 100.0,
            offset: Point::default(),
            pan_origin: Point::default(),
            client_rect: Rect::default(),
            disp_rect: Rect::default(),
            image_size: Size::default(),
            zoom,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    pub fn image_size(&self) -> Size {
        self.image_size
    }

    /// The sub-rectangle of the client area the image is blitted into
    /// (centered when the scaled image is smaller than the client area).
    pub fn display_rect(&self) -> Rect {
        self.disp_rect
    }

    /// Scaled image size as shown on screen.
    pub fn image_disp_size(&self) -> Size {
        let k = self.scale / 100.0;
        Size::new(
            (self.image_size.width as f64 * k) as i32,
            (self.image_size.height as f64 * k) as i32,
        )
    }

    /// Whether the scaled image overflows the display rect on either axis.
    pub fn is_scrollable(&self) -> bool {
        let shown = self.image_disp_size();
        shown.width > self.disp_rect.width() || shown.height > self.disp_rect.height()
    }

    /// Installs a new image size (buffer geometry changed).
    pub fn set_image_size(&mut self, size: Size) -> RedrawHint {
        if size == self.image_size {
            return RedrawHint::empty();
        }
        self.image_size = size;
        self.update_display_rect();
        let mut hint = RedrawHint::RESIZE | RedrawHint::REPAINT;
        if self.clamp_offset() {
            hint |= RedrawHint::ERASE;
        }
        hint
    }

    /// Installs the client area the glue renders into.
    pub fn set_client_rect(&mut self, rect: Rect) -> RedrawHint {
        self.client_rect = rect;
        let centered = self.update_display_rect();
        let mut hint = RedrawHint::REPAINT;
        if self.clamp_offset() || centered {
            hint |= RedrawHint::ERASE;
        }
        hint
    }

    /// Sets the zoom scale, clamped to the 1% floor; re-clamps the offset
    /// and recomputes the display rect.
    pub fn set_scale(&mut self, scale: f64) -> RedrawHint {
        let scale = if scale <= MIN_SCALE { MIN_SCALE } else { scale };
        trace!("viewport scale {} -> {}", self.scale, scale);
        self.scale = scale;
        let adjusted = self.clamp_offset();
        self.update_display_rect();
        let mut hint = RedrawHint::REPAINT;
        if adjusted {
            hint |= RedrawHint::ERASE;
        }
        hint
    }

    /// Percent scale at which the whole image fits the client area: uses the
    /// height-based scale when the image is relatively taller than the
    /// client area, the width-based scale otherwise.
    pub fn fit_scale(&self) -> f64 {
        if self.image_size.is_empty() || self.client_rect.width() <= 0 {
            return self.scale;
        }
        let image_ratio = self.image_size.height as f64 / self.image_size.width as f64;
        let width = self.client_rect.width() as f64;
        let height = self.client_rect.height() as f64;
        let disp_ratio = height / width;
        let scale = if image_ratio > disp_ratio {
            height / self.image_size.height as f64
        } else {
            width / self.image_size.width as f64
        };
        scale * 100.0
    }

    /// Sets the scale so the whole image fits the client area.
    pub fn fit_to_window(&mut self) -> RedrawHint {
        self.set_scale(self.fit_scale())
    }

    /// The scale `steps` log-domain units away from the current one:
    /// `10^(log10(scale) + steps/100)`, snapped to 100 within one point,
    /// floored at 1.
    pub fn step_scale(&self, steps: i32) -> f64 {
        let val = self.scale.log10() + steps as f64 / 100.0;
        let mut scale = 10f64.powf(val);
        if (scale - 100.0).abs() <= SCALE_SNAP {
            scale = 100.0;
        }
        if scale <= MIN_SCALE {
            scale = MIN_SCALE;
        }
        scale
    }

    pub fn zoom_in(&mut self) -> RedrawHint {
        self.set_scale(self.step_scale(self.zoom.step))
    }

    pub fn zoom_out(&mut self) -> RedrawHint {
        self.set_scale(self.step_scale(-self.zoom.step))
    }

    /// Clamps the offset to `[0, image - disp/scale]` per axis. Returns
    /// whether any coordinate was adjusted, in which case exposed background
    /// needs an erase-repaint rather than a partial one.
    pub fn clamp_offset(&mut self) -> bool {
        let scale = self.scale / 100.0;
        let prev = self.offset;

        let limit = (self.image_size.width as f64 - self.disp_rect.width() as f64 / scale) as i32;
        if self.offset.x > limit {
            self.offset.x = limit;
        }
        if self.offset.x < 0 {
            self.offset.x = 0;
        }
        let limit = (self.image_size.height as f64 - self.disp_rect.height() as f64 / scale) as i32;
        if self.offset.y > limit {
            self.offset.y = limit;
        }
        if self.offset.y < 0 {
            self.offset.y = 0;
        }

        prev != self.offset
    }

    /// Maps a screen point to image pixel coordinates (truncated toward
    /// zero). The result may lie outside the image; callers that need a
    /// valid pixel should bounds-check against the image size.
    pub fn screen_to_image(&self, p: Point) -> Point {
        let scale = self.scale / 100.0;
        Point::new(
            ((p.x - self.disp_rect.left) as f64 / scale) as i32 + self.offset.x,
            ((p.y - self.disp_rect.top) as f64 / scale) as i32 + self.offset.y,
        )
    }

    /// Zooms to `new_scale` keeping the image point under `anchor` (a
    /// screen position) fixed on screen.
    pub fn zoom_at(&mut self, anchor: Point, new_scale: f64) -> RedrawHint {
        let image_pt = self.screen_to_image(anchor);
        let local = Point::new(anchor.x - self.disp_rect.left, anchor.y - self.disp_rect.top);
        let k = new_scale / 100.0;
        self.offset.x = image_pt.x - (local.x as f64 / k) as i32;
        self.offset.y = image_pt.y - (local.y as f64 / k) as i32;
        self.set_scale(new_scale)
    }

    /// Toggle zoom (middle-click behavior): jump to `target` anchored at
    /// the cursor, or back to the previous scale when already there.
    pub fn toggle_scale(&mut self, anchor: Point, target: f64) -> RedrawHint {
        let target = if self.scale == target {
            self.prev_scale
        } else {
            target
        };
        self.prev_scale = self.scale;
        self.zoom_at(anchor, target)
    }

    /// Wheel zoom anchored at the cursor. `delta` is in native wheel units;
    /// one step per `wheel_step` units, scaled by `speed`. Ignored when the
    /// cursor is outside the display rect.
    pub fn wheel_zoom(&mut self, anchor: Point, delta: i32, speed: WheelSpeed) -> RedrawHint {
        if !self.disp_rect.contains(anchor) {
            return RedrawHint::empty();
        }
        let steps = delta / self.zoom.wheel_step;
        let steps = match speed {
            WheelSpeed::Normal => steps,
            WheelSpeed::Fast => steps * 4,
            WheelSpeed::Fine => steps / 2,
        };
        let scale = self.step_scale(steps);
        self.zoom_at(anchor, scale)
    }

    /// Starts a pan drag at the current offset.
    pub fn begin_pan(&mut self) {
        self.pan_origin = self.offset;
    }

    /// Continues a pan drag: the offset follows the cursor from the press
    /// position, clamped to the image.
    pub fn pan_to(&mut self, press: Point, current: Point) -> RedrawHint {
        let scale = self.scale / 100.0;
        self.offset.x = self.pan_origin.x - ((current.x - press.x) as f64 / scale) as i32;
        self.offset.y = self.pan_origin.y - ((current.y - press.y) as f64 / scale) as i32;
        self.clamp_offset();
        RedrawHint::REPAINT
    }

    /// How the renderer should blit at the current scale.
    pub fn render_path(&self, bit_count: u16) -> RenderPath {
        if self.scale == 100.0 {
            RenderPath::DirectCopy
        } else if self.scale >= READOUT_MIN_SCALE && bit_count == 8 {
            RenderPath::StretchWithReadout
        } else {
            RenderPath::Stretch
        }
    }

    /// Recomputes the display rect: the image area is centered inside the
    /// client rect on any axis where the scaled image is smaller. Returns
    /// whether centering shrank the rect (borders exposed).
    fn update_display_rect(&mut self) -> bool {
        let mut rect = self.client_rect;
        let shown = self.image_disp_size();
        let mut centered = false;
        if shown.width < rect.width() {
            rect.left += (rect.width() - shown.width) / 2;
            rect.right = rect.left + shown.width;
            centered = true;
        }
        if shown.height < rect.height() {
            rect.top += (rect.height() - shown.height) / 2;
            rect.bottom = rect.top + shown.height;
            centered = true;
        }
        self.disp_rect = rect;
        centered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(image_w: i32, image_h: i32, client_w: i32, client_h: i32) -> Viewport {
        let mut vp = Viewport::new(ZoomConfig::default());
        vp.set_image_size(Size::new(image_w, image_h));
        vp.set_client_rect(Rect::new(0, 0, client_w, client_h));
        vp
    }

    #[test]
    fn scale_floors_at_one_percent() {
        let mut vp = viewport(100, 100, 50, 50);
        vp.set_scale(0.1);
        assert_eq!(vp.scale(), 1.0);
    }

    #[test]
    fn step_scale_round_trips_within_snap() {
        let mut vp = viewport(1000, 1000, 500, 500);
        vp.set_scale(100.0);
        let n = 37;
        for _ in 0..n {
            let s = vp.step_scale(1);
            vp.set_scale(s);
        }
        for _ in 0..n {
            let s = vp.step_scale(-1);
            vp.set_scale(s);
        }
        assert!((vp.scale() - 100.0).abs() <= SCALE_SNAP, "{}", vp.scale());
    }

    #[test]
    fn step_scale_snaps_to_exactly_100() {
        let mut vp = viewport(100, 100, 100, 100);
        vp.set_scale(99.5);
        assert_eq!(vp.step_scale(0), 100.0);
    }

    #[test]
    fn steps_are_uniform_in_log_space() {
        let vp = viewport(100, 100, 100, 100);
        // One step up from 100 is ~102.3%.
        let up = vp.step_scale(1);
        assert!((up / 100.0 - 10f64.powf(0.01)).abs() < 1e-9);
    }

    #[test]
    fn fit_scale_uses_constrained_axis() {
        // Wide client, tall image: height constrains.
        let vp = viewport(100, 400, 400, 200);
        assert!((vp.fit_scale() - 50.0).abs() < 1e-9);
        // Tall client, wide image: width constrains.
        let vp = viewport(400, 100, 200, 400);
        assert!((vp.fit_scale() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn clamp_keeps_offset_in_bounds() {
        let mut vp = viewport(100, 100, 50, 50);
        vp.set_scale(100.0);
        vp.begin_pan();
        vp.pan_to(Point::new(0, 0), Point::new(-500, -500));
        // limit = 100 - 50/1 = 50 per axis
        assert_eq!(vp.offset(), Point::new(50, 50));
        vp.begin_pan();
        vp.pan_to(Point::new(0, 0), Point::new(500, 500));
        assert_eq!(vp.offset(), Point::new(0, 0));
    }

    #[test]
    fn clamp_reports_adjustment() {
        let mut vp = viewport(100, 100, 50, 50);
        vp.set_scale(100.0);
        assert!(!vp.clamp_offset());
        vp.begin_pan();
        vp.pan_to(Point::new(0, 0), Point::new(-10, 0));
        assert_eq!(vp.offset().x, 10);
        assert!(!vp.clamp_offset());
    }

    #[test]
    fn screen_to_image_applies_offset_and_scale() {
        let mut vp = viewport(1000, 1000, 500, 500);
        vp.set_scale(200.0);
        vp.begin_pan();
        vp.pan_to(Point::new(0, 0), Point::new(-100, -100)); // offset (50, 50)
        assert_eq!(vp.offset(), Point::new(50, 50));
        assert_eq!(vp.screen_to_image(Point::new(100, 40)), Point::new(100, 70));
    }

    #[test]
    fn zoom_at_keeps_anchor_fixed() {
        let mut vp = viewport(1000, 1000, 500, 500);
        vp.set_scale(100.0);
        let anchor = Point::new(250, 250);
        let before = vp.screen_to_image(anchor);
        vp.zoom_at(anchor, 200.0);
        assert_eq!(vp.scale(), 200.0);
        assert_eq!(vp.screen_to_image(anchor), before);
    }

    #[test]
    fn toggle_scale_returns_to_previous() {
        let mut vp = viewport(1000, 1000, 500, 500);
        vp.set_scale(150.0);
        let anchor = Point::new(250, 250);
        vp.toggle_scale(anchor, 100.0);
        assert_eq!(vp.scale(), 100.0);
        vp.toggle_scale(anchor, 100.0);
        assert_eq!(vp.scale(), 150.0);
    }

    #[test]
    fn wheel_zoom_ignores_cursor_outside_display() {
        let mut vp = viewport(1000, 1000, 500, 500);
        let hint = vp.wheel_zoom(Point::new(600, 600), 120, WheelSpeed::Normal);
        assert!(hint.is_empty());
        assert_eq!(vp.scale(), 100.0);
    }

    #[test]
    fn wheel_zoom_steps_by_notch() {
        let mut vp = viewport(1000, 1000, 500, 500);
        vp.wheel_zoom(Point::new(250, 250), 120, WheelSpeed::Normal);
        assert!((vp.scale() - 100.0 * 10f64.powf(0.02)).abs() < 1e-6);
    }

    #[test]
    fn render_path_policy() {
        let mut vp = viewport(100, 100, 100, 100);
        vp.set_scale(100.0);
        assert_eq!(vp.render_path(8), RenderPath::DirectCopy);
        vp.set_scale(250.0);
        assert_eq!(vp.render_path(8), RenderPath::Stretch);
        vp.set_scale(3200.0);
        assert_eq!(vp.render_path(8), RenderPath::StretchWithReadout);
        assert_eq!(vp.render_path(24), RenderPath::Stretch);
    }

    #[test]
    fn display_rect_centers_small_images() {
        let mut vp = viewport(100, 100, 400, 400);
        vp.set_scale(100.0);
        let rect = vp.display_rect();
        assert_eq!(rect, Rect::new(150, 150, 250, 250));
    }

    #[test]
    fn resize_hint_carries_resize_flag() {
        let mut vp = Viewport::new(ZoomConfig::default());
        let hint = vp.set_image_size(Size::new(10, 10));
        assert!(hint.contains(RedrawHint::RESIZE));
        let hint = vp.set_image_size(Size::new(10, 10));
        assert!(hint.is_empty());
    }
}
