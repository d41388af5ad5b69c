// src/overlay.rs
//! Typed overlay strategy injected into the pane.
//!
//! The renderer glue invokes the painter after blitting the image, handing
//! it a snapshot of the viewport state and a view of the presentable bytes.
//! This replaces the classic function-pointer-plus-context-pointer callback
//! with a trait object the embedding implements.

use anyhow::Result;

use crate::geometry::{Point, Rect, Size};

/// What an overlay painter gets to look at while drawing.
///
/// `display_bytes` is borrowed under the pane lock for the duration of the
/// call; the painter must not stash it.
pub struct OverlayContext<'a> {
    /// Image size in pixels.
    pub image_size: Size,
    /// Where on screen the image was blitted.
    pub display_rect: Rect,
    /// Current zoom, percent.
    pub scale: f64,
    /// Current pan offset in image coordinates.
    pub offset: Point,
    /// Presentable bytes, when an image is set.
    pub display_bytes: Option<&'a [u8]>,
}

/// Strategy for drawing on top of the blitted image.
///
/// Errors are arbitrary embedding errors and propagate to the glue that
/// requested the paint; the engine neither interprets nor retries them.
pub trait OverlayPainter: Send {
    fn draw_overlay(&mut self, ctx: &OverlayContext<'_>) -> Result<()>;
}
