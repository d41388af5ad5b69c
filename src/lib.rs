// src/lib.rs
//! Embeddable image-viewing surface.
//!
//! The crate owns a pixel buffer fed by an external producer, presents it
//! through a zoomable/pannable viewport, and persists it to a plain bitmap
//! container. Window creation, input dispatch and actual blitting are the
//! embedding's job; it drives the engine through [`ImagePane`],
//! [`ProducerHandle`] and [`Viewport`].
//!
//! ## Roles
//! - A **producer** (any thread) supplies pixel data: zero-copy adoption of
//!   caller-owned memory, engine-owned allocation, or copy-in.
//! - A **renderer** (one long-lived thread) owns the pane, reads buffer and
//!   geometry under the pane lock, and applies viewport transforms.
//!
//! ## Depths
//! Images are 8-bit palette-indexed or 24-bit truecolor; 16-bit mono
//! sources are presented through a tone-mapped 8-bit shadow buffer while
//! the samples stay authoritative for readout.

pub mod bitmap;
pub mod buffer;
pub mod config;
pub mod error;
pub mod geometry;
pub mod overlay;
pub mod palette;
pub mod pane;
pub mod stats;
pub mod sync;
pub mod tonemap;
pub mod viewport;

pub use buffer::{BufferStore, ImageFormat, Orientation, PixelDepth, PixelValue};
pub use config::{PaneConfig, Placement, ZoomConfig};
pub use error::{Error, Result};
pub use geometry::{Point, Rect, Size};
pub use overlay::{OverlayContext, OverlayPainter};
pub use palette::{Colormap, Palette, Rgb};
pub use pane::{FrameGuard, ImagePane, ProducerHandle};
pub use tonemap::ToneMap;
pub use viewport::{RedrawHint, RenderPath, Viewport, WheelSpeed};
