// src/config.rs
//! Configuration for an image pane instance.
//!
//! All fields have sensible defaults so an empty `{}` (or `PaneConfig::default()`)
//! yields a working pane. The struct tree is deserializable from JSON with
//! `#[serde(default)]` applied throughout, so partial configuration files
//! only need to name what they change.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::geometry::Point;
use crate::palette::Colormap;

/// Default window-origin used by cascade placement.
const CASCADE_BASE: i32 = 20;
/// Pixel gap between consecutive cascade slots.
const CASCADE_SPACE: i32 = 20;

/// Where the external glue should place the pane's window.
///
/// This is an explicit per-instance value: cascade placement takes the slot
/// number from the caller instead of a process-wide counter, so two engine
/// instances never race over hidden shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Let the platform pick.
    #[default]
    Auto,
    /// Diagonal cascade: slot `n` lands at `base + n * space` on both axes.
    Cascade { slot: i32 },
    /// Exact position.
    At { x: i32, y: i32 },
}

impl Placement {
    /// Resolves the placement to a concrete origin, or `None` for
    /// platform-chosen placement.
    pub fn resolve(&self) -> Option<Point> {
        match *self {
            Placement::Auto => None,
            Placement::Cascade { slot } => {
                let pos = CASCADE_BASE + slot * CASCADE_SPACE;
                Some(Point::new(pos, pos))
            }
            Placement::At { x, y } => Some(Point::new(x, y)),
        }
    }
}

/// Zoom interaction tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    /// Log-domain steps applied per zoom-in/zoom-out request.
    pub step: i32,
    /// Wheel delta units that make up one zoom step.
    pub wheel_step: i32,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            step: 1,
            wheel_step: 60,
        }
    }
}

/// Complete configuration for one pane.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaneConfig {
    /// Title the window glue shows; also the default save-file stem.
    pub title: String,
    /// Window placement policy.
    pub placement: Placement,
    /// Colormap installed when an 8-bit buffer is first created.
    pub colormap: Colormap,
    /// Zoom interaction tuning.
    pub zoom: ZoomConfig,
}

impl Default for PaneConfig {
    fn default() -> Self {
        Self {
            title: String::from("Untitled"),
            placement: Placement::default(),
            colormap: Colormap::default(),
            zoom: ZoomConfig::default(),
        }
    }
}

impl PaneConfig {
    /// Parses a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config = serde_json::from_str(json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(config)
    }

    /// Loads a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let config = PaneConfig::from_json_str("{}").unwrap();
        assert_eq!(config.title, "Untitled");
        assert_eq!(config.placement, Placement::Auto);
        assert_eq!(config.zoom.wheel_step, 60);
    }

    #[test]
    fn partial_json_overrides_one_field() {
        let config = PaneConfig::from_json_str(
            r#"{ "title": "camera-0", "placement": { "cascade": { "slot": 2 } } }"#,
        )
        .unwrap();
        assert_eq!(config.title, "camera-0");
        assert_eq!(config.placement.resolve(), Some(Point::new(60, 60)));
        assert_eq!(config.zoom.step, 1);
    }

    #[test]
    fn malformed_json_is_an_io_error() {
        let err = PaneConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, crate::error::Error::Io(_)));
    }

    #[test]
    fn cascade_slots_do_not_collide() {
        let a = Placement::Cascade { slot: 0 }.resolve().unwrap();
        let b = Placement::Cascade { slot: 1 }.resolve().unwrap();
        assert_ne!(a, b);
        assert_eq!(b, Point::new(40, 40));
    }
}
