// src/palette.rs
//! 256-entry palette for 8-bit indexed buffers, with the preset colormaps.
//!
//! Every preset pins entry 0 to black and entry 1 to white so that low
//! sample codes can be used as marker/overlay colors; the tone mapper's
//! pass-through band keeps those codes from being remapped away.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Number of palette entries for an 8-bit indexed image.
pub const PALETTE_LEN: usize = 256;

/// One palette entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    const fn gray(v: u8) -> Self {
        Self { r: v, g: v, b: v }
    }
}

/// Selectable colormap presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Colormap {
    /// Plain intensity ramp with marker entries pinned.
    #[default]
    Grayscale,
    /// Blue → cyan → green → yellow → red ramp.
    RainbowHeat,
    /// Tabulated blue/teal/warm thermal ramp.
    ThermalHeat,
    /// Grayscale ramp repeated in 4 bands.
    Banded4,
    /// Grayscale ramp repeated in 8 bands.
    Banded8,
    /// Grayscale ramp repeated in 16 bands.
    Banded16,
    /// Grayscale ramp repeated in 32 bands.
    Banded32,
}

/// A full 256-entry palette.
#[derive(Clone, PartialEq, Eq)]
pub struct Palette {
    entries: [Rgb; PALETTE_LEN],
}

impl std::fmt::Debug for Palette {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 256 entries are noise in debug output; show the ends.
        write!(
            f,
            "Palette {{ first: {:?}, last: {:?} }}",
            self.entries[0],
            self.entries[PALETTE_LEN - 1]
        )
    }
}

impl Default for Palette {
    /// The palette an 8-bit buffer starts with: a pure grayscale ramp,
    /// markers not pinned.
    fn default() -> Self {
        let mut entries = [Rgb::BLACK; PALETTE_LEN];
        for (i, e) in entries.iter_mut().enumerate() {
            *e = Rgb::gray(i as u8);
        }
        Self { entries }
    }
}

impl Palette {
    /// Builds the palette for a preset colormap.
    pub fn preset(map: Colormap) -> Self {
        let mut palette = match map {
            Colormap::Grayscale => Self::default(),
            Colormap::RainbowHeat => Self::rainbow(),
            Colormap::ThermalHeat => THERMAL.clone(),
            Colormap::Banded4 => Self::banded(64, 3, 64),
            Colormap::Banded8 => Self::banded(32, 7, 32),
            Colormap::Banded16 => Self::banded(16, 15, 16),
            Colormap::Banded32 => Self::banded(8, 32, 0),
        };
        palette.entries[0] = Rgb::BLACK;
        palette.entries[1] = Rgb::WHITE;
        palette
    }

    pub fn entries(&self) -> &[Rgb; PALETTE_LEN] {
        &self.entries
    }

    pub fn entry(&self, index: u8) -> Rgb {
        self.entries[index as usize]
    }

    pub fn set_entry(&mut self, index: u8, value: Rgb) {
        self.entries[index as usize] = value;
    }

    fn rainbow() -> Self {
        let mut entries = [Rgb::BLACK; PALETTE_LEN];
        for i in 0..64u16 {
            let ramp = (i * 4) as u8;
            let fall = (255 - i * 4) as u8;
            entries[i as usize] = Rgb::new(0, ramp, 255);
            entries[i as usize + 64] = Rgb::new(0, 255, fall);
            entries[i as usize + 128] = Rgb::new(ramp, 255, 0);
            entries[i as usize + 192] = Rgb::new(255, fall, 0);
        }
        Self { entries }
    }

    /// Grayscale ramp repeated every `span` entries; each in-band index is
    /// scaled by `step` and lifted by `base` so dark values stay readable.
    fn banded(span: usize, step: u8, base: u8) -> Self {
        let mut entries = [Rgb::BLACK; PALETTE_LEN];
        for band in 0..PALETTE_LEN / span {
            for i in 0..span {
                entries[band * span + i] = Rgb::gray(i as u8 * step + base);
            }
        }
        Self { entries }
    }
}

/// Tabulated thermal colormap (blue → teal → warm white → orange).
static THERMAL: Lazy<Palette> = Lazy::new(|| {
    let mut entries = [Rgb::BLACK; PALETTE_LEN];
    for i in 0..PALETTE_LEN {
        entries[i] = Rgb::new(THERMAL_R[i], THERMAL_G[i], THERMAL_B[i]);
    }
    Palette { entries }
});

#[rustfmt::skip]
const THERMAL_R: [u8; PALETTE_LEN] = [
    60, 61, 62, 63, 64, 66, 67, 68, 69, 70, 71, 73, 74, 75, 76, 77,
    79, 80, 81, 82, 84, 85, 86, 87, 89, 90, 91, 93, 94, 95, 96, 98,
    99, 100, 102, 103, 104, 106, 107, 108, 110, 111, 112, 114, 115, 116, 118, 119,
    120, 122, 123, 124, 126, 127, 129, 130, 131, 133, 134, 135, 137, 138, 140, 141,
    142, 144, 145, 147, 148, 149, 151, 152, 153, 155, 156, 158, 159, 160, 162, 163,
    164, 166, 167, 168, 170, 171, 172, 174, 175, 176, 178, 179, 180, 182, 183, 184,
    185, 187, 188, 189, 190, 192, 193, 194, 195, 197, 198, 199, 200, 201, 203, 204,
    205, 206, 207, 208, 209, 210, 211, 213, 214, 215, 216, 217, 218, 219, 220, 221,
    222, 223, 224, 225, 226, 227, 228, 229, 230, 231, 232, 232, 233, 234, 235, 236,
    236, 237, 238, 238, 239, 240, 240, 241, 241, 242, 242, 243, 243, 244, 244, 245,
    245, 245, 245, 246, 246, 246, 246, 247, 247, 247, 247, 247, 247, 247, 247, 247,
    247, 247, 247, 247, 247, 247, 247, 247, 246, 246, 246, 246, 245, 245, 245, 244,
    244, 244, 243, 243, 242, 242, 241, 241, 240, 240, 239, 238, 238, 237, 236, 236,
    235, 234, 233, 233, 232, 231, 230, 229, 228, 227, 227, 226, 225, 224, 223, 222,
    221, 220, 218, 217, 216, 215, 214, 213, 212, 210, 209, 208, 207, 205, 204, 203,
    202, 200, 199, 198, 196, 195, 193, 192, 190, 189, 188, 186, 185, 183, 181, 180,
];

#[rustfmt::skip]
const THERMAL_G: [u8; PALETTE_LEN] = [
    78, 80, 81, 83, 85, 87, 88, 90, 92, 93, 95, 97, 99, 100, 102, 104,
    105, 107, 109, 110, 112, 114, 115, 117, 119, 120, 122, 123, 125, 127, 128, 130,
    131, 133, 135, 136, 138, 139, 141, 142, 144, 145, 147, 148, 150, 151, 153, 154,
    156, 157, 158, 160, 161, 163, 164, 165, 167, 168, 169, 171, 172, 173, 174, 176,
    177, 178, 179, 181, 182, 183, 184, 185, 186, 187, 188, 190, 191, 192, 193, 194,
    195, 196, 197, 198, 199, 199, 200, 201, 202, 203, 204, 205, 205, 206, 207, 208,
    208, 209, 210, 210, 211, 212, 212, 213, 213, 214, 214, 215, 215, 216, 216, 217,
    217, 217, 218, 218, 219, 219, 219, 219, 220, 220, 220, 220, 220, 220, 221, 221,
    220, 220, 219, 219, 218, 218, 217, 216, 216, 215, 215, 214, 213, 212, 212, 211,
    210, 209, 209, 208, 207, 206, 205, 204, 203, 202, 201, 200, 199, 198, 197, 196,
    195, 194, 193, 192, 191, 190, 188, 187, 186, 185, 184, 182, 181, 180, 178, 177,
    176, 174, 173, 172, 170, 169, 167, 166, 164, 163, 161, 160, 158, 157, 155, 154,
    152, 151, 149, 147, 146, 144, 142, 141, 139, 137, 136, 134, 132, 130, 129, 127,
    125, 123, 121, 120, 118, 116, 114, 112, 110, 108, 106, 104, 102, 100, 98, 96,
    94, 92, 90, 88, 86, 84, 82, 80, 78, 75, 73, 71, 69, 66, 64, 62,
    59, 57, 54, 51, 49, 46, 43, 40, 37, 34, 30, 26, 22, 17, 11, 4,
];

#[rustfmt::skip]
const THERMAL_B: [u8; PALETTE_LEN] = [
    194, 195, 197, 198, 200, 201, 203, 204, 206, 207, 209, 210, 211, 213, 214, 215,
    217, 218, 219, 221, 222, 223, 224, 225, 226, 228, 229, 230, 231, 232, 233, 234,
    235, 236, 237, 238, 239, 239, 240, 241, 242, 243, 243, 244, 245, 246, 246, 247,
    247, 248, 249, 249, 250, 250, 251, 251, 252, 252, 252, 253, 253, 253, 254, 254,
    254, 254, 254, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255,
    254, 254, 254, 254, 253, 253, 253, 253, 252, 252, 251, 251, 251, 250, 250, 249,
    248, 248, 247, 247, 246, 245, 245, 244, 243, 243, 242, 241, 240, 239, 238, 238,
    237, 236, 235, 234, 233, 232, 231, 230, 229, 228, 227, 225, 224, 223, 222, 221,
    219, 218, 216, 215, 214, 212, 211, 209, 208, 206, 205, 203, 202, 200, 199, 197,
    196, 194, 193, 191, 190, 188, 187, 185, 184, 182, 181, 179, 178, 176, 174, 173,
    171, 170, 168, 167, 165, 163, 162, 160, 159, 157, 156, 154, 152, 151, 149, 148,
    146, 145, 143, 141, 140, 138, 137, 135, 134, 132, 131, 129, 127, 126, 124, 123,
    121, 120, 118, 117, 115, 114, 112, 111, 109, 108, 106, 105, 103, 102, 100, 99,
    97, 96, 95, 93, 92, 90, 89, 88, 86, 85, 83, 82, 81, 79, 78, 77,
    75, 74, 73, 71, 70, 69, 67, 66, 65, 64, 62, 61, 60, 59, 57, 56,
    55, 54, 53, 52, 50, 49, 48, 47, 46, 45, 44, 43, 41, 40, 39, 38,
];
