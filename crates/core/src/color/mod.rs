pub mod conversion;

use serde::{Deserialize, Serialize};

pub use conversion::{
    convert_chromaticity, convert_color_temperature, convert_hue_sat, light_state_to_color,
    ColorError, WARM_WHITE_MIREDS,
};

/// 8-bit RGB color
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Linear interpolation towards `target`, truncating each channel
    pub fn lerp(&self, target: &RgbColor, t: f64) -> Self {
        RgbColor {
            r: Self::lerp_component(self.r, target.r, t),
            g: Self::lerp_component(self.g, target.g, t),
            b: Self::lerp_component(self.b, target.b, t),
        }
    }

    pub fn lerp_component(start: u8, end: u8, t: f64) -> u8 {
        let t = t.clamp(0.0, 1.0);
        let start_f = start as f64;
        let end_f = end as f64;
        (start_f + (end_f - start_f) * t) as u8
    }

    pub fn is_black(&self) -> bool {
        *self == Self::BLACK
    }
}

impl From<(u8, u8, u8)> for RgbColor {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self { r, g, b }
    }
}

impl std::fmt::Display for RgbColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}
