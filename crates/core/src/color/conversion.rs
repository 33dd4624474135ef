//! Conversion of bridge light states into display RGB.
//!
//! All functions here are pure and truncate (never round) when producing
//! 8-bit channels.

use thiserror::Error;

use super::RgbColor;
use crate::light::{Gamut, LightState, Xy};

/// Color temperature used for lights that have no color capability
pub const WARM_WHITE_MIREDS: u16 = 370;

/// Lowest brightness fed into the chromaticity transform, out of 255
const MIN_XY_BRIGHTNESS: u8 = 5;

/// 65535 / 360
const HUE_SCALE: f64 = 182.04;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ColorError {
    #[error("unknown color format: {0}")]
    UnknownColorFormat(String),
}

fn to_channel(value: f64) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

fn cross(a: (f64, f64), b: (f64, f64)) -> f64 {
    a.0 * b.1 - a.1 * b.0
}

/// Barycentric point-in-triangle test against the red/green/blue vertices.
/// Points on an edge count as inside.
fn within_gamut(gamut: &Gamut, point: Xy) -> bool {
    let v0 = (gamut.green.x - gamut.red.x, gamut.green.y - gamut.red.y);
    let v1 = (gamut.blue.x - gamut.red.x, gamut.blue.y - gamut.red.y);
    let v2 = (point.x - gamut.red.x, point.y - gamut.red.y);

    let area = cross(v0, v1);
    if area == 0.0 {
        return false;
    }

    let a = cross(v2, v1) / area;
    let b = cross(v0, v2) / area;
    a >= 0.0 && b >= 0.0 && a + b <= 1.0
}

/// Closest gamut vertex by squared distance. This is not a projection onto
/// the triangle edge, so out-of-gamut colors snap to a fully saturated primary.
fn nearest_vertex(gamut: &Gamut, point: Xy) -> Xy {
    let distance = |v: &Xy| (v.x - point.x).powi(2) + (v.y - point.y).powi(2);

    [gamut.red, gamut.green, gamut.blue]
        .into_iter()
        .min_by(|a, b| distance(a).total_cmp(&distance(b)))
        .unwrap_or(point)
}

fn srgb_gamma(linear: f64) -> f64 {
    if linear <= 0.0031308 {
        12.92 * linear
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    }
}

/// CIE 1931 xy to sRGB (D65).
///
/// `brightness` is 0-255 and is floored at 5 so very dim lights keep a usable
/// hue. It sets the luminance Y and also scales the encoded channels.
pub fn convert_chromaticity(x: f64, y: f64, brightness: u8, gamut: Option<&Gamut>) -> RgbColor {
    let fraction = brightness.max(MIN_XY_BRIGHTNESS) as f64 / 255.0;

    let mut point = Xy::new(x, y);
    if let Some(gamut) = gamut {
        if !within_gamut(gamut, point) {
            point = nearest_vertex(gamut, point);
        }
    }

    if point.y <= 0.0 {
        return RgbColor::BLACK;
    }

    let z = 1.0 - point.x - point.y;
    let big_y = fraction;
    let big_x = (big_y / point.y) * point.x;
    let big_z = (big_y / point.y) * z;

    let r = big_x * 3.2406 - big_y * 1.5372 - big_z * 0.4986;
    let g = -big_x * 0.9689 + big_y * 1.8758 + big_z * 0.0415;
    let b = big_x * 0.0557 - big_y * 0.2040 + big_z * 1.0570;

    let scale = 255.0 * fraction;
    RgbColor {
        r: to_channel(srgb_gamma(r) * scale),
        g: to_channel(srgb_gamma(g) * scale),
        b: to_channel(srgb_gamma(b) * scale),
    }
}

/// HSV to RGB with a 16-bit hue (wrapping every 65536) and 8-bit
/// saturation and brightness.
pub fn convert_hue_sat(hue: u32, sat: u8, bri: u8) -> RgbColor {
    if sat == 0 {
        return RgbColor::new(bri, bri, bri);
    }

    let s = sat as f64 / 255.0;
    let v = bri as f64 / 255.0;

    let degrees = (hue % 65536) as f64 / HUE_SCALE;
    let sector_pos = degrees / 60.0;
    let sector_floor = sector_pos.floor();
    let ff = sector_pos - sector_floor;
    let sector = (sector_floor as u32) % 6;

    let p = v * (1.0 - s);
    let q = v * (1.0 - s * ff);
    let t = v * (1.0 - s * (1.0 - ff));

    let (r, g, b) = match sector {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };

    RgbColor {
        r: to_channel(r * 255.0),
        g: to_channel(g * 255.0),
        b: to_channel(b * 255.0),
    }
}

/// Approximate blackbody color for a temperature in mireds
pub fn convert_color_temperature(mireds: u16, bri: u8) -> RgbColor {
    let hectemp = 10000.0 / mireds.max(1) as f64;

    let (r, g, b) = if hectemp <= 66.0 {
        let g = 99.4708025861 * hectemp.ln() - 161.1195681661;
        let b = if hectemp <= 19.0 {
            0.0
        } else {
            138.5177312231 * (hectemp - 10.0).ln() - 305.0447927307
        };
        (255.0, g, b)
    } else {
        let r = 329.698727446 * (hectemp - 60.0).powf(-0.1332047592);
        let g = 288.1221695283 * (hectemp - 60.0).powf(-0.0755148492);
        (r, g, 255.0)
    };

    let scale = bri as f64 / 255.0;
    RgbColor {
        r: to_channel(r * scale),
        g: to_channel(g * scale),
        b: to_channel(b * scale),
    }
}

/// Pick the conversion matching whatever color data the light reports
pub fn light_state_to_color(state: &LightState) -> Result<RgbColor, ColorError> {
    if !state.on.on {
        return Ok(RgbColor::BLACK);
    }

    let Some(color) = &state.color else {
        return Ok(convert_color_temperature(WARM_WHITE_MIREDS, 255));
    };

    let bri = state.brightness_8bit();
    if let Some(xy) = color.xy {
        return Ok(convert_chromaticity(xy.x, xy.y, bri, color.gamut.as_ref()));
    }
    if let Some(ct) = color.ct {
        return Ok(convert_color_temperature(ct, bri));
    }
    if let (Some(hue), Some(sat)) = (color.hue, color.sat) {
        return Ok(convert_hue_sat(hue as u32, sat, bri));
    }

    Err(ColorError::UnknownColorFormat(format!("{:?}", color)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::{ColorState, Dimming, OnState};

    fn gamut_c() -> Gamut {
        Gamut {
            red: Xy::new(0.6915, 0.3083),
            green: Xy::new(0.17, 0.7),
            blue: Xy::new(0.1532, 0.0475),
        }
    }

    #[test]
    fn test_within_gamut() {
        let gamut = gamut_c();
        assert!(within_gamut(&gamut, Xy::new(0.3, 0.3)));
        assert!(within_gamut(&gamut, gamut.red));
        assert!(!within_gamut(&gamut, Xy::new(0.0, 0.0)));
        // beyond the green-blue edge
        assert!(!within_gamut(&gamut, Xy::new(0.05, 0.4)));
        // beyond the red-green edge
        assert!(!within_gamut(&gamut, Xy::new(0.5, 0.6)));
    }

    #[test]
    fn test_nearest_vertex() {
        let gamut = gamut_c();
        assert_eq!(nearest_vertex(&gamut, Xy::new(0.8, 0.3)), gamut.red);
        assert_eq!(nearest_vertex(&gamut, Xy::new(0.1, 0.9)), gamut.green);
        assert_eq!(nearest_vertex(&gamut, Xy::new(0.1, 0.0)), gamut.blue);
    }

    #[test]
    fn test_chromaticity_neutral_point() {
        let color = convert_chromaticity(0.3, 0.3, 127, None);
        assert!(color.r > 0 && color.g > 0 && color.b > 0);
        // (0.3, 0.3) is bluish white
        assert!(color.b > color.r);
    }

    #[test]
    fn test_chromaticity_brightness_floor() {
        assert_eq!(
            convert_chromaticity(0.4, 0.4, 0, None),
            convert_chromaticity(0.4, 0.4, 5, None)
        );
    }

    #[test]
    fn test_chromaticity_zero_y_is_black() {
        assert_eq!(convert_chromaticity(0.3, 0.0, 255, None), RgbColor::BLACK);
    }

    #[test]
    fn test_hue_sat_primaries() {
        assert_eq!(convert_hue_sat(0, 255, 255), RgbColor::new(255, 0, 0));
        // 120 degrees lands exactly on sector 2
        let green = convert_hue_sat(21845, 255, 255);
        assert_eq!(green.g, 255);
        assert_eq!(green.b, 0);
        assert!(green.r <= 1);
        // 240 degrees
        let blue = convert_hue_sat(43690, 255, 255);
        assert_eq!(blue.b, 255);
        assert!(blue.g <= 1);
    }

    #[test]
    fn test_hue_sat_achromatic() {
        assert_eq!(convert_hue_sat(12000, 0, 200), RgbColor::new(200, 200, 200));
    }

    #[test]
    fn test_color_temperature_warm_white() {
        let color = convert_color_temperature(WARM_WHITE_MIREDS, 255);
        assert_eq!(color.r, 255);
        assert!(color.g > color.b);
        assert!(color.b > 0);
    }

    #[test]
    fn test_color_temperature_very_warm_has_no_blue() {
        // 10000 / 600 = 16.6, below the blue cutoff
        assert_eq!(convert_color_temperature(600, 255).b, 0);
    }

    #[test]
    fn test_color_temperature_cool_branch() {
        // 10000 / 100 = 100, power-law branch
        let color = convert_color_temperature(100, 255);
        assert_eq!(color.b, 255);
        assert!(color.r < 255);
    }

    #[test]
    fn test_color_temperature_scales_with_brightness() {
        let full = convert_color_temperature(250, 255);
        let half = convert_color_temperature(250, 127);
        assert!(half.r < full.r);
        assert!(half.g < full.g);
    }

    #[test]
    fn test_unknown_color_format() {
        let state = LightState {
            on: OnState { on: true },
            dimming: Some(Dimming { brightness: 100.0 }),
            color: Some(ColorState {
                hue: Some(100),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(matches!(
            light_state_to_color(&state),
            Err(ColorError::UnknownColorFormat(_))
        ));
    }

    #[test]
    fn test_dispatch_prefers_xy() {
        let state = LightState {
            on: OnState { on: true },
            dimming: Some(Dimming { brightness: 100.0 }),
            color: Some(ColorState {
                xy: Some(Xy::new(0.6, 0.35)),
                ct: Some(153),
                hue: Some(40000),
                sat: Some(255),
                gamut: None,
            }),
            ..Default::default()
        };
        assert_eq!(
            light_state_to_color(&state).unwrap(),
            convert_chromaticity(0.6, 0.35, 255, None)
        );
    }
}
