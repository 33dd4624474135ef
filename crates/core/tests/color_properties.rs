use huesync_core::color::{
    convert_chromaticity, convert_color_temperature, convert_hue_sat, WARM_WHITE_MIREDS,
};
use huesync_core::{light_state_to_color, ColorState, Dimming, Gamut, LightState, OnState, RgbColor, Xy};

fn gamut_b() -> Gamut {
    Gamut {
        red: Xy::new(0.675, 0.322),
        green: Xy::new(0.409, 0.518),
        blue: Xy::new(0.167, 0.04),
    }
}

#[test]
fn test_inside_gamut_is_not_clamped() {
    let gamut = gamut_b();
    for (x, y) in [(0.4, 0.35), (0.3, 0.2), (0.5, 0.35), (0.409, 0.518)] {
        assert_eq!(
            convert_chromaticity(x, y, 200, Some(&gamut)),
            convert_chromaticity(x, y, 200, None),
            "({}, {})",
            x,
            y
        );
    }
}

#[test]
fn test_outside_gamut_snaps_to_nearest_vertex() {
    let gamut = gamut_b();
    let cases = [
        (Xy::new(0.72, 0.28), gamut.red),
        (Xy::new(0.3, 0.65), gamut.green),
        (Xy::new(0.14, 0.02), gamut.blue),
    ];

    for (point, vertex) in cases {
        assert_eq!(
            convert_chromaticity(point.x, point.y, 180, Some(&gamut)),
            convert_chromaticity(vertex.x, vertex.y, 180, None)
        );
    }
}

#[test]
fn test_hue_sat_zero_saturation_is_gray() {
    for hue in (0..65536u32).step_by(4099) {
        let color = convert_hue_sat(hue, 0, 173);
        assert_eq!(color.r, color.g);
        assert_eq!(color.g, color.b);
    }
}

#[test]
fn test_hue_sat_is_periodic() {
    for hue in (0..65536u32).step_by(997) {
        assert_eq!(
            convert_hue_sat(hue, 200, 220),
            convert_hue_sat(hue + 65536, 200, 220)
        );
    }
}

#[test]
fn test_off_light_is_black() {
    let state = LightState {
        on: OnState { on: false },
        dimming: Some(Dimming { brightness: 100.0 }),
        color: Some(ColorState {
            xy: Some(Xy::new(0.6, 0.3)),
            ct: Some(200),
            ..Default::default()
        }),
        ..Default::default()
    };
    assert_eq!(light_state_to_color(&state).unwrap(), RgbColor::BLACK);
}

#[test]
fn test_light_without_color_is_warm_white() {
    let warm_white = convert_color_temperature(WARM_WHITE_MIREDS, 255);
    for brightness in [1.0, 40.0, 100.0] {
        let state = LightState {
            on: OnState { on: true },
            dimming: Some(Dimming { brightness }),
            color: None,
            ..Default::default()
        };
        assert_eq!(light_state_to_color(&state).unwrap(), warm_white);
    }
}

#[test]
fn test_hue_sat_dispatch_uses_dimming() {
    let state = LightState {
        on: OnState { on: true },
        dimming: Some(Dimming { brightness: 50.0 }),
        color: Some(ColorState {
            hue: Some(0),
            sat: Some(255),
            ..Default::default()
        }),
        ..Default::default()
    };
    let color = light_state_to_color(&state).unwrap();
    assert!((126..=127).contains(&color.r), "{}", color);
    assert_eq!((color.g, color.b), (0, 0));
}
