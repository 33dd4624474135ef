use serde::{Deserialize, Serialize};

/// CIE 1931 chromaticity coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Xy {
    pub x: f64,
    pub y: f64,
}

impl Xy {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Triangle of the colors a light can actually produce
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gamut {
    pub red: Xy,
    pub green: Xy,
    pub blue: Xy,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceRef {
    pub rid: String,
    #[serde(default)]
    pub rtype: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OnState {
    pub on: bool,
}

/// Brightness as reported by the bridge, 0-100
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimming {
    pub brightness: f64,
}

/// Color descriptor of a light. Any combination of fields may be present;
/// conversion prefers `xy`, then `ct`, then `hue`/`sat`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColorState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xy: Option<Xy>,
    /// Color temperature in mireds
    #[serde(default, alias = "mirek", skip_serializing_if = "Option::is_none")]
    pub ct: Option<u16>,
    /// 16-bit hue, 0-65535
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hue: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sat: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamut: Option<Gamut>,
}

impl ColorState {
    /// Overlay every field present in `update` onto `self`
    pub fn merge(&self, update: &ColorState) -> ColorState {
        ColorState {
            xy: update.xy.or(self.xy),
            ct: update.ct.or(self.ct),
            hue: update.hue.or(self.hue),
            sat: update.sat.or(self.sat),
            gamut: update.gamut.or(self.gamut),
        }
    }
}

/// Current state of one light, as held in the bridge state table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LightState {
    /// Id of the light service resource
    pub id: String,
    /// Device owning the light; events are matched on this
    #[serde(default)]
    pub owner: ResourceRef,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub on: OnState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimming: Option<Dimming>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorState>,
}

impl LightState {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Brightness mapped onto 0-255, full when the light reports no dimming
    pub fn brightness_8bit(&self) -> u8 {
        match self.dimming {
            Some(dimming) => (dimming.brightness * 255.0 / 100.0).clamp(0.0, 255.0) as u8,
            None => 255,
        }
    }

    /// Apply a sparse update. Only `on`, `dimming` and `color` are taken from
    /// the update; fields it does not carry keep their prior values.
    pub fn merge(&self, update: &LightUpdate) -> LightState {
        let color = match (&self.color, &update.color) {
            (Some(prior), Some(changed)) => Some(prior.merge(changed)),
            (None, Some(changed)) => Some(changed.clone()),
            (prior, None) => prior.clone(),
        };

        LightState {
            on: update.on.unwrap_or(self.on),
            dimming: update.dimming.or(self.dimming),
            color,
            ..self.clone()
        }
    }
}

/// Sparse light change carried by a bridge event
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LightUpdate {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub resource_type: String,
    #[serde(default)]
    pub owner: ResourceRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<OnState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimming: Option<Dimming>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorState>,
}

impl LightUpdate {
    pub fn is_light(&self) -> bool {
        self.resource_type == "light"
    }
}
