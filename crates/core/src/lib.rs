pub use bridge::{BridgeApi, BridgeError, HueClient, LightTable};
pub use color::{light_state_to_color, ColorError, RgbColor};
pub use config::{BridgeSettings, ConfigError, ConfigManager, OutputSettings, RenderSettings, Settings};
pub use light::{ColorState, Dimming, Gamut, LightState, LightUpdate, OnState, Xy};
pub use modules::{
    AsyncModule, BridgeModule, ManagerError, ModuleEvent, ModuleId, ModuleManager, ModuleMessage,
    RenderModule, SyncState,
};
pub use output::{BackendError, OpenRgbBackend, OutputBackend, OutputDevice, ZoneInfo};
pub use render::{RenderHandle, Transition};
pub use service::{states_to_colors, HueSync};

pub mod bridge;
pub mod color;
mod config;
pub mod light;
pub mod modules;
pub mod output;
pub mod render;
mod service;
