pub mod openrgb;

use async_trait::async_trait;
use thiserror::Error;

pub use openrgb::OpenRgbBackend;

use crate::color::RgbColor;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("not connected")]
    NotConnected,
}

/// An independently addressable output segment
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneInfo {
    pub device: u32,
    pub index: u32,
    pub name: String,
    pub led_count: u32,
}

/// Factory for connections to RGB hardware
#[async_trait]
pub trait OutputBackend: Send + Sync {
    fn name(&self) -> String;

    /// Connect and enumerate the controllable zones
    async fn connect(&self) -> Result<Box<dyn OutputDevice>, BackendError>;
}

/// A live connection. The zone list is fixed for the connection's lifetime.
#[async_trait]
pub trait OutputDevice: Send {
    fn zones(&self) -> &[ZoneInfo];

    /// Record the color a zone should show on its next flush. Never blocks.
    fn set_zone_color(&mut self, zone: usize, color: RgbColor);

    /// Push a zone's pending color to the hardware
    async fn show_zone(&mut self, zone: usize) -> Result<(), BackendError>;
}
