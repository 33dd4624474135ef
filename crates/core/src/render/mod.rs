pub mod transition;

use std::sync::Arc;

use parking_lot::Mutex;

pub use transition::Transition;

use crate::color::RgbColor;

/// Cloneable entry point for changing what the render loop shows. Safe to use
/// from any thread; every call only takes the transition lock briefly.
#[derive(Clone)]
pub struct RenderHandle {
    transition: Arc<Mutex<Transition>>,
}

impl RenderHandle {
    pub fn new(transition: Arc<Mutex<Transition>>) -> Self {
        Self { transition }
    }

    /// Begin transitioning towards `colors`, one per output zone (cycled when
    /// there are more zones than colors)
    pub fn set_targets(&self, colors: Vec<RgbColor>) {
        self.transition.lock().set_targets(colors);
    }

    /// Drop all targets so every zone shows black
    pub fn clear_colors(&self) {
        self.set_targets(Vec::new());
    }

    /// Colors computed on the last tick
    pub fn current(&self) -> Vec<RgbColor> {
        self.transition.lock().current().to_vec()
    }

    pub fn progress(&self) -> f64 {
        self.transition.lock().progress()
    }
}
