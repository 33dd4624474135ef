use crate::color::RgbColor;

/// Interpolation state between the colors shown when targets last changed
/// and the current targets.
///
/// `from`, `to` and `current` always have the same length.
#[derive(Debug, Clone)]
pub struct Transition {
    from: Vec<RgbColor>,
    to: Vec<RgbColor>,
    current: Vec<RgbColor>,
    progress: f64,
    step: f64,
}

impl Transition {
    /// `speed` is in transitions per second, `update_rate` in ticks per second
    pub fn new(speed: f64, update_rate: f64) -> Self {
        Self {
            from: Vec::new(),
            to: Vec::new(),
            current: Vec::new(),
            progress: 0.0,
            step: speed / update_rate,
        }
    }

    /// Start a fresh transition from whatever is currently shown
    pub fn set_targets(&mut self, targets: Vec<RgbColor>) {
        self.to = targets;
        self.current.resize(self.to.len(), RgbColor::BLACK);
        self.from = self.current.clone();
        self.progress = 0.0;
    }

    /// Move one tick forward
    pub fn advance(&mut self) {
        self.progress += self.step;

        if self.progress >= 1.0 {
            self.progress = 1.0;
            self.current.clone_from(&self.to);
        } else {
            for ((current, from), to) in self.current.iter_mut().zip(&self.from).zip(&self.to) {
                *current = from.lerp(to, self.progress);
            }
        }
    }

    /// Color for an output zone, cycling through `current` when there are
    /// more zones than colors
    pub fn color_for_zone(&self, zone: usize) -> RgbColor {
        if self.current.is_empty() {
            RgbColor::BLACK
        } else {
            self.current[zone % self.current.len()]
        }
    }

    pub fn from(&self) -> &[RgbColor] {
        &self.from
    }

    pub fn to(&self) -> &[RgbColor] {
        &self.to
    }

    pub fn current(&self) -> &[RgbColor] {
        &self.current
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }
}
