use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};

use super::traits::{
    shutdown_requested, until_shutdown, AsyncModule, ModuleEvent, ModuleId, ModuleMessage,
    ModuleResult,
};
use crate::config::{secs_to_duration, OutputSettings, RenderSettings};
use crate::output::{OutputBackend, OutputDevice};
use crate::render::{RenderHandle, Transition};

const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Interval between ticks; never zero, which `interval` rejects
pub(crate) fn tick_period(update_rate: f64) -> Duration {
    let period = secs_to_duration(1.0 / update_rate, DEFAULT_TICK);
    if period.is_zero() {
        DEFAULT_TICK
    } else {
        period
    }
}

/// Fixed-rate loop that fades output zones towards the latest target colors
pub struct RenderModule {
    backend: Box<dyn OutputBackend>,
    transition: Arc<Mutex<Transition>>,
    update_rate: f64,
    reconnect_attempts: u32,
    reconnect_delay: Duration,
    frames_sent: u64,
}

impl RenderModule {
    pub fn new(
        backend: Box<dyn OutputBackend>,
        render: &RenderSettings,
        output: &OutputSettings,
    ) -> Self {
        Self {
            backend,
            transition: Arc::new(Mutex::new(Transition::new(
                render.transition_speed,
                render.update_rate,
            ))),
            update_rate: render.update_rate,
            reconnect_attempts: output.reconnect_attempts,
            reconnect_delay: Duration::from_millis(output.reconnect_delay_ms),
            frames_sent: 0,
        }
    }

    /// Handle for setting target colors from other tasks and threads
    pub fn handle(&self) -> RenderHandle {
        RenderHandle::new(Arc::clone(&self.transition))
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Try to connect a bounded number of times. `None` when every attempt
    /// failed or shutdown was requested meanwhile.
    async fn connect(
        &self,
        rx: &mut mpsc::Receiver<ModuleEvent>,
    ) -> Option<Box<dyn OutputDevice>> {
        let name = self.backend.name();

        for attempt in 1..=self.reconnect_attempts {
            match until_shutdown(rx, self.backend.connect()).await? {
                Ok(device) => {
                    log::info!("Connected to {}", name);
                    return Some(device);
                }
                Err(e) => log::error!(
                    "Failed to connect to {} (attempt {}/{}): {}",
                    name,
                    attempt,
                    self.reconnect_attempts,
                    e
                ),
            }

            until_shutdown(rx, tokio::time::sleep(self.reconnect_delay)).await?;
        }

        log::error!("Too many connection attempts to {}, giving up", name);
        None
    }
}

#[async_trait]
impl AsyncModule for RenderModule {
    fn id(&self) -> ModuleId {
        ModuleId::Render
    }

    async fn initialize(&mut self) -> ModuleResult {
        log::info!(
            "Initializing render module for {} at {}Hz",
            self.backend.name(),
            self.update_rate
        );
        self.frames_sent = 0;
        Ok(())
    }

    async fn run(
        &mut self,
        mut rx: mpsc::Receiver<ModuleEvent>,
        tx: mpsc::Sender<ModuleMessage>,
    ) -> ModuleResult {
        // the process keeps running without output if the backend never comes up
        let Some(mut device) = self.connect(&mut rx).await else {
            return Ok(());
        };

        let zone_count = device.zones().len();
        let _ = tx.try_send(ModuleMessage::Status(
            ModuleId::Render,
            format!("Rendering to {} zones at {}Hz", zone_count, self.update_rate),
        ));

        let mut ticker = interval(tick_period(self.update_rate));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut output_ok = true;

        loop {
            tokio::select! {
                biased;
                _ = shutdown_requested(&mut rx) => break,
                _ = ticker.tick() => {}
            }

            {
                let mut transition = self.transition.lock();
                transition.advance();
                for zone in 0..zone_count {
                    device.set_zone_color(zone, transition.color_for_zone(zone));
                }
            }

            // flushing can be slow, so it happens without holding the lock
            let mut failed = None;
            for zone in 0..zone_count {
                if let Err(e) = device.show_zone(zone).await {
                    failed = Some(e);
                }
            }

            match failed {
                Some(e) if output_ok => {
                    log::warn!("Failed to update zones: {}", e);
                    output_ok = false;
                }
                None if !output_ok => {
                    log::info!("Zone updates recovered");
                    output_ok = true;
                }
                _ => {}
            }

            self.frames_sent += 1;
        }

        log::info!(
            "Render module shutting down after sending {} frames",
            self.frames_sent
        );
        Ok(())
    }

    async fn shutdown(&mut self) -> ModuleResult {
        log::info!("Render module shutdown complete");
        Ok(())
    }
}
