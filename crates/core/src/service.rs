use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::bridge::{BridgeApi, HueClient};
use crate::color::{light_state_to_color, RgbColor};
use crate::config::{ConfigManager, Settings};
use crate::light::LightState;
use crate::modules::render_module::tick_period;
use crate::modules::{BridgeModule, ModuleId, ModuleManager, ModuleMessage, RenderModule};
use crate::output::{OpenRgbBackend, OutputBackend};
use crate::render::RenderHandle;

/// Convert every light to a color. Lights whose color can't be interpreted
/// are logged and left out of this update.
pub fn states_to_colors(states: &[LightState]) -> Vec<RgbColor> {
    states
        .iter()
        .filter_map(|state| match light_state_to_color(state) {
            Ok(color) => Some(color),
            Err(e) => {
                log::warn!("Light '{}': {}", state.name(), e);
                None
            }
        })
        .collect()
}

/// Bridge sync and render loop wired together
pub struct HueSync {
    settings: Settings,
    module_manager: ModuleManager,
    render: RenderHandle,
    message_rx: Option<mpsc::Receiver<ModuleMessage>>,
    is_running: bool,
}

impl HueSync {
    /// Build against a real Hue bridge and OpenRGB server
    pub fn new(settings: Settings) -> Result<Self, anyhow::Error> {
        let api = HueClient::new(&settings.bridge.ip, &settings.bridge.username)?;
        let backend = OpenRgbBackend::new(
            &settings.output.host,
            settings.output.port,
            &settings.output.client_name,
        );
        Self::with_backends(settings, Arc::new(api), Box::new(backend))
    }

    /// Build around any bridge and output. Numeric settings are checked here
    /// since the modules turn them into intervals.
    pub fn with_backends(
        settings: Settings,
        api: Arc<dyn BridgeApi>,
        backend: Box<dyn OutputBackend>,
    ) -> Result<Self, anyhow::Error> {
        ConfigManager::validate_ranges(&settings)?;

        let render_module = RenderModule::new(backend, &settings.render, &settings.output);
        let render = render_module.handle();

        let mut bridge_module = BridgeModule::new(api, &settings.bridge);
        let targets = render.clone();
        bridge_module.on_update(Box::new(move |states: &[LightState]| {
            targets.set_targets(states_to_colors(states));
        }));

        let mut module_manager = ModuleManager::new();
        module_manager.register_module(Box::new(render_module));
        module_manager.register_module(Box::new(bridge_module));

        Ok(Self {
            settings,
            module_manager,
            render,
            message_rx: None,
            is_running: false,
        })
    }

    pub fn render_handle(&self) -> RenderHandle {
        self.render.clone()
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// Initialize and start both modules, beginning from black
    pub async fn start(&mut self) -> Result<(), anyhow::Error> {
        log::info!("Starting sync for room '{}'", self.settings.bridge.room);

        self.render.clear_colors();

        self.module_manager.start().await?;

        self.message_rx = self.module_manager.take_message_receiver();
        self.is_running = true;
        Ok(())
    }

    /// Relay module messages until `signal` resolves. A bridge error ends the
    /// wait with that error; render errors are only logged.
    pub async fn run_until<F>(&mut self, signal: F) -> Result<(), anyhow::Error>
    where
        F: Future<Output = ()>,
    {
        let Some(message_rx) = self.message_rx.as_mut() else {
            return Err(anyhow::anyhow!("sync service is not started"));
        };

        tokio::pin!(signal);
        loop {
            tokio::select! {
                _ = &mut signal => return Ok(()),
                message = message_rx.recv() => match message {
                    Some(ModuleMessage::Status(id, status)) => log::debug!("{:?}: {}", id, status),
                    Some(ModuleMessage::Error(ModuleId::Bridge, e)) => {
                        return Err(anyhow::anyhow!("Bridge sync failed: {}", e));
                    }
                    Some(ModuleMessage::Error(id, e)) => log::error!("{:?} module error: {}", id, e),
                    None => return Ok(()),
                },
            }
        }
    }

    /// Fade to black, give the fade time to show, then stop both modules
    pub async fn shutdown(&mut self) -> Result<(), anyhow::Error> {
        if !self.is_running {
            return Ok(());
        }

        log::info!("Exiting...");
        self.render.clear_colors();
        let render = &self.settings.render;
        tokio::time::sleep(tick_period(render.update_rate) * render.shutdown_ticks).await;

        self.module_manager.shutdown().await;

        self.is_running = false;
        Ok(())
    }
}
