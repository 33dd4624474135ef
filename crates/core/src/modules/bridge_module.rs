use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::traits::{
    until_shutdown, AsyncModule, ModuleEvent, ModuleId, ModuleMessage, ModuleResult,
};
use crate::bridge::{discover_room_lights, BridgeApi, BridgeError, LightTable, RoomLight};
use crate::config::{secs_to_duration, BridgeSettings};
use crate::light::LightState;

const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5);

/// Receives the full light table after the initial fetch and after every
/// event batch that changed a tracked light. Runs on the bridge task, so it
/// must return quickly.
pub type UpdateCallback = Box<dyn Fn(&[LightState]) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Discovering,
    Fetching,
    Streaming,
    ErrorBackoff,
    Stopped,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Discovering => "discovering",
            SyncState::Fetching => "fetching",
            SyncState::Streaming => "streaming",
            SyncState::ErrorBackoff => "error_backoff",
            SyncState::Stopped => "stopped",
        }
    }
}

/// Keeps an in-memory copy of a room's light states in sync with the bridge
pub struct BridgeModule {
    api: Arc<dyn BridgeApi>,
    room: String,
    poll_timeout: Duration,
    error_cooldown: Duration,
    room_lights: Vec<RoomLight>,
    table: LightTable,
    callback: Option<UpdateCallback>,
    state: SyncState,
    batches_applied: u64,
}

impl BridgeModule {
    pub fn new(api: Arc<dyn BridgeApi>, settings: &BridgeSettings) -> Self {
        Self {
            api,
            room: settings.room.clone(),
            poll_timeout: secs_to_duration(settings.poll_timeout_secs, DEFAULT_POLL_TIMEOUT),
            error_cooldown: secs_to_duration(settings.error_cooldown_secs, DEFAULT_COOLDOWN),
            room_lights: Vec::new(),
            table: LightTable::new(),
            callback: None,
            state: SyncState::Stopped,
            batches_applied: 0,
        }
    }

    /// Register the callback invoked with the full light table on changes
    pub fn on_update(&mut self, callback: UpdateCallback) {
        self.callback = Some(callback);
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn lights(&self) -> &LightTable {
        &self.table
    }

    fn notify(&self) {
        if let Some(callback) = &self.callback {
            callback(self.table.states());
        }
    }

    fn enter(&mut self, state: SyncState, tx: &mpsc::Sender<ModuleMessage>) {
        if self.state != state {
            log::debug!("Bridge sync: {} -> {}", self.state.as_str(), state.as_str());
            self.state = state;
            let _ = tx.try_send(ModuleMessage::Status(
                ModuleId::Bridge,
                format!("Bridge sync {} ({} lights)", state.as_str(), self.table.len()),
            ));
        }
    }

    async fn fetch_states(&mut self) -> Result<(), BridgeError> {
        self.table.clear();
        for light in &self.room_lights {
            let state = self.api.light(&light.light_id).await?;
            self.table.insert(&light.device_id, state);
        }
        Ok(())
    }
}

#[async_trait]
impl AsyncModule for BridgeModule {
    fn id(&self) -> ModuleId {
        ModuleId::Bridge
    }

    async fn initialize(&mut self) -> ModuleResult {
        log::info!("Initializing bridge module for room '{}'", self.room);
        self.room_lights.clear();
        self.table.clear();
        self.batches_applied = 0;
        Ok(())
    }

    async fn run(
        &mut self,
        mut rx: mpsc::Receiver<ModuleEvent>,
        tx: mpsc::Sender<ModuleMessage>,
    ) -> ModuleResult {
        let mut next = SyncState::Discovering;

        loop {
            self.enter(next, &tx);

            next = match self.state {
                SyncState::Discovering => {
                    let api = Arc::clone(&self.api);
                    match until_shutdown(&mut rx, discover_room_lights(api.as_ref(), &self.room))
                        .await
                    {
                        None => SyncState::Stopped,
                        Some(Ok(lights)) => {
                            self.room_lights = lights;
                            SyncState::Fetching
                        }
                        Some(Err(e)) => {
                            self.enter(SyncState::Stopped, &tx);
                            return Err(e.into());
                        }
                    }
                }

                SyncState::Fetching => match until_shutdown(&mut rx, self.fetch_states()).await {
                    None => SyncState::Stopped,
                    Some(Ok(())) => {
                        // callers get a correct first frame even if no event ever arrives
                        self.notify();
                        log::debug!("Listening for light state changes...");
                        SyncState::Streaming
                    }
                    Some(Err(e)) => {
                        self.enter(SyncState::Stopped, &tx);
                        return Err(e.into());
                    }
                },

                SyncState::Streaming => {
                    let api = Arc::clone(&self.api);
                    match until_shutdown(&mut rx, api.events(self.poll_timeout)).await {
                        None => SyncState::Stopped,
                        Some(Ok(events)) => {
                            if self.table.apply_events(&events) {
                                self.batches_applied += 1;
                                self.notify();
                            }
                            SyncState::Streaming
                        }
                        Some(Err(BridgeError::Timeout)) => SyncState::Streaming,
                        Some(Err(e)) => {
                            log::error!("Request failed: {}", e);
                            SyncState::ErrorBackoff
                        }
                    }
                }

                SyncState::ErrorBackoff => {
                    match until_shutdown(&mut rx, tokio::time::sleep(self.error_cooldown)).await {
                        None => SyncState::Stopped,
                        Some(()) => SyncState::Streaming,
                    }
                }

                SyncState::Stopped => break,
            };
        }

        log::info!(
            "Bridge module stopped after {} update batches",
            self.batches_applied
        );
        Ok(())
    }

    async fn shutdown(&mut self) -> ModuleResult {
        self.state = SyncState::Stopped;
        log::info!("Bridge module shutdown complete");
        Ok(())
    }
}
