use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::traits::{AsyncModule, ModuleEvent, ModuleId, ModuleMessage};

#[derive(Debug, Error, PartialEq)]
pub enum ManagerError {
    #[error("modules are already running")]
    AlreadyRunning,
    #[error("{0:?} module failed to initialize: {1}")]
    Initialize(ModuleId, String),
}

/// A module whose loop runs in its own task
struct ModuleTask {
    id: ModuleId,
    events: mpsc::Sender<ModuleEvent>,
    handle: JoinHandle<()>,
}

/// Runs the sync modules as tokio tasks. Modules start in registration order
/// and all report into one message channel.
pub struct ModuleManager {
    pending: Vec<Box<dyn AsyncModule>>,
    tasks: Vec<ModuleTask>,
    message_tx: mpsc::Sender<ModuleMessage>,
    message_rx: Option<mpsc::Receiver<ModuleMessage>>,
}

impl ModuleManager {
    pub fn new() -> Self {
        let (message_tx, message_rx) = mpsc::channel(100);

        Self {
            pending: Vec::new(),
            tasks: Vec::new(),
            message_tx,
            message_rx: Some(message_rx),
        }
    }

    pub fn register_module(&mut self, module: Box<dyn AsyncModule>) {
        self.pending.push(module);
    }

    /// Initialize every registered module, then spawn their loops. Nothing is
    /// spawned if any module fails to initialize.
    pub async fn start(&mut self) -> Result<(), ManagerError> {
        if self.is_running() {
            return Err(ManagerError::AlreadyRunning);
        }

        for module in &mut self.pending {
            let id = module.id();
            module.initialize().await.map_err(|e| {
                log::error!("Failed to initialize {:?} module: {}", id, e);
                ManagerError::Initialize(id, e.to_string())
            })?;
        }

        for mut module in self.pending.drain(..) {
            let id = module.id();
            let (events, rx) = mpsc::channel(8);
            let tx = self.message_tx.clone();

            let handle = tokio::spawn(async move {
                if let Err(e) = module.run(rx, tx.clone()).await {
                    log::error!("{:?} module stopped: {}", id, e);
                    let _ = tx.send(ModuleMessage::Error(id, e.to_string())).await;
                }
                if let Err(e) = module.shutdown().await {
                    log::warn!("{:?} module shutdown error: {}", id, e);
                }
            });

            log::debug!("Started {:?} module", id);
            self.tasks.push(ModuleTask { id, events, handle });
        }

        Ok(())
    }

    /// Status and error messages from all modules. Only the first call
    /// returns the receiver.
    pub fn take_message_receiver(&mut self) -> Option<mpsc::Receiver<ModuleMessage>> {
        self.message_rx.take()
    }

    /// Ids of the modules whose loops were spawned and not yet joined
    pub fn running_modules(&self) -> Vec<ModuleId> {
        self.tasks.iter().map(|task| task.id).collect()
    }

    pub fn is_running(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Ask every module to stop and wait for its task. Modules that already
    /// ended on their own are just joined.
    pub async fn shutdown(&mut self) {
        for task in &self.tasks {
            if task.events.send(ModuleEvent::Shutdown).await.is_err() {
                log::debug!("{:?} module already stopped", task.id);
            }
        }

        for task in self.tasks.drain(..) {
            if let Err(e) = task.handle.await {
                log::error!("{:?} module task failed: {}", task.id, e);
            }
        }
    }
}

impl Default for ModuleManager {
    fn default() -> Self {
        Self::new()
    }
}
