use std::future::Future;

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Unique identifier for each module type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleId {
    Bridge,
    Render,
}

/// Events sent from the manager to modules
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleEvent {
    /// Stop the module's loop at its next boundary
    Shutdown,
}

/// Messages passed from modules back to the module manager
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleMessage {
    Status(ModuleId, String),
    Error(ModuleId, String),
}

pub type ModuleResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Trait that all async modules must implement
#[async_trait]
pub trait AsyncModule: Send + Sync {
    /// Get the unique identifier for this module
    fn id(&self) -> ModuleId;

    /// Initialize the module (called once at startup)
    async fn initialize(&mut self) -> ModuleResult;

    /// Start the module's main loop. Returns once a shutdown event arrives
    /// or the loop cannot continue.
    async fn run(
        &mut self,
        rx: mpsc::Receiver<ModuleEvent>,
        tx: mpsc::Sender<ModuleMessage>,
    ) -> ModuleResult;

    /// Shutdown the module gracefully, after `run` returned
    async fn shutdown(&mut self) -> ModuleResult;
}

/// Resolves once a shutdown event arrives or the manager goes away
pub async fn shutdown_requested(rx: &mut mpsc::Receiver<ModuleEvent>) {
    while let Some(event) = rx.recv().await {
        if event == ModuleEvent::Shutdown {
            return;
        }
    }
}

/// Drive `fut` to completion unless shutdown is requested first, in which
/// case `fut` is dropped and `None` is returned
pub async fn until_shutdown<F: Future>(
    rx: &mut mpsc::Receiver<ModuleEvent>,
    fut: F,
) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = shutdown_requested(rx) => None,
        output = fut => Some(output),
    }
}
