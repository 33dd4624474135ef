pub mod bridge_module;
pub mod module_manager;
pub mod render_module;
pub mod traits;

// Re-export for convenience
pub use bridge_module::{BridgeModule, SyncState, UpdateCallback};
pub use module_manager::{ManagerError, ModuleManager};
pub use render_module::RenderModule;
pub use traits::{
    shutdown_requested, until_shutdown, AsyncModule, ModuleEvent, ModuleId, ModuleMessage,
    ModuleResult,
};
