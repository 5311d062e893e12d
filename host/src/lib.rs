//! Controller-side bindings for the window hook module.
//!
//! A controller process loads `window_hooks.dll` through [`HookLibrary`],
//! asks it to freeze foreign windows or relay shell and tray activity,
//! and turns what arrives at its own window into [`ControllerEvent`]s.

pub mod error;
pub mod events;
pub mod ledger;
#[cfg(target_os = "windows")]
pub mod library;

pub use error::{HostError, HostResult};
pub use events::ControllerEvent;
pub use hook_shared::{MessageIds, TrayAction, TrayNotification};
pub use ledger::SubclassLedger;
#[cfg(target_os = "windows")]
pub use library::{register_message_ids, HookLibrary, DEFAULT_MODULE_NAME};
