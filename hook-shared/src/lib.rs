//! Platform-independent half of the window hook module.
//!
//! Everything here is pure decision logic over plain integers, so the
//! injected module, the controller bindings and the tests agree on it:
//! - `config`: protocol names and constants
//! - `shared`: the cross-process configuration record
//! - `filter`: what the wrapper procedure does with each message
//! - `subclass`: per-window wrapper bookkeeping and its OS seam
//! - `relay` / `tray`: shell and tray forwarding decisions
//! - `slot`: long-lived hook registrations

pub mod config;
pub mod error;
pub mod filter;
pub mod relay;
pub mod shared;
pub mod slot;
pub mod subclass;
pub mod tray;

pub use error::{HookError, HookResult};
pub use filter::Verdict;
pub use relay::{ControllerSink, ShellVerdict, TrayVerdict};
pub use shared::{ControllerSlot, InitOutcome, MessageIds, SharedConfig};
pub use slot::HandleSlot;
pub use subclass::{ControlKind, StartOutcome, StopOutcome, SubclassHost, SubclassTable};
pub use tray::{TrayAction, TrayNotification};
