//! Fixed names and numbers every participant must agree on.
//!
//! The hook module, the controller and every injected copy of the module
//! resolve the same values from here, so changing any of them is a protocol
//! break and must come with a bump of [`SHARED_LAYOUT_VERSION`].

use std::time::Duration;

// ============================================================================
// Registered window messages
// ============================================================================

/// Posted to the controller when the input language changes.
pub const SHELL_LANGUAGE_MESSAGE_NAME: &str = "GLOBAL_SHELL_HOOK";
/// Starts listening (and, through the hook, installs the wrapper).
pub const START_MESSAGE_NAME: &str = "START_WINDOW_PROC";
/// Stops listening (and, through the hook, removes the wrapper).
pub const STOP_MESSAGE_NAME: &str = "STOP_WINDOW_PROC";

// ============================================================================
// Shared configuration record
// ============================================================================

/// Name of the page-file backed mapping holding [`crate::SharedConfig`].
pub const SHARED_MAPPING_NAME: &str = "Local\\WindowHooks.SharedConfig.v2";
/// "WHSC" in little endian; guards against a foreign mapping with our name.
pub const SHARED_MAGIC: u32 = 0x4353_4857;
pub const SHARED_LAYOUT_VERSION: u32 = 2;

// ============================================================================
// Tray relay
// ============================================================================

/// Class of the window whose thread receives `Shell_NotifyIcon` traffic.
pub const TRAY_WINDOW_CLASS: &str = "Shell_TrayWnd";
/// `COPYDATASTRUCT::dwData` tag used by `Shell_NotifyIcon`.
pub const SH_TRAY_DATA: usize = 1;
/// Leading marker of every `SHELLTRAYDATA` payload.
pub const SHELL_TRAY_MAGIC: u32 = 0x3475_3423;
/// Upper bound on how long the shell thread may wait for the controller.
pub const TRAY_RELAY_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Shell relay
// ============================================================================

/// `HSHELL_LANGUAGE`
pub const HSHELL_LANGUAGE: i32 = 8;
