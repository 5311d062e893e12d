//! Shell and tray relays: which events reach the controller, and how.

use std::time::Duration;

use crate::config::{HSHELL_LANGUAGE, TRAY_RELAY_TIMEOUT};
use crate::error::{HookError, HookResult};
use crate::tray::is_tray_payload;

pub const WM_COPYDATA: u32 = 0x004A;

/// The controller's message queue, seen from a hook callback.
pub trait ControllerSink {
    /// Fire-and-forget.
    fn post(&self, msg: u32, wparam: usize, lparam: isize) -> bool;
    /// Blocking send that gives up after `timeout`.
    fn send_bounded(
        &self,
        msg: u32,
        wparam: usize,
        lparam: isize,
        timeout: Duration,
    ) -> HookResult<isize>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellVerdict {
    /// Relayed; the hook returns 0 without chaining.
    Consumed,
    PassThrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayVerdict {
    Relayed,
    Ignored,
    /// Matched but the controller did not answer in time.
    Dropped,
}

/// Forward an input-language change, parameters untouched.
pub fn relay_shell_event<S: ControllerSink>(
    sink: &S,
    shell_message: u32,
    code: i32,
    wparam: usize,
    lparam: isize,
) -> ShellVerdict {
    if code != HSHELL_LANGUAGE || shell_message == 0 {
        return ShellVerdict::PassThrough;
    }
    if !sink.post(shell_message, wparam, lparam) {
        log::debug!("[shell] Language change post failed");
    }
    ShellVerdict::Consumed
}

/// Forward a tray `WM_COPYDATA` if it carries icon data.
///
/// `wparam`/`lparam` are the original message parameters; the OS marshals
/// the copy-data block again for the controller.
pub fn relay_tray_copydata<S: ControllerSink>(
    sink: &S,
    tag: usize,
    payload: &[u8],
    wparam: usize,
    lparam: isize,
) -> TrayVerdict {
    if !is_tray_payload(tag, payload) {
        return TrayVerdict::Ignored;
    }
    match sink.send_bounded(WM_COPYDATA, wparam, lparam, TRAY_RELAY_TIMEOUT) {
        Ok(_) => TrayVerdict::Relayed,
        Err(HookError::Timeout(waited)) => {
            log::warn!("[tray] Controller unresponsive for {:?}, event dropped", waited);
            TrayVerdict::Dropped
        }
        Err(e) => {
            log::warn!("[tray] Relay failed: {}", e);
            TrayVerdict::Dropped
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
