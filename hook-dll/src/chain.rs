//! Hook installation.
//!
//! [`HookChain`] is the transient, thread-scoped hook that carries one control
//! message into a target thread; it unhooks when dropped. The relays keep
//! their hook for longer and park the raw handle in a [`HookSlot`].

use std::ffi::c_void;

use hook_shared::{HandleSlot, HookError, HookResult};
use windows::Win32::Foundation::HWND;
use windows::Win32::UI::WindowsAndMessaging::{
    GetWindowThreadProcessId, SetWindowsHookExW, UnhookWindowsHookEx, HHOOK, HOOKPROC,
    WINDOWS_HOOK_ID,
};

use crate::module;

pub struct HookChain {
    hook: HHOOK,
    thread_id: u32,
}

impl HookChain {
    /// `thread_id == 0` installs a desktop-wide hook.
    pub fn install(kind: WINDOWS_HOOK_ID, proc: HOOKPROC, thread_id: u32) -> HookResult<Self> {
        let hook = unsafe { SetWindowsHookExW(kind, proc, module::instance(), thread_id) }
            .map_err(|e| HookError::Install(format!("thread {}: {}", thread_id, e)))?;
        log::debug!("[hook] Installed {:?} on thread {}", kind, thread_id);
        Ok(Self { hook, thread_id })
    }

    /// Keep the hook installed past this guard.
    fn into_raw(self) -> isize {
        let raw = self.hook.0 as isize;
        std::mem::forget(self);
        raw
    }
}

impl Drop for HookChain {
    fn drop(&mut self) {
        if let Err(e) = unsafe { UnhookWindowsHookEx(self.hook) } {
            log::warn!("[hook] Unhook on thread {} failed: {}", self.thread_id, e);
        }
    }
}

/// Thread owning `window`.
pub fn owner_thread(window: HWND) -> HookResult<u32> {
    match unsafe { GetWindowThreadProcessId(window, None) } {
        0 => Err(HookError::WindowGone(format!("{:?}", window))),
        thread_id => Ok(thread_id),
    }
}

/// A long-lived hook registration.
pub struct HookSlot(HandleSlot);

impl HookSlot {
    pub const fn new() -> Self {
        Self(HandleSlot::new())
    }

    /// Store `chain`, removing whatever was registered before.
    pub fn replace(&self, chain: HookChain) {
        self.0.replace(chain.into_raw(), unhook);
    }

    /// Remove the registration; an empty slot counts as success.
    pub fn clear(&self) -> bool {
        self.0.clear(unhook)
    }
}

fn unhook(raw: isize) -> bool {
    unsafe { UnhookWindowsHookEx(HHOOK(raw as *mut c_void)) }.is_ok()
}
