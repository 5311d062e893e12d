//! Shell-event and tray relays.
//!
//! Both hooks live in every process the OS injects them into; they find the
//! controller through the shared record and forward matching events to it.

use std::slice;

use hook_shared::config::TRAY_WINDOW_CLASS;
use hook_shared::relay::{relay_shell_event, relay_tray_copydata, WM_COPYDATA};
use hook_shared::{ControllerSlot, HookError, HookResult, ShellVerdict};
use windows::core::PCWSTR;
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::DataExchange::COPYDATASTRUCT;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, FindWindowW, CWPRETSTRUCT, HHOOK, WH_CALLWNDPROCRET, WH_SHELL,
};

use crate::chain::{owner_thread, HookChain, HookSlot};
use crate::module::{self, wide};
use crate::sink::WindowSink;

static SHELL_HOOK: HookSlot = HookSlot::new();
static TRAY_HOOK: HookSlot = HookSlot::new();

// ============================================================================
// Shell relay
// ============================================================================

pub fn register_shell_hook(controller: HWND) -> HookResult<()> {
    let chain = module::context().register_controller(ControllerSlot::Shell, controller, || {
        HookChain::install(WH_SHELL, Some(shell_hook_proc), 0)
    })?;
    SHELL_HOOK.replace(chain);
    log::info!("[shell] Relay registered for {:?}", controller);
    Ok(())
}

pub fn unregister_shell_hook() -> bool {
    SHELL_HOOK.clear()
}

/// WH_SHELL procedure, runs inside every process receiving shell events.
unsafe extern "system" fn shell_hook_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code >= 0 {
        let ctx = module::context();
        if let Some(controller) = ctx.controller(ControllerSlot::Shell) {
            let sink = WindowSink(controller);
            if relay_shell_event(&sink, ctx.ids.shell, code, wparam.0, lparam.0)
                == ShellVerdict::Consumed
            {
                return LRESULT(0);
            }
        }
    }
    CallNextHookEx(HHOOK::default(), code, wparam, lparam)
}

// ============================================================================
// Tray relay
// ============================================================================

fn find_tray_window() -> HookResult<HWND> {
    let class = wide(TRAY_WINDOW_CLASS);
    unsafe { FindWindowW(PCWSTR(class.as_ptr()), PCWSTR::null()) }
        .ok()
        .filter(|h| !h.is_invalid())
        .ok_or_else(|| HookError::WindowGone(TRAY_WINDOW_CLASS.into()))
}

pub fn register_tray_hook(controller: HWND) -> HookResult<()> {
    let tray = find_tray_window()?;
    let thread_id = owner_thread(tray)?;
    let chain = module::context().register_controller(ControllerSlot::Tray, controller, || {
        HookChain::install(WH_CALLWNDPROCRET, Some(tray_hook_proc), thread_id)
    })?;
    TRAY_HOOK.replace(chain);
    log::info!("[tray] Relay registered on shell thread {}", thread_id);
    Ok(())
}

pub fn unregister_tray_hook() -> bool {
    TRAY_HOOK.clear()
}

/// WH_CALLWNDPROCRET procedure, runs on the tray window's thread.
unsafe extern "system" fn tray_hook_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code >= 0 && lparam.0 != 0 {
        let ret = &*(lparam.0 as *const CWPRETSTRUCT);
        if ret.message == WM_COPYDATA && ret.lParam.0 != 0 {
            if let Some(controller) = module::context().controller(ControllerSlot::Tray) {
                let data = &*(ret.lParam.0 as *const COPYDATASTRUCT);
                let payload: &[u8] = if data.lpData.is_null() || data.cbData == 0 {
                    &[]
                } else {
                    slice::from_raw_parts(data.lpData as *const u8, data.cbData as usize)
                };
                relay_tray_copydata(
                    &WindowSink(controller),
                    data.dwData,
                    payload,
                    ret.wParam.0,
                    ret.lParam.0,
                );
            }
        }
    }
    CallNextHookEx(HHOOK::default(), code, wparam, lparam)
}
