//! Window hook module: freezes foreign windows and relays shell events.
//!
//! The controller loads this DLL and calls the exports below. Windows then
//! maps the same DLL into other processes whenever one of our hooks fires
//! there:
//! - `SubclassWindow` / `UnsubclassWindow`: a transient WH_CALLWNDPROC hook on
//!   the target window's thread carries START/STOP; the hook callback wraps
//!   the window so move, size and restore requests leave it where it is.
//! - `RegisterGlobalShellHook`: WH_SHELL everywhere; input-language changes
//!   are posted to the controller as `GLOBAL_SHELL_HOOK`.
//! - `RegisterSystemTrayHook`: WH_CALLWNDPROCRET on the taskbar thread;
//!   `Shell_NotifyIcon` payloads are forwarded as WM_COPYDATA.
//!
//! Cross-process state lives in the named `SharedConfig` mapping (controller
//! handles and message ids), opened lazily by every process on first use.
//!
//! The module never installs a logger; records only appear when the
//! controller process has one.

#![cfg(target_os = "windows")]

mod chain;
mod module;
mod relays;
mod sink;
mod subclass;

use windows::Win32::Foundation::*;
use windows::Win32::System::LibraryLoader::DisableThreadLibraryCalls;
use windows::Win32::System::SystemServices::DLL_PROCESS_ATTACH;

/// # Safety
/// Called by the Windows loader with valid parameters.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "system" fn DllMain(
    dll_instance: HINSTANCE,
    reason: u32,
    _reserved: *const core::ffi::c_void,
) -> BOOL {
    if reason == DLL_PROCESS_ATTACH {
        module::set_instance(dll_instance);
        let _ = DisableThreadLibraryCalls(HMODULE(dll_instance.0));
    }
    TRUE
}

fn report(op: &str, result: hook_shared::HookResult<()>) -> BOOL {
    match result {
        Ok(()) => TRUE,
        Err(e) => {
            log::warn!("[{}] {}", op, e);
            FALSE
        }
    }
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn RegisterGlobalShellHook(controller: HWND) -> BOOL {
    report("shell", relays::register_shell_hook(controller))
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn UnregisterGlobalShellHook() -> BOOL {
    relays::unregister_shell_hook().into()
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn RegisterSystemTrayHook(controller: HWND) -> BOOL {
    report("tray", relays::register_tray_hook(controller))
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn UnregisterSystemTrayHook() -> BOOL {
    relays::unregister_tray_hook().into()
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn SubclassWindow(controller: HWND, target: HWND) -> BOOL {
    report("subclass", subclass::subclass_window(controller, target))
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn UnsubclassWindow(target: HWND) -> BOOL {
    report("subclass", subclass::unsubclass_window(target))
}
