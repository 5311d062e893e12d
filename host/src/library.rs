//! Typed access to the hook module's exports.
//!
//! Each export returns a Win32 `BOOL`; a `FALSE` becomes
//! [`HostError::Operation`] naming the export. Dropping the library undoes
//! every subclass it is still holding and unregisters both relays.

use std::ffi::c_void;
use std::os::windows::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use hook_shared::config::{
    SHELL_LANGUAGE_MESSAGE_NAME, START_MESSAGE_NAME, STOP_MESSAGE_NAME,
};
use hook_shared::relay::WM_COPYDATA;
use hook_shared::MessageIds;
use log::{info, warn};
use windows::core::{PCSTR, PCWSTR};
use windows::Win32::Foundation::{BOOL, FreeLibrary, HMODULE, HWND, LPARAM, WPARAM};
use windows::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};
use windows::Win32::UI::WindowsAndMessaging::{
    ChangeWindowMessageFilterEx, RegisterWindowMessageW, SendNotifyMessageW, MSGFLT_ALLOW,
};

use crate::error::{HostError, HostResult};
use crate::events::ControllerEvent;
use crate::ledger::SubclassLedger;

/// File name produced by the `window-hooks` crate.
pub const DEFAULT_MODULE_NAME: &str = "window_hooks.dll";

type RegisterFn = unsafe extern "system" fn(HWND) -> BOOL;
type UnregisterFn = unsafe extern "system" fn() -> BOOL;
type SubclassFn = unsafe extern "system" fn(HWND, HWND) -> BOOL;
type UnsubclassFn = unsafe extern "system" fn(HWND) -> BOOL;

struct Exports {
    register_shell: RegisterFn,
    unregister_shell: UnregisterFn,
    register_tray: RegisterFn,
    unregister_tray: UnregisterFn,
    subclass: SubclassFn,
    unsubclass: UnsubclassFn,
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn hwnd(raw: isize) -> HWND {
    HWND(raw as *mut c_void)
}

/// Resolve the registered message ids in this process.
pub fn register_message_ids() -> MessageIds {
    let register = |name: &str| {
        let name = wide(name);
        unsafe { RegisterWindowMessageW(PCWSTR(name.as_ptr())) }
    };
    MessageIds {
        start: register(START_MESSAGE_NAME),
        stop: register(STOP_MESSAGE_NAME),
        shell: register(SHELL_LANGUAGE_MESSAGE_NAME),
    }
}

unsafe fn resolve<F: Copy>(module: HMODULE, name: &'static str) -> HostResult<F> {
    let symbol = format!("{}\0", name);
    let proc = GetProcAddress(module, PCSTR(symbol.as_ptr()))
        .ok_or(HostError::MissingExport(name))?;
    Ok(std::mem::transmute_copy(&proc))
}

fn check(ok: BOOL, op: &'static str) -> HostResult<()> {
    if ok.as_bool() {
        Ok(())
    } else {
        Err(HostError::Operation(op))
    }
}

pub struct HookLibrary {
    module: isize,
    exports: Exports,
    ids: MessageIds,
    ledger: Mutex<SubclassLedger>,
    shell_registered: AtomicBool,
    tray_registered: AtomicBool,
}

impl HookLibrary {
    /// Load the module from the directory of the running executable.
    pub fn load_default() -> HostResult<Self> {
        let exe = std::env::current_exe()?;
        let dir = exe
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::load(dir.join(DEFAULT_MODULE_NAME))
    }

    pub fn load(path: impl AsRef<Path>) -> HostResult<Self> {
        let path = path.as_ref();
        let wide_path: Vec<u16> = path
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        let module = unsafe { LoadLibraryW(PCWSTR(wide_path.as_ptr())) }
            .map_err(|e| HostError::Load(format!("{}: {}", path.display(), e)))?;

        let exports = unsafe {
            (|| -> HostResult<Exports> {
                Ok(Exports {
                    register_shell: resolve(module, "RegisterGlobalShellHook")?,
                    unregister_shell: resolve(module, "UnregisterGlobalShellHook")?,
                    register_tray: resolve(module, "RegisterSystemTrayHook")?,
                    unregister_tray: resolve(module, "UnregisterSystemTrayHook")?,
                    subclass: resolve(module, "SubclassWindow")?,
                    unsubclass: resolve(module, "UnsubclassWindow")?,
                })
            })()
        };
        let exports = match exports {
            Ok(exports) => exports,
            Err(e) => {
                let _ = unsafe { FreeLibrary(module) };
                return Err(e);
            }
        };

        info!("[host] Loaded hook module {}", path.display());
        Ok(Self {
            module: module.0 as isize,
            exports,
            ids: register_message_ids(),
            ledger: Mutex::new(SubclassLedger::new()),
            shell_registered: AtomicBool::new(false),
            tray_registered: AtomicBool::new(false),
        })
    }

    pub fn message_ids(&self) -> MessageIds {
        self.ids
    }

    // ========================================================================
    // Relays
    // ========================================================================

    pub fn register_global_shell_hook(&self, controller: HWND) -> HostResult<()> {
        check(
            unsafe { (self.exports.register_shell)(controller) },
            "RegisterGlobalShellHook",
        )?;
        self.shell_registered.store(true, Ordering::Release);
        Ok(())
    }

    pub fn unregister_global_shell_hook(&self) -> HostResult<()> {
        check(
            unsafe { (self.exports.unregister_shell)() },
            "UnregisterGlobalShellHook",
        )?;
        self.shell_registered.store(false, Ordering::Release);
        Ok(())
    }

    pub fn register_system_tray_hook(&self, controller: HWND) -> HostResult<()> {
        check(
            unsafe { (self.exports.register_tray)(controller) },
            "RegisterSystemTrayHook",
        )?;
        self.tray_registered.store(true, Ordering::Release);
        Ok(())
    }

    pub fn unregister_system_tray_hook(&self) -> HostResult<()> {
        check(
            unsafe { (self.exports.unregister_tray)() },
            "UnregisterSystemTrayHook",
        )?;
        self.tray_registered.store(false, Ordering::Release);
        Ok(())
    }

    /// Let relayed messages through UIPI when the controller runs elevated.
    pub fn allow_relay_messages(&self, controller: HWND) -> HostResult<()> {
        for msg in [self.ids.shell, WM_COPYDATA] {
            unsafe { ChangeWindowMessageFilterEx(controller, msg, MSGFLT_ALLOW, None) }
                .map_err(|e| HostError::Os(format!("message filter {:#x}: {}", msg, e)))?;
        }
        Ok(())
    }

    // ========================================================================
    // Subclassing
    // ========================================================================

    pub fn subclass_window(&self, controller: HWND, target: HWND) -> HostResult<()> {
        check(
            unsafe { (self.exports.subclass)(controller, target) },
            "SubclassWindow",
        )?;
        if let Ok(mut ledger) = self.ledger.lock() {
            ledger.add(target.0 as isize);
        }
        Ok(())
    }

    pub fn unsubclass_window(&self, target: HWND) -> HostResult<()> {
        check(
            unsafe { (self.exports.unsubclass)(target) },
            "UnsubclassWindow",
        )?;
        if let Ok(mut ledger) = self.ledger.lock() {
            ledger.remove(target.0 as isize);
        }
        Ok(())
    }

    /// Let a subclassed window move and resize again, keeping the wrapper.
    pub fn pause_listening(&self, target: HWND) -> HostResult<()> {
        self.notify(target, self.ids.stop)
    }

    /// Freeze a paused window again.
    pub fn resume_listening(&self, target: HWND) -> HostResult<()> {
        self.notify(target, self.ids.start)
    }

    fn notify(&self, target: HWND, msg: u32) -> HostResult<()> {
        // sequence 0: never mistaken for a hook delivery
        unsafe { SendNotifyMessageW(target, msg, WPARAM(0), LPARAM(0)) }
            .map_err(|e| HostError::Os(format!("notify {:?}: {}", target, e)))
    }

    /// Decode a message received by the controller window.
    ///
    /// # Safety
    /// See [`ControllerEvent::decode`].
    pub unsafe fn decode(&self, msg: u32, wparam: usize, lparam: isize) -> Option<ControllerEvent> {
        ControllerEvent::decode(&self.ids, msg, wparam, lparam)
    }
}

impl Drop for HookLibrary {
    fn drop(&mut self) {
        let outstanding = match self.ledger.lock() {
            Ok(mut ledger) => ledger.drain(),
            Err(_) => Vec::new(),
        };
        for (window, count) in outstanding {
            for _ in 0..count {
                if !unsafe { (self.exports.unsubclass)(hwnd(window)) }.as_bool() {
                    warn!("[host] Could not unsubclass {:#x} on shutdown", window);
                    break;
                }
            }
        }

        if self.shell_registered.swap(false, Ordering::AcqRel) {
            let _ = unsafe { (self.exports.unregister_shell)() };
        }
        if self.tray_registered.swap(false, Ordering::AcqRel) {
            let _ = unsafe { (self.exports.unregister_tray)() };
        }

        let _ = unsafe { FreeLibrary(HMODULE(self.module as *mut c_void)) };
        info!("[host] Hook module released");
    }
}
