//! Per-process module state: our instance handle, the mapped shared record
//! and the resolved message ids.

use std::ffi::c_void;
use std::sync::atomic::{AtomicIsize, AtomicU32, Ordering};
use std::sync::OnceLock;

use hook_shared::config::{
    SHARED_MAPPING_NAME, SHELL_LANGUAGE_MESSAGE_NAME, START_MESSAGE_NAME, STOP_MESSAGE_NAME,
};
use hook_shared::{ControllerSlot, HookError, HookResult, InitOutcome, MessageIds, SharedConfig};
use windows::core::PCWSTR;
use windows::Win32::Foundation::{
    FreeLibrary, HINSTANCE, HMODULE, HWND, INVALID_HANDLE_VALUE, MAX_PATH,
};
use windows::Win32::System::LibraryLoader::{GetModuleFileNameW, LoadLibraryW};
use windows::Win32::System::Memory::{
    CreateFileMappingW, MapViewOfFile, FILE_MAP_ALL_ACCESS, PAGE_READWRITE,
};
use windows::Win32::UI::WindowsAndMessaging::RegisterWindowMessageW;

static INSTANCE: AtomicIsize = AtomicIsize::new(0);
static CONTEXT: OnceLock<ModuleContext> = OnceLock::new();
/// Used for sequence numbers when the shared record is unavailable.
static LOCAL_SEQUENCE: AtomicU32 = AtomicU32::new(0);

pub fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

pub fn set_instance(instance: HINSTANCE) {
    INSTANCE.store(instance.0 as isize, Ordering::Release);
}

pub fn instance() -> HINSTANCE {
    HINSTANCE(INSTANCE.load(Ordering::Acquire) as *mut c_void)
}

fn handle() -> HMODULE {
    HMODULE(INSTANCE.load(Ordering::Acquire) as *mut c_void)
}

pub struct ModuleContext {
    pub ids: MessageIds,
    pub shared: Option<&'static SharedConfig>,
}

impl ModuleContext {
    pub fn controller(&self, slot: ControllerSlot) -> Option<HWND> {
        self.shared
            .and_then(|s| s.controller(slot))
            .map(|h| HWND(h as *mut c_void))
    }

    pub fn set_controller(&self, slot: ControllerSlot, controller: HWND) -> HookResult<()> {
        let shared = self.shared.ok_or(HookError::NotConfigured)?;
        shared.set_controller(slot, controller.0 as isize);
        Ok(())
    }

    /// Record `controller` for `slot` while `install` runs, keeping it only
    /// if the install succeeds.
    pub fn register_controller<T>(
        &self,
        slot: ControllerSlot,
        controller: HWND,
        install: impl FnOnce() -> HookResult<T>,
    ) -> HookResult<T> {
        let shared = self.shared.ok_or(HookError::NotConfigured)?;
        shared.register_controller(slot, controller.0 as isize, install)
    }

    pub fn record_failed_stop(&self, sequence: u32) {
        if let Some(shared) = self.shared {
            shared.record_failed_stop(sequence);
        }
    }

    /// Without the shared record a delivered STOP counts as applied.
    pub fn stop_failed(&self, sequence: u32) -> bool {
        self.shared.is_some_and(|s| s.stop_failed(sequence))
    }

    pub fn next_sequence(&self) -> u32 {
        match self.shared {
            Some(shared) => shared.next_sequence(),
            None => LOCAL_SEQUENCE.fetch_add(1, Ordering::Relaxed).wrapping_add(1),
        }
    }
}

/// Resolve the module context on first use in this process.
pub fn context() -> &'static ModuleContext {
    CONTEXT.get_or_init(|| {
        let local = register_message_ids();
        let shared = match map_shared_config() {
            Ok(shared) => Some(shared),
            Err(e) => {
                log::warn!("[shared] {}", e);
                None
            }
        };

        let ids = match shared {
            Some(config) => {
                if config.initialize(local) == InitOutcome::Published {
                    log::info!("[shared] Configuration record published");
                }
                config.message_ids().unwrap_or(local)
            }
            None => local,
        };

        ModuleContext { ids, shared }
    })
}

fn register(name: &str) -> u32 {
    let name = wide(name);
    unsafe { RegisterWindowMessageW(PCWSTR(name.as_ptr())) }
}

pub fn register_message_ids() -> MessageIds {
    MessageIds {
        start: register(START_MESSAGE_NAME),
        stop: register(STOP_MESSAGE_NAME),
        shell: register(SHELL_LANGUAGE_MESSAGE_NAME),
    }
}

/// Open (or create) the named mapping. The handle stays open for the life of
/// the process, which keeps the record alive for every other loader.
fn map_shared_config() -> HookResult<&'static SharedConfig> {
    let name = wide(SHARED_MAPPING_NAME);
    unsafe {
        let mapping = CreateFileMappingW(
            INVALID_HANDLE_VALUE,
            None,
            PAGE_READWRITE,
            0,
            SharedConfig::SIZE as u32,
            PCWSTR(name.as_ptr()),
        )
        .map_err(|e| HookError::Install(format!("shared mapping: {}", e)))?;

        let view = MapViewOfFile(mapping, FILE_MAP_ALL_ACCESS, 0, 0, SharedConfig::SIZE);
        if view.Value.is_null() {
            return Err(HookError::Install("shared mapping view".into()));
        }
        // Fresh mappings are zero-filled, which is the EMPTY state.
        Ok(&*(view.Value as *const SharedConfig))
    }
}

// ============================================================================
// Module pinning
// ============================================================================

/// Load ourselves once more so a wrapper keeps the code resident after the
/// delivering hook is gone.
pub fn pin() -> bool {
    let mut path = [0u16; MAX_PATH as usize];
    let len = unsafe { GetModuleFileNameW(handle(), &mut path) } as usize;
    if len == 0 || len >= path.len() {
        return false;
    }
    unsafe { LoadLibraryW(PCWSTR(path.as_ptr())) }.is_ok()
}

pub fn unpin() {
    if let Err(e) = unsafe { FreeLibrary(handle()) } {
        log::warn!("[subclass] FreeLibrary failed: {}", e);
    }
}
