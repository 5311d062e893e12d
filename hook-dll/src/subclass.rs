//! START/STOP control protocol and the wrapper procedure.
//!
//! Delivery: the controller hooks the target thread with `WH_CALLWNDPROC`,
//! sends the control message, and unhooks. The hook callback runs on the
//! target thread before the window procedure sees the message, so on START the
//! wrapper is already in place when START is dispatched and answers it with 1.
//! A window that could not be wrapped answers START with 0.

use std::ffi::c_void;
use std::sync::{LazyLock, Mutex};

use hook_shared::filter::Verdict;
use hook_shared::{
    ControlKind, ControllerSlot, HookError, HookResult, StartOutcome, StopOutcome, SubclassHost,
    SubclassTable,
};
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows::Win32::UI::Shell::{DefSubclassProc, RemoveWindowSubclass, SetWindowSubclass};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, GetWindowRect, SendMessageW, CWPSTRUCT, HHOOK, WH_CALLWNDPROC,
};

use crate::chain::{owner_thread, HookChain};
use crate::module;

const SUBCLASS_ID: usize = 0x5748_4B31;

/// Wrapped windows of this process, keyed by handle value.
static SUBCLASSES: LazyLock<Mutex<SubclassTable<isize>>> =
    LazyLock::new(|| Mutex::new(SubclassTable::new()));

struct Win32Host;

fn hwnd(key: isize) -> HWND {
    HWND(key as *mut c_void)
}

impl SubclassHost for Win32Host {
    type Window = isize;

    fn pin_module(&mut self) -> bool {
        module::pin()
    }

    fn unpin_module(&mut self) {
        module::unpin()
    }

    fn attach(&mut self, window: isize) -> bool {
        unsafe { SetWindowSubclass(hwnd(window), Some(frozen_window_proc), SUBCLASS_ID, 0) }
            .as_bool()
    }

    fn detach(&mut self, window: isize) -> bool {
        unsafe { RemoveWindowSubclass(hwnd(window), Some(frozen_window_proc), SUBCLASS_ID) }
            .as_bool()
    }
}

// ============================================================================
// Controller side
// ============================================================================

pub fn subclass_window(controller: HWND, target: HWND) -> HookResult<()> {
    let ctx = module::context();
    let thread_id = owner_thread(target)?;
    let chain = HookChain::install(WH_CALLWNDPROC, Some(control_hook_proc), thread_id)?;
    if let Err(e) = ctx.set_controller(ControllerSlot::Subclass, controller) {
        log::debug!("[subclass] Controller not recorded: {}", e);
    }

    let sequence = ctx.next_sequence();
    let answer =
        unsafe { SendMessageW(target, ctx.ids.start, WPARAM(sequence as usize), LPARAM(0)) };
    drop(chain);

    if answer.0 == 0 {
        return Err(HookError::Replace(format!(
            "{:?} did not acknowledge START",
            target
        )));
    }
    log::info!("[subclass] {:?} is listening (thread {})", target, thread_id);
    Ok(())
}

pub fn unsubclass_window(target: HWND) -> HookResult<()> {
    let ctx = module::context();
    let thread_id = owner_thread(target)?;
    let chain = HookChain::install(WH_CALLWNDPROC, Some(control_hook_proc), thread_id)?;

    let sequence = ctx.next_sequence();
    let _ = unsafe { SendMessageW(target, ctx.ids.stop, WPARAM(sequence as usize), LPARAM(0)) };
    drop(chain);

    if ctx.stop_failed(sequence) {
        return Err(HookError::Replace(format!(
            "{:?} kept the wrapper after STOP",
            target
        )));
    }
    Ok(())
}

// ============================================================================
// Target side
// ============================================================================

fn apply_control(kind: ControlKind, window: HWND, sequence: u32) {
    let Ok(mut table) = SUBCLASSES.lock() else {
        return;
    };
    let mut host = Win32Host;
    let key = window.0 as isize;

    match kind {
        ControlKind::Start => match table.start(&mut host, key, sequence) {
            Ok(StartOutcome::Duplicate | StartOutcome::Ignored) => {}
            Ok(outcome) => log::debug!("[subclass] START {:?}: {:?}", window, outcome),
            Err(e) => log::warn!("[subclass] START {:?}: {}", window, e),
        },
        ControlKind::Stop => match table.stop(&mut host, key, sequence) {
            Ok(StopOutcome::Duplicate | StopOutcome::Ignored) => {}
            Ok(outcome) => log::debug!("[subclass] STOP {:?}: {:?}", window, outcome),
            Err(e) => {
                log::warn!("[subclass] STOP {:?}: {}", window, e);
                module::context().record_failed_stop(sequence);
            }
        },
    }
}

/// WH_CALLWNDPROC procedure: runs in the target process, on the window's thread.
unsafe extern "system" fn control_hook_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code >= 0 && lparam.0 != 0 {
        let call = &*(lparam.0 as *const CWPSTRUCT);
        let ids = module::context().ids;
        let sequence = call.wParam.0 as u32;
        // sequence 0 is a listening toggle for the wrapper alone
        if sequence != 0 {
            if let Some(kind) = ControlKind::from_message(&ids, call.message) {
                apply_control(kind, call.hwnd, sequence);
            }
        }
    }
    CallNextHookEx(HHOOK::default(), code, wparam, lparam)
}

/// The wrapper installed in front of the target window's procedure.
unsafe extern "system" fn frozen_window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
    _subclass_id: usize,
    _ref_data: usize,
) -> LRESULT {
    let ids = module::context().ids;
    let key = hwnd.0 as isize;
    let verdict = match SUBCLASSES.lock() {
        Ok(mut table) => table.filter(&ids, key, msg, wparam.0),
        Err(_) => Verdict::Forward,
    };

    match verdict {
        Verdict::Forward => DefSubclassProc(hwnd, msg, wparam, lparam),
        Verdict::Handled(result) => LRESULT(result),
        Verdict::Freeze => {
            if lparam.0 != 0 {
                let proposed = &mut *(lparam.0 as *mut RECT);
                let _ = GetWindowRect(hwnd, proposed);
            }
            LRESULT(1)
        }
        Verdict::Teardown => {
            if let Ok(mut table) = SUBCLASSES.lock() {
                table.destroyed(&mut Win32Host, key);
            }
            DefSubclassProc(hwnd, msg, wparam, lparam)
        }
    }
}
