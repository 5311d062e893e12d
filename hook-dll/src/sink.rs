use std::time::Duration;

use hook_shared::{ControllerSink, HookError, HookResult};
use windows::Win32::Foundation::{GetLastError, ERROR_TIMEOUT, HWND, LPARAM, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{PostMessageW, SendMessageTimeoutW, SMTO_ABORTIFHUNG};

/// The controller window, addressed from inside a hook callback.
pub struct WindowSink(pub HWND);

impl ControllerSink for WindowSink {
    fn post(&self, msg: u32, wparam: usize, lparam: isize) -> bool {
        unsafe { PostMessageW(self.0, msg, WPARAM(wparam), LPARAM(lparam)) }.is_ok()
    }

    fn send_bounded(
        &self,
        msg: u32,
        wparam: usize,
        lparam: isize,
        timeout: Duration,
    ) -> HookResult<isize> {
        let mut result: usize = 0;
        let sent = unsafe {
            SendMessageTimeoutW(
                self.0,
                msg,
                WPARAM(wparam),
                LPARAM(lparam),
                SMTO_ABORTIFHUNG,
                timeout.as_millis() as u32,
                Some(&mut result),
            )
        };
        if sent.0 != 0 {
            return Ok(result as isize);
        }
        if unsafe { GetLastError() } == ERROR_TIMEOUT {
            Err(HookError::Timeout(timeout))
        } else {
            Err(HookError::WindowGone(format!("controller {:?}", self.0)))
        }
    }
}
