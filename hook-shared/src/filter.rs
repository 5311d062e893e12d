//! Message filter run by the wrapper procedure inside the target process.
//!
//! The filter only decides; the Windows glue carries the decision out
//! (writing the rectangle, returning a result, or chaining to the previous
//! procedure).

use crate::shared::MessageIds;

pub const WM_NCDESTROY: u32 = 0x0082;
pub const WM_NCLBUTTONDBLCLK: u32 = 0x00A3;
pub const WM_SYSCOMMAND: u32 = 0x0112;
pub const WM_SIZING: u32 = 0x0214;
pub const WM_MOVING: u32 = 0x0216;

pub const HTCAPTION: usize = 2;

pub const SC_SIZE: usize = 0xF000;
pub const SC_MOVE: usize = 0xF010;
pub const SC_RESTORE: usize = 0xF120;
/// Undocumented caption drag, `SC_MOVE | HTCAPTION`.
pub const SC_DRAGMOVE: usize = 0xF012;

/// What the wrapper does with one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Chain to the previous procedure untouched.
    Forward,
    /// Answer with this value without chaining.
    Handled(isize),
    /// Overwrite the proposed rectangle with the current one, answer `TRUE`.
    Freeze,
    /// Window is being destroyed: drop the entry, then chain.
    Teardown,
}

/// Decide the fate of `msg`, updating `listening` for control messages.
pub fn classify(ids: &MessageIds, listening: &mut bool, msg: u32, wparam: usize) -> Verdict {
    if msg == 0 {
        return Verdict::Forward;
    }
    if msg == ids.start {
        *listening = true;
        return Verdict::Handled(1);
    }
    if msg == ids.stop {
        *listening = false;
        return Verdict::Handled(1);
    }
    if msg == WM_NCDESTROY {
        return Verdict::Teardown;
    }
    if !*listening {
        return Verdict::Forward;
    }

    match msg {
        WM_MOVING | WM_SIZING => Verdict::Freeze,
        WM_NCLBUTTONDBLCLK if wparam == HTCAPTION => Verdict::Handled(0),
        WM_SYSCOMMAND if is_frozen_command(wparam) => Verdict::Handled(0),
        _ => Verdict::Forward,
    }
}

/// `WM_SYSCOMMAND` codes that would move, size or restore the window.
pub fn is_frozen_command(wparam: usize) -> bool {
    if wparam == SC_DRAGMOVE {
        return true;
    }
    // low four bits are used internally by the system
    matches!(wparam & 0xFFF0, SC_RESTORE | SC_MOVE | SC_SIZE)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const IDS: MessageIds = MessageIds {
        start: 0xC0F0,
        stop: 0xC0F1,
        shell: 0xC0F2,
    };

    const WM_MOVE: u32 = 0x0003;
    const SC_MINIMIZE: usize = 0xF020;
    const SC_MAXIMIZE: usize = 0xF030;
    const HTLEFT: usize = 10;

    #[test]
    fn test_start_and_stop_toggle_listening() {
        let mut listening = false;
        assert_eq!(classify(&IDS, &mut listening, IDS.start, 0), Verdict::Handled(1));
        assert!(listening);
        assert_eq!(classify(&IDS, &mut listening, IDS.stop, 0), Verdict::Handled(1));
        assert!(!listening);
    }

    #[test]
    fn test_stop_while_idle_is_still_handled() {
        let mut listening = false;
        assert_eq!(classify(&IDS, &mut listening, IDS.stop, 0), Verdict::Handled(1));
        assert!(!listening);
    }

    #[test]
    fn test_geometry_proposals_frozen_only_while_listening() {
        let mut listening = true;
        assert_eq!(classify(&IDS, &mut listening, WM_MOVING, 0), Verdict::Freeze);
        assert_eq!(classify(&IDS, &mut listening, WM_SIZING, 8), Verdict::Freeze);

        listening = false;
        assert_eq!(classify(&IDS, &mut listening, WM_MOVING, 0), Verdict::Forward);
        assert_eq!(classify(&IDS, &mut listening, WM_SIZING, 8), Verdict::Forward);
    }

    #[test]
    fn test_caption_double_click_suppressed() {
        let mut listening = true;
        assert_eq!(
            classify(&IDS, &mut listening, WM_NCLBUTTONDBLCLK, HTCAPTION),
            Verdict::Handled(0)
        );
        assert_eq!(
            classify(&IDS, &mut listening, WM_NCLBUTTONDBLCLK, HTLEFT),
            Verdict::Forward
        );
    }

    #[test]
    fn test_system_commands() {
        let mut listening = true;
        for cmd in [SC_RESTORE, SC_MOVE, SC_SIZE, SC_DRAGMOVE, SC_SIZE | 0x0004] {
            assert_eq!(
                classify(&IDS, &mut listening, WM_SYSCOMMAND, cmd),
                Verdict::Handled(0),
                "command {cmd:#x}"
            );
        }
        for cmd in [SC_MINIMIZE, SC_MAXIMIZE] {
            assert_eq!(
                classify(&IDS, &mut listening, WM_SYSCOMMAND, cmd),
                Verdict::Forward
            );
        }
    }

    #[test]
    fn test_unrelated_messages_forwarded() {
        let mut listening = true;
        assert_eq!(classify(&IDS, &mut listening, WM_MOVE, 0), Verdict::Forward);
        assert_eq!(classify(&IDS, &mut listening, IDS.shell, 0), Verdict::Forward);
        assert!(listening);
    }

    #[test]
    fn test_destroy_tears_down_regardless_of_listening() {
        let mut listening = false;
        assert_eq!(classify(&IDS, &mut listening, WM_NCDESTROY, 0), Verdict::Teardown);
        listening = true;
        assert_eq!(classify(&IDS, &mut listening, WM_NCDESTROY, 0), Verdict::Teardown);
    }

    #[test]
    fn test_unconfigured_ids_never_match() {
        let ids = MessageIds::default();
        let mut listening = false;
        assert_eq!(classify(&ids, &mut listening, 0, 0), Verdict::Forward);
        assert!(!listening);
    }
}
