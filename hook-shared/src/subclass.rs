//! Subclass bookkeeping inside the target process.
//!
//! One [`SubclassTable`] lives in every process the module is injected into.
//! It owns the per-window state the wrapper procedure needs and pairs every
//! wrapper install with exactly one module pin.
//!
//! Policy for repeated control messages:
//!   - START on a window that already has the wrapper bumps a reference count.
//!   - STOP drops one reference; the last one removes the wrapper.
//!   - STOP on a window without the wrapper does nothing and succeeds.
//!   - A control delivery seen twice (two hooks from the same module on one
//!     thread) is recognised by its sequence number and applied once.
//!   - Sequence 0 marks a listening toggle meant only for the wrapper; the
//!     table never applies it.
//!
//! A window destroyed while wrapped loses its entry immediately, but its
//! module pin is only released by the next control delivery: the destroy
//! notification runs inside the wrapper, and no hook holds the module then.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{HookError, HookResult};
use crate::filter::{classify, Verdict};
use crate::shared::MessageIds;

/// OS operations the table drives. Implemented over Win32 by the hook module.
pub trait SubclassHost {
    type Window: Copy + Eq + Hash + Debug;

    /// Take an extra reference on the module so its code outlives the hook.
    fn pin_module(&mut self) -> bool;
    fn unpin_module(&mut self);
    /// Put the wrapper procedure in front of the window's current one.
    fn attach(&mut self, window: Self::Window) -> bool;
    fn detach(&mut self, window: Self::Window) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Start,
    Stop,
}

impl ControlKind {
    pub fn from_message(ids: &MessageIds, msg: u32) -> Option<Self> {
        if msg == 0 {
            None
        } else if msg == ids.start {
            Some(Self::Start)
        } else if msg == ids.stop {
            Some(Self::Stop)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Installed,
    AlreadyInstalled { refs: usize },
    Duplicate,
    /// Sequence 0: a toggle, not a delivery.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Removed,
    Released { remaining: usize },
    NotSubclassed,
    Duplicate,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SubclassEntry {
    refs: usize,
    listening: bool,
    last_sequence: u32,
}

impl SubclassEntry {
    fn seen(&self, sequence: u32) -> bool {
        self.last_sequence == sequence
    }
}

#[derive(Debug)]
pub struct SubclassTable<W> {
    entries: HashMap<W, SubclassEntry>,
    orphaned_pins: usize,
}

impl<W> Default for SubclassTable<W> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            orphaned_pins: 0,
        }
    }
}

impl<W: Copy + Eq + Hash + Debug> SubclassTable<W> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, window: W) -> bool {
        self.entries.contains_key(&window)
    }

    pub fn is_listening(&self, window: W) -> bool {
        self.entries.get(&window).is_some_and(|e| e.listening)
    }

    pub fn refs(&self, window: W) -> usize {
        self.entries.get(&window).map_or(0, |e| e.refs)
    }

    pub fn orphaned_pins(&self) -> usize {
        self.orphaned_pins
    }

    fn release_orphans<H>(&mut self, host: &mut H)
    where
        H: SubclassHost<Window = W>,
    {
        while self.orphaned_pins > 0 {
            host.unpin_module();
            self.orphaned_pins -= 1;
        }
    }

    /// Handle a START delivered through the hook.
    pub fn start<H>(&mut self, host: &mut H, window: W, sequence: u32) -> HookResult<StartOutcome>
    where
        H: SubclassHost<Window = W>,
    {
        if sequence == 0 {
            return Ok(StartOutcome::Ignored);
        }
        self.release_orphans(host);
        if let Some(entry) = self.entries.get_mut(&window) {
            if entry.seen(sequence) {
                return Ok(StartOutcome::Duplicate);
            }
            entry.refs += 1;
            entry.listening = true;
            entry.last_sequence = sequence;
            log::debug!("[subclass] {:?} already wrapped, refs={}", window, entry.refs);
            return Ok(StartOutcome::AlreadyInstalled { refs: entry.refs });
        }

        if !host.pin_module() {
            return Err(HookError::Replace(format!(
                "could not pin module for {:?}",
                window
            )));
        }
        if !host.attach(window) {
            host.unpin_module();
            return Err(HookError::Replace(format!(
                "{:?} has no replaceable procedure",
                window
            )));
        }

        self.entries.insert(
            window,
            SubclassEntry {
                refs: 1,
                listening: true,
                last_sequence: sequence,
            },
        );
        log::info!("[subclass] Wrapper installed on {:?}", window);
        Ok(StartOutcome::Installed)
    }

    /// Handle a STOP delivered through the hook.
    pub fn stop<H>(&mut self, host: &mut H, window: W, sequence: u32) -> HookResult<StopOutcome>
    where
        H: SubclassHost<Window = W>,
    {
        if sequence == 0 {
            return Ok(StopOutcome::Ignored);
        }
        self.release_orphans(host);
        let Some(entry) = self.entries.get_mut(&window) else {
            log::debug!("[subclass] STOP for unwrapped {:?} ignored", window);
            return Ok(StopOutcome::NotSubclassed);
        };
        if entry.seen(sequence) {
            return Ok(StopOutcome::Duplicate);
        }
        entry.last_sequence = sequence;
        entry.listening = false;

        if entry.refs > 1 {
            entry.refs -= 1;
            return Ok(StopOutcome::Released {
                remaining: entry.refs,
            });
        }

        if !host.detach(window) {
            return Err(HookError::Replace(format!(
                "could not restore the original procedure of {:?}",
                window
            )));
        }
        self.entries.remove(&window);
        host.unpin_module();
        log::info!("[subclass] Wrapper removed from {:?}", window);
        Ok(StopOutcome::Removed)
    }

    /// The window is being destroyed with the wrapper still in place.
    pub fn destroyed<H>(&mut self, host: &mut H, window: W) -> bool
    where
        H: SubclassHost<Window = W>,
    {
        if self.entries.remove(&window).is_none() {
            return false;
        }
        let _ = host.detach(window);
        self.orphaned_pins += 1;
        log::info!("[subclass] {:?} destroyed while wrapped", window);
        true
    }

    /// Run the message filter against `window`'s listening flag.
    pub fn filter(&mut self, ids: &MessageIds, window: W, msg: u32, wparam: usize) -> Verdict {
        match self.entries.get_mut(&window) {
            Some(entry) => classify(ids, &mut entry.listening, msg, wparam),
            None => Verdict::Forward,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{WM_MOVING, WM_NCDESTROY, WM_SIZING};

    const IDS: MessageIds = MessageIds {
        start: 0xC200,
        stop: 0xC201,
        shell: 0xC202,
    };

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    struct Rect {
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
    }

    impl Rect {
        const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
            Self {
                left,
                top,
                right,
                bottom,
            }
        }
    }

    /// A desktop with windows that either run their original procedure or
    /// have the wrapper in front of it.
    #[derive(Default)]
    struct FakeDesktop {
        rects: HashMap<u32, Rect>,
        attached: HashMap<u32, bool>,
        pins: i32,
        refuse_attach: bool,
        refuse_pin: bool,
        /// Rectangles that reached the original procedure.
        original_saw: Vec<Rect>,
    }

    impl SubclassHost for FakeDesktop {
        type Window = u32;

        fn pin_module(&mut self) -> bool {
            if self.refuse_pin {
                return false;
            }
            self.pins += 1;
            true
        }

        fn unpin_module(&mut self) {
            self.pins -= 1;
        }

        fn attach(&mut self, window: u32) -> bool {
            if self.refuse_attach {
                return false;
            }
            self.attached.insert(window, true);
            true
        }

        fn detach(&mut self, window: u32) -> bool {
            self.attached.remove(&window).is_some()
        }
    }

    impl FakeDesktop {
        fn with_window(window: u32, rect: Rect) -> Self {
            let mut desktop = Self::default();
            desktop.rects.insert(window, rect);
            desktop
        }

        /// Deliver a geometry proposal the way the OS would.
        fn propose(
            &mut self,
            table: &mut SubclassTable<u32>,
            window: u32,
            msg: u32,
            proposal: Rect,
        ) -> Rect {
            let wrapped = self.attached.get(&window).copied().unwrap_or(false);
            if wrapped {
                match table.filter(&IDS, window, msg, 0) {
                    Verdict::Freeze => return self.rects[&window],
                    Verdict::Handled(_) => return proposal,
                    Verdict::Forward | Verdict::Teardown => {}
                }
            }
            self.original_saw.push(proposal);
            proposal
        }
    }

    #[test]
    fn test_resize_proposal_is_frozen() {
        let window = 7;
        let mut desktop = FakeDesktop::with_window(window, Rect::new(100, 100, 400, 300));
        let mut table = SubclassTable::new();

        assert_eq!(table.start(&mut desktop, window, 1), Ok(StartOutcome::Installed));
        assert!(table.is_listening(window));

        let proposal = Rect::new(100, 100, 800, 300);
        let result = desktop.propose(&mut table, window, WM_SIZING, proposal);
        assert_eq!(result, Rect::new(100, 100, 400, 300));
        assert!(desktop.original_saw.is_empty());
    }

    #[test]
    fn test_unsubclass_restores_original_handler() {
        let window = 7;
        let mut desktop = FakeDesktop::with_window(window, Rect::new(100, 100, 400, 300));
        let mut table = SubclassTable::new();

        table.start(&mut desktop, window, 1).unwrap();
        assert_eq!(table.stop(&mut desktop, window, 2), Ok(StopOutcome::Removed));
        assert_eq!(desktop.pins, 0);
        assert!(table.is_empty());

        let proposal = Rect::new(150, 120, 450, 320);
        let result = desktop.propose(&mut table, window, WM_MOVING, proposal);
        assert_eq!(result, proposal);
        assert_eq!(desktop.original_saw, vec![proposal]);
    }

    #[test]
    fn test_failed_attach_releases_pin() {
        let mut desktop = FakeDesktop {
            refuse_attach: true,
            ..Default::default()
        };
        let mut table = SubclassTable::new();

        let result = table.start(&mut desktop, 3, 1);
        assert!(matches!(result, Err(HookError::Replace(_))));
        assert_eq!(desktop.pins, 0);
        assert!(!table.contains(3));
        assert!(!table.is_listening(3));
    }

    #[test]
    fn test_failed_pin_does_not_attach() {
        let mut desktop = FakeDesktop {
            refuse_pin: true,
            ..Default::default()
        };
        let mut table = SubclassTable::new();

        assert!(table.start(&mut desktop, 3, 1).is_err());
        assert!(desktop.attached.is_empty());
        assert_eq!(desktop.pins, 0);
    }

    #[test]
    fn test_double_start_is_reference_counted() {
        let mut desktop = FakeDesktop::default();
        let mut table = SubclassTable::new();

        table.start(&mut desktop, 9, 1).unwrap();
        assert_eq!(
            table.start(&mut desktop, 9, 2),
            Ok(StartOutcome::AlreadyInstalled { refs: 2 })
        );
        assert_eq!(desktop.pins, 1);

        assert_eq!(
            table.stop(&mut desktop, 9, 3),
            Ok(StopOutcome::Released { remaining: 1 })
        );
        assert!(table.contains(9));
        assert!(!table.is_listening(9));
        assert_eq!(desktop.pins, 1);

        assert_eq!(table.stop(&mut desktop, 9, 4), Ok(StopOutcome::Removed));
        assert_eq!(desktop.pins, 0);
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let mut desktop = FakeDesktop::default();
        let mut table: SubclassTable<u32> = SubclassTable::new();

        assert_eq!(table.stop(&mut desktop, 5, 1), Ok(StopOutcome::NotSubclassed));
        assert_eq!(table.stop(&mut desktop, 5, 2), Ok(StopOutcome::NotSubclassed));
        assert_eq!(desktop.pins, 0);
    }

    #[test]
    fn test_duplicate_delivery_applied_once() {
        let mut desktop = FakeDesktop::default();
        let mut table = SubclassTable::new();

        assert_eq!(table.start(&mut desktop, 2, 10), Ok(StartOutcome::Installed));
        assert_eq!(table.start(&mut desktop, 2, 10), Ok(StartOutcome::Duplicate));
        assert_eq!(table.refs(2), 1);

        assert_eq!(table.stop(&mut desktop, 2, 11), Ok(StopOutcome::Removed));
        assert_eq!(table.stop(&mut desktop, 2, 11), Ok(StopOutcome::NotSubclassed));
        assert_eq!(desktop.pins, 0);
    }

    #[test]
    fn test_zero_sequence_toggle_never_applied() {
        let window = 2;
        let mut desktop = FakeDesktop::with_window(window, Rect::new(0, 0, 10, 10));
        let mut table = SubclassTable::new();
        table.start(&mut desktop, window, 1).unwrap();

        // a queued pause seen by another window's delivery hook
        assert_eq!(table.stop(&mut desktop, window, 0), Ok(StopOutcome::Ignored));
        assert!(table.contains(window));
        assert!(desktop.attached.contains_key(&window));
        assert_eq!(desktop.pins, 1);

        assert_eq!(table.start(&mut desktop, window, 0), Ok(StartOutcome::Ignored));
        assert_eq!(table.refs(window), 1);

        // the wrapper still sees the toggle
        assert_eq!(table.filter(&IDS, window, IDS.stop, 0), Verdict::Handled(1));
        assert!(!table.is_listening(window));
        assert_eq!(table.filter(&IDS, window, IDS.start, 0), Verdict::Handled(1));
        assert!(table.is_listening(window));
    }

    #[test]
    fn test_zero_sequence_does_not_install() {
        let mut desktop = FakeDesktop::default();
        let mut table = SubclassTable::new();

        assert_eq!(table.start(&mut desktop, 8, 0), Ok(StartOutcome::Ignored));
        assert!(table.is_empty());
        assert!(desktop.attached.is_empty());
        assert_eq!(desktop.pins, 0);
    }

    #[test]
    fn test_failed_detach_keeps_entry() {
        let mut desktop = FakeDesktop::default();
        let mut table = SubclassTable::new();

        table.start(&mut desktop, 4, 1).unwrap();
        desktop.attached.clear();

        assert!(table.stop(&mut desktop, 4, 2).is_err());
        assert!(table.contains(4));
        assert_eq!(desktop.pins, 1);
    }

    #[test]
    fn test_toggle_messages_pause_and_resume() {
        let window = 1;
        let mut desktop = FakeDesktop::with_window(window, Rect::new(0, 0, 10, 10));
        let mut table = SubclassTable::new();
        table.start(&mut desktop, window, 1).unwrap();

        assert_eq!(table.filter(&IDS, window, IDS.stop, 0), Verdict::Handled(1));
        let moved = Rect::new(5, 5, 15, 15);
        assert_eq!(desktop.propose(&mut table, window, WM_MOVING, moved), moved);

        assert_eq!(table.filter(&IDS, window, IDS.start, 0), Verdict::Handled(1));
        assert_eq!(
            desktop.propose(&mut table, window, WM_MOVING, moved),
            Rect::new(0, 0, 10, 10)
        );
    }

    #[test]
    fn test_destroy_releases_everything() {
        let mut desktop = FakeDesktop::default();
        let mut table = SubclassTable::new();
        table.start(&mut desktop, 6, 1).unwrap();
        table.start(&mut desktop, 6, 2).unwrap();

        assert_eq!(table.filter(&IDS, 6, WM_NCDESTROY, 0), Verdict::Teardown);
        assert!(table.destroyed(&mut desktop, 6));
        assert!(!table.destroyed(&mut desktop, 6));
        assert!(desktop.attached.is_empty());
        assert_eq!(table.orphaned_pins(), 1);
        assert_eq!(desktop.pins, 1);

        // next delivery settles the pin
        assert_eq!(table.stop(&mut desktop, 6, 3), Ok(StopOutcome::NotSubclassed));
        assert_eq!(table.orphaned_pins(), 0);
        assert_eq!(desktop.pins, 0);
    }

    #[test]
    fn test_control_kind_from_message() {
        assert_eq!(ControlKind::from_message(&IDS, IDS.start), Some(ControlKind::Start));
        assert_eq!(ControlKind::from_message(&IDS, IDS.stop), Some(ControlKind::Stop));
        assert_eq!(ControlKind::from_message(&IDS, IDS.shell), None);
        assert_eq!(ControlKind::from_message(&MessageIds::default(), 0), None);
    }
}
