//! Shared configuration record
//!
//! Every process that loads the hook module maps the same named section and
//! sees one [`SharedConfig`]. The record is plain atomics in a `#[repr(C)]`
//! struct so the layout is identical in every process of the same bitness.
//!
//! Handshake:
//!   - `state` goes `EMPTY -> INITIALIZING -> READY`, once, by CAS. The CAS
//!     winner writes magic, version and message ids, then stores `READY`
//!     with release ordering.
//!   - Readers load `state` with acquire ordering and only trust the record
//!     when it is `READY` with the expected magic and version.
//!   - Controller handles are written before the hook that reads them is
//!     installed, so a hook callback never observes a stale slot for its own
//!     registration. A failed install puts the previous handle back.
//!   - A target process that cannot remove a wrapper on STOP records that
//!     STOP's sequence in `failed_stop` before the blocking send returns.

use std::sync::atomic::{AtomicIsize, AtomicU32, Ordering};

use crate::config::{SHARED_LAYOUT_VERSION, SHARED_MAGIC};
use crate::error::{HookError, HookResult};

const STATE_EMPTY: u32 = 0;
const STATE_INITIALIZING: u32 = 1;
const STATE_READY: u32 = 2;

/// Message ids resolved from the OS name registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageIds {
    pub start: u32,
    pub stop: u32,
    pub shell: u32,
}

/// Which relay a controller handle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerSlot {
    Subclass,
    Shell,
    Tray,
}

/// Outcome of [`SharedConfig::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// This caller wrote the record.
    Published,
    /// Somebody else already did (or is doing) it.
    AlreadyInitialized,
}

#[repr(C)]
#[derive(Debug, Default)]
pub struct SharedConfig {
    magic: AtomicU32,
    version: AtomicU32,
    state: AtomicU32,
    start_message: AtomicU32,
    stop_message: AtomicU32,
    shell_message: AtomicU32,
    sequence: AtomicU32,
    failed_stop: AtomicU32,
    subclass_controller: AtomicIsize,
    shell_controller: AtomicIsize,
    tray_controller: AtomicIsize,
}

impl SharedConfig {
    /// Size the mapping must have.
    pub const SIZE: usize = std::mem::size_of::<SharedConfig>();

    /// Publish the message ids if nobody has yet.
    pub fn initialize(&self, ids: MessageIds) -> InitOutcome {
        if self
            .state
            .compare_exchange(
                STATE_EMPTY,
                STATE_INITIALIZING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return InitOutcome::AlreadyInitialized;
        }

        self.magic.store(SHARED_MAGIC, Ordering::Relaxed);
        self.version.store(SHARED_LAYOUT_VERSION, Ordering::Relaxed);
        self.start_message.store(ids.start, Ordering::Relaxed);
        self.stop_message.store(ids.stop, Ordering::Relaxed);
        self.shell_message.store(ids.shell, Ordering::Relaxed);
        self.state.store(STATE_READY, Ordering::Release);

        log::debug!(
            "[shared] Published message ids start={} stop={} shell={}",
            ids.start,
            ids.stop,
            ids.shell
        );
        InitOutcome::Published
    }

    pub fn is_ready(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_READY
            && self.magic.load(Ordering::Relaxed) == SHARED_MAGIC
            && self.version.load(Ordering::Relaxed) == SHARED_LAYOUT_VERSION
    }

    pub fn message_ids(&self) -> HookResult<MessageIds> {
        if !self.is_ready() {
            return Err(HookError::NotConfigured);
        }
        Ok(MessageIds {
            start: self.start_message.load(Ordering::Relaxed),
            stop: self.stop_message.load(Ordering::Relaxed),
            shell: self.shell_message.load(Ordering::Relaxed),
        })
    }

    fn slot(&self, slot: ControllerSlot) -> &AtomicIsize {
        match slot {
            ControllerSlot::Subclass => &self.subclass_controller,
            ControllerSlot::Shell => &self.shell_controller,
            ControllerSlot::Tray => &self.tray_controller,
        }
    }

    pub fn set_controller(&self, slot: ControllerSlot, handle: isize) {
        self.slot(slot).store(handle, Ordering::Release);
    }

    /// Point `slot` at `handle`, then run `install`. If it fails the slot
    /// goes back to whatever it held before.
    pub fn register_controller<T>(
        &self,
        slot: ControllerSlot,
        handle: isize,
        install: impl FnOnce() -> HookResult<T>,
    ) -> HookResult<T> {
        let previous = self.slot(slot).swap(handle, Ordering::AcqRel);
        install().inspect_err(|_| {
            self.slot(slot).store(previous, Ordering::Release);
        })
    }

    /// `None` until a controller registered for `slot`.
    pub fn controller(&self, slot: ControllerSlot) -> Option<isize> {
        match self.slot(slot).load(Ordering::Acquire) {
            0 => None,
            handle => Some(handle),
        }
    }

    /// Called in the target process when the STOP carrying `sequence` could
    /// not remove the wrapper.
    pub fn record_failed_stop(&self, sequence: u32) {
        if sequence != 0 {
            self.failed_stop.store(sequence, Ordering::Release);
        }
    }

    pub fn stop_failed(&self, sequence: u32) -> bool {
        sequence != 0 && self.failed_stop.load(Ordering::Acquire) == sequence
    }

    /// Fresh, non-zero sequence number for one control delivery.
    pub fn next_sequence(&self) -> u32 {
        loop {
            let seq = self.sequence.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
            if seq != 0 {
                return seq;
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
