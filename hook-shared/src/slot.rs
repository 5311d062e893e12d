use std::sync::atomic::{AtomicIsize, Ordering};

/// Holds one raw OS handle (0 = empty) for a long-lived registration.
#[derive(Debug, Default)]
pub struct HandleSlot(AtomicIsize);

impl HandleSlot {
    pub const fn new() -> Self {
        Self(AtomicIsize::new(0))
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire) != 0
    }

    /// Store `raw`, handing whatever was there before to `release`.
    pub fn replace(&self, raw: isize, release: impl FnOnce(isize) -> bool) {
        let previous = self.0.swap(raw, Ordering::AcqRel);
        if previous != 0 && !release(previous) {
            log::warn!("[hook] Previous registration could not be released");
        }
    }

    /// Empty the slot. Clearing an empty slot succeeds without calling `release`.
    pub fn clear(&self, release: impl FnOnce(isize) -> bool) -> bool {
        match self.0.swap(0, Ordering::AcqRel) {
            0 => true,
            raw => release(raw),
        }
    }
}
