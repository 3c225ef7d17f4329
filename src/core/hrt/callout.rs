//! Callout records and handles
//!
//! The scheduler owns a fixed pool of callout slots. Callers claim a slot
//! with [`Hrt::callout_alloc`](super::Hrt::callout_alloc) and hold on to the
//! returned [`CalloutHandle`] for as long as the callout may be scheduled —
//! the handle is the arena-style replacement for the caller-owned intrusive
//! record of classic callout lists.

/// Maximum number of concurrently claimed callouts
///
/// Fixed pool, no heap: 32 slots cover every periodic driver and one-shot
/// timeout in the firmware with room to spare.
pub const MAX_CALLOUTS: usize = 32;

/// Callback invoked when a callout fires
///
/// Runs at interrupt level with the servicing interrupt blocking same-or-
/// lower priority work: callbacks must be short and non-blocking. The
/// argument is the opaque value supplied when the callout was scheduled.
pub type CalloutFn = fn(usize);

/// One slot of the callout pool
///
/// `deadline == 0` means "not scheduled"; a slot with deadline 0 is never a
/// member of the queue.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CalloutSlot {
    /// Absolute time in microseconds at which the callout fires; 0 = idle
    pub deadline: u64,
    /// Microseconds between repeats; 0 = one-shot
    pub period: u64,
    /// Function to invoke; `None` simply removes the entry when due
    pub callback: Option<CalloutFn>,
    /// Opaque caller-supplied value passed to the callback
    pub arg: usize,
    /// Slot is claimed by a live handle
    pub in_use: bool,
}

impl CalloutSlot {
    pub(crate) const fn idle() -> Self {
        Self {
            deadline: 0,
            period: 0,
            callback: None,
            arg: 0,
            in_use: false,
        }
    }
}

/// Owned handle to a claimed callout slot
///
/// Deliberately not `Copy`/`Clone`: queue membership is exclusive, and a
/// single owner per slot keeps cancel/re-arm races out of the API. Release
/// the slot back to the pool with
/// [`Hrt::callout_release`](super::Hrt::callout_release).
#[derive(Debug, PartialEq, Eq)]
pub struct CalloutHandle {
    pub(crate) index: u8,
}

impl CalloutHandle {
    /// Pool index of this callout (diagnostic)
    pub fn index(&self) -> usize {
        usize::from(self.index)
    }
}
