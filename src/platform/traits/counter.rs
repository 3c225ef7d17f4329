//! Free-running counter trait
//!
//! The timing core drives a single timer channel: a free-running counter of
//! fixed width and tick frequency, one compare unit, and two interrupt
//! sources (counter overflow and compare match). This trait is the only
//! hardware surface the core touches; a board backend maps it onto its timer
//! peripheral registers, the mock backend simulates it for host tests.

use crate::platform::Result;

/// Pending interrupt events of a timer channel
///
/// Returned by [`CounterInterface::take_events`]. Reading clears the pending
/// flags, mirroring a read-to-clear hardware status register.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CounterEvents {
    /// The counter completed a full cycle and wrapped to zero
    pub overflow: bool,
    /// The counter matched the programmed compare value
    pub compare: bool,
}

impl CounterEvents {
    /// True if any event is pending
    pub fn any(&self) -> bool {
        self.overflow || self.compare
    }
}

/// Free-running counter interface
///
/// All methods are called with the timing core's critical section held, so
/// implementations do not need their own locking. Values returned by
/// [`read`](CounterInterface::read) and accepted by
/// [`set_compare`](CounterInterface::set_compare) are raw counter ticks,
/// always below `2^counter_bits`.
pub trait CounterInterface {
    /// Start the counter free-running
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::InitializationFailed` if the peripheral
    /// cannot be brought up.
    fn start(&mut self) -> Result<()>;

    /// Read the current raw counter value
    fn read(&mut self) -> u32;

    /// Program the compare unit to match when the counter reaches `ticks`
    fn set_compare(&mut self, ticks: u32);

    /// Enable the compare-match interrupt source
    fn enable_compare_interrupt(&mut self);

    /// Disable the compare-match interrupt source
    fn disable_compare_interrupt(&mut self);

    /// Enable the overflow interrupt source
    ///
    /// Stays enabled for the life of the subsystem; the overflow interrupt
    /// keeps the 64-bit timebase rolling even when no callouts are pending.
    fn enable_overflow_interrupt(&mut self);

    /// Read and clear the pending interrupt events
    ///
    /// Called from the interrupt handler (or from a poll loop where no
    /// asynchronous interrupt delivery exists) to learn which sources fired.
    fn take_events(&mut self) -> CounterEvents;
}
