//! Mock counter implementation for testing
//!
//! Simulates a free-running timer channel: a fixed-width counter, one
//! compare unit and latched overflow/compare events. Tests advance simulated
//! time explicitly with [`MockCounter::advance_us`]; in addition every
//! `read()` consumes a configurable number of ticks so that poll loops over
//! the counter make progress on the host (a frozen clock would otherwise
//! spin them forever).

use crate::platform::{CounterEvents, CounterInterface, Result};

/// Mock counter implementation
///
/// Events latch only while the corresponding interrupt source is enabled,
/// approximating a timer whose status lines are gated by its interrupt
/// enable register.
#[derive(Debug)]
pub struct MockCounter {
    count: u32,
    mask: u32,
    period_ticks: u64,
    tick_hz: u32,
    compare: u32,
    compare_irq_enabled: bool,
    overflow_irq_enabled: bool,
    pending_compare: bool,
    pending_overflow: bool,
    auto_advance_ticks: u32,
    started: bool,
}

impl MockCounter {
    /// Create a mock counter with the given tick frequency and width
    pub fn new(tick_hz: u32, counter_bits: u8) -> Self {
        let period_ticks = 1u64 << counter_bits;
        Self {
            count: 0,
            mask: (period_ticks - 1) as u32,
            period_ticks,
            tick_hz,
            compare: 0,
            compare_irq_enabled: false,
            overflow_irq_enabled: false,
            pending_compare: false,
            pending_overflow: false,
            auto_advance_ticks: 1,
            started: false,
        }
    }

    /// Ticks consumed by each `read()` call (default 1)
    ///
    /// Set to 0 for tests that need full manual control of simulated time.
    pub fn set_auto_advance(&mut self, ticks: u32) {
        self.auto_advance_ticks = ticks;
    }

    /// Advance simulated time by `ticks`
    pub fn advance_ticks(&mut self, ticks: u64) {
        if ticks == 0 {
            return;
        }

        if self.compare_irq_enabled {
            let distance = u64::from(self.compare.wrapping_sub(self.count) & self.mask);
            if (distance != 0 && distance <= ticks) || ticks >= self.period_ticks {
                self.pending_compare = true;
            }
        }

        let total = u64::from(self.count) + ticks;

        if total >= self.period_ticks && self.overflow_irq_enabled {
            self.pending_overflow = true;
        }

        self.count = (total % self.period_ticks) as u32;
    }

    /// Advance simulated time by `us` microseconds (rounded down to ticks)
    pub fn advance_us(&mut self, us: u64) {
        let ticks = us * u64::from(self.tick_hz) / 1_000_000;
        self.advance_ticks(ticks);
    }

    /// Current raw counter value, without consuming ticks
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Overwrite the raw counter value
    ///
    /// Writing a value below the current one looks like a wrap to the next
    /// timebase read. No events are latched.
    pub fn set_count(&mut self, count: u32) {
        self.count = count & self.mask;
    }

    /// Currently programmed compare value
    pub fn compare(&self) -> u32 {
        self.compare
    }

    /// Whether the compare-match interrupt source is enabled
    pub fn compare_interrupt_enabled(&self) -> bool {
        self.compare_irq_enabled
    }

    /// Whether `start()` has been called
    pub fn is_started(&self) -> bool {
        self.started
    }
}

impl Default for MockCounter {
    fn default() -> Self {
        Self::new(1_000_000, 32)
    }
}

impl CounterInterface for MockCounter {
    fn start(&mut self) -> Result<()> {
        self.started = true;
        Ok(())
    }

    fn read(&mut self) -> u32 {
        let count = self.count;
        let auto = self.auto_advance_ticks;
        self.advance_ticks(u64::from(auto));
        count
    }

    fn set_compare(&mut self, ticks: u32) {
        self.compare = ticks & self.mask;
    }

    fn enable_compare_interrupt(&mut self) {
        self.compare_irq_enabled = true;
    }

    fn disable_compare_interrupt(&mut self) {
        self.compare_irq_enabled = false;
    }

    fn enable_overflow_interrupt(&mut self) {
        self.overflow_irq_enabled = true;
    }

    fn take_events(&mut self) -> CounterEvents {
        let events = CounterEvents {
            overflow: self.pending_overflow,
            compare: self.pending_compare,
        };
        self.pending_overflow = false;
        self.pending_compare = false;
        events
    }
}
