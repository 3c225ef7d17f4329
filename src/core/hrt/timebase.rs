//! Wrap-safe 64-bit timebase
//!
//! Accumulates the fixed-width hardware counter into a 64-bit tick count
//! that never wraps in practice, and scales between ticks and microseconds.
//!
//! Wrap detection is differential: a reading numerically below the previous
//! one means exactly one wrap happened since. This holds only while reads
//! occur more often than one full counter period — a liveness requirement
//! the overflow interrupt upholds at runtime by reading the counter on
//! every wrap.

use super::config::HrtConfig;

/// Accumulated timebase state
///
/// Single instance per scheduler, mutated only with the critical section
/// held.
#[derive(Debug)]
pub struct Timebase {
    tick_hz: u32,
    period_ticks: u64,
    mask: u32,
    tick_base: u64,
    last_count: u32,
    wrap_count: u32,
}

impl Timebase {
    /// Create a timebase for the given counter description
    pub fn new(config: &HrtConfig) -> Self {
        Self {
            tick_hz: config.tick_hz,
            period_ticks: config.period_ticks(),
            mask: config.counter_mask(),
            tick_base: 0,
            last_count: 0,
            wrap_count: 0,
        }
    }

    /// Fold a fresh counter reading into the 64-bit tick count
    ///
    /// Must be called with the critical section held: it both reads and
    /// mutates shared state relative to the previous observation.
    pub fn update(&mut self, count: u32) -> u64 {
        let count = count & self.mask;

        if count < self.last_count {
            self.tick_base += self.period_ticks;
            self.wrap_count += 1;
        }

        self.last_count = count;
        self.tick_base + u64::from(count)
    }

    /// Convert ticks to microseconds (rounding down)
    pub fn ticks_to_usec(&self, ticks: u64) -> u64 {
        (u128::from(ticks) * 1_000_000 / u128::from(self.tick_hz)) as u64
    }

    /// Convert microseconds to ticks (rounding up)
    ///
    /// Rounds toward more ticks so a requested delay is never under-delivered.
    pub fn usec_to_ticks(&self, us: u64) -> u64 {
        ((u128::from(us) * u128::from(self.tick_hz) + 999_999) / 1_000_000) as u64
    }

    /// Number of wraps observed so far (diagnostic)
    pub fn wrap_count(&self) -> u32 {
        self.wrap_count
    }

    /// Bit mask selecting the valid counter range
    pub fn mask(&self) -> u32 {
        self.mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timebase_1mhz(counter_bits: u8) -> Timebase {
        Timebase::new(&HrtConfig {
            counter_bits,
            ..Default::default()
        })
    }

    #[test]
    fn test_monotonic_across_reads() {
        let mut tb = timebase_1mhz(32);
        let mut last = 0;

        for count in [0u32, 10, 500, 501, 10_000] {
            let ticks = tb.update(count);
            assert!(ticks >= last);
            last = ticks;
        }
    }

    #[test]
    fn test_wrap_detected_once() {
        let mut tb = timebase_1mhz(16);

        assert_eq!(tb.update(0xFF00), 0xFF00);
        assert_eq!(tb.wrap_count(), 0);

        // Reading below the previous value implies exactly one wrap
        let ticks = tb.update(0x0010);
        assert_eq!(ticks, 0x1_0000 + 0x0010);
        assert_eq!(tb.wrap_count(), 1);

        // Time keeps increasing afterwards, no double counting
        assert_eq!(tb.update(0x0011), 0x1_0000 + 0x0011);
        assert_eq!(tb.wrap_count(), 1);
    }

    #[test]
    fn test_monotonic_across_wrap() {
        let mut tb = timebase_1mhz(16);
        let before = tb.update(0xFFFE);
        let after = tb.update(0x0001);
        assert!(after > before);
    }

    #[test]
    fn test_ticks_to_usec_identity_at_1mhz() {
        let tb = timebase_1mhz(32);
        assert_eq!(tb.ticks_to_usec(123_456), 123_456);
        assert_eq!(tb.usec_to_ticks(123_456), 123_456);
    }

    #[test]
    fn test_usec_to_ticks_rounds_up() {
        // 4.6875 MHz, the SAMV7 TC0 rate (150 MHz MCK / 32)
        let tb = Timebase::new(&HrtConfig {
            tick_hz: 4_687_500,
            ..Default::default()
        });

        // 1 us = 4.6875 ticks; rounding down would under-deliver the delay
        assert_eq!(tb.usec_to_ticks(1), 5);
        assert_eq!(tb.usec_to_ticks(16), 75);

        // Tick -> time direction floors
        assert_eq!(tb.ticks_to_usec(5), 1);
    }

    #[test]
    fn test_update_masks_wide_readings() {
        let mut tb = timebase_1mhz(16);
        assert_eq!(tb.update(0x5_1234), 0x1234);
    }
}
