//! Timer configuration
//!
//! The counter's base frequency and width are fixed by the board, but they
//! are carried as a configuration surface so the core, the mock backend and
//! the tests agree on one description of the hardware.

use crate::platform::error::TimerError;
use crate::platform::{PlatformError, Result};

/// High-resolution timer configuration
///
/// `min_interval_us` and `max_interval_us` bound every compare deadline the
/// dispatcher arms. The minimum covers interrupt latency (arming closer than
/// this risks missing the match entirely); the maximum keeps the target
/// within a range the fixed-width counter can resolve unambiguously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HrtConfig {
    /// Frequency of the free-running counter in Hz
    pub tick_hz: u32,
    /// Width of the hardware counter in bits (8..=32)
    pub counter_bits: u8,
    /// Smallest deadline lead time the compare unit can hit reliably, in microseconds
    pub min_interval_us: u64,
    /// Largest compare horizon, in microseconds; must stay inside one counter period
    pub max_interval_us: u64,
}

impl Default for HrtConfig {
    fn default() -> Self {
        Self {
            tick_hz: 1_000_000,
            counter_bits: 32,
            min_interval_us: 50,
            max_interval_us: 50_000,
        }
    }
}

impl HrtConfig {
    /// Length of one full counter cycle in ticks
    pub fn period_ticks(&self) -> u64 {
        1u64 << self.counter_bits
    }

    /// Bit mask selecting the valid counter range
    pub fn counter_mask(&self) -> u32 {
        (self.period_ticks() - 1) as u32
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Timer` describing the first violated
    /// constraint.
    pub fn validate(&self) -> Result<()> {
        if self.tick_hz == 0 {
            return Err(PlatformError::Timer(TimerError::InvalidFrequency));
        }

        if !(8..=32).contains(&self.counter_bits) {
            return Err(PlatformError::Timer(TimerError::InvalidCounterWidth));
        }

        if self.min_interval_us == 0 || self.min_interval_us >= self.max_interval_us {
            return Err(PlatformError::Timer(TimerError::InvalidInterval));
        }

        // Beyond one counter period the compare value aliases with an
        // earlier cycle and the match would land a whole wrap late.
        let period_us = self.period_ticks() * 1_000_000 / u64::from(self.tick_hz);
        if self.max_interval_us >= period_us {
            return Err(PlatformError::Timer(TimerError::InvalidInterval));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(HrtConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_frequency_rejected() {
        let config = HrtConfig {
            tick_hz: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(PlatformError::Timer(TimerError::InvalidFrequency))
        );
    }

    #[test]
    fn test_counter_width_bounds() {
        let config = HrtConfig {
            counter_bits: 33,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(PlatformError::Timer(TimerError::InvalidCounterWidth))
        );

        let config = HrtConfig {
            counter_bits: 7,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_interval_window_must_be_ordered() {
        let config = HrtConfig {
            min_interval_us: 100,
            max_interval_us: 100,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(PlatformError::Timer(TimerError::InvalidInterval))
        );
    }

    #[test]
    fn test_horizon_must_fit_counter_period() {
        // 8-bit counter at 1 MHz wraps every 256 us; the default 50 ms
        // horizon cannot be represented.
        let config = HrtConfig {
            counter_bits: 8,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(PlatformError::Timer(TimerError::InvalidInterval))
        );
    }

    #[test]
    fn test_mask_and_period() {
        let config = HrtConfig {
            counter_bits: 16,
            ..Default::default()
        };
        assert_eq!(config.period_ticks(), 0x1_0000);
        assert_eq!(config.counter_mask(), 0xFFFF);

        assert_eq!(HrtConfig::default().counter_mask(), u32::MAX);
    }
}
