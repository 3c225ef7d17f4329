//! Platform abstraction layer
//!
//! This module provides hardware abstraction for the timer counter used by
//! the high-resolution timing core. All platform-specific code must be
//! isolated to this module.

pub mod error;
pub mod traits;

// Mock implementation for host tests and simulation
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export commonly used types
pub use error::{PlatformError, Result};
pub use traits::{CounterEvents, CounterInterface};
