//! Platform abstraction traits
//!
//! This module defines the traits that platform implementations must provide.

pub mod counter;

// Re-export trait interfaces
pub use counter::{CounterEvents, CounterInterface};
