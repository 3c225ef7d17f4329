//! Core timing functionality
//!
//! This module contains the high-resolution timebase and callout scheduler
//! together with the logging infrastructure they report through.

pub mod hrt;
pub mod logging;
