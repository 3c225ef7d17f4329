#![cfg_attr(not(test), no_std)]

//! pico_hrt - High-resolution timing core for embedded autopilot systems
//!
//! This library turns a free-running hardware counter into a monotonic,
//! wrap-safe, microsecond-resolution clock and builds a deadline-ordered
//! callout scheduler on top of it. Other subsystems use it to request
//! "call this function once, or repeatedly, at time T".
//!
//! Board bring-up and peripheral wiring stay outside this crate; hardware
//! is reached exclusively through the counter trait in [`platform`].

// Platform abstraction layer (counter trait, mock backend)
pub mod platform;

// Core timing functionality (timebase, callout scheduler, diagnostics)
pub mod core;
