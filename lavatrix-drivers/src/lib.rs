//! Hardware drivers for the Lavatrix stage monitor
//!
//! Board-independent driver logic: each driver is a plain state machine
//! driven by periodic `tick()`/`poll()` calls, with the actual pin or
//! peripheral access at the edge. This keeps the timing logic testable
//! on the host.

#![no_std]
#![deny(unsafe_code)]

pub mod dvp;
pub mod indicator;

pub use dvp::{CaptureWindow, DvpConfig};
pub use indicator::{BlinkIndicator, BlinkPattern};
