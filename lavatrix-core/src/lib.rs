//! Board-agnostic core logic for the washing machine stage monitor
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Hardware abstraction traits (frame capture, inference engine, heap
//!   introspection, stage listeners)
//! - Frame preprocessing (crop + RGB565 to RGB888 conversion)
//! - Guarded model-input buffer management
//! - Normalized sample stream adapter for the inference engine
//! - Error escalation and fail-safe health tracking
//! - Debounced stage classification state machine
//! - Per-cycle prediction orchestration
//!
//! The single heap allocation (the model input buffer) goes through
//! `alloc`; the embedding firmware supplies the global allocator.

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

pub mod classify;
pub mod config;
pub mod frame;
pub mod health;
pub mod memory;
pub mod pipeline;
pub mod signal;
pub mod traits;
