//! Externally visible message types for the Lavatrix stage monitor
//!
//! Two kinds of messages leave the monitor:
//!
//! - **Stage events**: emitted exactly once per committed stage
//!   transition, consumed by the cloud device bridge, the LED indicator,
//!   and the local log.
//! - **Status snapshots**: periodic point-in-time state for the
//!   dashboard and the status link. The snapshot schema is stable;
//!   additive diagnostic fields are permitted.
//!
//! The cloud bridge additionally needs each stage as a small integer
//! range value; the bidirectional mapping lives here so both directions
//! of the bridge agree on it.

#![no_std]
#![deny(unsafe_code)]

pub mod events;
pub mod status;

pub use events::{stage_code, stage_for_code, StageEvent, MAX_STAGE_LEN, STAGE_LABELS};
pub use status::{format_uptime, StatusSnapshot};
