//! Inter-task communication channels
//!
//! Static embassy-sync primitives connecting the monitor task to the
//! indicator and status link tasks.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use lavatrix_protocol::{StageEvent, StatusSnapshot};

/// Channel capacity for stage events
const EVENT_CHANNEL_SIZE: usize = 4;

/// Committed stage changes, for the status link
pub static STAGE_EVENTS: Channel<CriticalSectionRawMutex, StageEvent, EVENT_CHANNEL_SIZE> =
    Channel::new();

/// Latest status snapshot (updated once per cycle)
pub static STATUS: Signal<CriticalSectionRawMutex, StatusSnapshot> = Signal::new();

/// Stage change for the LED indicator (latest wins)
pub static BLINK: Signal<CriticalSectionRawMutex, StageEvent> = Signal::new();
