//! Stage-change LED indicator
//!
//! Blinks the status LED three times whenever a stage change is
//! committed. The pattern is a plain time-driven state machine; the
//! owning task calls `poll()` at its own cadence and the pattern
//! consumes whatever time has passed, so a slow tick cannot stall it.

use embedded_hal::digital::OutputPin;
use lavatrix_core::traits::StageListener;

/// On time per pulse in ms
pub const ON_MS: u32 = 100;
/// Off time per pulse in ms
pub const OFF_MS: u32 = 100;
/// Pulses per stage change
pub const PULSES: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    On { remaining_ms: u32, pulses_left: u8 },
    Off { remaining_ms: u32, pulses_left: u8 },
}

/// The blink sequence state machine, without a pin
///
/// `advance()` returns the LED level for the current instant.
#[derive(Debug, Clone)]
pub struct BlinkPattern {
    phase: Phase,
}

impl BlinkPattern {
    pub fn new() -> Self {
        Self { phase: Phase::Idle }
    }

    /// Start (or restart) the blink sequence
    ///
    /// A trigger mid-sequence restarts it from the first pulse.
    pub fn trigger(&mut self) {
        self.phase = Phase::On {
            remaining_ms: ON_MS,
            pulses_left: PULSES,
        };
    }

    /// Whether the sequence is still running
    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Consume `delta_ms` of elapsed time and return the LED level
    pub fn advance(&mut self, mut delta_ms: u32) -> bool {
        loop {
            match self.phase {
                Phase::Idle => return false,
                Phase::On {
                    remaining_ms,
                    pulses_left,
                } => {
                    if delta_ms < remaining_ms {
                        self.phase = Phase::On {
                            remaining_ms: remaining_ms - delta_ms,
                            pulses_left,
                        };
                        return true;
                    }
                    delta_ms -= remaining_ms;
                    self.phase = Phase::Off {
                        remaining_ms: OFF_MS,
                        pulses_left,
                    };
                }
                Phase::Off {
                    remaining_ms,
                    pulses_left,
                } => {
                    if delta_ms < remaining_ms {
                        self.phase = Phase::Off {
                            remaining_ms: remaining_ms - delta_ms,
                            pulses_left,
                        };
                        return false;
                    }
                    delta_ms -= remaining_ms;
                    if pulses_left <= 1 {
                        self.phase = Phase::Idle;
                        return false;
                    }
                    self.phase = Phase::On {
                        remaining_ms: ON_MS,
                        pulses_left: pulses_left - 1,
                    };
                }
            }
        }
    }
}

impl Default for BlinkPattern {
    fn default() -> Self {
        Self::new()
    }
}

/// Blink indicator bound to an output pin
///
/// Implements [`StageListener`] so it can be handed straight to the
/// pipeline; the commit callback only arms the pattern, the pin is
/// driven from `poll()`.
pub struct BlinkIndicator<P: OutputPin> {
    pin: P,
    pattern: BlinkPattern,
    level: bool,
}

impl<P: OutputPin> BlinkIndicator<P> {
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            pattern: BlinkPattern::new(),
            level: false,
        }
    }

    /// Advance the pattern and drive the pin
    ///
    /// The pin is only touched on level changes.
    pub fn poll(&mut self, delta_ms: u32) {
        let level = self.pattern.advance(delta_ms);
        if level != self.level {
            self.level = level;
            let _ = if level {
                self.pin.set_high()
            } else {
                self.pin.set_low()
            };
        }
    }

    /// Whether a blink sequence is in progress
    pub fn is_active(&self) -> bool {
        self.pattern.is_active()
    }
}

impl<P: OutputPin> StageListener for BlinkIndicator<P> {
    fn on_stage_changed(&mut self, _stage: &str, _confidence: f32) {
        self.pattern.trigger();
    }
}
