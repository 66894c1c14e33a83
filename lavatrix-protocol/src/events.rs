//! Stage-change events and the bridge stage code mapping

use heapless::String;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum stage label length
pub const MAX_STAGE_LEN: usize = 16;

/// The six stages the model distinguishes, in bridge code order
///
/// Index in this table is the stage's bridge range value.
pub const STAGE_LABELS: [&str; 6] = [
    "idle",
    "soak_short",
    "soak",
    "soak_long",
    "rinse",
    "spin",
];

/// Map a stage label to its bridge range value
///
/// Unknown labels map to 0 (`idle`); the bridge treats an unrecognized
/// stage as the machine being off.
pub fn stage_code(stage: &str) -> u8 {
    STAGE_LABELS
        .iter()
        .position(|&label| label == stage)
        .unwrap_or(0) as u8
}

/// Map a bridge range value back to its stage label
pub fn stage_for_code(code: u8) -> &'static str {
    STAGE_LABELS.get(code as usize).copied().unwrap_or("idle")
}

/// One committed stage transition
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StageEvent {
    /// The newly committed stage
    pub stage: String<MAX_STAGE_LEN>,
    /// Winning confidence at commit time, in [0, 1]
    pub confidence: f32,
    /// Monitor uptime at commit time (ms)
    pub uptime_ms: u64,
}

impl StageEvent {
    /// Build an event, truncating an overlong label
    pub fn new(stage: &str, confidence: f32, uptime_ms: u64) -> Self {
        let mut label = String::new();
        for c in stage.chars() {
            if label.push(c).is_err() {
                break;
            }
        }
        Self {
            stage: label,
            confidence,
            uptime_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_stage_codes() {
        assert_eq!(stage_code("idle"), 0);
        assert_eq!(stage_code("soak_short"), 1);
        assert_eq!(stage_code("soak"), 2);
        assert_eq!(stage_code("soak_long"), 3);
        assert_eq!(stage_code("rinse"), 4);
        assert_eq!(stage_code("spin"), 5);
    }

    #[test]
    fn test_unknown_stage_maps_to_idle() {
        assert_eq!(stage_code("lint_filter"), 0);
        assert_eq!(stage_for_code(200), "idle");
    }

    #[test]
    fn test_event_truncates_overlong_label() {
        let event = StageEvent::new("a_label_much_longer_than_sixteen", 0.5, 0);
        assert_eq!(event.stage.len(), MAX_STAGE_LEN);
    }

    proptest! {
        /// Every known label round-trips through its code
        #[test]
        fn prop_code_roundtrip(index in 0usize..STAGE_LABELS.len()) {
            let label = STAGE_LABELS[index];
            prop_assert_eq!(stage_for_code(stage_code(label)), label);
        }
    }
}
