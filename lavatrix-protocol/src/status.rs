//! Status snapshot for the dashboard and status link

use core::fmt::Write;

use heapless::String;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::events::MAX_STAGE_LEN;

/// Point-in-time monitor state
///
/// `stage`, `confidence`, `uptime_s` and `heap_free` are the stable
/// schema; the remaining fields are additive diagnostics.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StatusSnapshot {
    /// Committed stage ("unknown" before the first commit)
    pub stage: String<MAX_STAGE_LEN>,
    /// Confidence of the last accepted cycle, in [0, 1]
    pub confidence: f32,
    /// Monitor uptime in seconds
    pub uptime_s: u32,
    /// Free heap in bytes
    pub heap_free: u32,
    /// Largest contiguous allocatable block in bytes
    pub heap_largest: u32,
    /// Classification cycles attempted since start
    pub cycles: u32,
    /// Critical errors since start (or last re-initialization)
    pub faults: u32,
    /// Whether the last cycle completed cleanly
    pub stable: bool,
}

#[cfg(feature = "serde")]
impl StatusSnapshot {
    /// Encode the snapshot into a postcard frame for the status link
    pub fn to_wire<'a>(&self, buf: &'a mut [u8]) -> Result<&'a [u8], postcard::Error> {
        postcard::to_slice(self, buf).map(|s| &*s)
    }

    /// Decode a snapshot from a postcard frame
    pub fn from_wire(buf: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(buf)
    }
}

/// Render an uptime as "1d 2h 3m 4s"
///
/// Leading zero units are omitted, matching the dashboard's display.
pub fn format_uptime(mut seconds: u32) -> String<24> {
    let days = seconds / 86_400;
    seconds %= 86_400;
    let hours = seconds / 3_600;
    seconds %= 3_600;
    let minutes = seconds / 60;
    seconds %= 60;

    let mut out: String<24> = String::new();
    if days > 0 {
        let _ = write!(out, "{}d ", days);
    }
    if hours > 0 || days > 0 {
        let _ = write!(out, "{}h ", hours);
    }
    if minutes > 0 || hours > 0 || days > 0 {
        let _ = write!(out, "{}m ", minutes);
    }
    let _ = write!(out, "{}s", seconds);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uptime_seconds_only() {
        assert_eq!(format_uptime(42).as_str(), "42s");
    }

    #[test]
    fn test_uptime_full_units() {
        // 1 day, 2 hours, 3 minutes, 4 seconds
        let total = 86_400 + 2 * 3_600 + 3 * 60 + 4;
        assert_eq!(format_uptime(total).as_str(), "1d 2h 3m 4s");
    }

    #[test]
    fn test_uptime_keeps_zero_middle_units() {
        // Exactly one hour: minutes shown as zero, days omitted
        assert_eq!(format_uptime(3_600).as_str(), "1h 0m 0s");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_snapshot_wire_roundtrip() {
        let mut stage = String::new();
        let _ = stage.push_str("rinse");
        let snapshot = StatusSnapshot {
            stage,
            confidence: 0.91,
            uptime_s: 3_700,
            heap_free: 120_000,
            heap_largest: 64_000,
            cycles: 57,
            faults: 1,
            stable: true,
        };

        let mut buf = [0u8; 128];
        let wire = snapshot.to_wire(&mut buf).unwrap();
        let decoded = StatusSnapshot::from_wire(wire).unwrap();
        assert_eq!(decoded, snapshot);
    }
}
