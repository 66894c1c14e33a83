//! Configuration type definitions
//!
//! Historical builds of the monitor hard-coded the debounce count, the
//! memory floors, and the leak threshold, and different builds disagreed
//! on the values. All of them are explicit, defaultable fields here so a
//! board can tune them without touching component code.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum stage label length
pub const MAX_LABEL_LEN: usize = 16;

/// Maximum classes the inference engine may report
pub const MAX_CLASSES: usize = 8;

/// Source frame and model input geometry
///
/// The camera delivers QVGA RGB565; the model consumes a centered crop
/// expanded to RGB888.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModelGeometry {
    /// Source frame width in pixels
    pub source_width: u16,
    /// Source frame height in pixels
    pub source_height: u16,
    /// Model input width in pixels
    pub input_width: u16,
    /// Model input height in pixels
    pub input_height: u16,
}

impl ModelGeometry {
    /// Bytes in a full source frame (2 bytes per RGB565 pixel)
    pub fn source_bytes(&self) -> usize {
        self.source_width as usize * self.source_height as usize * 2
    }

    /// Bytes in the model input buffer (3 bytes per RGB888 pixel)
    pub fn input_bytes(&self) -> usize {
        self.total_samples()
    }

    /// Total samples the engine reads (one byte per channel)
    pub fn total_samples(&self) -> usize {
        self.input_width as usize * self.input_height as usize * 3
    }
}

impl Default for ModelGeometry {
    fn default() -> Self {
        Self {
            source_width: 320,
            source_height: 240,
            input_width: 96,
            input_height: 96,
        }
    }
}

/// Stage classifier tuning
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClassifierTuning {
    /// Minimum winning confidence for a cycle to count at all
    pub min_confidence: f32,
    /// Consecutive agreeing cycles required to commit a stage change
    pub debounce_cycles: u8,
}

impl Default for ClassifierTuning {
    fn default() -> Self {
        Self {
            min_confidence: 0.60,
            debounce_cycles: 3,
        }
    }
}

/// Memory safety policy for the guarded input buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MemoryPolicy {
    /// Minimum free heap required to attempt a cycle (bytes)
    pub min_free_heap: usize,
    /// Minimum largest contiguous allocatable block (bytes)
    pub min_largest_block: usize,
}

impl Default for MemoryPolicy {
    fn default() -> Self {
        Self {
            min_free_heap: 48 * 1024,
            min_largest_block: 16 * 1024,
        }
    }
}

/// Failure escalation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HealthPolicy {
    /// Cycles are skipped for this long after any failure (ms)
    pub cooldown_ms: u32,
    /// Critical error count at which classification is suppressed
    pub max_critical_errors: u32,
    /// Inference wall-clock ceiling (ms)
    pub max_inference_ms: u32,
    /// Free-heap drop across one cycle treated as a suspected leak (bytes)
    pub leak_threshold: usize,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            cooldown_ms: 5_000,
            max_critical_errors: 5,
            max_inference_ms: 2_000,
            leak_threshold: 8 * 1024,
        }
    }
}

/// Complete monitor configuration
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MonitorConfig {
    pub geometry: ModelGeometry,
    pub tuning: ClassifierTuning,
    pub memory: MemoryPolicy,
    pub health: HealthPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_geometry_sizes() {
        let geom = ModelGeometry::default();
        assert_eq!(geom.source_bytes(), 320 * 240 * 2);
        assert_eq!(geom.input_bytes(), 96 * 96 * 3);
        assert_eq!(geom.total_samples(), geom.input_bytes());
    }

    #[test]
    fn test_defaults_are_defensive() {
        let config = MonitorConfig::default();
        // Debounce of 3 is the most defensive observed variant
        assert_eq!(config.tuning.debounce_cycles, 3);
        assert!(config.memory.min_free_heap > config.memory.min_largest_block);
        assert!(config.health.cooldown_ms > 0);
    }
}
