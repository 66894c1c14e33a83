//! Error escalation and fail-safe health tracking
//!
//! Every failure anywhere in the cycle lands here. The monitor counts
//! critical errors, holds the system in a cooldown window after each
//! one, and above the critical-error ceiling suppresses classification
//! entirely until explicit re-initialization. The externally visible
//! effect of any failure is only ever that the committed stage stops
//! changing.

use crate::config::HealthPolicy;

/// Everything that counts as a critical failure of one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultKind {
    /// Heap failed the pre-cycle safety check
    MemoryUnsafe,
    /// Model input buffer could not be (safely) allocated
    AllocationFailed,
    /// Camera produced no frame
    CaptureFailed,
    /// Frame was empty or larger than the sensor geometry allows
    InvalidFrame,
    /// Crop/conversion failed
    PreprocessFailed,
    /// Engine-reported error code
    InferenceError(i32),
    /// Inference exceeded the wall-clock ceiling
    InferenceTimeout,
    /// Free heap dropped more than the leak threshold across one cycle
    LeakSuspected,
    /// Engine returned an empty or oversized result vector
    InvalidResultIndex,
}

/// Whether a classification cycle may run right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleGate {
    /// Cycle may proceed
    Ready,
    /// Inside the post-failure cooldown window
    CoolingDown,
    /// Critical-error ceiling reached; suppressed until re-init
    Suppressed,
}

/// Health state for the whole monitor
///
/// Mutated only on the main cycle; read by the orchestrator to gate
/// cycles.
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    policy: HealthPolicy,
    critical_errors: u32,
    stable: bool,
    last_failure_ms: Option<u64>,
    last_fault: Option<FaultKind>,
}

impl HealthMonitor {
    /// Create a monitor in the stable state
    pub fn new(policy: HealthPolicy) -> Self {
        Self {
            policy,
            critical_errors: 0,
            stable: true,
            last_failure_ms: None,
            last_fault: None,
        }
    }

    /// Record one critical failure
    pub fn record_fault(&mut self, kind: FaultKind, now_ms: u64) {
        self.critical_errors = self.critical_errors.saturating_add(1);
        self.stable = false;
        self.last_failure_ms = Some(now_ms);
        self.last_fault = Some(kind);
    }

    /// Record one clean cycle
    ///
    /// Restores the stable flag; the critical-error count is retained
    /// so repeated intermittent failures still reach the ceiling.
    pub fn record_success(&mut self) {
        self.stable = true;
    }

    /// Check whether a cycle may run at `now_ms`
    pub fn gate(&self, now_ms: u64) -> CycleGate {
        if self.critical_errors >= self.policy.max_critical_errors {
            return CycleGate::Suppressed;
        }
        if let Some(failed_at) = self.last_failure_ms {
            if now_ms.saturating_sub(failed_at) < self.policy.cooldown_ms as u64 {
                return CycleGate::CoolingDown;
            }
        }
        CycleGate::Ready
    }

    /// Clear all health state
    ///
    /// Suppression is permanent for a run; this is the external
    /// intervention that ends it.
    pub fn reinitialize(&mut self) {
        self.critical_errors = 0;
        self.stable = true;
        self.last_failure_ms = None;
        self.last_fault = None;
    }

    /// Whether the last cycle completed cleanly
    pub fn is_stable(&self) -> bool {
        self.stable
    }

    /// Number of critical errors since the last re-initialization
    pub fn critical_errors(&self) -> u32 {
        self.critical_errors
    }

    /// Most recent fault, if any
    pub fn last_fault(&self) -> Option<FaultKind> {
        self.last_fault
    }

    /// Whether classification is suppressed
    pub fn is_suppressed(&self) -> bool {
        self.critical_errors >= self.policy.max_critical_errors
    }

    /// Inference wall-clock ceiling (ms)
    pub fn max_inference_ms(&self) -> u32 {
        self.policy.max_inference_ms
    }

    /// Leak threshold (bytes per cycle)
    pub fn leak_threshold(&self) -> usize {
        self.policy.leak_threshold
    }
}
