//! Inference engine trait

use heapless::Vec;

use crate::config::MAX_CLASSES;
use crate::signal::SignalAdapter;

/// One per-class confidence score
///
/// Labels are the engine's own category strings; they live for the whole
/// run because the vendor engine compiles them into the model blob.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Score {
    /// Class label as reported by the model
    pub label: &'static str,
    /// Confidence in [0, 1]
    pub value: f32,
}

/// Result of one engine invocation
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Inference {
    /// Per-class scores in the engine's label order
    pub scores: Vec<Score, MAX_CLASSES>,
    /// Wall-clock time the engine reported for the run (ms)
    pub elapsed_ms: u32,
}

/// Errors reported by the inference engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EngineError {
    /// Vendor engine error code
    Code(i32),
}

/// Trait for the vendor inference engine
///
/// The engine pulls normalized samples through the [`SignalAdapter`]
/// rather than receiving a buffer, matching the vendor's sample-reader
/// callback interface.
pub trait InferenceEngine {
    /// Run the classifier over the sample stream
    ///
    /// Blocking and time-bounded only by measurement around the call;
    /// the pipeline enforces the wall-clock ceiling after return.
    fn classify(&mut self, signal: &SignalAdapter<'_>, debug: bool) -> Result<Inference, EngineError>;

    /// Number of classes in the loaded model
    fn label_count(&self) -> usize;

    /// Model input width in pixels
    fn input_width(&self) -> u16;

    /// Model input height in pixels
    fn input_height(&self) -> u16;
}
