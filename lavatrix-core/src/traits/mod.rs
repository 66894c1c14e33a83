//! Hardware abstraction traits
//!
//! These traits define the interface between the classification pipeline
//! and its external collaborators: the camera, the vendor inference
//! engine, the heap allocator, and stage-change consumers.

pub mod capture;
pub mod engine;
pub mod listener;
pub mod memory;

pub use capture::{CaptureError, FrameSource};
pub use engine::{EngineError, Inference, InferenceEngine, Score};
pub use listener::StageListener;
pub use memory::HeapMonitor;
