//! Stage-change listener trait

/// Trait for stage-change consumers
///
/// Listeners (cloud bridge, LED indicator, log sink) are invoked
/// synchronously, in registration order, at commit time only. A
/// reaffirmed stage never notifies.
pub trait StageListener {
    /// Called once per committed stage transition
    fn on_stage_changed(&mut self, stage: &str, confidence: f32);
}
