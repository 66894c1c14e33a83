//! Per-cycle prediction orchestration
//!
//! One classification cycle runs to completion before the next begins;
//! the pipeline is the only component that calls the external capture
//! and inference collaborators. Every failure along the way is absorbed
//! into the health monitor and the caller gets the last committed stage
//! back, never an error. Stale but safe.

use heapless::String;
use lavatrix_protocol::StatusSnapshot;

use crate::classify::StageClassifier;
use crate::config::{ModelGeometry, MonitorConfig};
use crate::frame;
use crate::health::{CycleGate, FaultKind, HealthMonitor};
use crate::memory::{MemoryError, MemoryGuard};
use crate::signal::SignalAdapter;
use crate::traits::{
    CaptureError, EngineError, FrameSource, HeapMonitor, InferenceEngine, StageListener,
};

/// Errors detected while validating the engine at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SetupError {
    /// Model reports no classes
    NoClasses,
    /// Model reports a zero input dimension
    ZeroInputDimension,
    /// Model input size disagrees with the configured geometry
    GeometryMismatch,
}

/// Check the loaded model against the configured geometry
///
/// Run once before the first cycle; a model that fails here would turn
/// every cycle into a fault.
pub fn validate_engine(
    engine: &impl InferenceEngine,
    geometry: &ModelGeometry,
) -> Result<(), SetupError> {
    if engine.label_count() == 0 {
        return Err(SetupError::NoClasses);
    }
    if engine.input_width() == 0 || engine.input_height() == 0 {
        return Err(SetupError::ZeroInputDimension);
    }
    if engine.input_width() != geometry.input_width
        || engine.input_height() != geometry.input_height
    {
        return Err(SetupError::GeometryMismatch);
    }
    Ok(())
}

/// How one cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleOutcome {
    /// Ran to completion; `changed` is whether a stage was committed
    Completed { changed: bool },
    /// Skipped by the health gate before doing any work
    Skipped(CycleGate),
    /// A step failed; the fault was recorded and the cycle abandoned
    Faulted(FaultKind),
}

/// Result of one cycle, always carrying the committed stage
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    /// Committed stage after the cycle (unchanged on skip or fault)
    pub stage: Option<&'static str>,
    /// Confidence of the last accepted cycle
    pub confidence: f32,
}

/// The prediction pipeline
///
/// Owns all process-wide mutable state (stage, health, the guarded
/// buffer); collaborators are passed per call so boards can wire up
/// whatever capture and engine they have.
#[derive(Debug)]
pub struct Pipeline {
    config: MonitorConfig,
    guard: MemoryGuard,
    health: HealthMonitor,
    classifier: StageClassifier,
    cycles: u32,
}

impl Pipeline {
    /// Create a pipeline; allocates nothing until the first cycle
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            guard: MemoryGuard::new(config.memory),
            health: HealthMonitor::new(config.health),
            classifier: StageClassifier::new(config.tuning),
            cycles: 0,
        }
    }

    /// The committed, externally visible stage
    pub fn current_stage(&self) -> Option<&'static str> {
        self.classifier.current_stage()
    }

    /// Health state, for external gating decisions
    pub fn health(&self) -> &HealthMonitor {
        &self.health
    }

    /// Cycles attempted since start
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    /// Clear health state after external intervention
    ///
    /// This is the only way out of suppression. The committed stage is
    /// kept; a restart of the health tracking must not fake a stage
    /// change.
    pub fn reinitialize(&mut self) {
        self.health.reinitialize();
        self.guard.release();
    }

    /// Run one classification cycle
    ///
    /// `now_ms` is the monotonic uptime; the caller samples it once per
    /// cycle. `debug` is passed through to the vendor engine.
    pub fn run_cycle(
        &mut self,
        source: &mut impl FrameSource,
        engine: &mut impl InferenceEngine,
        heap: &impl HeapMonitor,
        listeners: &mut [&mut dyn StageListener],
        now_ms: u64,
        debug: bool,
    ) -> CycleReport {
        match self.health.gate(now_ms) {
            CycleGate::Ready => {}
            gate => return self.report(CycleOutcome::Skipped(gate)),
        }
        self.cycles = self.cycles.wrapping_add(1);

        // The heap safety check lives inside acquire and only gates new
        // allocation; once the buffer is held the cycle needs no heap,
        // and free memory legitimately sits below the pre-allocation
        // floor.
        if let Err(e) = self.guard.acquire(self.config.geometry.input_bytes(), heap) {
            let kind = match e {
                MemoryError::Unsafe => FaultKind::MemoryUnsafe,
                MemoryError::AllocationFailed => FaultKind::AllocationFailed,
            };
            return self.fault(kind, now_ms);
        }

        let free_before = heap.free_bytes();

        // Capture and preprocess. The sensor buffer is released exactly
        // once, whatever happens in between.
        let preprocessed = {
            let geometry = self.config.geometry;
            match source.capture() {
                Err(CaptureError::Failed) => Err(FaultKind::CaptureFailed),
                Err(CaptureError::Empty) => Err(FaultKind::InvalidFrame),
                Ok(raw) => {
                    if raw.data.is_empty() || raw.data.len() > geometry.source_bytes() {
                        Err(FaultKind::InvalidFrame)
                    } else {
                        match self.guard.buffer_mut() {
                            Some(buf) => frame::convert(&raw, &geometry, buf)
                                .map_err(|_| FaultKind::PreprocessFailed),
                            None => Err(FaultKind::AllocationFailed),
                        }
                    }
                }
            }
        };
        source.release();
        if let Err(kind) = preprocessed {
            return self.fault(kind, now_ms);
        }

        // Inference over the guarded buffer
        let inference = {
            let total = self.config.geometry.total_samples();
            let Some(buf) = self.guard.buffer() else {
                return self.fault(FaultKind::AllocationFailed, now_ms);
            };
            let signal = SignalAdapter::new(buf, total);
            engine.classify(&signal, debug)
        };
        let inference = match inference {
            Ok(inference) => inference,
            Err(EngineError::Code(code)) => {
                return self.fault(FaultKind::InferenceError(code), now_ms)
            }
        };

        if inference.elapsed_ms > self.health.max_inference_ms() {
            return self.fault(FaultKind::InferenceTimeout, now_ms);
        }
        if inference.scores.is_empty() || inference.scores.len() > engine.label_count() {
            return self.fault(FaultKind::InvalidResultIndex, now_ms);
        }

        // Heap budget check before the result is allowed to matter: a
        // leaking cycle must not commit a stage change
        let leaked = free_before.saturating_sub(heap.free_bytes());
        if leaked > self.health.leak_threshold() {
            return self.fault(FaultKind::LeakSuspected, now_ms);
        }

        let change = self.classifier.process(&inference.scores);
        if let Some(change) = change {
            for listener in listeners.iter_mut() {
                listener.on_stage_changed(change.stage, change.confidence);
            }
        }

        self.health.record_success();
        self.report(CycleOutcome::Completed {
            changed: change.is_some(),
        })
    }

    /// Build a status snapshot
    pub fn snapshot(&self, heap: &impl HeapMonitor, now_ms: u64) -> StatusSnapshot {
        let mut stage: String<{ lavatrix_protocol::MAX_STAGE_LEN }> = String::new();
        let _ = stage.push_str(self.classifier.current_stage().unwrap_or("unknown"));
        StatusSnapshot {
            stage,
            confidence: self.classifier.last_confidence(),
            uptime_s: (now_ms / 1_000).min(u32::MAX as u64) as u32,
            heap_free: clamp_u32(heap.free_bytes()),
            heap_largest: clamp_u32(heap.largest_block()),
            cycles: self.cycles,
            faults: self.health.critical_errors(),
            stable: self.health.is_stable(),
        }
    }

    fn fault(&mut self, kind: FaultKind, now_ms: u64) -> CycleReport {
        self.health.record_fault(kind, now_ms);
        // Defensive cleanup: every transition to unstable drops the
        // guarded buffer
        self.guard.release();
        self.report(CycleOutcome::Faulted(kind))
    }

    fn report(&self, outcome: CycleOutcome) -> CycleReport {
        CycleReport {
            outcome,
            stage: self.classifier.current_stage(),
            confidence: self.classifier.last_confidence(),
        }
    }
}

fn clamp_u32(value: usize) -> u32 {
    value.min(u32::MAX as usize) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClassifierTuning, HealthPolicy, MemoryPolicy};
    use crate::frame::RawFrame;
    use crate::traits::{Inference, Score};
    use alloc::string::String as StdString;
    use alloc::vec::Vec;
    use core::cell::Cell;

    struct FakeHeap {
        free: Cell<usize>,
        largest: Cell<usize>,
    }

    impl FakeHeap {
        fn healthy() -> Self {
            Self {
                free: Cell::new(200_000),
                largest: Cell::new(150_000),
            }
        }
    }

    impl HeapMonitor for FakeHeap {
        fn free_bytes(&self) -> usize {
            self.free.get()
        }
        fn largest_block(&self) -> usize {
            self.largest.get()
        }
    }

    struct MockSource {
        data: Vec<u8>,
        width: u16,
        height: u16,
        fail: Option<CaptureError>,
        captures: u32,
        releases: u32,
    }

    impl MockSource {
        fn solid(pixel: u16, width: u16, height: u16) -> Self {
            let mut data = Vec::new();
            for _ in 0..(width as usize * height as usize) {
                data.extend_from_slice(&pixel.to_le_bytes());
            }
            Self {
                data,
                width,
                height,
                fail: None,
                captures: 0,
                releases: 0,
            }
        }
    }

    impl FrameSource for MockSource {
        fn capture(&mut self) -> Result<RawFrame<'_>, CaptureError> {
            self.captures += 1;
            if let Some(e) = self.fail {
                return Err(e);
            }
            Ok(RawFrame {
                data: &self.data,
                width: self.width,
                height: self.height,
            })
        }
        fn release(&mut self) {
            self.releases += 1;
        }
    }

    struct MockEngine<'a> {
        scores: Vec<(&'static str, f32)>,
        elapsed_ms: u32,
        error: Option<i32>,
        width: u16,
        height: u16,
        // Optional heap to drain during classify, to simulate a leak
        drain: Option<(&'a FakeHeap, usize)>,
    }

    impl<'a> MockEngine<'a> {
        fn confident(label: &'static str, value: f32) -> Self {
            Self {
                scores: alloc::vec![("idle", 1.0 - value), (label, value)],
                elapsed_ms: 120,
                error: None,
                width: 4,
                height: 4,
                drain: None,
            }
        }
    }

    impl InferenceEngine for MockEngine<'_> {
        fn classify(
            &mut self,
            _signal: &SignalAdapter<'_>,
            _debug: bool,
        ) -> Result<Inference, EngineError> {
            if let Some(code) = self.error {
                return Err(EngineError::Code(code));
            }
            if let Some((heap, drop_to)) = self.drain {
                heap.free.set(drop_to);
            }
            let scores = self
                .scores
                .iter()
                .map(|&(label, value)| Score { label, value })
                .collect();
            Ok(Inference {
                scores,
                elapsed_ms: self.elapsed_ms,
            })
        }
        fn label_count(&self) -> usize {
            self.scores.len()
        }
        fn input_width(&self) -> u16 {
            self.width
        }
        fn input_height(&self) -> u16 {
            self.height
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<(StdString, f32)>,
    }

    impl StageListener for Recorder {
        fn on_stage_changed(&mut self, stage: &str, confidence: f32) {
            self.events.push((StdString::from(stage), confidence));
        }
    }

    fn test_config() -> MonitorConfig {
        MonitorConfig {
            geometry: ModelGeometry {
                source_width: 8,
                source_height: 8,
                input_width: 4,
                input_height: 4,
            },
            tuning: ClassifierTuning {
                min_confidence: 0.60,
                debounce_cycles: 3,
            },
            memory: MemoryPolicy {
                min_free_heap: 1_000,
                min_largest_block: 400,
            },
            health: HealthPolicy {
                cooldown_ms: 1_000,
                max_critical_errors: 5,
                max_inference_ms: 2_000,
                leak_threshold: 8 * 1024,
            },
        }
    }

    /// Drive `n` cycles with ticks far enough apart to clear cooldowns
    fn run_n(
        pipeline: &mut Pipeline,
        source: &mut MockSource,
        engine: &mut MockEngine<'_>,
        heap: &FakeHeap,
        listeners: &mut [&mut dyn StageListener],
        start_ms: u64,
        n: u32,
    ) -> CycleReport {
        let mut report = pipeline.run_cycle(source, engine, heap, listeners, start_ms, false);
        for i in 1..n {
            report = pipeline.run_cycle(
                source,
                engine,
                heap,
                listeners,
                start_ms + i as u64 * 2_000,
                false,
            );
        }
        report
    }

    #[test]
    fn test_end_to_end_stage_change_notifies_once() {
        let mut pipeline = Pipeline::new(test_config());
        let heap = FakeHeap::healthy();
        let mut source = MockSource::solid(0xF800, 8, 8);
        let mut recorder = Recorder::default();

        // Commit "rinse" first (K = 3)
        let mut rinse = MockEngine::confident("rinse", 0.90);
        {
            let mut listeners: [&mut dyn StageListener; 1] = [&mut recorder];
            run_n(&mut pipeline, &mut source, &mut rinse, &heap, &mut listeners, 0, 3);
        }
        assert_eq!(pipeline.current_stage(), Some("rinse"));

        // Three consecutive "spin" cycles at 0.95
        let mut spin = MockEngine::confident("spin", 0.95);
        let report = {
            let mut listeners: [&mut dyn StageListener; 1] = [&mut recorder];
            run_n(
                &mut pipeline,
                &mut source,
                &mut spin,
                &heap,
                &mut listeners,
                10_000,
                3,
            )
        };

        assert_eq!(report.outcome, CycleOutcome::Completed { changed: true });
        assert_eq!(pipeline.current_stage(), Some("spin"));
        // Exactly one notification for each commit
        assert_eq!(recorder.events.len(), 2);
        assert_eq!(recorder.events[1].0, "spin");
        assert_eq!(recorder.events[1].1, 0.95);
    }

    #[test]
    fn test_capture_failure_keeps_stale_stage_and_cools_down() {
        let mut pipeline = Pipeline::new(test_config());
        let heap = FakeHeap::healthy();
        let mut recorder = Recorder::default();

        // Establish a committed stage
        let mut source = MockSource::solid(0x07E0, 8, 8);
        let mut rinse = MockEngine::confident("rinse", 0.90);
        {
            let mut listeners: [&mut dyn StageListener; 1] = [&mut recorder];
            run_n(&mut pipeline, &mut source, &mut rinse, &heap, &mut listeners, 0, 3);
        }

        // Camera goes dark
        source.fail = Some(CaptureError::Failed);
        let mut listeners: [&mut dyn StageListener; 1] = [&mut recorder];
        let report =
            pipeline.run_cycle(&mut source, &mut rinse, &heap, &mut listeners, 50_000, false);

        assert_eq!(report.outcome, CycleOutcome::Faulted(FaultKind::CaptureFailed));
        assert_eq!(report.stage, Some("rinse"));
        assert!(!pipeline.health().is_stable());

        // Next cycle inside the cooldown window is skipped, same answer
        let report =
            pipeline.run_cycle(&mut source, &mut rinse, &heap, &mut listeners, 50_500, false);
        assert_eq!(
            report.outcome,
            CycleOutcome::Skipped(CycleGate::CoolingDown)
        );
        assert_eq!(report.stage, Some("rinse"));
    }

    #[test]
    fn test_memory_unsafe_blocks_before_capture() {
        let mut pipeline = Pipeline::new(test_config());
        let heap = FakeHeap::healthy();
        heap.free.set(500); // below the floor
        let mut source = MockSource::solid(0x0000, 8, 8);
        let mut engine = MockEngine::confident("spin", 0.95);
        let mut listeners: [&mut dyn StageListener; 0] = [];

        let report = pipeline.run_cycle(&mut source, &mut engine, &heap, &mut listeners, 0, false);

        assert_eq!(report.outcome, CycleOutcome::Faulted(FaultKind::MemoryUnsafe));
        assert_eq!(source.captures, 0);
    }

    #[test]
    fn test_leak_is_flagged_without_commit() {
        let mut pipeline = Pipeline::new(test_config());
        let heap = FakeHeap::healthy();
        let mut source = MockSource::solid(0x001F, 8, 8);
        let mut engine = MockEngine::confident("spin", 0.99);
        engine.drain = Some((&heap, 150_000)); // drops 50 KB during inference
        let mut listeners: [&mut dyn StageListener; 0] = [];

        let report = pipeline.run_cycle(&mut source, &mut engine, &heap, &mut listeners, 0, false);

        assert_eq!(report.outcome, CycleOutcome::Faulted(FaultKind::LeakSuspected));
        // Confident scores were produced, but the leaky cycle must not
        // move the stage or the pending debounce
        assert_eq!(pipeline.current_stage(), None);
    }

    #[test]
    fn test_inference_timeout_faults() {
        let mut pipeline = Pipeline::new(test_config());
        let heap = FakeHeap::healthy();
        let mut source = MockSource::solid(0x0000, 8, 8);
        let mut engine = MockEngine::confident("spin", 0.95);
        engine.elapsed_ms = 2_500;
        let mut listeners: [&mut dyn StageListener; 0] = [];

        let report = pipeline.run_cycle(&mut source, &mut engine, &heap, &mut listeners, 0, false);
        assert_eq!(
            report.outcome,
            CycleOutcome::Faulted(FaultKind::InferenceTimeout)
        );
    }

    #[test]
    fn test_engine_error_code_faults_and_releases_buffer() {
        let mut pipeline = Pipeline::new(test_config());
        let heap = FakeHeap::healthy();
        let mut source = MockSource::solid(0x0000, 8, 8);
        let mut engine = MockEngine::confident("spin", 0.95);
        engine.error = Some(-3);
        let mut listeners: [&mut dyn StageListener; 0] = [];

        let report = pipeline.run_cycle(&mut source, &mut engine, &heap, &mut listeners, 0, false);
        assert_eq!(
            report.outcome,
            CycleOutcome::Faulted(FaultKind::InferenceError(-3))
        );
        assert_eq!(source.releases, 1);
    }

    #[test]
    fn test_repeated_faults_suppress_until_reinit() {
        let mut pipeline = Pipeline::new(test_config());
        let heap = FakeHeap::healthy();
        let mut source = MockSource::solid(0x0000, 8, 8);
        source.fail = Some(CaptureError::Failed);
        let mut engine = MockEngine::confident("spin", 0.95);
        let mut listeners: [&mut dyn StageListener; 0] = [];

        // Five faults, spaced past the cooldown each time
        for i in 0..5u64 {
            let report = pipeline.run_cycle(
                &mut source,
                &mut engine,
                &heap,
                &mut listeners,
                i * 2_000,
                false,
            );
            assert!(matches!(report.outcome, CycleOutcome::Faulted(_)));
        }

        let report =
            pipeline.run_cycle(&mut source, &mut engine, &heap, &mut listeners, 100_000, false);
        assert_eq!(report.outcome, CycleOutcome::Skipped(CycleGate::Suppressed));

        // External intervention reopens the gate
        pipeline.reinitialize();
        source.fail = None;
        let report =
            pipeline.run_cycle(&mut source, &mut engine, &heap, &mut listeners, 200_000, false);
        assert_eq!(report.outcome, CycleOutcome::Completed { changed: false });
    }

    #[test]
    fn test_oversized_frame_is_invalid() {
        let mut pipeline = Pipeline::new(test_config());
        let heap = FakeHeap::healthy();
        // 16x16 frame against an 8x8 geometry
        let mut source = MockSource::solid(0x0000, 16, 16);
        let mut engine = MockEngine::confident("spin", 0.95);
        let mut listeners: [&mut dyn StageListener; 0] = [];

        let report = pipeline.run_cycle(&mut source, &mut engine, &heap, &mut listeners, 0, false);
        assert_eq!(report.outcome, CycleOutcome::Faulted(FaultKind::InvalidFrame));
        assert_eq!(source.releases, 1);
    }

    #[test]
    fn test_snapshot_reports_current_state() {
        let mut pipeline = Pipeline::new(test_config());
        let heap = FakeHeap::healthy();
        let mut source = MockSource::solid(0x0000, 8, 8);
        let mut engine = MockEngine::confident("spin", 0.95);
        let mut listeners: [&mut dyn StageListener; 0] = [];

        let before = pipeline.snapshot(&heap, 5_000);
        assert_eq!(before.stage.as_str(), "unknown");
        assert_eq!(before.uptime_s, 5);
        assert_eq!(before.cycles, 0);
        assert!(before.stable);

        run_n(&mut pipeline, &mut source, &mut engine, &heap, &mut listeners, 0, 3);

        let after = pipeline.snapshot(&heap, 65_000);
        assert_eq!(after.stage.as_str(), "spin");
        assert_eq!(after.confidence, 0.95);
        assert_eq!(after.cycles, 3);
        assert_eq!(after.faults, 0);
        assert_eq!(after.heap_free, 200_000);
    }

    #[test]
    fn test_validate_engine() {
        let geometry = test_config().geometry;
        let good = MockEngine::confident("spin", 0.9);
        assert!(validate_engine(&good, &geometry).is_ok());

        let mut no_classes = MockEngine::confident("spin", 0.9);
        no_classes.scores.clear();
        assert_eq!(
            validate_engine(&no_classes, &geometry),
            Err(SetupError::NoClasses)
        );

        let mut wrong_size = MockEngine::confident("spin", 0.9);
        wrong_size.width = 96;
        assert_eq!(
            validate_engine(&wrong_size, &geometry),
            Err(SetupError::GeometryMismatch)
        );
    }
}
