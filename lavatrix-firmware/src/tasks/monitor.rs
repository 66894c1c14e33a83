//! Main classification cycle task
//!
//! Runs one full cycle per tick: capture, preprocess, inference,
//! debounce. Committed stage changes fan out to the indicator and
//! status tasks; every cycle publishes a fresh status snapshot.

use defmt::*;
use embassy_time::{Duration, Instant, Ticker};

use lavatrix_core::config::MonitorConfig;
use lavatrix_core::pipeline::{validate_engine, CycleOutcome, Pipeline};
use lavatrix_core::traits::StageListener;
use lavatrix_protocol::StageEvent;

use crate::camera::Camera;
use crate::channels::{BLINK, STAGE_EVENTS, STATUS};
use crate::engine::VendorEngine;
use crate::heap::HeapProbe;

/// Time between classification cycles
pub const CYCLE_INTERVAL_MS: u64 = 2_000;

/// Every Nth cycle runs the engine with debug output enabled
const DEBUG_EVERY: u32 = 30;

/// Fans a committed stage change out to the other tasks
struct EventBridge;

impl StageListener for EventBridge {
    fn on_stage_changed(&mut self, stage: &str, confidence: f32) {
        let event = StageEvent::new(stage, confidence, Instant::now().as_millis());
        // A full channel drops this consumer's copy, never the commit
        let _ = STAGE_EVENTS.try_send(event.clone());
        BLINK.signal(event);
    }
}

#[embassy_executor::task]
pub async fn monitor_task(mut camera: Camera, mut engine: VendorEngine) {
    let config = MonitorConfig::default();

    if let Err(e) = validate_engine(&engine, &config.geometry) {
        error!("model validation failed: {}", e);
        return;
    }

    let mut pipeline = Pipeline::new(config);
    let probe = HeapProbe;
    let mut bridge = EventBridge;
    let mut ticker = Ticker::every(Duration::from_millis(CYCLE_INTERVAL_MS));

    info!("monitor task started");

    loop {
        ticker.next().await;
        let now_ms = Instant::now().as_millis();

        camera.refresh().await;

        let debug = pipeline.cycles() % DEBUG_EVERY == 0;
        let mut listeners: [&mut dyn StageListener; 1] = [&mut bridge];
        let report =
            pipeline.run_cycle(&mut camera, &mut engine, &probe, &mut listeners, now_ms, debug);

        match report.outcome {
            CycleOutcome::Completed { changed: true } => {
                info!("stage -> {}", report.stage.unwrap_or("unknown"));
            }
            CycleOutcome::Completed { changed: false } => {
                trace!("cycle ok, stage {}", report.stage.unwrap_or("unknown"));
            }
            CycleOutcome::Skipped(gate) => {
                warn!("cycle skipped: {}", gate);
            }
            CycleOutcome::Faulted(kind) => {
                warn!(
                    "cycle faulted: {} ({} critical errors)",
                    kind,
                    pipeline.health().critical_errors()
                );
            }
        }

        STATUS.signal(pipeline.snapshot(&probe, now_ms));
    }
}
