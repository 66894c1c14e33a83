//! Stage-change blink task
//!
//! Blinks the status LED three times on every committed stage change.

use defmt::*;
use embassy_rp::gpio::Output;
use embassy_time::{Duration, Ticker};

use lavatrix_core::traits::StageListener;
use lavatrix_drivers::indicator::BlinkIndicator;

use crate::channels::BLINK;

/// Poll interval while a blink sequence is running
const POLL_MS: u32 = 10;

#[embassy_executor::task]
pub async fn indicator_task(led: Output<'static>) {
    let mut indicator = BlinkIndicator::new(led);
    info!("indicator task started");

    loop {
        let event = BLINK.wait().await;
        debug!("blink for stage {}", event.stage.as_str());
        indicator.on_stage_changed(event.stage.as_str(), event.confidence);

        let mut ticker = Ticker::every(Duration::from_millis(POLL_MS as u64));
        while indicator.is_active() {
            ticker.next().await;
            indicator.poll(POLL_MS);
        }
    }
}
