//! Status and event uplink task
//!
//! Frames stage events and status snapshots onto the status UART. Each
//! frame is a one-byte tag followed by a postcard payload; the bridge
//! on the other side maps stages to range values with the same table.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_rp::uart::{Blocking, UartTx};

use lavatrix_protocol::{format_uptime, stage_code};

use crate::channels::{STAGE_EVENTS, STATUS};

/// Frame tag: stage event
pub const TAG_EVENT: u8 = 0x01;
/// Frame tag: status snapshot
pub const TAG_STATUS: u8 = 0x02;

#[embassy_executor::task]
pub async fn status_task(mut tx: UartTx<'static, Blocking>) {
    let mut buf = [0u8; 96];
    info!("status task started");

    loop {
        match select(STAGE_EVENTS.receive(), STATUS.wait()).await {
            Either::First(event) => {
                info!(
                    "stage event: {} (code {}) conf={}",
                    event.stage.as_str(),
                    stage_code(event.stage.as_str()),
                    event.confidence
                );
                buf[0] = TAG_EVENT;
                match postcard::to_slice(&event, &mut buf[1..]) {
                    Ok(payload) => {
                        let n = payload.len();
                        let _ = tx.blocking_write(&buf[..1 + n]);
                    }
                    Err(_) => warn!("event encode failed"),
                }
            }
            Either::Second(snapshot) => {
                debug!(
                    "status: stage={} up={} heap={}",
                    snapshot.stage.as_str(),
                    format_uptime(snapshot.uptime_s).as_str(),
                    snapshot.heap_free
                );
                buf[0] = TAG_STATUS;
                match snapshot.to_wire(&mut buf[1..]) {
                    Ok(payload) => {
                        let n = payload.len();
                        let _ = tx.blocking_write(&buf[..1 + n]);
                    }
                    Err(_) => warn!("status encode failed"),
                }
            }
        }
    }
}
