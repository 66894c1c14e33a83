//! Lavatrix - Washing Machine Stage Monitor Firmware
//!
//! Main firmware binary for RP2040-based monitor boards. A DVP camera
//! watches the machine's window, a vendor classifier scores each frame
//! against six operating stages, and the debounced result drives the
//! LED indicator and the status UART.
//!
//! Named after the Latin "lavatrix" (washerwoman) - the firmware
//! watches the machine so nobody else has to.

#![no_std]
#![no_main]

extern crate alloc;

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::PIO0;
use embassy_rp::pio::Pio;
use embassy_rp::pwm::{Config as PwmConfig, Pwm};
use embassy_rp::uart::{Config as UartConfig, UartTx};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use lavatrix_drivers::dvp::{DvpConfig, SYS_CLK_HZ, XCLK_HZ};

use crate::camera::{Camera, FRAME_WORDS};
use crate::engine::VendorEngine;

mod camera;
mod channels;
mod engine;
mod heap;
mod tasks;

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => embassy_rp::pio::InterruptHandler<PIO0>;
});

// Static frame buffer for DMA (must live forever)
static FRAME_BUF: StaticCell<[u32; FRAME_WORDS]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Lavatrix firmware starting...");

    heap::init();

    let p = embassy_rp::init(Default::default());
    info!("peripherals initialized");

    // Camera master clock: PWM square wave on GPIO11.
    // SYS_CLK / (top + 1) lands just above the nominal 20MHz; the
    // sensor tolerates 10-48MHz.
    let mut xclk_config = PwmConfig::default();
    xclk_config.top = (SYS_CLK_HZ / XCLK_HZ) as u16 - 1;
    xclk_config.compare_b = (xclk_config.top + 1) / 2;
    let _xclk = Pwm::new_output_b(p.PWM_SLICE5, p.PIN_11, xclk_config);

    // Camera bus: D0-D7 on GPIO0-7, PCLK on GPIO8, sync on GPIO9/10
    let Pio {
        mut common, sm0, ..
    } = Pio::new(p.PIO0, Irqs);

    let vsync = Input::new(p.PIN_9, Pull::Down);
    let href = Input::new(p.PIN_10, Pull::Down);
    let frame_buf = FRAME_BUF.init([0u32; FRAME_WORDS]);

    let camera = Camera::new(
        &mut common,
        sm0,
        p.DMA_CH0,
        p.PIN_0,
        p.PIN_1,
        p.PIN_2,
        p.PIN_3,
        p.PIN_4,
        p.PIN_5,
        p.PIN_6,
        p.PIN_7,
        p.PIN_8,
        vsync,
        href,
        frame_buf,
        DvpConfig::default(),
    );
    info!("camera initialized");

    // Vendor classifier
    let engine = match VendorEngine::init() {
        Ok(engine) => engine,
        Err(e) => {
            error!("classifier init failed: {}", e);
            // Nothing sensible to do without a model; park the core
            loop {
                embassy_time::Timer::after_secs(60).await;
            }
        }
    };
    info!("classifier initialized");

    // Status LED
    let led = Output::new(p.PIN_25, Level::Low);

    // Status UART on GPIO16 (TX only)
    let uart_config = UartConfig::default(); // 115200 baud default
    let tx = UartTx::new_blocking(p.UART0, p.PIN_16, uart_config);
    info!("status UART initialized");

    // Spawn tasks
    spawner.spawn(tasks::monitor_task(camera, engine)).unwrap();
    spawner.spawn(tasks::indicator_task(led)).unwrap();
    spawner.spawn(tasks::status_task(tx)).unwrap();

    info!("all tasks spawned, firmware running");

    // Main task has nothing else to do - all work happens in spawned tasks
    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("main loop heartbeat");
    }
}
