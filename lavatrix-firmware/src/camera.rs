//! DVP camera capture via PIO + DMA
//!
//! A PIO state machine samples the 8-bit camera bus on each PCLK rising
//! edge; autopush packs four bytes per word and DMA drains the RX FIFO
//! into a static frame buffer. `refresh()` captures one frame
//! asynchronously; the pipeline then reads it through the blocking
//! [`FrameSource`] view.

use embassy_rp::gpio::Input;
use embassy_rp::peripherals::{DMA_CH0, PIO0};
use embassy_rp::pio::{Common, Config, Direction as PioDirection, PioPin, ShiftConfig, ShiftDirection, StateMachine};
use embassy_rp::Peri;
use fixed::types::U24F8;

use lavatrix_core::frame::RawFrame;
use lavatrix_core::traits::{CaptureError, FrameSource};
use lavatrix_drivers::dvp::{CaptureWindow, DvpConfig, TransferState, BYTES_PER_PIXEL, QVGA_HEIGHT, QVGA_WIDTH};

/// Frame buffer size in 32-bit words
pub const FRAME_WORDS: usize =
    QVGA_WIDTH as usize * QVGA_HEIGHT as usize * BYTES_PER_PIXEL / 4;

/// DVP camera bound to PIO0 SM0 and one DMA channel
pub struct Camera {
    sm: StateMachine<'static, PIO0, 0>,
    dma: Peri<'static, DMA_CH0>,
    vsync: Input<'static>,
    // HREF is sampled by the sensor timing, not the firmware; holding
    // the input keeps the pin claimed
    _href: Input<'static>,
    window: CaptureWindow,
    buf: &'static mut [u32; FRAME_WORDS],
    fresh: bool,
}

impl Camera {
    /// Create the camera capture unit
    ///
    /// D0-D7 and PCLK must be consecutive GPIOs in that order; the
    /// sampling program waits on PCLK as IN pin index 8.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        common: &mut Common<'static, PIO0>,
        mut sm: StateMachine<'static, PIO0, 0>,
        dma: Peri<'static, DMA_CH0>,
        d0: Peri<'static, impl PioPin>,
        d1: Peri<'static, impl PioPin>,
        d2: Peri<'static, impl PioPin>,
        d3: Peri<'static, impl PioPin>,
        d4: Peri<'static, impl PioPin>,
        d5: Peri<'static, impl PioPin>,
        d6: Peri<'static, impl PioPin>,
        d7: Peri<'static, impl PioPin>,
        pclk: Peri<'static, impl PioPin>,
        vsync: Input<'static>,
        href: Input<'static>,
        buf: &'static mut [u32; FRAME_WORDS],
        config: DvpConfig,
    ) -> Self {
        let prg = pio::pio_asm!(
            ".wrap_target",
            "wait 1 pin 8", // PCLK rising edge
            "in pins, 8",   // sample D0-D7
            "wait 0 pin 8", // PCLK falling edge
            ".wrap"
        );

        let installed = common.load_program(&prg.program);

        let d0 = common.make_pio_pin(d0);
        let d1 = common.make_pio_pin(d1);
        let d2 = common.make_pio_pin(d2);
        let d3 = common.make_pio_pin(d3);
        let d4 = common.make_pio_pin(d4);
        let d5 = common.make_pio_pin(d5);
        let d6 = common.make_pio_pin(d6);
        let d7 = common.make_pio_pin(d7);
        let pclk = common.make_pio_pin(pclk);
        let in_pins = [&d0, &d1, &d2, &d3, &d4, &d5, &d6, &d7, &pclk];

        let mut cfg = Config::default();
        cfg.use_program(&installed, &[]);
        cfg.set_in_pins(&in_pins);
        // Bytes shift in at the top and settle toward bit 0, so word
        // memory order matches bus byte order on a little-endian core
        cfg.shift_in = ShiftConfig {
            auto_fill: true,
            threshold: 32,
            direction: ShiftDirection::Right,
        };
        // Sample at full system clock; PCLK is the pacing signal
        cfg.clock_divider = U24F8::from_num(1);

        sm.set_config(&cfg);
        sm.set_pin_dirs(PioDirection::In, &in_pins);

        Self {
            sm,
            dma,
            vsync,
            _href: href,
            window: CaptureWindow::new(config),
            buf,
            fresh: false,
        }
    }

    /// Capture one frame into the static buffer
    ///
    /// Waits for the VSYNC rising edge so the sampling loop starts at
    /// the first pixel of a frame.
    pub async fn refresh(&mut self) {
        self.fresh = false;
        self.window.release();
        if !self.window.arm() {
            return;
        }

        self.vsync.wait_for_rising_edge().await;

        self.sm.clear_fifos();
        self.sm.restart();
        self.sm.set_enable(true);
        self.sm
            .rx()
            .dma_pull(self.dma.reborrow(), &mut self.buf[..], false)
            .await;
        self.sm.set_enable(false);

        if self.window.complete(self.buf.len() * 4) {
            self.fresh = true;
        }
    }
}

/// View the DMA word buffer as bytes
fn words_as_bytes(words: &[u32]) -> &[u8] {
    // Safety: u32 has no padding or invalid bit patterns and the
    // returned slice covers exactly the same memory.
    unsafe { core::slice::from_raw_parts(words.as_ptr() as *const u8, words.len() * 4) }
}

impl FrameSource for Camera {
    fn capture(&mut self) -> Result<RawFrame<'_>, CaptureError> {
        if !self.fresh || self.window.state() != TransferState::Complete {
            return Err(CaptureError::Failed);
        }
        let data = words_as_bytes(&self.buf[..]);
        if data.is_empty() {
            return Err(CaptureError::Empty);
        }
        Ok(RawFrame {
            data,
            width: self.window.config().width,
            height: self.window.config().height,
        })
    }

    fn release(&mut self) {
        self.fresh = false;
        self.window.release();
    }
}
