//! PIO-based DVP camera capture helpers
//!
//! The camera pushes an 8-bit parallel bus (D0-D7) clocked by PCLK,
//! framed by VSYNC/HREF. A PIO state machine samples the bus on each
//! PCLK rising edge and DMA moves the packed bytes into the frame
//! buffer; the CPU only arms the transfer and waits for completion.
//!
//! This module holds the board-independent parts: the sampling program,
//! the clock divider math and the transfer bookkeeping. The state
//! machine and DMA channel wiring live in the firmware crate.

/// System clock frequency (RP2040 default)
pub const SYS_CLK_HZ: u32 = 125_000_000;

/// Camera master clock the sensor expects
pub const XCLK_HZ: u32 = 20_000_000;

/// QVGA frame dimensions
pub const QVGA_WIDTH: u16 = 320;
pub const QVGA_HEIGHT: u16 = 240;

/// Bytes per RGB565 pixel on the bus
pub const BYTES_PER_PIXEL: usize = 2;

/// DVP pin and geometry configuration
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DvpConfig {
    /// First data pin (D0); D0-D7 must be consecutive GPIOs
    pub data_base_pin: u8,
    /// PCLK pin, index 8 relative to the data base
    pub pclk_pin: u8,
    /// VSYNC pin
    pub vsync_pin: u8,
    /// HREF pin
    pub href_pin: u8,
    /// Frame width in pixels
    pub width: u16,
    /// Frame height in pixels
    pub height: u16,
}

impl Default for DvpConfig {
    fn default() -> Self {
        Self {
            data_base_pin: 0,
            pclk_pin: 8,
            vsync_pin: 9,
            href_pin: 10,
            width: QVGA_WIDTH,
            height: QVGA_HEIGHT,
        }
    }
}

impl DvpConfig {
    /// Bytes in one scan line
    pub fn line_bytes(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Bytes in one full frame
    pub fn frame_bytes(&self) -> usize {
        self.line_bytes() * self.height as usize
    }

    /// DMA transfer count in 32-bit words
    ///
    /// Frame sizes at 2 bytes per pixel and even widths are always
    /// word-aligned.
    pub fn frame_words(&self) -> usize {
        self.frame_bytes() / 4
    }
}

/// Calculate the clock divider for the camera master clock
///
/// XCLK comes from a PWM slice toggling at SYS_CLK / (divider * 2).
/// Returns (integer_part, fractional_part) for the 16.8 fixed-point
/// divider.
pub fn calc_xclk_divider(target_hz: u32) -> (u16, u8) {
    if target_hz == 0 {
        return (0xFFFF, 0xFF); // Maximum divider = stopped
    }

    // divider * 256 = (SYS_CLK * 256) / (target * 2)
    let divisor = target_hz as u64 * 2;
    let divider_x256 = (SYS_CLK_HZ as u64 * 256) / divisor;

    let int_part = (divider_x256 / 256).min(0xFFFF) as u16;
    let frac_part = (divider_x256 % 256) as u8;

    (int_part, frac_part)
}

/// PIO program for DVP bus sampling
///
/// One byte is shifted into the ISR per PCLK cycle; autopush at 32 bits
/// hands packed words to the RX FIFO for DMA. The state machine is
/// started on the VSYNC rising edge so the loop only ever sees pixel
/// data.
///
/// Pin indices are relative to the IN base (D0).
#[rustfmt::skip]
pub const DVP_PROGRAM: &[u16] = &[
    // .wrap_target
    0x20a8, // wait 1 pin 8   ; PCLK rising edge
    0x4008, // in pins, 8     ; sample D0-D7
    0x2028, // wait 0 pin 8   ; PCLK falling edge
    // .wrap
];

/// State of one frame transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferState {
    /// No transfer armed
    Idle,
    /// DMA armed, waiting for the frame
    Armed,
    /// Frame landed; buffer holds `frame_bytes()` valid bytes
    Complete,
    /// Transfer aborted or short
    Failed,
}

/// Bookkeeping for one in-flight frame capture
///
/// The firmware owns the actual DMA channel; this tracks what the
/// channel is supposed to deliver so a short or spurious completion is
/// caught.
#[derive(Debug)]
pub struct CaptureWindow {
    config: DvpConfig,
    state: TransferState,
}

impl CaptureWindow {
    pub fn new(config: DvpConfig) -> Self {
        Self {
            config,
            state: TransferState::Idle,
        }
    }

    pub fn config(&self) -> &DvpConfig {
        &self.config
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Mark the DMA channel as armed for one frame
    ///
    /// Only valid from `Idle`, `Complete` or `Failed`; arming twice
    /// without completion is a firmware bug and is ignored.
    pub fn arm(&mut self) -> bool {
        if self.state == TransferState::Armed {
            return false;
        }
        self.state = TransferState::Armed;
        true
    }

    /// Record DMA completion with the delivered byte count
    ///
    /// A short transfer marks the window failed; its buffer contents
    /// must not be used.
    pub fn complete(&mut self, bytes: usize) -> bool {
        if self.state != TransferState::Armed {
            return false;
        }
        if bytes == self.config.frame_bytes() {
            self.state = TransferState::Complete;
            true
        } else {
            self.state = TransferState::Failed;
            false
        }
    }

    /// Abort an in-flight transfer
    pub fn abort(&mut self) {
        if self.state == TransferState::Armed {
            self.state = TransferState::Failed;
        }
    }

    /// Return to idle, releasing the frame
    pub fn release(&mut self) {
        self.state = TransferState::Idle;
    }
}
