//! Frame capture trait

use crate::frame::RawFrame;

/// Errors that can occur while capturing a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CaptureError {
    /// The sensor produced no frame
    Failed,
    /// The sensor produced a zero-length frame
    Empty,
}

/// Trait for camera frame sources
///
/// Implementations own the sensor's frame buffer. The pipeline calls
/// [`FrameSource::release`] exactly once after every successful capture,
/// whether or not preprocessing succeeded, so the buffer can be handed
/// back to the sensor driver.
pub trait FrameSource {
    /// Capture one frame
    ///
    /// The returned frame borrows the source's internal buffer and is
    /// only valid until [`FrameSource::release`] is called.
    ///
    /// Blocking; per the concurrency model there is exactly one cycle in
    /// flight, so no capture overlaps another.
    fn capture(&mut self) -> Result<RawFrame<'_>, CaptureError>;

    /// Return the frame buffer to the sensor driver
    ///
    /// Safe to call when no capture is outstanding.
    fn release(&mut self);
}
