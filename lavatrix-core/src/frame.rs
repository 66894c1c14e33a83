//! Frame preprocessing
//!
//! Converts a raw RGB565 camera frame into the model's RGB888 input:
//! a centered crop, clamped to the source bounds, with each packed
//! channel expanded to 8 bits by bit replication.
//!
//! Replicating the high bits into the low bits (instead of zero-filling)
//! keeps the expanded channel proportional across the full range; plain
//! left shifts cap white at 0xF8/0xFC and produce visible banding on the
//! machine's status LEDs, which is exactly what the model keys on.
//!
//! Pixels whose source offset falls outside the frame buffer are written
//! as black instead of failing the conversion. A ragged frame degrades
//! one crop, not the whole cycle.

use crate::config::ModelGeometry;

/// Bytes per source pixel (RGB565)
pub const BYTES_PER_SOURCE_PIXEL: usize = 2;

/// Bytes per model input pixel (RGB888)
pub const BYTES_PER_INPUT_PIXEL: usize = 3;

/// A raw frame borrowed from the capture collaborator
///
/// The buffer is owned by the camera driver and must be released after
/// preprocessing regardless of the outcome.
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    /// Packed RGB565 pixel data, little endian
    pub data: &'a [u8],
    /// Source width in pixels
    pub width: u16,
    /// Source height in pixels
    pub height: u16,
}

/// Errors that can occur during preprocessing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PreprocessError {
    /// Frame buffer shorter than width x height x 2
    InsufficientData { expected: usize, actual: usize },
    /// Caller-supplied output buffer too small for the model input
    OutputTooSmall { expected: usize, actual: usize },
}

/// Expand a 5-bit channel to 8 bits with bit replication
#[inline]
pub fn expand5(value: u8) -> u8 {
    let shifted = value << 3;
    shifted | (shifted >> 5)
}

/// Expand a 6-bit channel to 8 bits with bit replication
#[inline]
pub fn expand6(value: u8) -> u8 {
    let shifted = value << 2;
    shifted | (shifted >> 6)
}

/// Unpack one RGB565 pixel into (r, g, b) RGB888 channels
#[inline]
pub fn unpack_rgb565(pixel: u16) -> (u8, u8, u8) {
    let r = expand5(((pixel >> 11) & 0x1F) as u8);
    let g = expand6(((pixel >> 5) & 0x3F) as u8);
    let b = expand5((pixel & 0x1F) as u8);
    (r, g, b)
}

/// Crop and convert a raw frame into the model input buffer
///
/// Writes exactly `input_width x input_height x 3` bytes into `out`,
/// deterministically for the same input. Performs no allocation and has
/// no side effects beyond the write into `out`.
pub fn convert(
    frame: &RawFrame<'_>,
    geometry: &ModelGeometry,
    out: &mut [u8],
) -> Result<(), PreprocessError> {
    let expected_input = frame.width as usize * frame.height as usize * BYTES_PER_SOURCE_PIXEL;
    if frame.data.len() < expected_input {
        return Err(PreprocessError::InsufficientData {
            expected: expected_input,
            actual: frame.data.len(),
        });
    }

    let out_width = geometry.input_width as usize;
    let out_height = geometry.input_height as usize;
    let required = out_width * out_height * BYTES_PER_INPUT_PIXEL;
    if out.len() < required {
        return Err(PreprocessError::OutputTooSmall {
            expected: required,
            actual: out.len(),
        });
    }

    let src_width = frame.width as i32;
    let src_height = frame.height as i32;

    // Centered crop, clamped so it never starts outside the source
    let mut start_x = (src_width - out_width as i32) / 2;
    let mut start_y = (src_height - out_height as i32) / 2;
    if start_x + out_width as i32 > src_width {
        start_x = src_width - out_width as i32;
    }
    if start_y + out_height as i32 > src_height {
        start_y = src_height - out_height as i32;
    }
    start_x = start_x.max(0);
    start_y = start_y.max(0);

    for y in 0..out_height {
        for x in 0..out_width {
            let src_x = start_x + x as i32;
            let src_y = start_y + y as i32;
            let input_idx = (src_y * src_width + src_x) as usize * BYTES_PER_SOURCE_PIXEL;
            let output_idx = (y * out_width + x) * BYTES_PER_INPUT_PIXEL;

            if input_idx + 1 < frame.data.len() {
                let pixel =
                    u16::from_le_bytes([frame.data[input_idx], frame.data[input_idx + 1]]);
                let (r, g, b) = unpack_rgb565(pixel);
                out[output_idx] = r;
                out[output_idx + 1] = g;
                out[output_idx + 2] = b;
            } else {
                // Source offset out of bounds: fail soft with black
                out[output_idx] = 0;
                out[output_idx + 1] = 0;
                out[output_idx + 2] = 0;
            }
        }
    }

    Ok(())
}
