//! Sample stream adapter for the inference engine
//!
//! The vendor engine pulls its input through an indexed reader callback
//! instead of taking a buffer. This adapter exposes the guarded model
//! input buffer as that stream: bounds-checked, one byte per sample,
//! normalized to [0, 1].

/// Errors that can occur reading the sample stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SignalError {
    /// Requested window falls outside the logical sample range
    OutOfRange,
}

/// Bounds-checked view of the model input buffer as normalized samples
///
/// Constructed fresh each cycle from the guard's held buffer, so it can
/// only exist while the allocation flag is set.
#[derive(Debug, Clone, Copy)]
pub struct SignalAdapter<'a> {
    buffer: &'a [u8],
    total_samples: usize,
}

impl<'a> SignalAdapter<'a> {
    /// Create an adapter over `buffer` with a logical length of
    /// `total_samples`
    ///
    /// The logical length is the model's sample count; the physical
    /// buffer may be larger (safety margin) or, after a policy change,
    /// smaller.
    pub fn new(buffer: &'a [u8], total_samples: usize) -> Self {
        Self {
            buffer,
            total_samples,
        }
    }

    /// Logical number of samples
    pub fn total_samples(&self) -> usize {
        self.total_samples
    }

    /// Read a window of normalized samples into `out`
    ///
    /// Out-of-range windows fail without any partial write. Samples
    /// that are logically valid but beyond the physical buffer read as
    /// 0.5: mid-scale, so a truncated buffer does not drag every
    /// channel toward black and bias the classifier toward the darkest
    /// class.
    pub fn read(&self, offset: usize, out: &mut [f32]) -> Result<(), SignalError> {
        if offset >= self.total_samples || offset + out.len() > self.total_samples {
            return Err(SignalError::OutOfRange);
        }

        for (i, slot) in out.iter_mut().enumerate() {
            let index = offset + i;
            *slot = if index < self.buffer.len() {
                self.buffer[index] as f32 / 255.0
            } else {
                0.5
            };
        }

        Ok(())
    }
}
