//! Vendor classifier bindings
//!
//! The stage classifier is a vendor-supplied static library linked into
//! the firmware. It pulls normalized samples through a C callback and
//! fills a fixed-size score array, one entry per stage label.

use core::ffi::c_int;
use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

use lavatrix_core::signal::SignalAdapter;
use lavatrix_core::traits::{EngineError, Inference, InferenceEngine, Score};
use lavatrix_protocol::STAGE_LABELS;

/// Model input dimensions the vendor library was trained for
const INPUT_WIDTH: u16 = 96;
const INPUT_HEIGHT: u16 = 96;

/// Sample reader callback: fills `out[0..length]` starting at `offset`,
/// returns 0 on success
type SampleReadFn = extern "C" fn(offset: usize, length: usize, out: *mut f32) -> c_int;

extern "C" {
    fn wm_classifier_init() -> c_int;
    fn wm_classifier_run(
        read: SampleReadFn,
        debug: bool,
        scores: *mut f32,
        score_count: usize,
        elapsed_ms: *mut u32,
    ) -> c_int;
}

// Signal adapter for the in-flight classify call. Only set and read on
// the monitor task, and only dereferenced while `wm_classifier_run` is
// on the stack.
static ACTIVE_SIGNAL: AtomicPtr<SignalAdapter<'static>> = AtomicPtr::new(ptr::null_mut());

extern "C" fn read_samples(offset: usize, length: usize, out: *mut f32) -> c_int {
    let signal = ACTIVE_SIGNAL.load(Ordering::Acquire);
    if signal.is_null() || out.is_null() {
        return -1;
    }
    let out = unsafe { core::slice::from_raw_parts_mut(out, length) };
    let signal = unsafe { &*signal };
    match signal.read(offset, out) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

/// The vendor classifier, initialized exactly once
pub struct VendorEngine {
    _private: (),
}

impl VendorEngine {
    /// Initialize the vendor library
    pub fn init() -> Result<Self, EngineError> {
        let rc = unsafe { wm_classifier_init() };
        if rc != 0 {
            return Err(EngineError::Code(rc));
        }
        Ok(Self { _private: () })
    }
}

impl InferenceEngine for VendorEngine {
    fn classify(
        &mut self,
        signal: &SignalAdapter<'_>,
        debug: bool,
    ) -> Result<Inference, EngineError> {
        let mut raw = [0f32; STAGE_LABELS.len()];
        let mut elapsed_ms = 0u32;

        ACTIVE_SIGNAL.store(
            signal as *const SignalAdapter<'_> as *mut SignalAdapter<'static>,
            Ordering::Release,
        );
        let rc = unsafe {
            wm_classifier_run(read_samples, debug, raw.as_mut_ptr(), raw.len(), &mut elapsed_ms)
        };
        ACTIVE_SIGNAL.store(ptr::null_mut(), Ordering::Release);

        if rc != 0 {
            return Err(EngineError::Code(rc));
        }

        let mut scores = heapless::Vec::new();
        for (&label, &value) in STAGE_LABELS.iter().zip(raw.iter()) {
            let _ = scores.push(Score { label, value });
        }
        Ok(Inference { scores, elapsed_ms })
    }

    fn label_count(&self) -> usize {
        STAGE_LABELS.len()
    }

    fn input_width(&self) -> u16 {
        INPUT_WIDTH
    }

    fn input_height(&self) -> u16 {
        INPUT_HEIGHT
    }
}
