use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Samples per published amplitude frame.
pub const FRAME_LEN: usize = 1024;

/// Single most-recent time-domain frame. No history is kept; every
/// publish overwrites the previous frame.
struct TapBuffer {
    frame: [f32; FRAME_LEN],
}

/// Producer side of the amplitude tap, owned by the device stream.
///
/// The stream publishes raw input here on every audio callback, upstream
/// of the chunk-emission on/off switch, so paused capture still feeds the
/// tap.
pub struct TapHandle {
    inner: Arc<Mutex<TapBuffer>>,
}

impl TapHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(TapBuffer {
                frame: [0.0; FRAME_LEN],
            })),
        }
    }

    /// Overwrite the frame with the latest samples. Longer input keeps
    /// only the tail; shorter input zero-fills the remainder.
    pub fn publish(&self, samples: &[f32]) {
        let mut buffer = self.inner.lock();
        if samples.len() >= FRAME_LEN {
            buffer
                .frame
                .copy_from_slice(&samples[samples.len() - FRAME_LEN..]);
        } else {
            buffer.frame[..samples.len()].copy_from_slice(samples);
            buffer.frame[samples.len()..].fill(0.0);
        }
    }

    /// A non-owning reader for this tap.
    pub fn tap(&self) -> WaveformTap {
        WaveformTap {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl Default for TapHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-owning reader side of the amplitude tap.
///
/// Created once per capture attempt; invalidated when the owning stream
/// drops its `TapHandle`. Readers must never attempt to keep the
/// underlying graph alive.
#[derive(Clone)]
pub struct WaveformTap {
    inner: Weak<Mutex<TapBuffer>>,
}

impl WaveformTap {
    /// Copy the most recent frame into `out`.
    ///
    /// Returns `false` once the underlying stream has been released; `out`
    /// is left untouched in that case.
    pub fn copy_latest(&self, out: &mut [f32; FRAME_LEN]) -> bool {
        match self.inner.upgrade() {
            Some(buffer) => {
                out.copy_from_slice(&buffer.lock().frame);
                true
            }
            None => false,
        }
    }

    /// A tap that was never connected (for tests and detached UIs).
    pub fn disconnected() -> Self {
        Self { inner: Weak::new() }
    }
}
