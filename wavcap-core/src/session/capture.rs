use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::models::asset::RecordedAsset;
use crate::models::config::CaptureConfig;
use crate::models::error::CaptureError;
use crate::models::state::CaptureState;
use crate::traits::capture_device::{CaptureConstraints, CaptureDevice, ChunkSink, DeviceStream};
use crate::traits::session_observer::SessionObserver;
use crate::waveform::sampler::RecordingProbe;
use crate::waveform::tap::WaveformTap;

/// Internal mutable session state, shared with the chunk sink.
struct SessionShared {
    state: CaptureState,
    chunks: Vec<Vec<u8>>,
    capture_start: Option<Instant>,
    paused_duration: Duration,
    last_pause: Option<Instant>,
    /// Set at stop time; the clock reads this until reset.
    final_elapsed: Option<Duration>,
}

impl SessionShared {
    fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            chunks: Vec::new(),
            capture_start: None,
            paused_duration: Duration::ZERO,
            last_pause: None,
            final_elapsed: None,
        }
    }

    /// Accumulated recording time. Frozen while paused (an in-progress
    /// pause counts against the running total) and after stop.
    fn elapsed(&self) -> Duration {
        if let Some(frozen) = self.final_elapsed {
            return frozen;
        }
        let Some(start) = self.capture_start else {
            return Duration::ZERO;
        };
        let current_pause = self.last_pause.map(|p| p.elapsed()).unwrap_or(Duration::ZERO);
        start
            .elapsed()
            .saturating_sub(self.paused_duration)
            .saturating_sub(current_pause)
    }

    fn clear(&mut self) {
        self.state = CaptureState::Idle;
        self.chunks.clear();
        self.capture_start = None;
        self.paused_duration = Duration::ZERO;
        self.last_pause = None;
        self.final_elapsed = None;
    }
}

/// Live microphone capture session.
///
/// Owns the hardware stream exclusively and is the only component that
/// mutates `CaptureState`. The device capability passed at construction
/// enforces that at most one stream is open at a time; starting a second
/// session over the same device fails rather than queueing.
pub struct CaptureSession<D: CaptureDevice> {
    device: D,
    config: CaptureConfig,
    shared: Arc<Mutex<SessionShared>>,
    stream: Option<D::Stream>,
    observer: Option<Arc<dyn SessionObserver>>,
}

impl<D: CaptureDevice> CaptureSession<D> {
    pub fn new(device: D, config: CaptureConfig) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(Self {
            device,
            config,
            shared: Arc::new(Mutex::new(SessionShared::new())),
            stream: None,
            observer: None,
        })
    }

    pub fn set_observer(&mut self, observer: Arc<dyn SessionObserver>) {
        self.observer = Some(observer);
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn state(&self) -> CaptureState {
        self.shared.lock().state
    }

    /// Accumulated recording time in seconds, paused time excluded.
    /// Zero once the session returns to `Idle`.
    pub fn elapsed_seconds(&self) -> f64 {
        self.shared.lock().elapsed().as_secs_f64()
    }

    /// Number of chunks accepted so far in this capture attempt.
    pub fn chunk_count(&self) -> usize {
        self.shared.lock().chunks.len()
    }

    /// Read-only display hint for the waveform layer: true while the
    /// session is `Recording`. Never a control input.
    pub fn recording_probe(&self) -> RecordingProbe {
        let shared = Arc::clone(&self.shared);
        Arc::new(move || shared.lock().state.is_recording())
    }

    /// Amplitude tap into the open stream, if one is held.
    pub fn tap(&self) -> Option<WaveformTap> {
        self.stream.as_ref().map(|s| s.tap())
    }

    /// Open the microphone and begin emitting chunks.
    ///
    /// Valid only from `Idle`. Fails with `DeviceUnavailable` if
    /// permission is denied or no device exists; on failure the state
    /// remains `Idle` and no resources are held.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        {
            let shared = self.shared.lock();
            if !shared.state.is_idle() {
                return Err(CaptureError::InvalidTransition {
                    op: "start",
                    from: shared.state.name(),
                });
            }
        }

        let encoding = self.negotiate_encoding()?;
        let constraints = CaptureConstraints {
            sample_rate_hint: self.config.sample_rate_hint,
            chunk_interval: self.config.chunk_interval,
            echo_cancellation: self.config.echo_cancellation,
            noise_suppression: self.config.noise_suppression,
            encoding,
        };

        let stream = self.device.acquire(&constraints, self.chunk_sink())?;
        log::info!(
            "capture started: {} at {} Hz",
            stream.encoding(),
            stream.sample_rate()
        );

        {
            let mut shared = self.shared.lock();
            shared.chunks.clear();
            shared.capture_start = Some(Instant::now());
            shared.paused_duration = Duration::ZERO;
            shared.last_pause = None;
            shared.final_elapsed = None;
            shared.state = CaptureState::Recording;
        }
        self.stream = Some(stream);
        self.notify_state(CaptureState::Recording);
        Ok(())
    }

    /// Stop chunk emission and freeze the clock without releasing the
    /// device. Valid only from `Recording`.
    pub fn pause(&mut self) -> Result<(), CaptureError> {
        {
            let mut shared = self.shared.lock();
            if !shared.state.is_recording() {
                return Err(CaptureError::InvalidTransition {
                    op: "pause",
                    from: shared.state.name(),
                });
            }
            shared.last_pause = Some(Instant::now());
            shared.state = CaptureState::Paused;
        }
        if let Some(stream) = self.stream.as_mut() {
            stream.set_emitting(false);
        }
        self.notify_state(CaptureState::Paused);
        Ok(())
    }

    /// Restart chunk emission and the clock. Valid only from `Paused`.
    pub fn resume(&mut self) -> Result<(), CaptureError> {
        {
            let mut shared = self.shared.lock();
            if !shared.state.is_paused() {
                return Err(CaptureError::InvalidTransition {
                    op: "resume",
                    from: shared.state.name(),
                });
            }
            if let Some(pause_start) = shared.last_pause.take() {
                shared.paused_duration += pause_start.elapsed();
            }
            shared.state = CaptureState::Recording;
        }
        if let Some(stream) = self.stream.as_mut() {
            stream.set_emitting(true);
        }
        self.notify_state(CaptureState::Recording);
        Ok(())
    }

    /// Flush the final chunk, release the device, and concatenate all
    /// chunks into a `RecordedAsset`.
    ///
    /// Valid from `Recording` or `Paused`. From `Idle` or `Stopped` this
    /// is a no-op that signals nothing and returns `Ok(None)`.
    pub fn stop(&mut self) -> Result<Option<RecordedAsset>, CaptureError> {
        {
            let shared = self.shared.lock();
            match shared.state {
                CaptureState::Recording | CaptureState::Paused => {}
                CaptureState::Idle | CaptureState::Stopped => return Ok(None),
            }
        }

        let Some(mut stream) = self.stream.take() else {
            // Unreachable while the handle invariant holds.
            return Ok(None);
        };

        // Final chunk before release; releasing early truncates the
        // recording. The sink still accepts chunks in this state.
        stream.flush();
        let mime_type = stream.encoding().to_string();
        drop(stream);

        let (bytes, duration_secs) = {
            let mut shared = self.shared.lock();
            if let Some(pause_start) = shared.last_pause.take() {
                shared.paused_duration += pause_start.elapsed();
            }
            let elapsed = shared.elapsed();
            shared.final_elapsed = Some(elapsed);
            let duration = elapsed.as_secs_f64();

            let total: usize = shared.chunks.iter().map(Vec::len).sum();
            let mut bytes = Vec::with_capacity(total);
            for chunk in &shared.chunks {
                bytes.extend_from_slice(chunk);
            }

            shared.state = CaptureState::Stopped;
            (bytes, duration)
        };

        let asset = RecordedAsset {
            bytes,
            mime_type,
            duration_secs,
        };
        log::info!(
            "capture stopped: {} bytes over {:.1}s",
            asset.bytes.len(),
            asset.duration_secs
        );

        self.notify_state(CaptureState::Stopped);
        if let Some(observer) = &self.observer {
            observer.on_finished(&asset);
        }
        Ok(Some(asset))
    }

    /// Universal cancellation: force-release the device if held, discard
    /// chunks, return to `Idle`.
    ///
    /// Safe from any state, including mid-capture and when no device was
    /// ever acquired. Chunk callbacks still in flight afterwards check
    /// state and no-op.
    pub fn reset(&mut self) {
        if self.stream.take().is_some() {
            log::debug!("capture reset: device released");
        }

        let previous = {
            let mut shared = self.shared.lock();
            let previous = shared.state;
            shared.clear();
            previous
        };

        if previous != CaptureState::Idle {
            self.notify_state(CaptureState::Idle);
        }
    }

    // --- Internal helpers ---

    /// Pick the most capable encoding the device supports, in preference
    /// order. With no overlap, the device's own first (most capable)
    /// encoding wins.
    fn negotiate_encoding(&self) -> Result<String, CaptureError> {
        let supported = self.device.supported_encodings();
        if supported.is_empty() {
            return Err(CaptureError::DeviceUnavailable(
                "device advertises no encodings".into(),
            ));
        }
        for preferred in &self.config.encoding_preferences {
            if supported.iter().any(|s| s == preferred) {
                return Ok(preferred.clone());
            }
        }
        Ok(supported[0].clone())
    }

    fn chunk_sink(&self) -> ChunkSink {
        let shared = Arc::clone(&self.shared);
        let observer = self.observer.clone();
        Arc::new(move |chunk: Vec<u8>| {
            if chunk.is_empty() {
                return;
            }
            let len = chunk.len();
            {
                let mut shared = shared.lock();
                // Stale callbacks after stop/reset land here and no-op.
                if !shared.state.holds_device() {
                    return;
                }
                shared.chunks.push(chunk);
            }
            if let Some(observer) = &observer {
                observer.on_chunk(len);
            }
        })
    }

    fn notify_state(&self, state: CaptureState) {
        if let Some(observer) = &self.observer {
            observer.on_state_changed(state);
        }
    }
}
