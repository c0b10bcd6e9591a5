use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::waveform::tap::{WaveformTap, FRAME_LEN};

/// Default render cadence, roughly one frame per display refresh.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Display styling hint for the rendered trace.
///
/// Derived from whether the session is currently recording. Display-only,
/// never a control input back into the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceStyle {
    Live,
    Idle,
}

/// Rendering boundary. The UI layer implements this; the sampler calls it
/// once per tick with the reused frame buffer.
pub trait FrameSink: Send + Sync {
    fn render(&self, frame: &[f32], style: TraceStyle);
}

/// Sink that discards every frame, for headless sessions and tests.
pub struct NullSink;

impl FrameSink for NullSink {
    fn render(&self, _frame: &[f32], _style: TraceStyle) {}
}

/// Read-only probe for the recording display hint, the one coupling from
/// the waveform layer back to the session.
pub type RecordingProbe = Arc<dyn Fn() -> bool + Send + Sync>;

/// Continuous amplitude render loop over a device stream tap.
///
/// Runs from `attach` until `detach`, independent of the session's
/// pause/resume transitions: the tap sits upstream of chunk emission, so
/// the trace keeps following raw microphone input while capture is
/// paused. Holds no history: one fixed-size frame buffer, overwritten
/// every tick.
pub struct WaveformSampler {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl WaveformSampler {
    /// Begin rendering `tap` through `sink` on a display-refresh cadence.
    ///
    /// Tolerates a tap whose stream closes mid-loop: the trace falls back
    /// to a flat frame instead of faulting.
    pub fn attach(
        tap: WaveformTap,
        sink: Arc<dyn FrameSink>,
        probe: RecordingProbe,
        interval: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut frame = [0.0f32; FRAME_LEN];
            let mut tick = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tick.tick() => {
                        if !tap.copy_latest(&mut frame) {
                            // Stream released mid-loop: hold a flat trace.
                            frame.fill(0.0);
                        }
                        let style = if probe() { TraceStyle::Live } else { TraceStyle::Idle };
                        sink.render(&frame, style);
                    }
                }
            }

            // One final idle frame so the trace never freezes on stale data.
            frame.fill(0.0);
            sink.render(&frame, TraceStyle::Idle);
        });

        Self { cancel, task }
    }

    /// Stop scheduling frames. The final idle frame is rendered before
    /// this returns.
    pub async fn detach(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}
