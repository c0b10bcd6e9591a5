//! cpal microphone capture provider.
//!
//! Opens the default (or a named) input device and delivers converted
//! 16-bit PCM chunks on a fixed flush cadence. The amplitude tap is fed
//! from the audio callback upstream of the emission switch, so a paused
//! session still sees a live trace.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use parking_lot::Mutex;

use wavcap_core::encoder::pcm::quantize_sample;
use wavcap_core::models::error::CaptureError;
use wavcap_core::traits::capture_device::{
    CaptureConstraints, CaptureDevice, ChunkSink, DeviceStream,
};
use wavcap_core::waveform::tap::{TapHandle, WaveformTap};

/// Raw-PCM encoding label advertised to the session. The acquired stream
/// reports the same media type with rate and channel parameters attached.
pub const RAW_PCM_ENCODING: &str = "audio/pcm;encoding=s16le";

/// Microphone capability backed by a cpal input device.
///
/// Exclusivity: one live stream per device value. `acquire` fails with
/// `DeviceUnavailable` while a previous stream is alive.
pub struct CpalMicDevice {
    device_name: Option<String>,
    in_use: Arc<AtomicBool>,
}

impl CpalMicDevice {
    /// Capture from the system default input device.
    pub fn new() -> Self {
        Self {
            device_name: None,
            in_use: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Capture from a specific input device by name.
    pub fn with_device(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
            ..Self::new()
        }
    }
}

impl Default for CpalMicDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDevice for CpalMicDevice {
    type Stream = CpalMicStream;

    fn supported_encodings(&self) -> Vec<String> {
        vec![RAW_PCM_ENCODING.to_string()]
    }

    fn acquire(
        &self,
        constraints: &CaptureConstraints,
        sink: ChunkSink,
    ) -> Result<CpalMicStream, CaptureError> {
        if self.in_use.swap(true, Ordering::SeqCst) {
            return Err(CaptureError::DeviceUnavailable(
                "microphone already in use".into(),
            ));
        }

        match open_stream(self.device_name.as_deref(), constraints, sink) {
            Ok(mut stream) => {
                stream.in_use = Some(Arc::clone(&self.in_use));
                Ok(stream)
            }
            Err(e) => {
                self.in_use.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }
}

/// State shared between the audio callback, the flush thread, and the
/// stream handle.
struct StreamInner {
    sink: ChunkSink,
    emitting: AtomicBool,
    /// Converted samples (interleaved, native channel count) awaiting the
    /// next chunk flush.
    pending: Mutex<Vec<i16>>,
    tap: TapHandle,
}

/// A live cpal input stream: the hardware handle.
///
/// Dropping it joins the flush thread, pauses the input stream, and
/// clears the device's in-use flag. Release failures are logged, never
/// surfaced.
pub struct CpalMicStream {
    encoding: String,
    sample_rate: u32,
    inner: Arc<StreamInner>,
    running: Arc<AtomicBool>,
    flusher: Option<thread::JoinHandle<()>>,
    stream: cpal::Stream,
    in_use: Option<Arc<AtomicBool>>,
}

impl DeviceStream for CpalMicStream {
    fn encoding(&self) -> &str {
        &self.encoding
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn set_emitting(&mut self, emitting: bool) {
        // The cpal stream keeps playing either way; only accumulation and
        // flushing react. The tap stays live across a pause.
        self.inner.emitting.store(emitting, Ordering::SeqCst);
    }

    fn flush(&mut self) {
        flush_pending(&self.inner, true);
    }

    fn tap(&self) -> WaveformTap {
        self.inner.tap.tap()
    }
}

impl Drop for CpalMicStream {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.flusher.take() {
            let _ = handle.join();
        }
        if let Err(e) = self.stream.pause() {
            log::warn!("failed to stop input stream: {}", e);
        }
        if let Some(in_use) = self.in_use.take() {
            in_use.store(false, Ordering::SeqCst);
        }
        log::debug!("microphone released");
    }
}

fn open_stream(
    device_name: Option<&str>,
    constraints: &CaptureConstraints,
    sink: ChunkSink,
) -> Result<CpalMicStream, CaptureError> {
    let host = cpal::default_host();

    let device = match device_name {
        Some(name) => host
            .input_devices()
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| {
                CaptureError::DeviceUnavailable(format!("input device '{name}' not found"))
            })?,
        None => host
            .default_input_device()
            .ok_or_else(|| CaptureError::DeviceUnavailable("no input device".into()))?,
    };
    log::info!("using input device: {:?}", device.name());

    if constraints.echo_cancellation || constraints.noise_suppression {
        // cpal exposes no processing controls; the OS input path decides.
        log::debug!("echo cancellation / noise suppression left to the platform");
    }

    let default_config = device
        .default_input_config()
        .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;
    let mut sample_format = default_config.sample_format();
    let mut config: StreamConfig = default_config.into();

    // Honor the rate hint when the device offers it; otherwise keep the
    // device default and report the realized rate.
    if config.sample_rate.0 != constraints.sample_rate_hint {
        if let Ok(mut ranges) = device.supported_input_configs() {
            if let Some(range) = ranges.find(|r| {
                r.min_sample_rate().0 <= constraints.sample_rate_hint
                    && constraints.sample_rate_hint <= r.max_sample_rate().0
            }) {
                let hinted = range.with_sample_rate(cpal::SampleRate(constraints.sample_rate_hint));
                sample_format = hinted.sample_format();
                config = hinted.into();
            }
        }
    }

    let sample_rate = config.sample_rate.0;
    let channels = config.channels as usize;
    let encoding = format!(
        "audio/pcm;rate={};channels={};encoding=s16le",
        sample_rate, config.channels
    );
    log::info!(
        "input config: {} Hz, {} channels, {:?}",
        sample_rate,
        channels,
        sample_format
    );

    let inner = Arc::new(StreamInner {
        sink,
        emitting: AtomicBool::new(true),
        pending: Mutex::new(Vec::new()),
        tap: TapHandle::new(),
    });

    let stream = match sample_format {
        SampleFormat::F32 => build_input::<f32>(&device, &config, Arc::clone(&inner), channels, |s| s),
        SampleFormat::I16 => build_input::<i16>(&device, &config, Arc::clone(&inner), channels, |s| {
            s as f32 / 32_768.0
        }),
        SampleFormat::U16 => build_input::<u16>(&device, &config, Arc::clone(&inner), channels, |s| {
            (s as f32 - 32_768.0) / 32_768.0
        }),
        other => {
            return Err(CaptureError::DeviceUnavailable(format!(
                "unsupported sample format {other:?}"
            )))
        }
    }?;

    stream
        .play()
        .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to start stream: {e}")))?;

    let running = Arc::new(AtomicBool::new(true));
    let flusher = spawn_flusher(
        Arc::clone(&inner),
        Arc::clone(&running),
        constraints.chunk_interval,
    );

    Ok(CpalMicStream {
        encoding,
        sample_rate,
        inner,
        running,
        flusher: Some(flusher),
        stream,
        in_use: None,
    })
}

fn build_input<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    inner: Arc<StreamInner>,
    channels: usize,
    convert: impl Fn(T) -> f32 + Send + 'static,
) -> Result<cpal::Stream, CaptureError>
where
    T: cpal::SizedSample,
{
    let err_fn = |err| log::error!("input stream error: {}", err);

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let samples: Vec<f32> = data.iter().map(|&s| convert(s)).collect();
                publish_and_buffer(&inner, &samples, channels);
            },
            err_fn,
            None,
        )
        .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to open stream: {e}")))
}

/// Audio-callback half of the chunk pipeline: feed the tap with the raw
/// input, then accumulate samples for the next flush while emitting.
fn publish_and_buffer(inner: &StreamInner, samples: &[f32], channels: usize) {
    if channels > 1 {
        let frames = samples.len() / channels;
        let mut mono = Vec::with_capacity(frames);
        for frame in 0..frames {
            let sum: f32 = samples[frame * channels..(frame + 1) * channels].iter().sum();
            mono.push(sum / channels as f32);
        }
        inner.tap.publish(&mono);
    } else {
        inner.tap.publish(samples);
    }

    if !inner.emitting.load(Ordering::SeqCst) {
        return;
    }
    let mut pending = inner.pending.lock();
    pending.extend(samples.iter().map(|&s| quantize_sample(s)));
}

fn spawn_flusher(
    inner: Arc<StreamInner>,
    running: Arc<AtomicBool>,
    interval: Duration,
) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("wavcap-chunk-flush".into())
        .spawn(move || {
            while running.load(Ordering::SeqCst) {
                thread::sleep(interval);
                flush_pending(&inner, false);
            }
        })
        .expect("failed to spawn chunk flush thread")
}

/// Package pending samples into a chunk and hand it to the sink.
///
/// With `force` set (the stop-path flush) buffered samples go out even
/// while emission is off, so the tail of the recording is kept.
fn flush_pending(inner: &StreamInner, force: bool) {
    if !force && !inner.emitting.load(Ordering::SeqCst) {
        return;
    }
    let samples = {
        let mut pending = inner.pending.lock();
        if pending.is_empty() {
            return;
        }
        std::mem::take(&mut *pending)
    };

    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in &samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    (inner.sink)(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn null_sink() -> ChunkSink {
        Arc::new(|_chunk| {})
    }

    fn collecting_sink() -> (ChunkSink, Arc<Mutex<Vec<Vec<u8>>>>) {
        let chunks = Arc::new(Mutex::new(Vec::new()));
        let sink_chunks = Arc::clone(&chunks);
        let sink: ChunkSink = Arc::new(move |chunk| sink_chunks.lock().push(chunk));
        (sink, chunks)
    }

    fn inner_with_sink(sink: ChunkSink) -> StreamInner {
        StreamInner {
            sink,
            emitting: AtomicBool::new(true),
            pending: Mutex::new(Vec::new()),
            tap: TapHandle::new(),
        }
    }

    #[test]
    fn buffer_converts_to_s16le_chunks() {
        let (sink, chunks) = collecting_sink();
        let inner = inner_with_sink(sink);

        publish_and_buffer(&inner, &[0.0, 1.0, -1.0], 1);
        flush_pending(&inner, false);

        let chunks = chunks.lock();
        assert_eq!(chunks.len(), 1);
        let samples: Vec<i16> = chunks[0]
            .chunks_exact(2)
            .map(|p| i16::from_le_bytes([p[0], p[1]]))
            .collect();
        assert_eq!(samples, vec![0, 32_767, -32_768]);
    }

    #[test]
    fn paused_emission_buffers_until_forced_flush() {
        let (sink, chunks) = collecting_sink();
        let inner = inner_with_sink(sink);

        publish_and_buffer(&inner, &[0.5; 8], 1);
        inner.emitting.store(false, Ordering::SeqCst);

        flush_pending(&inner, false);
        assert!(chunks.lock().is_empty());

        flush_pending(&inner, true);
        assert_eq!(chunks.lock().len(), 1);
    }

    #[test]
    fn paused_emission_still_feeds_the_tap() {
        let inner = inner_with_sink(null_sink());
        inner.emitting.store(false, Ordering::SeqCst);
        let tap = inner.tap.tap();

        publish_and_buffer(&inner, &[0.25; 16], 1);

        let mut frame = [0.0f32; wavcap_core::waveform::tap::FRAME_LEN];
        assert!(tap.copy_latest(&mut frame));
        assert_eq!(frame[0], 0.25);
        // Nothing accumulated for emission.
        assert!(inner.pending.lock().is_empty());
    }

    #[test]
    fn multichannel_tap_is_per_frame_mean() {
        let inner = inner_with_sink(null_sink());
        let tap = inner.tap.tap();

        // Two stereo frames: (0.5, -0.5) and (1.0, 0.0).
        publish_and_buffer(&inner, &[0.5, -0.5, 1.0, 0.0], 2);

        let mut frame = [0.0f32; wavcap_core::waveform::tap::FRAME_LEN];
        assert!(tap.copy_latest(&mut frame));
        assert_eq!(frame[0], 0.0);
        assert_eq!(frame[1], 0.5);
        // Pending keeps the interleaved samples for the chunk stream.
        assert_eq!(inner.pending.lock().len(), 4);
    }

    #[test]
    fn empty_pending_never_emits_a_chunk() {
        let (sink, chunks) = collecting_sink();
        let inner = inner_with_sink(sink);
        flush_pending(&inner, true);
        assert!(chunks.lock().is_empty());
    }
}
