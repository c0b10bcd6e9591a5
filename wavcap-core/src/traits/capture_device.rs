use std::sync::Arc;
use std::time::Duration;

use crate::models::error::CaptureError;
use crate::waveform::tap::WaveformTap;

/// Callback invoked when the device stream flushes a compressed chunk.
///
/// Fires on the device's emission cadence (timer or audio thread), so
/// keep processing minimal.
pub type ChunkSink = Arc<dyn Fn(Vec<u8>) + Send + Sync + 'static>;

/// Constraints passed to `CaptureDevice::acquire`.
#[derive(Debug, Clone)]
pub struct CaptureConstraints {
    /// Requested sample rate; the realized rate is whatever the stream
    /// reports afterwards.
    pub sample_rate_hint: u32,
    /// Requested interval between chunk flushes.
    pub chunk_interval: Duration,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    /// Negotiated encoding, one of the device's `supported_encodings`.
    pub encoding: String,
}

/// Interface to platform-specific microphone access.
///
/// Implementations own device exclusivity: while a stream returned by
/// `acquire` is alive, a second `acquire` fails with `DeviceUnavailable`.
/// Exclusivity lives in the capability value handed to each session, not
/// in ambient global state.
pub trait CaptureDevice {
    type Stream: DeviceStream;

    /// Encodings this device can emit, most capable first.
    fn supported_encodings(&self) -> Vec<String>;

    /// Open the microphone and begin delivering compressed chunks to
    /// `sink`. Resolves exactly once: a live stream, or
    /// `DeviceUnavailable` with nothing held.
    fn acquire(
        &self,
        constraints: &CaptureConstraints,
        sink: ChunkSink,
    ) -> Result<Self::Stream, CaptureError>;
}

/// A live, exclusively-owned microphone stream: the hardware handle.
///
/// Dropping the stream releases the device and its processing graph.
/// Release is a hygiene action: implementations log failures rather than
/// surface them, since already-captured chunks are unaffected.
pub trait DeviceStream {
    /// Full encoding label of the emitted chunks. May carry parameters
    /// (rate, channel count) beyond the negotiated media type.
    fn encoding(&self) -> &str;

    /// Realized sample rate, which may differ from the requested hint.
    fn sample_rate(&self) -> u32;

    /// Turn chunk emission on or off without releasing the device. While
    /// off, captured audio is not accumulated; the amplitude tap keeps
    /// seeing raw input.
    fn set_emitting(&mut self, emitting: bool);

    /// Synchronously deliver any buffered partial chunk to the sink.
    /// Called once before release so the tail of the recording is kept.
    fn flush(&mut self);

    /// Non-owning amplitude tap into the live audio graph. Goes flat once
    /// the stream is dropped.
    fn tap(&self) -> WaveformTap;
}
