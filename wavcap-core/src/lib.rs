//! # wavcap-core
//!
//! Platform-agnostic microphone capture core library.
//!
//! Coordinates a live capture session, a concurrent waveform render loop
//! sampling the same signal, and a deterministic PCM/WAV encoder, while
//! guaranteeing the hardware handle is never leaked across state
//! transitions, including error and cancellation paths. Platform backends
//! implement the `CaptureDevice` and `AudioDecoder` traits and plug into
//! the generic `CaptureSession` and `PcmEncoder`.
//!
//! ## Architecture
//!
//! ```text
//! wavcap-core (this crate)
//! ├── traits/    ← CaptureDevice, DeviceStream, AudioDecoder, SessionObserver
//! ├── models/    ← CaptureError, CaptureState, CaptureConfig, RecordedAsset, EncodedWav
//! ├── session/   ← CaptureSession (state machine + chunk accumulation)
//! ├── waveform/  ← TapHandle/WaveformTap, WaveformSampler render loop
//! ├── encoder/   ← downmix, 16-bit quantization, WAV container
//! └── storage/   ← WavArtifact assembly, metadata sidecar
//! ```

pub mod encoder;
pub mod models;
pub mod session;
pub mod storage;
pub mod traits;
pub mod waveform;

// Re-export key types at crate root for convenience.
pub use encoder::PcmEncoder;
pub use models::asset::{DecodedPcm, EncodedWav, RecordedAsset};
pub use models::config::CaptureConfig;
pub use models::error::CaptureError;
pub use models::state::CaptureState;
pub use session::capture::CaptureSession;
pub use storage::artifact::{ArtifactMetadata, WavArtifact};
pub use traits::audio_decoder::AudioDecoder;
pub use traits::capture_device::{CaptureConstraints, CaptureDevice, ChunkSink, DeviceStream};
pub use traits::session_observer::SessionObserver;
pub use waveform::sampler::{FrameSink, NullSink, RecordingProbe, TraceStyle, WaveformSampler};
pub use waveform::tap::{TapHandle, WaveformTap};
