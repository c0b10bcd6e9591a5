//! # wavcap-cpal
//!
//! Microphone backend for `wavcap-core` built on cpal, plus a symphonia
//! decoder.
//!
//! The mic stream emits raw little-endian 16-bit PCM chunks labelled with
//! a parameterized `audio/pcm` MIME string. The decoder reads that label
//! back directly (fast path) and falls through to symphonia container
//! probing for everything else (wav/ogg/vorbis/flac/mp3/aac).

pub mod decoder;
pub mod mic;

pub use decoder::SymphoniaDecoder;
pub use mic::CpalMicDevice;
