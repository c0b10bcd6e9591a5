use std::time::Duration;

/// Encodings requested from the capture device, most capable first.
/// Opus in a container leads; raw PCM is the floor every backend can emit.
pub const DEFAULT_ENCODING_PREFERENCES: [&str; 4] = [
    "audio/webm;codecs=opus",
    "audio/ogg;codecs=opus",
    "audio/mp4",
    "audio/pcm;encoding=s16le",
];

/// Configuration for a capture session.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Sample rate requested from the device (default: 44100 Hz).
    /// A request, not a guarantee: the realized rate is reported by the
    /// stream and threaded through to the encoder.
    pub sample_rate_hint: u32,

    /// Interval between compressed chunk flushes (default: 250 ms).
    /// Bounds memory growth and gives incremental chunk availability.
    pub chunk_interval: Duration,

    /// Ask the device for echo cancellation (default: true).
    pub echo_cancellation: bool,

    /// Ask the device for noise suppression (default: true).
    pub noise_suppression: bool,

    /// Encoding preference order for negotiation with the device.
    pub encoding_preferences: Vec<String>,
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate_hint == 0 {
            return Err("sample rate hint must be positive".into());
        }
        if self.chunk_interval.is_zero() {
            return Err("chunk interval must be positive".into());
        }
        if self.encoding_preferences.is_empty() {
            return Err("encoding preference list must not be empty".into());
        }
        Ok(())
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate_hint: 44_100,
            chunk_interval: Duration::from_millis(250),
            echo_cancellation: true,
            noise_suppression: true,
            encoding_preferences: DEFAULT_ENCODING_PREFERENCES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(CaptureConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_rate_hint_rejected() {
        let config = CaptureConfig {
            sample_rate_hint: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_preference_list_rejected() {
        let config = CaptureConfig {
            encoding_preferences: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
