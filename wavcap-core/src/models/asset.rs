use crate::encoder::wav;

/// A finished recording: every chunk the device emitted for one capture
/// attempt, concatenated in emission order. Immutable once produced;
/// owned by the caller until superseded or discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedAsset {
    /// Compressed bitstream. Chunk order is the emission order; there is
    /// no redundancy, so a reordered or dropped chunk corrupts the asset.
    pub bytes: Vec<u8>,
    /// Container/codec label reported by the capture device. Varies by
    /// platform; the decoder treats it as a hint.
    pub mime_type: String,
    /// Recording duration at stop time, paused time excluded.
    pub duration_secs: f64,
}

impl RecordedAsset {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Linear PCM produced by an `AudioDecoder`: one plane of f32 samples per
/// channel, at the rate the decoder reported (never forced).
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPcm {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

/// Canonical encoder output: mono, 16-bit, at the decoded sample rate.
/// Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedWav {
    pub sample_rate: u32,
    pub samples: Vec<i16>,
}

impl EncodedWav {
    pub const CHANNELS: u16 = 1;
    pub const BITS_PER_SAMPLE: u16 = 16;

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Serialize the full WAV container: 44-byte header followed by the
    /// samples in emission order, little-endian.
    pub fn to_bytes(&self) -> Vec<u8> {
        let data_size = (self.samples.len() * 2) as u32;
        let header = wav::wav_header(
            self.sample_rate,
            Self::BITS_PER_SAMPLE,
            Self::CHANNELS,
            data_size,
        );

        let mut bytes = Vec::with_capacity(wav::WAV_HEADER_SIZE + data_size as usize);
        bytes.extend_from_slice(&header);
        for sample in &self.samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_bytes_length_is_header_plus_payload() {
        let wav = EncodedWav {
            sample_rate: 44_100,
            samples: vec![0, 1, -1, 100],
        };
        assert_eq!(wav.to_bytes().len(), 44 + 8);
    }

    #[test]
    fn empty_recording_still_gets_a_header() {
        let wav = EncodedWav {
            sample_rate: 48_000,
            samples: Vec::new(),
        };
        let bytes = wav.to_bytes();
        assert_eq!(bytes.len(), 44);
        assert_eq!(&bytes[0..4], b"RIFF");
    }

    #[test]
    fn duration_from_sample_count() {
        let wav = EncodedWav {
            sample_rate: 8_000,
            samples: vec![0; 16_000],
        };
        assert!((wav.duration_secs() - 2.0).abs() < 1e-9);
    }
}
