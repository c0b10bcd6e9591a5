//! Compressed asset → canonical mono 16-bit WAV.
//!
//! The decode step runs through the injected `AudioDecoder` capability;
//! everything after it (downmix, quantization, container) is pure math.

pub mod pcm;
pub mod wav;

use crate::models::asset::{EncodedWav, RecordedAsset};
use crate::models::error::CaptureError;
use crate::traits::audio_decoder::AudioDecoder;

/// Stateless transform from a `RecordedAsset` to an `EncodedWav`.
///
/// The decoded sample rate is carried into the container unchanged; the
/// encoder never resamples.
pub struct PcmEncoder<D: AudioDecoder> {
    decoder: D,
}

impl<D: AudioDecoder> PcmEncoder<D> {
    pub fn new(decoder: D) -> Self {
        Self { decoder }
    }

    /// Decode the full bitstream, downmix to mono, quantize to 16-bit.
    ///
    /// Fails with `DecodeError` if the bytes are unreadable; no partial
    /// `EncodedWav` is ever returned.
    pub fn encode(&self, asset: &RecordedAsset) -> Result<EncodedWav, CaptureError> {
        let decoded = self.decoder.decode(&asset.bytes, &asset.mime_type)?;
        let mono = pcm::downmix_to_mono(&decoded.channels);
        let samples = pcm::quantize(&mono);

        log::debug!(
            "encoded {} samples at {} Hz from {} compressed bytes",
            samples.len(),
            decoded.sample_rate,
            asset.bytes.len()
        );

        Ok(EncodedWav {
            sample_rate: decoded.sample_rate,
            samples,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::asset::DecodedPcm;

    /// Decoder double that interprets the asset bytes as little-endian
    /// i16 samples, normalized the same way the quantizer denormalizes.
    struct StubDecoder {
        sample_rate: u32,
        channels: u16,
    }

    impl AudioDecoder for StubDecoder {
        fn decode(&self, bytes: &[u8], _mime_hint: &str) -> Result<DecodedPcm, CaptureError> {
            if bytes.len() % 2 != 0 {
                return Err(CaptureError::DecodeError("odd byte count".into()));
            }
            let channels = self.channels as usize;
            let mut planes = vec![Vec::new(); channels];
            for (i, pair) in bytes.chunks_exact(2).enumerate() {
                let v = i16::from_le_bytes([pair[0], pair[1]]);
                let s = if v < 0 {
                    v as f32 / 32768.0
                } else {
                    v as f32 / 32767.0
                };
                planes[i % channels].push(s);
            }
            Ok(DecodedPcm {
                sample_rate: self.sample_rate,
                channels: planes,
            })
        }
    }

    struct FailingDecoder;

    impl AudioDecoder for FailingDecoder {
        fn decode(&self, _bytes: &[u8], _mime_hint: &str) -> Result<DecodedPcm, CaptureError> {
            Err(CaptureError::DecodeError("unsupported codec variant".into()))
        }
    }

    fn asset_from_samples(samples: &[i16]) -> RecordedAsset {
        let mut bytes = Vec::with_capacity(samples.len() * 2);
        for s in samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        RecordedAsset {
            bytes,
            mime_type: "audio/pcm;rate=22050;encoding=s16le".into(),
            duration_secs: 1.0,
        }
    }

    /// Minimal container parse for round-trip assertions.
    fn parse_wav(bytes: &[u8]) -> (u32, Vec<i16>) {
        assert_eq!(&bytes[0..4], b"RIFF");
        let sample_rate = u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]);
        let data_size =
            u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]) as usize;
        assert_eq!(bytes.len(), 44 + data_size);
        let samples = bytes[44..]
            .chunks_exact(2)
            .map(|p| i16::from_le_bytes([p[0], p[1]]))
            .collect();
        (sample_rate, samples)
    }

    #[test]
    fn mono_source_round_trips_bit_identically() {
        let source: Vec<i16> = (0..2_000).map(|i| ((i * 31) % 65_536 - 32_768) as i16).collect();
        let encoder = PcmEncoder::new(StubDecoder {
            sample_rate: 22_050,
            channels: 1,
        });

        let wav = encoder.encode(&asset_from_samples(&source)).unwrap();
        let (rate, parsed) = parse_wav(&wav.to_bytes());

        assert_eq!(rate, 22_050);
        assert_eq!(parsed.len(), source.len());
        assert_eq!(parsed, source);
    }

    #[test]
    fn sample_rate_is_inherited_not_forced() {
        let encoder = PcmEncoder::new(StubDecoder {
            sample_rate: 48_000,
            channels: 1,
        });
        let wav = encoder.encode(&asset_from_samples(&[0, 1, 2])).unwrap();
        assert_eq!(wav.sample_rate, 48_000);
    }

    #[test]
    fn stereo_asset_downmixes_to_mono() {
        // Interleaved L/R where the channels cancel exactly.
        let encoder = PcmEncoder::new(StubDecoder {
            sample_rate: 44_100,
            channels: 2,
        });
        let interleaved = [32_767i16, -32_768, -32_768, 32_767];

        let wav = encoder.encode(&asset_from_samples(&interleaved)).unwrap();

        assert_eq!(wav.samples.len(), 2);
        assert_eq!(wav.samples, vec![0, 0]);
    }

    #[test]
    fn empty_asset_encodes_to_empty_payload() {
        let encoder = PcmEncoder::new(StubDecoder {
            sample_rate: 44_100,
            channels: 1,
        });
        let wav = encoder.encode(&asset_from_samples(&[])).unwrap();
        assert!(wav.samples.is_empty());
        assert_eq!(wav.to_bytes().len(), 44);
    }

    #[test]
    fn decode_failure_yields_no_partial_output() {
        let encoder = PcmEncoder::new(FailingDecoder);
        let asset = RecordedAsset {
            bytes: vec![1, 2, 3],
            mime_type: "audio/webm;codecs=opus".into(),
            duration_secs: 0.5,
        };
        let err = encoder.encode(&asset).unwrap_err();
        assert!(matches!(err, CaptureError::DecodeError(_)));
    }
}
