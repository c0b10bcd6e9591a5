//! Compressed-bitstream decoding.
//!
//! Raw `audio/pcm` chunks from the cpal backend are split into planes
//! directly; anything else goes through symphonia's probe and codec
//! registry.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use wavcap_core::models::asset::DecodedPcm;
use wavcap_core::models::error::CaptureError;
use wavcap_core::traits::audio_decoder::AudioDecoder;

/// System decoder capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, bytes: &[u8], mime_hint: &str) -> Result<DecodedPcm, CaptureError> {
        if let Some(params) = RawPcmParams::from_mime(mime_hint) {
            return decode_raw_s16le(bytes, params);
        }
        decode_container(bytes, mime_hint)
    }
}

/// Parameters carried in an `audio/pcm` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RawPcmParams {
    sample_rate: u32,
    channels: u16,
}

impl RawPcmParams {
    /// Parse `audio/pcm;rate=48000;channels=1;encoding=s16le`.
    ///
    /// Returns `None` for any other media type or sample encoding, and
    /// for a label that omits the rate (headerless PCM is undecodable
    /// without it).
    fn from_mime(mime: &str) -> Option<Self> {
        let mut parts = mime.split(';').map(str::trim);
        if parts.next()? != "audio/pcm" {
            return None;
        }

        let mut sample_rate = None;
        let mut channels = 1u16;
        let mut encoding = "s16le";
        for part in parts {
            let (key, value) = part.split_once('=')?;
            match key {
                "rate" => sample_rate = value.parse().ok(),
                "channels" => channels = value.parse().ok()?,
                "encoding" => encoding = value,
                _ => {}
            }
        }
        if encoding != "s16le" || channels == 0 {
            return None;
        }
        Some(Self {
            sample_rate: sample_rate?,
            channels,
        })
    }
}

fn decode_raw_s16le(bytes: &[u8], params: RawPcmParams) -> Result<DecodedPcm, CaptureError> {
    if bytes.len() % 2 != 0 {
        return Err(CaptureError::DecodeError(
            "raw PCM stream ends on a partial sample".into(),
        ));
    }

    let channels = params.channels as usize;
    let mut planes = vec![Vec::with_capacity(bytes.len() / 2 / channels + 1); channels];
    for (i, pair) in bytes.chunks_exact(2).enumerate() {
        let v = i16::from_le_bytes([pair[0], pair[1]]);
        // Mirror of the capture-side quantizer, so 16-bit sources
        // round-trip bit-identically.
        let s = if v < 0 {
            v as f32 / 32_768.0
        } else {
            v as f32 / 32_767.0
        };
        planes[i % channels].push(s);
    }

    Ok(DecodedPcm {
        sample_rate: params.sample_rate,
        channels: planes,
    })
}

fn decode_container(bytes: &[u8], mime_hint: &str) -> Result<DecodedPcm, CaptureError> {
    let source = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());
    let mut hint = Hint::new();
    hint.mime_type(mime_hint);

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| CaptureError::DecodeError(format!("unrecognized container: {e}")))?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| CaptureError::DecodeError("no audio track in stream".into()))?;
    let track_id = track.id;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| CaptureError::DecodeError(format!("unsupported codec: {e}")))?;

    let mut sample_rate = 0u32;
    let mut planes: Vec<Vec<f32>> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(CaptureError::DecodeError(format!("demux failed: {e}"))),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .map_err(|e| CaptureError::DecodeError(format!("corrupt stream: {e}")))?;

        let spec = *decoded.spec();
        sample_rate = spec.rate;
        let channel_count = spec.channels.count();
        if planes.len() != channel_count {
            planes = vec![Vec::new(); channel_count];
        }

        let buf = sample_buf
            .get_or_insert_with(|| SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
        buf.copy_interleaved_ref(decoded);
        for (i, &sample) in buf.samples().iter().enumerate() {
            planes[i % channel_count].push(sample);
        }
    }

    if sample_rate == 0 || planes.is_empty() {
        return Err(CaptureError::DecodeError(
            "stream contains no decodable audio".into(),
        ));
    }

    Ok(DecodedPcm {
        sample_rate,
        channels: planes,
    })
}
