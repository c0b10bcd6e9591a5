use crate::models::asset::DecodedPcm;
use crate::models::error::CaptureError;

/// Interface to the platform audio decoder.
pub trait AudioDecoder {
    /// Decode a complete compressed bitstream to planar f32 PCM at the
    /// stream's own sample rate.
    ///
    /// `mime_hint` is the label the capture device attached to the asset;
    /// implementations may use it or sniff the bytes. Fails with
    /// `CaptureError::DecodeError` and never returns partial output.
    fn decode(&self, bytes: &[u8], mime_hint: &str) -> Result<DecodedPcm, CaptureError>;
}
