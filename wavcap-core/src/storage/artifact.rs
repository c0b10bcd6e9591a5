use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::asset::EncodedWav;
use crate::models::error::CaptureError;

/// MIME type of the produced artifact.
pub const WAV_MIME: &str = "audio/wav";

/// The one outbound artifact: a named WAV blob plus upload metadata.
///
/// The submission layer treats the bytes as opaque; the core knows
/// nothing about the destination or protocol.
#[derive(Debug, Clone)]
pub struct WavArtifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub metadata: ArtifactMetadata,
}

/// Metadata handed off alongside (or stored next to) an artifact.
///
/// Serializable for JSON export to the submission layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub id: String,
    pub file_name: String,
    pub duration_secs: f64,
    pub size_bytes: u64,
    pub sample_rate: u32,
    pub mime_type: String,
    pub checksum: String,
    pub created_at: String,
}

impl WavArtifact {
    /// Assemble the upload artifact from an encoded recording.
    ///
    /// `duration_secs` is the session-clock duration copied from the
    /// recorded asset, not re-derived from the sample count.
    pub fn from_encoded(wav: &EncodedWav, duration_secs: f64) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        let file_name = format!("recording_{id}.wav");
        let bytes = wav.to_bytes();
        let checksum = sha256_hex(&bytes);

        let metadata = ArtifactMetadata {
            id,
            file_name: file_name.clone(),
            duration_secs,
            size_bytes: bytes.len() as u64,
            sample_rate: wav.sample_rate,
            mime_type: WAV_MIME.to_string(),
            checksum,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        Self {
            file_name,
            bytes,
            metadata,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Write the WAV and a `<name>.metadata.json` sidecar into `dir`.
    /// Returns the path of the WAV file.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, CaptureError> {
        fs::create_dir_all(dir)
            .map_err(|e| CaptureError::StorageError(format!("failed to create directory: {e}")))?;

        let wav_path = dir.join(&self.file_name);
        fs::write(&wav_path, &self.bytes)
            .map_err(|e| CaptureError::StorageError(format!("failed to write artifact: {e}")))?;

        let json = serde_json::to_string_pretty(&self.metadata)
            .map_err(|e| CaptureError::StorageError(format!("failed to serialize metadata: {e}")))?;
        fs::write(wav_path.with_extension("metadata.json"), json)
            .map_err(|e| CaptureError::StorageError(format!("failed to write metadata: {e}")))?;

        log::info!("artifact saved: {}", wav_path.display());
        Ok(wav_path)
    }
}

/// Read artifact metadata back from its JSON sidecar.
pub fn read_metadata(wav_path: &Path) -> Result<ArtifactMetadata, CaptureError> {
    let metadata_path = wav_path.with_extension("metadata.json");
    let json = fs::read_to_string(&metadata_path)
        .map_err(|e| CaptureError::StorageError(format!("failed to read metadata: {e}")))?;
    serde_json::from_str(&json)
        .map_err(|e| CaptureError::StorageError(format!("failed to parse metadata: {e}")))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
