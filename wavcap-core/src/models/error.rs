use thiserror::Error;

/// Errors that can occur during capture and encoding operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Permission was denied or no capture device exists. The session
    /// stays `Idle` and holds nothing; retry with a fresh `start`.
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The compressed bytes could not be decoded (corrupt stream or
    /// unsupported codec variant). Terminal for the encode operation.
    #[error("decode failed: {0}")]
    DecodeError(String),

    /// A session operation was called from a state that does not allow
    /// it. A contract violation by the caller, not a runtime condition
    /// to react to.
    #[error("invalid transition: {op} from {from} state")]
    InvalidTransition {
        op: &'static str,
        from: &'static str,
    },

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),
}
