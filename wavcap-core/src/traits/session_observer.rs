use crate::models::asset::RecordedAsset;
use crate::models::state::CaptureState;

/// Event observer for capture session notifications.
///
/// Methods are called synchronously from session operations; marshal to
/// the UI thread if needed.
pub trait SessionObserver: Send + Sync {
    /// Called after every state transition.
    fn on_state_changed(&self, state: CaptureState);

    /// Called when a compressed chunk is accepted, with its byte length.
    fn on_chunk(&self, len: usize);

    /// Called when `stop` finalizes a recording.
    fn on_finished(&self, asset: &RecordedAsset);
}
