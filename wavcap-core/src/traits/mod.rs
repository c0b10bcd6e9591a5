pub mod audio_decoder;
pub mod capture_device;
pub mod session_observer;
