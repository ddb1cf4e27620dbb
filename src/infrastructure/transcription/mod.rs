pub mod whisper;

pub use whisper::WhisperClient;
