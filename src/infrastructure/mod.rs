pub mod ffmpeg;
pub mod queue;
pub mod storage;
pub mod transcription;
