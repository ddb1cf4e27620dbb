pub mod artifacts;
pub mod error;
pub mod events;
pub mod ports;
pub mod probe;
pub mod publisher;
pub mod service;
pub mod transcoder;
pub mod transcription;
pub mod uploader;
pub mod workspace;

pub use error::{ErrorKind, JobError, PipelineError};
pub use events::{MediaProcessed, MediaUploaded};
pub use service::{MediaProcessor, PipelineSettings};
