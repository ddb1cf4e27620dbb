//! Collaborators the pipeline talks to. Production adapters live under
//! `crate::infrastructure`; tests substitute in-memory doubles.

use std::path::Path;
use std::pin::Pin;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use super::error::{StorageResult, ToolError};
use super::events::MediaProcessed;

/// A streaming object body as returned by storage.
pub struct ObjectStream {
    pub body: Pin<Box<dyn AsyncRead + Send>>,
    pub content_type: Option<String>,
    pub content_length: Option<i64>,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectStream>;

    /// Uploads a local file, overwriting any existing object. Returns the key.
    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<String>;
}

/// The two external media tools the pipeline shells out to.
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Source duration in seconds, as reported by the probe tool.
    async fn probe_duration(&self, input: &Path) -> Result<f64, ToolError>;

    /// Writes renditions, their playlists, the master manifest and the audio
    /// extraction into `output_dir`.
    async fn transcode(&self, input: &Path, output_dir: &Path) -> Result<(), ToolError>;
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Caption text for the audio file, or `None` when nothing was recognised.
    async fn transcribe(&self, audio: &Path) -> anyhow::Result<Option<String>>;
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &MediaProcessed) -> anyhow::Result<()>;
}
