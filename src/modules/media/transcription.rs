//! Best-effort captions. Nothing in here can fail a job: a missing audio
//! track, an empty transcript, or a broken transcription service all end up
//! as "no caption".

use std::path::Path;

use tracing::{info, warn};

use super::artifacts::{self, AUDIO_FILE, CAPTION_FILE};
use super::ports::{ObjectStorage, Transcriber};

/// Returns the uploaded caption key, or an empty string when skipped.
pub async fn transcribe(
    transcriber: Option<&dyn Transcriber>,
    storage: &dyn ObjectStorage,
    output_dir: &Path,
    bucket: &str,
    source_key: &str,
) -> String {
    let audio_path = output_dir.join(AUDIO_FILE);
    if !tokio::fs::try_exists(&audio_path).await.unwrap_or(false) {
        info!("No audio track produced, skipping transcription");
        return String::new();
    }

    let Some(transcriber) = transcriber else {
        return String::new();
    };

    let captions = match transcriber.transcribe(&audio_path).await {
        Ok(Some(text)) if !text.trim().is_empty() => text,
        Ok(_) => {
            info!("Transcription returned no content");
            return String::new();
        }
        Err(e) => {
            warn!("Transcription failed, continuing without captions: {:#}", e);
            return String::new();
        }
    };

    let caption_path = output_dir.join(CAPTION_FILE);
    if let Err(e) = tokio::fs::write(&caption_path, captions.as_bytes()).await {
        warn!("Failed to write captions to {}: {}", caption_path.display(), e);
        return String::new();
    }

    let key = artifacts::caption_key(source_key);
    match storage
        .upload_file(bucket, &key, &caption_path, &artifacts::content_type_for(&caption_path))
        .await
    {
        Ok(key) => {
            info!("📝 Uploaded captions to {}", key);
            key
        }
        Err(e) => {
            warn!("Failed to upload captions: {}", e);
            String::new()
        }
    }
}
