use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MANIFEST_CONTENT_TYPE: &str = "adaptive-streaming-manifest";

pub mod metadata_keys {
    pub const RAW_VIDEO_KEY: &str = "RawVideoKey";
    pub const AUDIO_KEY: &str = "AudioKey";
    pub const DURATION_SECONDS: &str = "DurationSeconds";
    pub const DURATION: &str = "Duration";
    pub const TRANSCRIPT_KEY: &str = "TranscriptKey";
}

/// Inbound job: a raw object landed in storage and needs processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaUploaded {
    pub file_key: String,
    pub bucket: String,
    pub content_type: String,
    pub file_size: i64,
    pub owner_service: String,
    pub reference_id: Uuid,
    pub reference_type: String,
}

impl MediaUploaded {
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// Outbound completion event consumed by the owning service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaProcessed {
    pub file_key: String,
    pub bucket: String,
    pub content_type: String,
    pub file_size: i64,
    pub owner_service: String,
    pub reference_id: Uuid,
    pub reference_type: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl MediaProcessed {
    /// Copies every correlation field of `source` with no metadata.
    pub fn passthrough(source: &MediaUploaded) -> Self {
        Self {
            file_key: source.file_key.clone(),
            bucket: source.bucket.clone(),
            content_type: source.content_type.clone(),
            file_size: source.file_size,
            owner_service: source.owner_service.clone(),
            reference_id: source.reference_id,
            reference_type: source.reference_type.clone(),
            metadata: BTreeMap::new(),
        }
    }
}
