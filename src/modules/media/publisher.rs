use std::collections::BTreeMap;

use tracing::info;

use super::error::{PipelineError, PipelineResult};
use super::events::{MANIFEST_CONTENT_TYPE, MediaProcessed, MediaUploaded, metadata_keys};
use super::ports::EventPublisher;
use super::probe::ProbedDuration;
use super::uploader::UploadedArtifacts;

/// Builds the completion event for a processed video. Correlation fields are
/// copied from `job` unchanged.
pub fn build_completion(
    job: &MediaUploaded,
    uploaded: &UploadedArtifacts,
    transcript_key: &str,
    audio_key: &str,
    duration: &ProbedDuration,
) -> PipelineResult<MediaProcessed> {
    let primary_key = uploaded
        .primary_key()
        .ok_or_else(|| PipelineError::EmptyOutput {
            dir: "uploaded artifact set".to_string(),
        })?
        .to_string();

    let metadata = BTreeMap::from([
        (metadata_keys::RAW_VIDEO_KEY.to_string(), job.file_key.clone()),
        (metadata_keys::AUDIO_KEY.to_string(), audio_key.to_string()),
        (metadata_keys::DURATION_SECONDS.to_string(), duration.seconds.to_string()),
        (metadata_keys::DURATION.to_string(), duration.formatted.clone()),
        (metadata_keys::TRANSCRIPT_KEY.to_string(), transcript_key.to_string()),
    ]);

    Ok(MediaProcessed {
        file_key: primary_key,
        bucket: job.bucket.clone(),
        content_type: MANIFEST_CONTENT_TYPE.to_string(),
        file_size: job.file_size,
        owner_service: job.owner_service.clone(),
        reference_id: job.reference_id,
        reference_type: job.reference_type.clone(),
        metadata,
    })
}

pub async fn publish(publisher: &dyn EventPublisher, event: &MediaProcessed) -> PipelineResult<()> {
    publisher
        .publish(event)
        .await
        .map_err(|e| PipelineError::Publish(format!("{e:#}")))?;

    info!("📣 Published completion for {} ({})", event.reference_id, event.file_key);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn job() -> MediaUploaded {
        MediaUploaded {
            file_key: "raw/lesson.mp4".into(),
            bucket: "media".into(),
            content_type: "video/mp4".into(),
            file_size: 2048,
            owner_service: "courses".into(),
            reference_id: Uuid::new_v4(),
            reference_type: "Lesson".into(),
        }
    }

    #[test]
    fn completion_carries_manifest_and_metadata() {
        let job = job();
        let uploaded: UploadedArtifacts = [
            ("master.m3u8".to_string(), "raw/lesson/hls/master.m3u8".to_string()),
            ("stream_0.m3u8".to_string(), "raw/lesson/hls/stream_0.m3u8".to_string()),
        ]
        .into_iter()
        .collect();
        let duration = ProbedDuration {
            seconds: 125.4,
            formatted: "00:02:05".into(),
        };

        let event = build_completion(&job, &uploaded, "", "raw/lesson/audio.mp3", &duration).unwrap();

        assert_eq!(event.file_key, "raw/lesson/hls/master.m3u8");
        assert_eq!(event.content_type, MANIFEST_CONTENT_TYPE);
        assert_eq!(event.bucket, job.bucket);
        assert_eq!(event.file_size, job.file_size);
        assert_eq!(event.reference_id, job.reference_id);
        assert_eq!(event.metadata[metadata_keys::RAW_VIDEO_KEY], "raw/lesson.mp4");
        assert_eq!(event.metadata[metadata_keys::DURATION_SECONDS], "125.4");
        assert_eq!(event.metadata[metadata_keys::DURATION], "00:02:05");
        assert_eq!(event.metadata[metadata_keys::TRANSCRIPT_KEY], "");
        assert_eq!(event.metadata.len(), 5);
    }

    #[test]
    fn empty_upload_set_has_no_primary_key() {
        let duration = ProbedDuration {
            seconds: 1.0,
            formatted: "00:00:01".into(),
        };
        let err = build_completion(&job(), &UploadedArtifacts::default(), "", "", &duration).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyOutput { .. }));
    }
}
