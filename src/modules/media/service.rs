use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use super::artifacts::{self, AUDIO_FILE};
use super::error::{JobError, PipelineError, PipelineResult};
use super::events::{MediaProcessed, MediaUploaded};
use super::ports::{EventPublisher, MediaTool, ObjectStorage, Transcriber};
use super::workspace::JobWorkspace;
use super::{probe, publisher, transcoder, transcription, uploader};

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Parent directory for per-job workspaces.
    pub work_dir: PathBuf,
    pub upload_concurrency: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir(),
            upload_concurrency: 10,
        }
    }
}

/// Turns one uploaded object into a published completion event.
#[derive(Clone)]
pub struct MediaProcessor {
    storage: Arc<dyn ObjectStorage>,
    tool: Arc<dyn MediaTool>,
    transcriber: Option<Arc<dyn Transcriber>>,
    publisher: Arc<dyn EventPublisher>,
    settings: PipelineSettings,
}

impl MediaProcessor {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        tool: Arc<dyn MediaTool>,
        publisher: Arc<dyn EventPublisher>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            storage,
            tool,
            transcriber: None,
            publisher,
            settings,
        }
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    /// Processes one job and returns the event that was published.
    ///
    /// Images are passed through untouched. Videos go through download,
    /// probe, transcode, transcription, upload and publish inside a job
    /// workspace that is removed before this returns.
    #[instrument(
        name = "media_job",
        skip_all,
        fields(file_key = %job.file_key, reference_id = %job.reference_id)
    )]
    pub async fn process(
        &self,
        job: &MediaUploaded,
        cancel: &CancellationToken,
    ) -> Result<MediaProcessed, JobError> {
        let result = if job.is_image() {
            self.process_image(job).await
        } else {
            self.process_video(job, cancel).await
        };

        result.map_err(|e| {
            error!(kind = %e.kind(), "❌ Job failed: {}", e);
            JobError::new(job.file_key.clone(), e)
        })
    }

    async fn process_image(&self, job: &MediaUploaded) -> PipelineResult<MediaProcessed> {
        info!("🖼️ Image upload, publishing pass-through event");
        let event = MediaProcessed::passthrough(job);
        publisher::publish(self.publisher.as_ref(), &event).await?;
        Ok(event)
    }

    async fn process_video(
        &self,
        job: &MediaUploaded,
        cancel: &CancellationToken,
    ) -> PipelineResult<MediaProcessed> {
        ensure_active(cancel)?;

        let mut workspace = JobWorkspace::create(&self.settings.work_dir, &job.file_key).await?;
        info!(correlation_id = %workspace.correlation_id(), "📦 Processing video");

        let result = self.run_video(job, &workspace, cancel).await;
        workspace.dispose().await;
        result
    }

    async fn run_video(
        &self,
        job: &MediaUploaded,
        workspace: &JobWorkspace,
        cancel: &CancellationToken,
    ) -> PipelineResult<MediaProcessed> {
        workspace
            .download(self.storage.as_ref(), &job.bucket, &job.file_key)
            .await?;
        ensure_active(cancel)?;

        let duration = probe::probe(self.tool.as_ref(), workspace.input_path()).await?;
        ensure_active(cancel)?;

        transcoder::transcode(self.tool.as_ref(), workspace.input_path(), workspace.output_dir()).await?;
        ensure_active(cancel)?;

        // An empty ladder fails before transcription is attempted.
        if uploader::eligible_files(workspace.output_dir()).await?.is_empty() {
            return Err(PipelineError::EmptyOutput {
                dir: workspace.output_dir().display().to_string(),
            });
        }

        let transcript_key = transcription::transcribe(
            self.transcriber.as_deref(),
            self.storage.as_ref(),
            workspace.output_dir(),
            &job.bucket,
            &job.file_key,
        )
        .await;
        ensure_active(cancel)?;

        let uploaded = uploader::upload_all(
            self.storage.clone(),
            workspace.output_dir(),
            &job.bucket,
            &job.file_key,
            self.settings.upload_concurrency,
            cancel,
        )
        .await?;
        ensure_active(cancel)?;

        let audio_key = self.upload_audio(workspace, job).await?;
        ensure_active(cancel)?;

        let event = publisher::build_completion(job, &uploaded, &transcript_key, &audio_key, &duration)?;
        publisher::publish(self.publisher.as_ref(), &event).await?;

        info!("✅ Video processed: {} artifacts, primary {}", uploaded.len(), event.file_key);
        Ok(event)
    }

    /// Uploads the audio extraction if the encoder wrote one; empty key
    /// otherwise.
    async fn upload_audio(&self, workspace: &JobWorkspace, job: &MediaUploaded) -> PipelineResult<String> {
        let audio_path = workspace.output_dir().join(AUDIO_FILE);
        if !tokio::fs::try_exists(&audio_path).await? {
            warn!("Encoder produced no audio file, AudioKey left empty");
            return Ok(String::new());
        }

        let key = artifacts::audio_key(&job.file_key);
        let key = self
            .storage
            .upload_file(&job.bucket, &key, &audio_path, &artifacts::content_type_for(&audio_path))
            .await?;
        Ok(key)
    }
}

fn ensure_active(cancel: &CancellationToken) -> PipelineResult<()> {
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }
    Ok(())
}
