#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use media_pipeline::modules::media::error::{StorageError, StorageResult, ToolError};
use media_pipeline::modules::media::ports::{
    EventPublisher, MediaTool, ObjectStorage, ObjectStream, Transcriber,
};
use media_pipeline::modules::media::{MediaProcessed, MediaProcessor, MediaUploaded, PipelineSettings};

pub const SOURCE_BUCKET: &str = "media";
pub const SOURCE_KEY: &str = "raw/course-7/lesson-3.mp4";

pub fn video_job() -> MediaUploaded {
    MediaUploaded {
        file_key: SOURCE_KEY.to_string(),
        bucket: SOURCE_BUCKET.to_string(),
        content_type: "video/mp4".to_string(),
        file_size: 4096,
        owner_service: "courses".to_string(),
        reference_id: Uuid::parse_str("0b9d4f0e-8a51-4c55-9f0e-3f6d8e2c9a11").unwrap(),
        reference_type: "Lesson".to_string(),
    }
}

pub fn image_job() -> MediaUploaded {
    MediaUploaded {
        file_key: "raw/course-7/cover.png".to_string(),
        content_type: "image/png".to_string(),
        ..video_job()
    }
}

/// In-memory object store that records upload concurrency.
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<BTreeMap<(String, String), Vec<u8>>>,
    upload_delay: Duration,
    fail_uploads_named: Option<String>,
    cancel_after: Option<(usize, CancellationToken)>,
    upload_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = delay;
        self
    }

    /// Every upload whose key ends with `suffix` fails.
    pub fn failing_uploads_ending_with(mut self, suffix: &str) -> Self {
        self.fail_uploads_named = Some(suffix.to_string());
        self
    }

    /// Cancels `token` as soon as the `count`-th upload starts.
    pub fn cancelling_after_uploads(mut self, count: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((count, token));
        self
    }

    pub fn put(&self, bucket: &str, key: &str, data: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data.to_vec());
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().map(|(_, k)| k.clone()).collect()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectStream> {
        let data = self
            .get(bucket, key)
            .ok_or_else(|| StorageError::not_found(bucket, key))?;
        let length = data.len() as i64;

        Ok(ObjectStream {
            body: Box::pin(Cursor::new(data)),
            content_type: Some("video/mp4".to_string()),
            content_length: Some(length),
        })
    }

    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        _content_type: &str,
    ) -> StorageResult<String> {
        let call = self.upload_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((count, token)) = &self.cancel_after {
            if call == *count {
                token.cancel();
            }
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.upload_delay.is_zero() {
            tokio::time::sleep(self.upload_delay).await;
        }

        let result = match &self.fail_uploads_named {
            Some(suffix) if key.ends_with(suffix.as_str()) => {
                Err(StorageError::upload_failed(key, "simulated outage"))
            }
            _ => match tokio::fs::read(path).await {
                Ok(data) => {
                    self.put(bucket, key, &data);
                    Ok(key.to_string())
                }
                Err(e) => Err(StorageError::Io(e)),
            },
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[derive(Debug, Clone)]
pub enum EncoderBehaviour {
    Write {
        renditions: usize,
        segments_per_rendition: usize,
        manifest: bool,
        audio: bool,
    },
    Crash {
        exit_code: i32,
        stderr: String,
    },
    WriteNothing,
}

impl EncoderBehaviour {
    pub fn standard() -> Self {
        EncoderBehaviour::Write {
            renditions: 3,
            segments_per_rendition: 2,
            manifest: true,
            audio: true,
        }
    }
}

/// Media tool double that writes fake encoder output.
pub struct ScriptedTool {
    duration: Option<f64>,
    behaviour: EncoderBehaviour,
    probe_calls: AtomicUsize,
    transcode_calls: AtomicUsize,
    seen_inputs: Mutex<Vec<PathBuf>>,
}

impl ScriptedTool {
    pub fn new(duration: Option<f64>, behaviour: EncoderBehaviour) -> Self {
        Self {
            duration,
            behaviour,
            probe_calls: AtomicUsize::new(0),
            transcode_calls: AtomicUsize::new(0),
            seen_inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn transcode_calls(&self) -> usize {
        self.transcode_calls.load(Ordering::SeqCst)
    }

    pub fn seen_inputs(&self) -> Vec<PathBuf> {
        self.seen_inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaTool for ScriptedTool {
    async fn probe_duration(&self, input: &Path) -> Result<f64, ToolError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_inputs.lock().unwrap().push(input.to_path_buf());
        assert!(input.is_file(), "probe ran before the source was downloaded");

        self.duration.ok_or_else(|| ToolError::Output {
            tool: "ffprobe".to_string(),
            output: "N/A".to_string(),
        })
    }

    async fn transcode(&self, _input: &Path, output_dir: &Path) -> Result<(), ToolError> {
        self.transcode_calls.fetch_add(1, Ordering::SeqCst);

        match &self.behaviour {
            EncoderBehaviour::Write {
                renditions,
                segments_per_rendition,
                manifest,
                audio,
            } => {
                for i in 0..*renditions {
                    write(output_dir, &format!("stream_{i}.m3u8"), "#EXTM3U\n");
                    for seq in 0..*segments_per_rendition {
                        write(output_dir, &format!("stream_{i}_{seq:03}.ts"), "segment");
                    }
                }
                if *manifest {
                    write(output_dir, "master.m3u8", "#EXTM3U\n#EXT-X-STREAM-INF\n");
                }
                if *audio {
                    write(output_dir, "audio.mp3", "ID3");
                }
                Ok(())
            }
            EncoderBehaviour::Crash { exit_code, stderr } => Err(ToolError::Exit {
                tool: "ffmpeg".to_string(),
                exit_code: Some(*exit_code),
                stderr: stderr.clone(),
            }),
            EncoderBehaviour::WriteNothing => Ok(()),
        }
    }
}

fn write(dir: &Path, name: &str, contents: &str) {
    std::fs::write(dir.join(name), contents).unwrap();
}

pub enum TranscriptReply {
    Captions(String),
    Nothing,
    Fail,
}

pub struct ScriptedTranscriber {
    reply: TranscriptReply,
    calls: AtomicUsize,
}

impl ScriptedTranscriber {
    pub fn new(reply: TranscriptReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, audio: &Path) -> anyhow::Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(audio.is_file());

        match &self.reply {
            TranscriptReply::Captions(text) => Ok(Some(text.clone())),
            TranscriptReply::Nothing => Ok(None),
            TranscriptReply::Fail => Err(anyhow!("transcription backend unavailable")),
        }
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<MediaProcessed>>,
    fail: bool,
}

impl RecordingPublisher {
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn events(&self) -> Vec<MediaProcessed> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &MediaProcessed) -> anyhow::Result<()> {
        if self.fail {
            return Err(anyhow!("broker unreachable"));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub const CAPTIONS: &str = "WEBVTT\n\n00:00:00.000 --> 00:00:02.000\nWelcome to lesson three.\n";

pub struct Harness {
    pub storage: Arc<MemoryStorage>,
    pub tool: Arc<ScriptedTool>,
    pub transcriber: Arc<ScriptedTranscriber>,
    pub publisher: Arc<RecordingPublisher>,
    pub work_dir: TempDir,
    pub processor: MediaProcessor,
}

impl Harness {
    pub fn new(tool: ScriptedTool) -> Self {
        Self::build(
            MemoryStorage::new(),
            tool,
            TranscriptReply::Captions(CAPTIONS.to_string()),
            RecordingPublisher::default(),
            10,
        )
    }

    pub fn build(
        storage: MemoryStorage,
        tool: ScriptedTool,
        reply: TranscriptReply,
        publisher: RecordingPublisher,
        upload_concurrency: usize,
    ) -> Self {
        storage.put(SOURCE_BUCKET, SOURCE_KEY, b"\x00\x00\x00\x18ftypmp42 fake video bytes");

        let storage = Arc::new(storage);
        let tool = Arc::new(tool);
        let transcriber = Arc::new(ScriptedTranscriber::new(reply));
        let publisher = Arc::new(publisher);
        let work_dir = tempfile::tempdir().unwrap();

        let processor = MediaProcessor::new(
            storage.clone(),
            tool.clone(),
            publisher.clone(),
            PipelineSettings {
                work_dir: work_dir.path().to_path_buf(),
                upload_concurrency,
            },
        )
        .with_transcriber(transcriber.clone());

        Self {
            storage,
            tool,
            transcriber,
            publisher,
            work_dir,
            processor,
        }
    }

    /// True when no job workspace is left on disk.
    pub fn workspace_is_clean(&self) -> bool {
        std::fs::read_dir(self.work_dir.path()).unwrap().next().is_none()
    }
}
