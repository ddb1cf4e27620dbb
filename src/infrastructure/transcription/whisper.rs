use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::config::settings::TranscriptionConfig;
use crate::modules::media::ports::Transcriber;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Client for an OpenAI-compatible `audio/transcriptions` endpoint that
/// returns WebVTT captions.
#[derive(Clone)]
pub struct WhisperClient {
    client: Client,
    url: String,
    api_key: Option<String>,
    model: String,
}

impl WhisperClient {
    pub fn new(config: &TranscriptionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build transcription HTTP client")?;

        Ok(Self {
            client,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(&self, audio: &Path) -> Result<Option<String>> {
        let file = tokio::fs::File::open(audio)
            .await
            .with_context(|| format!("Failed to open {}", audio.display()))?;
        let length = file.metadata().await?.len();

        let file_name = audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let part = Part::stream_with_length(reqwest::Body::wrap_stream(ReaderStream::new(file)), length)
            .file_name(file_name)
            .mime_str("audio/mpeg")?;

        let form = Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "vtt");

        debug!("Sending {} bytes of audio to {}", length, self.url);

        let mut request = self.client.post(&self.url).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.context("Transcription request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Transcription service returned {}: {}", status, body));
        }

        let captions = response.text().await?;
        if captions.trim().is_empty() {
            return Ok(None);
        }

        info!("📝 Received {} bytes of captions", captions.len());
        Ok(Some(captions))
    }
}
