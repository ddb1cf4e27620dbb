use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use crate::config::env::{self, EnvKey};
use crate::infrastructure::ffmpeg::command::Rendition;

const DEFAULT_RENDITIONS: &str = "1080:5000k:192k,720:2800k:128k,480:1400k:96k";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid rendition ladder '{0}': expected height:videoBitrate:audioBitrate[,...]")]
    InvalidRenditions(String),
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub server_port: u16,
    pub rabbitmq_url: String,
    pub input_queue: String,
    pub output_queue: String,
    pub minio_url: String,
    pub minio_region: String,
    pub minio_access_key: String,
    pub minio_secret_key: String,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub work_dir: PathBuf,
    pub upload_concurrency: usize,
    pub hls_segment_seconds: u32,
    pub renditions: Vec<Rendition>,
    pub transcription: Option<TranscriptionConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TranscriptionConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub model: String,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let renditions_raw = env::get_or(EnvKey::HlsRenditions, DEFAULT_RENDITIONS);
        let renditions = parse_renditions(&renditions_raw)?;

        let transcription = env::get_opt(EnvKey::TranscriptionUrl).map(|url| TranscriptionConfig {
            url,
            api_key: env::get_opt(EnvKey::TranscriptionApiKey),
            model: env::get_or(EnvKey::TranscriptionModel, "whisper-1"),
        });

        let work_dir = env::get_opt(EnvKey::WorkDir)
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);

        Ok(Self {
            server_port: env::get_parsed(EnvKey::ServerPort, 3000),
            rabbitmq_url: required(EnvKey::RabbitMqUrl)?,
            input_queue: env::get_or(EnvKey::InputQueue, "media.uploaded"),
            output_queue: env::get_or(EnvKey::OutputQueue, "media.processed"),
            minio_url: required(EnvKey::MinioUrl)?,
            minio_region: env::get_or(EnvKey::MinioRegion, "us-east-1"),
            minio_access_key: required(EnvKey::MinioAccessKey)?,
            minio_secret_key: required(EnvKey::MinioSecretKey)?,
            ffmpeg_path: env::get_or(EnvKey::FfmpegPath, "ffmpeg"),
            ffprobe_path: env::get_or(EnvKey::FfprobePath, "ffprobe"),
            work_dir,
            upload_concurrency: env::get_parsed(EnvKey::UploadConcurrency, 10usize).max(1),
            hls_segment_seconds: env::get_parsed(EnvKey::HlsSegmentSeconds, 6u32).max(1),
            renditions,
            transcription,
        })
    }
}

fn required(key: EnvKey) -> Result<String, ConfigError> {
    let name = key.as_str();
    env::get(key).map_err(|_| ConfigError::Missing(name))
}

/// Parses `1080:5000k:192k,720:2800k:128k` into a rendition ladder.
pub fn parse_renditions(raw: &str) -> Result<Vec<Rendition>, ConfigError> {
    let invalid = || ConfigError::InvalidRenditions(raw.to_string());

    let ladder = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let mut parts = entry.split(':');
            let height = parts.next().and_then(|h| h.parse::<u32>().ok()).filter(|h| *h > 0);
            let video_bitrate = parts.next().filter(|b| !b.is_empty());
            let audio_bitrate = parts.next().filter(|b| !b.is_empty());

            match (height, video_bitrate, audio_bitrate, parts.next()) {
                (Some(height), Some(video), Some(audio), None) => Ok(Rendition {
                    height,
                    video_bitrate: video.to_string(),
                    audio_bitrate: audio.to_string(),
                }),
                _ => Err(invalid()),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    if ladder.is_empty() {
        return Err(invalid());
    }

    Ok(ladder)
}
