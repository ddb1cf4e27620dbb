use std::env;
use std::str::FromStr;

pub enum EnvKey {
    ServerPort,
    RabbitMqUrl,
    InputQueue,
    OutputQueue,
    MinioUrl,
    MinioRegion,
    MinioAccessKey,
    MinioSecretKey,
    FfmpegPath,
    FfprobePath,
    WorkDir,
    UploadConcurrency,
    HlsSegmentSeconds,
    HlsRenditions,
    TranscriptionUrl,
    TranscriptionApiKey,
    TranscriptionModel,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::RabbitMqUrl => "RABBITMQ_URL",
            EnvKey::InputQueue => "MEDIA_INPUT_QUEUE",
            EnvKey::OutputQueue => "MEDIA_OUTPUT_QUEUE",
            EnvKey::MinioUrl => "MINIO_ENDPOINT",
            EnvKey::MinioRegion => "MINIO_REGION",
            EnvKey::MinioAccessKey => "AWS_ACCESS_KEY_ID",
            EnvKey::MinioSecretKey => "AWS_SECRET_ACCESS_KEY",
            EnvKey::FfmpegPath => "FFMPEG_PATH",
            EnvKey::FfprobePath => "FFPROBE_PATH",
            EnvKey::WorkDir => "MEDIA_WORK_DIR",
            EnvKey::UploadConcurrency => "UPLOAD_CONCURRENCY",
            EnvKey::HlsSegmentSeconds => "HLS_SEGMENT_SECONDS",
            EnvKey::HlsRenditions => "HLS_RENDITIONS",
            EnvKey::TranscriptionUrl => "TRANSCRIPTION_URL",
            EnvKey::TranscriptionApiKey => "TRANSCRIPTION_API_KEY",
            EnvKey::TranscriptionModel => "TRANSCRIPTION_MODEL",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_opt(key: EnvKey) -> Option<String> {
    env::var(key.as_str()).ok().filter(|v| !v.trim().is_empty())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
