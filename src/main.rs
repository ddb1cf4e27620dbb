use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use media_pipeline::config::settings::AppConfig;
use media_pipeline::infrastructure::ffmpeg::FfmpegCli;
use media_pipeline::infrastructure::ffmpeg::command::HlsOptions;
use media_pipeline::infrastructure::queue::{QueuePublisher, RabbitMqService};
use media_pipeline::infrastructure::storage::StorageService;
use media_pipeline::infrastructure::transcription::WhisperClient;
use media_pipeline::modules::media::{MediaProcessor, PipelineSettings};
use media_pipeline::state::AppState;
use media_pipeline::{app, workers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting media pipeline...");

    let config = AppConfig::new().context("Invalid configuration")?;

    let queue = RabbitMqService::new(&config.rabbitmq_url).await?;
    let storage = StorageService::new(
        &config.minio_url,
        &config.minio_region,
        &config.minio_access_key,
        &config.minio_secret_key,
    );
    let tool = FfmpegCli::new(
        config.ffmpeg_path.clone(),
        config.ffprobe_path.clone(),
        HlsOptions {
            renditions: config.renditions.clone(),
            segment_seconds: config.hls_segment_seconds,
        },
    );
    let publisher = QueuePublisher::new(queue.clone(), config.output_queue.clone());

    let mut processor = MediaProcessor::new(
        Arc::new(storage),
        Arc::new(tool),
        Arc::new(publisher),
        PipelineSettings {
            work_dir: config.work_dir.clone(),
            upload_concurrency: config.upload_concurrency,
        },
    );
    match &config.transcription {
        Some(transcription) => {
            processor = processor.with_transcriber(Arc::new(WhisperClient::new(transcription)?));
            info!("Transcription enabled via {}", transcription.url);
        }
        None => info!("Transcription disabled"),
    }

    let port = config.server_port;
    let state = AppState::new(config, queue, processor);

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
            }
            shutdown.cancel();
        }
    });

    let worker = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            let result = workers::media_worker::start_media_worker(state, shutdown.clone()).await;
            // The health endpoint should not outlive the worker.
            shutdown.cancel();
            result
        }
    });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Health endpoint on http://0.0.0.0:{}/health", port);

    axum::serve(listener, app::create_app())
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await?;

    worker
        .await
        .context("Media worker panicked")?
        .inspect_err(|e| error!("Media worker exited with error: {:#}", e))
        .context("Media worker failed")
}
