use crate::modules::media::{ErrorKind, JobError, MediaProcessor, MediaUploaded};
use crate::state::AppState;
use futures_util::StreamExt;
use lapin::message::Delivery;
use lapin::options::{BasicAckOptions, BasicNackOptions};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// What to tell the broker about a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    Requeue,
    /// Nack without requeue; the broker dead-letters it if configured to.
    Reject,
}

pub async fn start_media_worker(state: AppState, shutdown: CancellationToken) -> anyhow::Result<()> {
    info!("🎥 Starting media worker...");

    let queue_name = state.config.input_queue.clone();
    let mut consumer = state.queue.consume(&queue_name, "media_worker").await?;

    info!("🎥 Media worker listening on '{}'", queue_name);

    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = consumer.next() => next,
        };

        let delivery = match next {
            Some(Ok(delivery)) => delivery,
            Some(Err(e)) => {
                error!("❌ Consumer error: {}", e);
                continue;
            }
            None => return stream_closed(&shutdown),
        };

        // Jobs run one at a time: ffmpeg already saturates the host.
        let disposition = handle_payload(&state.processor, &delivery.data, delivery.redelivered, &shutdown).await;
        settle(&delivery, disposition).await;
    }

    info!("🎥 Media worker stopped");
    Ok(())
}

/// A consumer stream only ends on its own when the broker dropped us, which
/// is an error unless shutdown was already requested.
pub fn stream_closed(shutdown: &CancellationToken) -> anyhow::Result<()> {
    if shutdown.is_cancelled() {
        info!("🎥 Media worker stopped");
        return Ok(());
    }
    warn!("Consumer stream closed");
    Err(anyhow::anyhow!("consumer stream closed"))
}

pub async fn handle_payload(
    processor: &MediaProcessor,
    payload: &[u8],
    redelivered: bool,
    shutdown: &CancellationToken,
) -> Disposition {
    let job = match serde_json::from_slice::<MediaUploaded>(payload) {
        Ok(job) => job,
        Err(e) => {
            error!("❌ Failed to parse job: {}", e);
            return Disposition::Reject;
        }
    };

    info!("📦 Received job for {}", job.file_key);

    let result = processor.process(&job, shutdown).await;
    disposition(&result, redelivered)
}

pub fn disposition<T>(result: &Result<T, JobError>, redelivered: bool) -> Disposition {
    match result {
        Ok(_) => Disposition::Ack,
        Err(e) if e.kind() == ErrorKind::Cancelled => Disposition::Requeue,
        Err(e) if e.is_retryable() && !redelivered => Disposition::Requeue,
        Err(_) => Disposition::Reject,
    }
}

async fn settle(delivery: &Delivery, disposition: Disposition) {
    let result = match disposition {
        Disposition::Ack => delivery.ack(BasicAckOptions::default()).await,
        Disposition::Requeue | Disposition::Reject => {
            delivery
                .nack(BasicNackOptions {
                    requeue: disposition == Disposition::Requeue,
                    ..BasicNackOptions::default()
                })
                .await
        }
    };

    if let Err(e) = result {
        error!("Failed to settle delivery ({:?}): {}", disposition, e);
    }
}
