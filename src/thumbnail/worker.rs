use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::VariantPipeline;
use crate::queue::JobQueue;

/// Pull jobs one at a time until `shutdown` fires.
///
/// The job in progress when shutdown is requested runs to completion.
pub async fn run(
    worker_id: usize,
    queue: Arc<dyn JobQueue>,
    pipeline: Arc<VariantPipeline>,
    shutdown: CancellationToken,
) {
    tracing::info!(worker_id, "Thumbnail worker started");

    loop {
        let delivery = tokio::select! {
            _ = shutdown.cancelled() => break,
            delivery = queue.dequeue() => delivery,
        };

        let delivery = match delivery {
            Ok(delivery) => delivery,
            Err(e) => {
                tracing::error!(worker_id, error = %e, "Failed to dequeue job");
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_secs(1)) => continue,
                }
            }
        };

        let file_id = delivery.job.file_id.as_deref().unwrap_or("");
        let outcome = pipeline.process(&delivery.job).await;
        match &outcome {
            Ok(()) => {
                tracing::info!(
                    worker_id,
                    file_id,
                    attempt = delivery.attempt,
                    "Generated thumbnails"
                );
            }
            Err(e) if e.is_rejection() => {
                tracing::warn!(worker_id, file_id, error = %e, "Rejected thumbnail job");
            }
            Err(e) => {
                tracing::error!(
                    worker_id,
                    file_id,
                    attempt = delivery.attempt,
                    error = %e,
                    "Thumbnail job failed"
                );
            }
        }

        if let Err(e) = queue.complete(&delivery, &outcome).await {
            tracing::error!(worker_id, file_id, error = %e, "Failed to settle job");
        }
    }

    tracing::info!(worker_id, "Thumbnail worker stopped");
}
