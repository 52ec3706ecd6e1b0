use std::sync::Arc;
use std::time::Duration;

use finagent_models::{BridgeConfig, NormalizedReport, Query};
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::BridgeError;
use crate::pipeline::Pipeline;

/// Hands queries from a transport to a bounded pool of worker tasks.
///
/// Each query gets one deadline covering both the wait for a free worker and
/// the run itself. A worker past its deadline is aborted.
pub struct RequestBridge {
    pipeline: Arc<Pipeline>,
    workers: Arc<Semaphore>,
    max_workers: usize,
    timeout: Duration,
    shutdown: CancellationToken,
}

impl RequestBridge {
    pub fn new(pipeline: Arc<Pipeline>, config: &BridgeConfig) -> Self {
        Self::with_limits(
            pipeline,
            config.max_concurrent_queries,
            Duration::from_secs(config.query_timeout_seconds),
        )
    }

    pub fn with_limits(pipeline: Arc<Pipeline>, max_workers: usize, timeout: Duration) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            pipeline,
            workers: Arc::new(Semaphore::new(max_workers)),
            max_workers,
            timeout,
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancelled when the bridge stops accepting work.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Reject new queries and wake queries still waiting for a worker.
    /// Running queries are left to finish.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn idle_workers(&self) -> usize {
        self.workers.available_permits()
    }

    pub async fn submit(&self, query: Query) -> Result<NormalizedReport, BridgeError> {
        if self.shutdown.is_cancelled() {
            return Err(BridgeError::ShuttingDown);
        }

        let deadline = Instant::now() + self.timeout;
        let query_id = query.id;

        let permit = tokio::select! {
            _ = self.shutdown.cancelled() => return Err(BridgeError::ShuttingDown),
            acquired = tokio::time::timeout_at(deadline, Arc::clone(&self.workers).acquire_owned()) => {
                match acquired {
                    Ok(Ok(permit)) => permit,
                    Ok(Err(_)) => return Err(BridgeError::ShuttingDown),
                    Err(_) => {
                        warn!(%query_id, "Timed out waiting for a free worker");
                        return Err(BridgeError::Timeout(self.timeout));
                    }
                }
            }
        };

        debug!(%query_id, idle = self.idle_workers(), "Dispatching query to worker");
        let pipeline = Arc::clone(&self.pipeline);
        let mut worker = tokio::spawn(async move {
            let _permit = permit;
            pipeline.run(&query).await
        });

        match tokio::time::timeout_at(deadline, &mut worker).await {
            Ok(Ok(result)) => Ok(result?),
            Ok(Err(join_error)) => {
                error!(%query_id, error = %join_error, "Query worker panicked");
                Err(BridgeError::Worker(join_error.to_string()))
            }
            Err(_) => {
                worker.abort();
                warn!(%query_id, timeout = ?self.timeout, "Query timed out, worker aborted");
                Err(BridgeError::Timeout(self.timeout))
            }
        }
    }
}
