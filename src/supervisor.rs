//! Wires the pipeline together, propagates shutdown, and surfaces health
//! (C7, `spec.md` §4.7).
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::batcher::Batcher;
use crate::config::Config;
use crate::dedup::{DedupOutcome, Deduplicator};
use crate::detector::detect;
use crate::mempool::{subscribe_with_reconnect, MempoolSource};
use crate::metrics::Metrics;
use crate::publisher::Publisher;
use crate::transaction::Batch;
use crate::validator::Validator;

/// Grace period C7 allows the in-flight batch to drain through C3-C6 after a
/// shutdown signal before forcing the clients closed (`spec.md` §4.7).
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

pub struct Supervisor {
    mempool: Arc<dyn MempoolSource>,
    batch_size: usize,
    batch_interval: Duration,
    dedup: Deduplicator,
    validator: Validator,
    publisher: Publisher,
    metrics: Arc<Metrics>,
}

impl Supervisor {
    pub fn new(
        mempool: Arc<dyn MempoolSource>,
        config: &Config,
        dedup: Deduplicator,
        validator: Validator,
        publisher: Publisher,
    ) -> Self {
        Self {
            mempool,
            batch_size: config.batch_size,
            batch_interval: config.batch_interval,
            dedup,
            validator,
            publisher,
            metrics: Arc::new(Metrics::default()),
        }
    }

    /// Runs until `shutdown` is cancelled, then drains for up to
    /// [`SHUTDOWN_GRACE`] before returning.
    pub async fn run(self, shutdown: CancellationToken) {
        let inbound = subscribe_with_reconnect(self.mempool.clone(), shutdown.clone());
        let batcher = Batcher::new(self.batch_size, self.batch_interval);
        let mut sealed = batcher.run(inbound, 1, shutdown.clone(), self.metrics.clone());

        let drive = async {
            while let Some(batch) = sealed.recv().await {
                self.process_batch(batch).await;
            }
        };

        tokio::select! {
            _ = drive => {}
            _ = shutdown.cancelled() => {
                info!("shutdown signal received, draining in-flight work");
                let drain = async {
                    while let Some(batch) = sealed.recv().await {
                        self.process_batch(batch).await;
                    }
                };
                if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
                    warn!("shutdown grace period exceeded, forcing close");
                }
            }
        }

        let snapshot = self.metrics.snapshot();
        info!(?snapshot, "final health snapshot");
    }

    async fn process_batch(&self, batch: Batch) {
        let findings = detect(&batch);
        for finding in findings {
            self.metrics.record_finding_detected();

            let attacker = finding.attacker_address;
            match self.dedup.check_and_mark(attacker, &self.metrics).await {
                DedupOutcome::RecentlySeen => {
                    self.metrics.record_finding_deduped();
                    continue;
                }
                DedupOutcome::FirstSeen => {}
            }

            if let Some(confirmed) = self.validator.confirm(finding, &self.metrics).await {
                self.publisher.publish(&confirmed, &self.metrics).await;
            }
        }
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }
}

/// Installs the process shutdown handler (SIGINT, and SIGTERM on Unix) and
/// returns a token that cancels when either fires.
pub fn install_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let handler_token = token.clone();

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }

        handler_token.cancel();
    });

    token
}
