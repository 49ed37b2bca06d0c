//! Seals the inbound transaction stream into size/time-bounded windows
//! (`spec.md` §4.2). Drops a sealed batch under backpressure instead of
//! queuing it — on an adversarially fast source, a missed batch is
//! preferable to unbounded queue growth.
use futures::stream::BoxStream;
use futures::StreamExt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::metrics::Metrics;
use crate::transaction::{Batch, Transaction};

pub struct Batcher {
    size_threshold: usize,
    interval: Duration,
}

impl Batcher {
    pub fn new(size_threshold: usize, interval: Duration) -> Self {
        Self {
            size_threshold,
            interval,
        }
    }

    /// Consumes `inbound`, sealing a [`Batch`] every time `size_threshold`
    /// transactions accumulate or `interval` elapses, whichever first. A
    /// batch still being analyzed by the caller when the next seal fires is
    /// dropped; `capacity` bounds how many sealed-but-unconsumed batches may
    /// queue before that backpressure kicks in (1 models C3's "at most one
    /// batch in analysis at a time", per `spec.md` §5).
    pub fn run(
        self,
        mut inbound: BoxStream<'static, Transaction>,
        capacity: usize,
        shutdown: CancellationToken,
        metrics: std::sync::Arc<Metrics>,
    ) -> mpsc::Receiver<Batch> {
        let (sealed_tx, sealed_rx) = mpsc::channel(capacity);

        tokio::spawn(async move {
            let mut pending: Vec<Transaction> = Vec::new();
            let mut ticker = tokio::time::interval(self.interval);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        if !pending.is_empty() {
                            seal(&mut pending, &sealed_tx, &metrics).await;
                        }
                        return;
                    }
                    _ = ticker.tick() => {
                        if !pending.is_empty() {
                            seal(&mut pending, &sealed_tx, &metrics).await;
                        }
                    }
                    maybe_tx = inbound.next() => {
                        match maybe_tx {
                            Some(tx) => {
                                pending.push(tx);
                                if pending.len() >= self.size_threshold {
                                    seal(&mut pending, &sealed_tx, &metrics).await;
                                    ticker.reset();
                                }
                            }
                            None => {
                                if !pending.is_empty() {
                                    seal(&mut pending, &sealed_tx, &metrics).await;
                                }
                                return;
                            }
                        }
                    }
                }
            }
        });

        sealed_rx
    }
}

async fn seal(pending: &mut Vec<Transaction>, sealed_tx: &mpsc::Sender<Batch>, metrics: &Metrics) {
    let batch = Batch::new(std::mem::take(pending), unix_now());
    metrics.record_batch_sealed();
    // try_send, not send: a full channel means C3 is still analyzing the
    // previous batch, and the contract is to drop rather than queue.
    if sealed_tx.try_send(batch).is_err() {
        metrics.record_batch_dropped();
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
