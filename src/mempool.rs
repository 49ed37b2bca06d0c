//! The mempool subscriber (C1): a long-lived, reconnecting subscription to a
//! pending-transaction feed (`spec.md` §4.1).
use async_trait::async_trait;
use ethers::providers::{Middleware, Provider, Ws};
use futures::stream::BoxStream;
use futures::StreamExt;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::transaction::Transaction;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Provider(#[from] ethers::providers::ProviderError),
}

/// A long-lived pending-transaction subscription. Transient transport
/// failures are the caller's concern (see [`subscribe_with_reconnect`]); this
/// trait only needs to describe one successful connection attempt.
#[async_trait]
pub trait MempoolSource: Send + Sync {
    async fn subscribe(&self) -> Result<BoxStream<'static, Transaction>, SourceError>;
}

pub struct WsMempoolSource {
    url: String,
}

impl WsMempoolSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl MempoolSource for WsMempoolSource {
    async fn subscribe(&self) -> Result<BoxStream<'static, Transaction>, SourceError> {
        let ws = Ws::connect(&self.url)
            .await
            .map_err(ethers::providers::ProviderError::from)?;
        let provider = Arc::new(Provider::new(ws));
        let hashes = provider.subscribe_pending_txs().await?;

        let resolved = hashes.filter_map(move |hash| {
            let provider = provider.clone();
            async move {
                match provider.get_transaction(hash).await {
                    Ok(Some(tx)) => to_transaction(tx),
                    Ok(None) => {
                        debug!(?hash, "pending tx vanished before it could be fetched");
                        None
                    }
                    Err(err) => {
                        debug!(?hash, error = %err, "could not fetch pending tx, skipping");
                        None
                    }
                }
            }
        });

        Ok(Box::pin(resolved))
    }
}

/// A malformed record (missing gas price, e.g. a pre-EIP-1559 quirk the
/// node didn't normalize) is logged and skipped, never fatal.
fn to_transaction(tx: ethers::types::Transaction) -> Option<Transaction> {
    let gas_price = tx.gas_price.or(tx.max_fee_per_gas)?;
    Some(Transaction {
        hash: tx.hash,
        from: tx.from,
        to: tx.to?,
        input_data: tx.input,
        gas_price,
        value: tx.value,
        nonce: tx.nonce,
        observed_at: Instant::now(),
    })
}

const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(60);

/// Drives `source` forever, reconnecting with full-jitter exponential
/// backoff on every disconnect, and forwards every yielded transaction onto
/// the returned stream. Consumed by the batcher (C2).
pub fn subscribe_with_reconnect(
    source: Arc<dyn MempoolSource>,
    shutdown: tokio_util::sync::CancellationToken,
) -> BoxStream<'static, Transaction> {
    let (tx, rx) = mpsc::channel(1024);

    tokio::spawn(async move {
        let mut attempt: u32 = 0;
        loop {
            if shutdown.is_cancelled() {
                return;
            }

            match source.subscribe().await {
                Ok(mut stream) => {
                    attempt = 0;
                    loop {
                        tokio::select! {
                            _ = shutdown.cancelled() => return,
                            next = stream.next() => match next {
                                Some(transaction) => {
                                    if tx.send(transaction).await.is_err() {
                                        return;
                                    }
                                }
                                None => break,
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, attempt, "mempool subscription failed, reconnecting");
                }
            }

            let delay = jittered_backoff(attempt);
            attempt = attempt.saturating_add(1);
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    });

    Box::pin(ReceiverStream::new(rx))
}

fn jittered_backoff(attempt: u32) -> Duration {
    let exp = BACKOFF_BASE.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX)).min(BACKOFF_CAP);
    rand::thread_rng().gen_range(Duration::ZERO..=exp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_capped() {
        for attempt in 0..20 {
            let delay = jittered_backoff(attempt);
            assert!(delay <= BACKOFF_CAP);
        }
    }

    #[test]
    fn backoff_grows_with_attempts_before_cap() {
        // attempt 0 caps at 1s, attempt 5 caps at 32s — the ceiling should
        // grow even though the jittered sample itself is random.
        let mut saw_large = false;
        for _ in 0..200 {
            if jittered_backoff(5) > Duration::from_secs(1) {
                saw_large = true;
                break;
            }
        }
        assert!(saw_large);
    }
}
