//! Publishes confirmed findings to the outbound topic (C6), at-least-once,
//! with bounded retry; never blocks the live pipeline on a broken downstream
//! (`spec.md` §4.6, §7).
use async_trait::async_trait;
use rand::Rng;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};

use crate::finding::{Alert, Finding};
use crate::metrics::Metrics;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("broker rejected the message: {0}")]
    Broker(String),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// The outbound topic. No partition key is required — `spec.md` §4.6 makes
/// no consumer-ordering guarantee.
#[async_trait]
pub trait AlertPublisher: Send + Sync {
    async fn publish(&self, alert: &Alert) -> Result<(), PublishError>;
}

pub struct KafkaPublisher {
    producer: FutureProducer,
    topic: String,
}

impl KafkaPublisher {
    pub fn new(bootstrap_servers: &str, topic: impl Into<String>) -> Result<Self, rdkafka::error::KafkaError> {
        let producer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("message.timeout.ms", "5000")
            .create()?;
        Ok(Self {
            producer,
            topic: topic.into(),
        })
    }
}

#[async_trait]
impl AlertPublisher for KafkaPublisher {
    async fn publish(&self, alert: &Alert) -> Result<(), PublishError> {
        let payload = serde_json::to_string(alert)?;
        let record: FutureRecord<'_, (), String> = FutureRecord::to(&self.topic).payload(&payload);
        self.producer
            .send(record, Timeout::After(Duration::from_secs(5)))
            .await
            .map_err(|(err, _message)| PublishError::Broker(err.to_string()))?;
        Ok(())
    }
}

const RETRY_BASE: Duration = Duration::from_millis(100);
const RETRY_CAP: Duration = Duration::from_secs(5);
const MAX_ATTEMPTS: u32 = 3;

pub struct Publisher {
    sink: Box<dyn AlertPublisher>,
}

impl Publisher {
    pub fn new(sink: Box<dyn AlertPublisher>) -> Self {
        Self { sink }
    }

    /// Publishes `finding`, retrying transient errors with full-jitter
    /// exponential backoff. Final failure is logged and the alert is
    /// dropped — the pipeline must keep moving.
    pub async fn publish(&self, finding: &Finding, metrics: &Metrics) {
        let alert: Alert = finding.into();

        for attempt in 0..MAX_ATTEMPTS {
            match self.sink.publish(&alert).await {
                Ok(()) => {
                    metrics.record_finding_published();
                    return;
                }
                Err(err) if attempt + 1 < MAX_ATTEMPTS => {
                    let delay = backoff_delay(attempt);
                    warn!(attacker = %alert.attacker, error = %err, attempt, "publish failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    error!(attacker = %alert.attacker, error = %err, "publish failed after max attempts, dropping alert");
                    metrics.record_publish_failure();
                }
            }
        }
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let exp = RETRY_BASE.saturating_mul(1 << attempt).min(RETRY_CAP);
    rand::thread_rng().gen_range(Duration::ZERO..=exp)
}
