//! The historical-validation gate (C4): fail-closed, stateless, confirms a
//! finding only when the attacker has a deep enough swap history
//! (`spec.md` §4.5, §7, §9).
use async_trait::async_trait;
use ethers::types::Address;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::finding::Finding;
use crate::metrics::Metrics;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("subgraph query timed out")]
    Timeout,
    #[error("subgraph returned an unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// The historical-activity source: "how many swaps has this address made in
/// the last `window`". An external collaborator per `spec.md` §6.
#[async_trait]
pub trait HistoricalActivitySource: Send + Sync {
    async fn swap_count(&self, address: Address, window: u32) -> Result<u32, ValidationError>;
}

pub struct SubgraphClient {
    http: reqwest::Client,
    endpoint: String,
}

impl SubgraphClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[derive(serde::Serialize)]
struct SwapCountQuery {
    address: String,
    window: u32,
}

#[derive(serde::Deserialize)]
struct SwapCountResponse {
    count: u32,
}

#[async_trait]
impl HistoricalActivitySource for SubgraphClient {
    async fn swap_count(&self, address: Address, window: u32) -> Result<u32, ValidationError> {
        let body = SwapCountQuery {
            address: format!("{:?}", address),
            window,
        };
        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<SwapCountResponse>()
            .await?;
        Ok(response.count)
    }
}

const RECENT_SWAPS_WINDOW: u32 = 100;

pub struct Validator {
    source: Box<dyn HistoricalActivitySource>,
    threshold: u32,
    timeout: Duration,
}

impl Validator {
    pub fn new(source: Box<dyn HistoricalActivitySource>, threshold: u32, timeout: Duration) -> Self {
        Self {
            source,
            threshold,
            timeout,
        }
    }

    /// Confirms `finding` iff the attacker's recent swap count exceeds `H`.
    /// Fail-closed: timeout or remote failure drops the finding.
    pub async fn confirm(&self, finding: Finding, metrics: &Metrics) -> Option<Finding> {
        let query = self.source.swap_count(finding.attacker_address, RECENT_SWAPS_WINDOW);
        let outcome = tokio::time::timeout(self.timeout, query).await;

        let count = match outcome {
            Ok(Ok(count)) => count,
            Ok(Err(err)) => {
                info!(attacker = ?finding.attacker_address, error = %err, "validation query failed, dropping finding");
                metrics.record_finding_rejected();
                return None;
            }
            Err(_) => {
                info!(attacker = ?finding.attacker_address, "validation query timed out, dropping finding");
                metrics.record_finding_rejected();
                return None;
            }
        };

        if count > self.threshold {
            Some(finding)
        } else {
            metrics.record_finding_rejected();
            None
        }
    }
}
