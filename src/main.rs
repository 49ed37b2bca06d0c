use sandwich_sentinel::config::Config;
use sandwich_sentinel::dedup::{Deduplicator, RedisDedupCache};
use sandwich_sentinel::mempool::WsMempoolSource;
use sandwich_sentinel::publisher::{KafkaPublisher, Publisher};
use sandwich_sentinel::supervisor::{install_shutdown_handler, Supervisor};
use sandwich_sentinel::validator::{SubgraphClient, Validator};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_level))
        .init();

    let mempool = Arc::new(WsMempoolSource::new(config.wss_url.clone()));

    let cache = RedisDedupCache::connect(&config.redis_url).await?;
    let dedup = Deduplicator::new(Box::new(cache), config.dedup_ttl);

    let history = SubgraphClient::new(config.subgraph_url.clone());
    let validator = Validator::new(
        Box::new(history),
        config.validation_threshold,
        config.validation_timeout,
    );

    let sink = KafkaPublisher::new(&config.kafka_broker, config.kafka_topic.clone())?;
    let publisher = Publisher::new(Box::new(sink));

    let supervisor = Supervisor::new(mempool, &config, dedup, validator, publisher);
    let shutdown = install_shutdown_handler();
    supervisor.run(shutdown).await;

    Ok(())
}
