//! Loads and validates the environment table from `spec.md` §6. Centralizing
//! this here means no other module touches `std::env` directly.
use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    /// Pending-transaction subscription endpoint (`WSS_URL`).
    pub wss_url: String,
    /// Broker bootstrap address (`KAFKA_BROKER`).
    pub kafka_broker: String,
    /// Cache endpoint (`REDIS_URL`).
    pub redis_url: String,
    /// Outbound topic name (`KAFKA_TOPIC`, default `mev-alerts`).
    pub kafka_topic: String,
    /// Historical-activity query endpoint.
    pub subgraph_url: String,
    /// C2 size threshold `B`.
    pub batch_size: usize,
    /// C2 interval `T`.
    pub batch_interval: Duration,
    /// C5 dedup TTL `D`.
    pub dedup_ttl: Duration,
    /// C4 confirmation threshold `H`.
    pub validation_threshold: u32,
    /// C4 query timeout.
    pub validation_timeout: Duration,
    /// Logger threshold (`LOG_LEVEL`, default `info`).
    pub log_level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: std::num::ParseIntError,
    },
}

const DEFAULT_KAFKA_TOPIC: &str = "mev-alerts";
const DEFAULT_SUBGRAPH_URL: &str = "https://api.thegraph.com/subgraphs/name/mev/swap-history";
const DEFAULT_BATCH_SIZE: usize = 100;
const DEFAULT_BATCH_INTERVAL_MS: u64 = 1000;
const DEFAULT_DEDUP_TTL_SECS: u64 = 300;
const DEFAULT_VALIDATION_THRESHOLD: u32 = 5;
const DEFAULT_VALIDATION_TIMEOUT_SECS: u64 = 3;
const DEFAULT_LOG_LEVEL: &str = "info";

impl Config {
    /// Loads from the process environment, falling back to a local `.env`
    /// file (silently ignored if absent — a missing dotfile just means
    /// everything comes from the real environment).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv::dotenv();

        Ok(Self {
            wss_url: required("WSS_URL")?,
            kafka_broker: required("KAFKA_BROKER")?,
            redis_url: required("REDIS_URL")?,
            kafka_topic: optional("KAFKA_TOPIC", DEFAULT_KAFKA_TOPIC.to_owned()),
            subgraph_url: optional("SUBGRAPH_URL", DEFAULT_SUBGRAPH_URL.to_owned()),
            batch_size: optional_parsed("BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
            batch_interval: Duration::from_millis(optional_parsed(
                "BATCH_INTERVAL_MS",
                DEFAULT_BATCH_INTERVAL_MS,
            )?),
            dedup_ttl: Duration::from_secs(optional_parsed(
                "DEDUP_TTL_SECS",
                DEFAULT_DEDUP_TTL_SECS,
            )?),
            validation_threshold: optional_parsed(
                "VALIDATION_THRESHOLD",
                DEFAULT_VALIDATION_THRESHOLD,
            )?,
            validation_timeout: Duration::from_secs(optional_parsed(
                "VALIDATION_TIMEOUT_SECS",
                DEFAULT_VALIDATION_TIMEOUT_SECS,
            )?),
            log_level: optional("LOG_LEVEL", DEFAULT_LOG_LEVEL.to_owned()),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn optional(name: &'static str, default: String) -> String {
    env::var(name).unwrap_or(default)
}

fn optional_parsed<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|source| ConfigError::Invalid { name, source }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // env::set_var mutates global process state; serialize tests that touch it.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn missing_required_var_is_a_config_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::remove_var("WSS_URL");
        env::remove_var("KAFKA_BROKER");
        env::remove_var("REDIS_URL");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("WSS_URL")));
    }

    #[test]
    fn defaults_apply_when_optional_vars_are_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("WSS_URL", "wss://node.example/ws");
        env::set_var("KAFKA_BROKER", "broker:9092");
        env::set_var("REDIS_URL", "redis://cache:6379");
        env::remove_var("KAFKA_TOPIC");
        env::remove_var("BATCH_SIZE");

        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.kafka_topic, "mev-alerts");
        assert_eq!(cfg.batch_size, 100);

        env::remove_var("WSS_URL");
        env::remove_var("KAFKA_BROKER");
        env::remove_var("REDIS_URL");
    }

    #[test]
    fn numeric_overrides_parse() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("WSS_URL", "wss://node.example/ws");
        env::set_var("KAFKA_BROKER", "broker:9092");
        env::set_var("REDIS_URL", "redis://cache:6379");
        env::set_var("BATCH_SIZE", "250");

        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.batch_size, 250);

        env::remove_var("WSS_URL");
        env::remove_var("KAFKA_BROKER");
        env::remove_var("REDIS_URL");
        env::remove_var("BATCH_SIZE");
    }
}
