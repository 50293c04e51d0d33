use crate::service::StartPosition;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub stream: StreamConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    pub shard: ShardConfig,
    #[serde(default)]
    pub poll: PollConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    pub name: String,
    pub endpoint: String,
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub secret_access_key: String,
    #[serde(default)]
    pub session_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardConfig {
    pub id: String,
    #[serde(default = "default_start")]
    pub start: StartPosition,
}

fn default_start() -> StartPosition {
    StartPosition::Earliest
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Upper bound on records per batch request.
    #[serde(default = "default_max_records")]
    pub max_records: usize,
    /// Wait between polls when a live cursor returns zero records.
    #[serde(with = "humantime_serde", default = "default_idle_backoff")]
    pub idle_backoff: Duration,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_records: default_max_records(),
            idle_backoff: default_idle_backoff(),
            retry: RetryConfig::default(),
        }
    }
}

fn default_max_records() -> usize {
    1000
}

fn default_idle_backoff() -> Duration {
    Duration::from_secs(1)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(with = "humantime_serde", default = "default_initial_backoff")]
    pub initial_backoff: Duration,
    #[serde(with = "humantime_serde", default = "default_max_backoff")]
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff: default_initial_backoff(),
            max_backoff: default_max_backoff(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff() -> Duration {
    Duration::from_millis(200)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(30)
}
