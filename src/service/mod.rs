pub mod http;

pub use http::HttpLogService;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request throttled by service")]
    Throttled,
}

impl ServiceError {
    /// Whether the caller may retry this call with backoff. Throttling and
    /// transport-level failures are transient; everything else is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Throttled => true,
            ServiceError::Http(e) => e.is_timeout() || e.is_connect(),
            ServiceError::Status { status, .. } => *status >= 500,
        }
    }
}

/// Where to begin reading a shard that has no prior cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartPosition {
    Earliest,
    Latest,
}

/// One opaque encoded record as delivered by the log service.
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// Service-assigned position within the shard; used only for logging.
    pub sequence_number: String,
    pub data: Vec<u8>,
}

/// Result of one `get_records_batch` call.
#[derive(Debug, Clone, Default)]
pub struct RecordBatch {
    pub records: Vec<RawRecord>,
    pub next_cursor: Option<String>,
    pub millis_behind_latest: Option<i64>,
}

/// The two remote calls the consumer needs. Network, throttling, and
/// credential handling live behind this seam.
#[async_trait]
pub trait LogService: Send + Sync {
    async fn get_initial_cursor(
        &self,
        shard_id: &str,
        start: StartPosition,
    ) -> Result<String, ServiceError>;

    async fn get_records_batch(
        &self,
        cursor: &str,
        max_records: usize,
    ) -> Result<RecordBatch, ServiceError>;
}
