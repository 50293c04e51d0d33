use crate::config::types::{CredentialsConfig, StreamConfig};
use crate::service::{LogService, RawRecord, RecordBatch, ServiceError, StartPosition};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// HTTP client for the log service's shard-cursor and record-batch calls.
#[derive(Debug)]
pub struct HttpLogService {
    base_url: String,
    stream: String,
    region: String,
    credentials: CredentialsConfig,
    client: reqwest::Client,
}

impl HttpLogService {
    pub fn new(
        stream: &StreamConfig,
        credentials: &CredentialsConfig,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            base_url: stream.endpoint.trim_end_matches('/').to_string(),
            stream: stream.name.clone(),
            region: stream.region.clone(),
            credentials: credentials.clone(),
            client,
        })
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .post(url)
            .header("x-log-region", &self.region)
            .header("x-access-key-id", &self.credentials.access_key_id)
            .header("x-secret-access-key", &self.credentials.secret_access_key);
        if let Some(token) = &self.credentials.session_token {
            request = request.header("x-session-token", token);
        }
        request
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ServiceError::Throttled);
        }
        if !status.is_success() {
            return Err(ServiceError::Status {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl LogService for HttpLogService {
    async fn get_initial_cursor(
        &self,
        shard_id: &str,
        start: StartPosition,
    ) -> Result<String, ServiceError> {
        let url = format!(
            "{}/v1/streams/{}/shards/{}/cursor",
            self.base_url, self.stream, shard_id
        );
        let response = self
            .post(&url)
            .json(&CursorRequest { start })
            .send()
            .await?;
        let body: CursorResponse = Self::check(response).await?.json().await?;
        Ok(body.cursor)
    }

    async fn get_records_batch(
        &self,
        cursor: &str,
        max_records: usize,
    ) -> Result<RecordBatch, ServiceError> {
        let url = format!("{}/v1/streams/{}/records", self.base_url, self.stream);
        let response = self
            .post(&url)
            .json(&RecordsRequest {
                cursor,
                max_records,
            })
            .send()
            .await?;
        let body: RecordsResponse = Self::check(response).await?.json().await?;

        Ok(RecordBatch {
            records: decode_payloads(body.records),
            next_cursor: body.next_cursor,
            millis_behind_latest: body.millis_behind_latest,
        })
    }
}

/// Decode the base64 payloads of one response. A record with a corrupt
/// payload is logged and dropped; its siblings in the batch are unaffected.
fn decode_payloads(records: Vec<WireRecord>) -> Vec<RawRecord> {
    let mut decoded = Vec::with_capacity(records.len());
    for record in records {
        match BASE64.decode(&record.data) {
            Ok(data) => decoded.push(RawRecord {
                sequence_number: record.sequence_number,
                data,
            }),
            Err(e) => {
                warn!(
                    sequence = %record.sequence_number,
                    error = %e,
                    "skipping record with undecodable payload encoding"
                );
            }
        }
    }
    decoded
}

// ===== Wire types =====

#[derive(Debug, Serialize)]
struct CursorRequest {
    start: StartPosition,
}

#[derive(Debug, Deserialize)]
struct CursorResponse {
    cursor: String,
}

#[derive(Debug, Serialize)]
struct RecordsRequest<'a> {
    cursor: &'a str,
    max_records: usize,
}

#[derive(Debug, Deserialize)]
struct RecordsResponse {
    records: Vec<WireRecord>,
    next_cursor: Option<String>,
    millis_behind_latest: Option<i64>,
}

/// Record payloads travel base64-encoded inside the JSON body.
#[derive(Debug, Deserialize)]
struct WireRecord {
    sequence_number: String,
    data: String,
}
