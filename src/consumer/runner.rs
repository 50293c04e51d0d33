use crate::config::types::{Config, RetryConfig};
use crate::cursor::{ExhaustReason, ShardCursor};
use crate::decode::{decode_record, extract_action};
use crate::emit::{emit_fields, RecordSink};
use crate::service::{LogService, RawRecord, RecordBatch, ServiceError};
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("could not obtain an initial cursor: {0}")]
    CursorUnavailable(#[source] ServiceError),

    #[error("poll failed: {0}")]
    PollFailure(#[source] ServiceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Exhausted(ExhaustReason),
    ShutdownRequested,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Exhausted(reason) => write!(f, "{}", reason),
            StopReason::ShutdownRequested => write!(f, "shutdown requested"),
        }
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub records_seen: u64,
    pub actions_extracted: u64,
    pub stop_reason: StopReason,
}

/// Drives one shard: acquire a cursor, poll bounded batches, decode every
/// record, advance the cursor, stop when the shard is exhausted or shutdown
/// is signalled. One cursor, one in-flight poll, records decoded in order.
pub struct ConsumerRunner {
    config: Config,
    service: Arc<dyn LogService>,
    sink: Box<dyn RecordSink>,
}

impl ConsumerRunner {
    pub fn new(config: Config, service: Arc<dyn LogService>, sink: Box<dyn RecordSink>) -> Self {
        Self {
            config,
            service,
            sink,
        }
    }

    pub async fn run(
        mut self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<RunSummary, ConsumerError> {
        info!(
            stream = %self.config.stream.name,
            shard_id = %self.config.shard.id,
            "starting shard consumer"
        );

        let mut records_seen = 0u64;
        let mut actions_extracted = 0u64;

        let token = match self.acquire_initial_cursor(&mut shutdown).await? {
            Some(token) => token,
            None => {
                return Ok(RunSummary {
                    records_seen,
                    actions_extracted,
                    stop_reason: StopReason::ShutdownRequested,
                })
            }
        };
        let mut cursor = ShardCursor::Active(token);

        loop {
            if *shutdown.borrow() {
                info!("shutdown requested, stopping shard consumer");
                return Ok(RunSummary {
                    records_seen,
                    actions_extracted,
                    stop_reason: StopReason::ShutdownRequested,
                });
            }

            let token = match &cursor {
                ShardCursor::Active(token) => token.clone(),
                ShardCursor::Exhausted(reason) => {
                    info!(reason = %reason, records = records_seen, "shard exhausted");
                    return Ok(RunSummary {
                        records_seen,
                        actions_extracted,
                        stop_reason: StopReason::Exhausted(*reason),
                    });
                }
            };

            let batch = match self.poll_with_retry(&token, &mut shutdown).await? {
                Some(batch) => batch,
                None => {
                    return Ok(RunSummary {
                        records_seen,
                        actions_extracted,
                        stop_reason: StopReason::ShutdownRequested,
                    })
                }
            };

            for record in &batch.records {
                records_seen += 1;
                self.process_record(record, &mut actions_extracted);
            }

            let next = cursor.advance(&batch);

            // Empty poll against a live cursor: back off instead of
            // busy-spinning against the service.
            if batch.records.is_empty() && !next.is_exhausted() {
                debug!("empty poll, backing off");
                if wait_or_shutdown(self.config.poll.idle_backoff, &mut shutdown).await {
                    return Ok(RunSummary {
                        records_seen,
                        actions_extracted,
                        stop_reason: StopReason::ShutdownRequested,
                    });
                }
            }

            cursor = next;
        }
    }

    /// Decode one record and surface its fields and, when present, its
    /// action payload. Every failure here is scoped to this record; siblings
    /// in the same batch are unaffected.
    fn process_record(&mut self, record: &RawRecord, actions_extracted: &mut u64) {
        let fields = match decode_record(&record.data) {
            Ok(fields) => fields,
            Err(e) => {
                warn!(
                    sequence = %record.sequence_number,
                    error = %e,
                    "abandoning undecodable record"
                );
                return;
            }
        };

        if fields.is_empty() {
            // Non-struct top level or an empty top-level struct: either way
            // there is nothing to surface.
            debug!(
                sequence = %record.sequence_number,
                "record has no decodable top-level fields, skipping"
            );
            return;
        }

        emit_fields(self.sink.as_mut(), &fields);

        match extract_action(&fields) {
            Some(Ok(action)) => {
                *actions_extracted += 1;
                self.sink.action(&action);
            }
            Some(Err(e)) => {
                warn!(
                    sequence = %record.sequence_number,
                    error = %e,
                    "payload struct does not match action schema"
                );
            }
            None => {}
        }
    }

    /// Shard-cursor acquisition can be transiently throttled, so failures
    /// retry with capped exponential backoff before becoming fatal.
    /// `Ok(None)` means shutdown arrived while waiting.
    async fn acquire_initial_cursor(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Option<String>, ConsumerError> {
        let retry = self.config.poll.retry.clone();
        let mut attempt = 0u32;

        loop {
            if *shutdown.borrow() {
                return Ok(None);
            }

            match self
                .service
                .get_initial_cursor(&self.config.shard.id, self.config.shard.start)
                .await
            {
                Ok(token) => {
                    info!(shard_id = %self.config.shard.id, "obtained initial cursor");
                    return Ok(Some(token));
                }
                Err(e) if e.is_retryable() && attempt + 1 < retry.max_attempts => {
                    attempt += 1;
                    let delay = backoff_delay(attempt, &retry);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "initial cursor request failed, retrying"
                    );
                    if wait_or_shutdown(delay, shutdown).await {
                        return Ok(None);
                    }
                }
                Err(e) => {
                    error!(error = %e, "giving up on initial cursor");
                    return Err(ConsumerError::CursorUnavailable(e));
                }
            }
        }
    }

    /// Poll one batch, retrying retryable failures with the same cursor.
    /// `Ok(None)` means shutdown arrived while waiting.
    async fn poll_with_retry(
        &self,
        cursor: &str,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Option<RecordBatch>, ConsumerError> {
        let retry = self.config.poll.retry.clone();
        let mut attempt = 0u32;

        loop {
            if *shutdown.borrow() {
                return Ok(None);
            }

            match self
                .service
                .get_records_batch(cursor, self.config.poll.max_records)
                .await
            {
                Ok(batch) => {
                    debug!(
                        records = batch.records.len(),
                        lag_ms = batch.millis_behind_latest,
                        "received batch"
                    );
                    return Ok(Some(batch));
                }
                Err(e) if e.is_retryable() && attempt + 1 < retry.max_attempts => {
                    attempt += 1;
                    let delay = backoff_delay(attempt, &retry);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "poll failed, retrying"
                    );
                    if wait_or_shutdown(delay, shutdown).await {
                        return Ok(None);
                    }
                }
                Err(e) => {
                    error!(error = %e, "poll failed with non-retryable error");
                    return Err(ConsumerError::PollFailure(e));
                }
            }
        }
    }
}

/// Exponential backoff with up to 25% jitter, capped at the configured max.
fn backoff_delay(attempt: u32, retry: &RetryConfig) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    let base = retry
        .initial_backoff
        .saturating_mul(1u32 << exp)
        .min(retry.max_backoff);
    let jitter = rand::thread_rng().gen_range(0.0..=0.25);
    base.mul_f64(1.0 + jitter).min(retry.max_backoff)
}

/// Sleep, racing the shutdown signal. Returns true if shutdown was
/// requested before the delay elapsed.
async fn wait_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let deadline = tokio::time::Instant::now() + delay;
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => return false,
            changed = shutdown.changed() => match changed {
                Ok(()) if *shutdown.borrow() => return true,
                // Spurious change or dropped sender: keep waiting out the
                // original deadline.
                Ok(()) => continue,
                Err(_) => {
                    sleep(deadline.saturating_duration_since(tokio::time::Instant::now())).await;
                    return false;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retry_config() -> RetryConfig {
        RetryConfig {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(30),
        }
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let retry = retry_config();
        let first = backoff_delay(1, &retry);
        assert!(first >= Duration::from_millis(200));
        assert!(first <= Duration::from_millis(250));

        let deep = backoff_delay(30, &retry);
        assert_eq!(deep, retry.max_backoff);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_or_shutdown_elapses() {
        let (_tx, mut rx) = watch::channel(false);
        let start = tokio::time::Instant::now();
        let interrupted = wait_or_shutdown(Duration::from_secs(1), &mut rx).await;
        assert!(!interrupted);
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_or_shutdown_interrupted() {
        let (tx, mut rx) = watch::channel(false);
        let wait = tokio::spawn(async move {
            wait_or_shutdown(Duration::from_secs(3600), &mut rx).await
        });
        tx.send(true).unwrap();
        assert!(wait.await.unwrap());
    }
}
