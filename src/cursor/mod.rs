use crate::service::RecordBatch;
use std::fmt;

/// Read position within one shard. Replaced after every poll, never mutated
/// in place; once exhausted it stays exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShardCursor {
    Active(String),
    Exhausted(ExhaustReason),
}

/// Why a shard walk stopped. Kept as distinct outcomes so the stop reason
/// survives into logs and the run summary instead of collapsing into one
/// terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustReason {
    /// The service reported zero lag behind the log's tip.
    CaughtUp,
    /// The service returned no next cursor: true end-of-shard.
    ShardClosed,
    /// The next cursor was byte-identical to the one just used.
    Stalled,
}

impl fmt::Display for ExhaustReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExhaustReason::CaughtUp => write!(f, "caught up with log tip"),
            ExhaustReason::ShardClosed => write!(f, "shard closed"),
            ExhaustReason::Stalled => write!(f, "cursor stalled"),
        }
    }
}

impl ShardCursor {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, ShardCursor::Exhausted(_))
    }

    /// Compute the cursor to use after a successful poll. Pure; the service
    /// calls themselves live with the poll loop.
    ///
    /// Decision order: missing or self-referential next cursor terminates,
    /// then zero reported lag terminates ("caught up, stop" is policy, not
    /// an error), otherwise the walk continues from the returned token.
    pub fn advance(&self, batch: &RecordBatch) -> ShardCursor {
        let current = match self {
            ShardCursor::Active(token) => token,
            ShardCursor::Exhausted(_) => return self.clone(),
        };

        let next = match &batch.next_cursor {
            None => return ShardCursor::Exhausted(ExhaustReason::ShardClosed),
            Some(next) if next == current => {
                return ShardCursor::Exhausted(ExhaustReason::Stalled)
            }
            Some(next) => next,
        };

        if batch.millis_behind_latest == Some(0) {
            return ShardCursor::Exhausted(ExhaustReason::CaughtUp);
        }

        ShardCursor::Active(next.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::RawRecord;

    fn batch(next: Option<&str>, lag: Option<i64>) -> RecordBatch {
        RecordBatch {
            records: Vec::new(),
            next_cursor: next.map(|s| s.to_string()),
            millis_behind_latest: lag,
        }
    }

    #[test]
    fn test_advance_continues_with_new_token() {
        let cursor = ShardCursor::Active("a".to_string());
        let next = cursor.advance(&batch(Some("b"), Some(5000)));
        assert_eq!(next, ShardCursor::Active("b".to_string()));
    }

    #[test]
    fn test_missing_next_cursor_closes_shard() {
        let cursor = ShardCursor::Active("a".to_string());
        let next = cursor.advance(&batch(None, Some(5000)));
        assert_eq!(next, ShardCursor::Exhausted(ExhaustReason::ShardClosed));
    }

    #[test]
    fn test_identical_next_cursor_stalls() {
        let cursor = ShardCursor::Active("a".to_string());
        let next = cursor.advance(&batch(Some("a"), Some(5000)));
        assert_eq!(next, ShardCursor::Exhausted(ExhaustReason::Stalled));
    }

    #[test]
    fn test_zero_lag_terminates() {
        let cursor = ShardCursor::Active("a".to_string());
        let next = cursor.advance(&batch(Some("b"), Some(0)));
        assert_eq!(next, ShardCursor::Exhausted(ExhaustReason::CaughtUp));
    }

    #[test]
    fn test_zero_lag_terminates_even_with_records() {
        let cursor = ShardCursor::Active("a".to_string());
        let mut b = batch(Some("b"), Some(0));
        b.records.push(RawRecord {
            sequence_number: "1".to_string(),
            data: vec![0x01],
        });
        assert_eq!(
            cursor.advance(&b),
            ShardCursor::Exhausted(ExhaustReason::CaughtUp)
        );
    }

    #[test]
    fn test_stall_takes_precedence_over_lag() {
        // A self-referential cursor terminates as stalled even when the
        // service also reports zero lag.
        let cursor = ShardCursor::Active("a".to_string());
        let next = cursor.advance(&batch(Some("a"), Some(0)));
        assert_eq!(next, ShardCursor::Exhausted(ExhaustReason::Stalled));
    }

    #[test]
    fn test_unknown_lag_continues() {
        let cursor = ShardCursor::Active("a".to_string());
        let next = cursor.advance(&batch(Some("b"), None));
        assert_eq!(next, ShardCursor::Active("b".to_string()));
    }

    #[test]
    fn test_exhausted_stays_exhausted() {
        let cursor = ShardCursor::Exhausted(ExhaustReason::CaughtUp);
        let next = cursor.advance(&batch(Some("b"), Some(5000)));
        assert_eq!(next, cursor);
    }
}
