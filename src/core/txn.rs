//! Serializable transaction helper with bounded retry.
//!
//! Every balance- or state-mutating operation in the economy runs its whole
//! read-then-write body through [`run_serializable`]. When the storage engine
//! reports a serialization conflict the transaction is rolled back and the body
//! is re-executed from scratch, including all of its reads, after a short
//! jittered pause, up to the attempt cap in [`RetryPolicy`]. Any other storage error propagates immediately.
//!
//! The body returns an [`Outcome`]: `Ok` commits, a business rejection rolls
//! back, so a rejected operation never leaves partial writes behind.

use crate::errors::{Error, Outcome, Result};
use rand::Rng;
use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseConnection, DatabaseTransaction, DbErr, IsolationLevel,
    TransactionTrait,
};
use std::{future::Future, pin::Pin, time::Duration};
use tracing::{debug, instrument, warn};

/// Boxed future returned by a transaction body, borrowing the transaction.
pub type TxnFuture<'c, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'c>>;

/// Error fragments reported by Postgres and `SQLite` for serialization conflicts.
const RETRYABLE_MESSAGES: [&str; 6] = [
    "could not serialize access",
    "40001",
    "deadlock detected",
    "40p01",
    "database is locked",
    "database table is locked",
];

/// Pause before the second attempt, grows linearly with each conflict.
const RETRY_BACKOFF: Duration = Duration::from_millis(2);

/// How many times a conflicting transaction is attempted before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Creates a policy; a cap of zero is treated as one attempt.
    #[must_use]
    pub const fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5)
    }
}

/// Returns true when `err` is a transient serialization conflict worth retrying.
#[must_use]
pub fn is_serialization_failure(err: &DbErr) -> bool {
    let message = err.to_string().to_lowercase();
    RETRYABLE_MESSAGES
        .iter()
        .any(|fragment| message.contains(fragment))
}

/// Runs `body` inside a serializable transaction, retrying on conflicts.
///
/// # Errors
/// Returns [`Error::RetriesExhausted`] when every attempt hit a serialization
/// conflict, or the first non-retryable error otherwise.
#[instrument(skip(db, body), fields(max_attempts = policy.max_attempts))]
pub async fn run_serializable<T, E, F>(
    db: &DatabaseConnection,
    policy: RetryPolicy,
    operation: &'static str,
    body: F,
) -> Result<Outcome<T, E>>
where
    F: for<'c> Fn(&'c DatabaseTransaction) -> TxnFuture<'c, Outcome<T, E>> + Send + Sync,
    T: Send,
    E: Send + std::fmt::Debug,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match run_once(db, &body).await {
            Err(Error::Database(err)) if is_serialization_failure(&err) => {
                if attempt >= policy.max_attempts {
                    warn!(operation, attempt, "serialization conflicts exhausted retries");
                    return Err(Error::RetriesExhausted {
                        attempts: attempt,
                        source: err,
                    });
                }
                warn!(operation, attempt, error = %err, "serialization conflict, retrying");
                let jitter = rand::thread_rng().gen_range(0..=u64::from(attempt));
                tokio::time::sleep(RETRY_BACKOFF * attempt + Duration::from_millis(jitter)).await;
            }
            other => return other,
        }
    }
}

async fn run_once<T, E, F>(db: &DatabaseConnection, body: &F) -> Result<Outcome<T, E>>
where
    F: for<'c> Fn(&'c DatabaseTransaction) -> TxnFuture<'c, Outcome<T, E>> + Send + Sync,
    T: Send,
    E: Send + std::fmt::Debug,
{
    // SQLite transactions are always serializable and reject an explicit level.
    let isolation = match db.get_database_backend() {
        DatabaseBackend::Sqlite => None,
        _ => Some(IsolationLevel::Serializable),
    };
    let txn = db.begin_with_config(isolation, None).await?;

    let outcome = body(&txn).await;
    match outcome {
        Ok(Ok(value)) => {
            txn.commit().await?;
            Ok(Ok(value))
        }
        Ok(Err(rejection)) => {
            debug!(?rejection, "transaction body rejected, rolling back");
            txn.rollback().await?;
            Ok(Err(rejection))
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                debug!(error = %rollback_err, "rollback after failure also failed");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::setup_test_db;
    use sea_orm::RuntimeErr;
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    fn locked() -> DbErr {
        DbErr::Exec(RuntimeErr::Internal("database is locked".to_string()))
    }

    #[test]
    fn test_is_serialization_failure() {
        assert!(is_serialization_failure(&locked()));
        assert!(is_serialization_failure(&DbErr::Query(RuntimeErr::Internal(
            "ERROR: could not serialize access due to read/write dependencies".to_string()
        ))));
        assert!(!is_serialization_failure(&DbErr::RecordNotFound(
            "wallet".to_string()
        )));
        assert!(!is_serialization_failure(&DbErr::Custom(
            "UNIQUE constraint failed".to_string()
        )));
    }

    #[test]
    fn test_zero_attempt_policy_is_one() {
        assert_eq!(RetryPolicy::new(0).max_attempts, 1);
        assert_eq!(RetryPolicy::default().max_attempts, 5);
    }

    #[tokio::test]
    async fn test_retries_until_success() -> Result<()> {
        let db = setup_test_db().await?;
        let calls = Arc::new(AtomicU32::new(0));

        let outcome: Outcome<u32, String> =
            run_serializable(&db, RetryPolicy::new(5), "test", |_txn| {
                let calls = Arc::clone(&calls);
                Box::pin(async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    let result: Result<Outcome<u32, String>> = if n < 3 {
                        Err(Error::Database(locked()))
                    } else {
                        Ok(Ok(n))
                    };
                    result
                })
            })
            .await?;

        assert_eq!(outcome, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_retries_exhausted() -> Result<()> {
        let db = setup_test_db().await?;
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<Outcome<(), String>> =
            run_serializable(&db, RetryPolicy::new(5), "test", |_txn| {
                let calls = Arc::clone(&calls);
                Box::pin(async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let result: Result<Outcome<(), String>> = Err(Error::Database(locked()));
                    result
                })
            })
            .await;

        assert!(matches!(
            result,
            Err(Error::RetriesExhausted { attempts: 5, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_non_retryable_error_propagates_immediately() -> Result<()> {
        let db = setup_test_db().await?;
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<Outcome<(), String>> =
            run_serializable(&db, RetryPolicy::new(5), "test", |_txn| {
                let calls = Arc::clone(&calls);
                Box::pin(async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let result: Result<Outcome<(), String>> =
                        Err(Error::Database(DbErr::Custom("boom".to_string())));
                    result
                })
            })
            .await;

        assert!(matches!(result, Err(Error::Database(DbErr::Custom(_)))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_business_rejection_is_not_retried() -> Result<()> {
        let db = setup_test_db().await?;
        let calls = Arc::new(AtomicU32::new(0));

        let outcome: Outcome<(), &'static str> =
            run_serializable(&db, RetryPolicy::new(5), "test", |_txn| {
                let calls = Arc::clone(&calls);
                Box::pin(async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let result: Result<Outcome<(), &'static str>> = Ok(Err("insufficient_funds"));
                    result
                })
            })
            .await?;

        assert_eq!(outcome, Err("insufficient_funds"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        Ok(())
    }
}
