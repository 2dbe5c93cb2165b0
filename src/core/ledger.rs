//! Ledger business logic - Wallet balances and the append-only audit trail.
//!
//! This module owns every balance mutation in the economy. Mutations go through
//! [`run_serializable`], re-read the balance inside the transaction right
//! before writing, apply a relative increment/decrement, and write exactly one
//! [`ledger_transaction`] row per balance change with `amount` equal to the
//! applied delta. The transaction-scoped helpers (`ensure_wallet`,
//! `read_balance`, `apply_delta`, `record`) are shared with the coinflip and
//! shop engines so they mutate wallets the same way.

use crate::{
    core::txn::{RetryPolicy, run_serializable},
    entities::{LedgerKind, User, Wallet, ledger_transaction, user, wallet},
    errors::{Error, Outcome, Result},
};
use chrono::Utc;
use sea_orm::{
    Condition, DatabaseTransaction, DbErr, QueryOrder, QuerySelect, Set,
    prelude::*,
    sea_query::{Expr, OnConflict},
};
use thiserror::Error as ThisError;
use tracing::{debug, info, instrument};

/// Business-rule failures of ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum LedgerError {
    /// Amount was zero, negative or not a number
    #[error("amount must be a positive whole number")]
    InvalidAmount,
    /// Source wallet cannot cover the amount
    #[error("insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds {
        /// Freshly read balance
        balance: i64,
        /// Amount that was requested
        required: i64,
    },
    /// Sender and receiver are the same user
    #[error("cannot transfer to yourself")]
    SameUser,
    /// Credit would overflow the balance column
    #[error("balance would overflow")]
    BalanceOverflow,
}

impl LedgerError {
    /// Stable snake_case code for callers and logs.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidAmount => "invalid_amount",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::SameUser => "same_user",
            Self::BalanceOverflow => "balance_overflow",
        }
    }
}

/// Optional profile data refreshed by [`ensure_user`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileHints {
    /// Current username
    pub username: Option<String>,
    /// Current avatar URL
    pub avatar_url: Option<String>,
}

/// Result of a successful transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    /// Sender balance after the transfer
    pub from_balance: i64,
    /// Receiver balance after the transfer
    pub to_balance: i64,
    /// Ledger row documenting the transfer
    pub transaction_id: i64,
}

/// Result of a successful operator credit or debit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceReceipt {
    /// Balance after the operation
    pub balance: i64,
    /// Ledger row documenting the operation
    pub transaction_id: i64,
}

/// A ledger row to be written alongside a balance change.
#[derive(Debug, Clone)]
pub(crate) struct LedgerEntry {
    pub kind: LedgerKind,
    pub amount: i64,
    pub from_user_id: Option<String>,
    pub to_user_id: Option<String>,
    pub guild_id: Option<String>,
    pub reason: Option<String>,
    pub metadata: Option<Json>,
}

impl LedgerEntry {
    pub(crate) const fn new(kind: LedgerKind, amount: i64) -> Self {
        Self {
            kind,
            amount,
            from_user_id: None,
            to_user_id: None,
            guild_id: None,
            reason: None,
            metadata: None,
        }
    }
}

/// Parses a user-supplied amount made only of decimal digits.
///
/// Signs, separators, decimals, zero and values beyond `i64` are rejected with
/// [`LedgerError::InvalidAmount`].
pub fn parse_amount(input: &str) -> Outcome<i64, LedgerError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LedgerError::InvalidAmount);
    }
    match trimmed.parse::<i64>() {
        Ok(amount) if amount > 0 => Ok(amount),
        _ => Err(LedgerError::InvalidAmount),
    }
}

/// Creates the user and wallet rows if they do not exist yet.
///
/// Works on a plain connection or inside an open transaction.
pub(crate) async fn ensure_wallet<C>(conn: &C, user_id: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    User::insert(user::ActiveModel {
        id: Set(user_id.to_string()),
        username: Set(None),
        avatar_url: Set(None),
        created_at: Set(now),
    })
    .on_conflict(OnConflict::column(user::Column::Id).do_nothing().to_owned())
    .exec_without_returning(conn)
    .await?;

    Wallet::insert(wallet::ActiveModel {
        user_id: Set(user_id.to_string()),
        balance: Set(0),
        updated_at: Set(now),
    })
    .on_conflict(
        OnConflict::column(wallet::Column::UserId)
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;

    Ok(())
}

/// Reads the current balance, `None` when the user has no wallet.
pub(crate) async fn read_balance<C>(conn: &C, user_id: &str) -> Result<Option<i64>>
where
    C: ConnectionTrait,
{
    Ok(Wallet::find_by_id(user_id.to_string())
        .one(conn)
        .await?
        .map(|w| w.balance))
}

/// Applies `delta` to a wallet with a single relative UPDATE and returns the
/// new balance.
///
/// Debits are additionally guarded by `balance >= -delta` in the WHERE clause;
/// callers check sufficiency first, so a guard miss is a storage-level fault.
pub(crate) async fn apply_delta<C>(conn: &C, user_id: &str, delta: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    let mut update = Wallet::update_many()
        .col_expr(
            wallet::Column::Balance,
            Expr::col(wallet::Column::Balance).add(delta),
        )
        .col_expr(wallet::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(wallet::Column::UserId.eq(user_id));
    if delta < 0 {
        update = update.filter(wallet::Column::Balance.gte(-delta));
    }

    let result = update.exec(conn).await?;
    if result.rows_affected != 1 {
        return Err(Error::Database(DbErr::RecordNotUpdated));
    }

    read_balance(conn, user_id)
        .await?
        .ok_or_else(|| Error::Database(DbErr::RecordNotFound(format!("wallet {user_id}"))))
}

/// Appends one audit row.
pub(crate) async fn record<C>(conn: &C, entry: LedgerEntry) -> Result<ledger_transaction::Model>
where
    C: ConnectionTrait,
{
    let row = ledger_transaction::ActiveModel {
        kind: Set(entry.kind),
        amount: Set(entry.amount),
        from_user_id: Set(entry.from_user_id),
        to_user_id: Set(entry.to_user_id),
        guild_id: Set(entry.guild_id),
        reason: Set(entry.reason),
        metadata: Set(entry.metadata),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    row.insert(conn).await.map_err(Into::into)
}

/// Returns the stored balance, or 0 when the user has no wallet.
///
/// Never creates a wallet.
pub async fn get_balance(db: &DatabaseConnection, user_id: &str) -> Result<i64> {
    Ok(read_balance(db, user_id).await?.unwrap_or(0))
}

/// Idempotently creates the user and a zero-balance wallet.
///
/// Provided profile hints overwrite the stored ones; absent hints leave them
/// untouched.
#[instrument(skip(db, hints))]
pub async fn ensure_user(db: &DatabaseConnection, user_id: &str, hints: &ProfileHints) -> Result<()> {
    let mut update_columns = Vec::new();
    if hints.username.is_some() {
        update_columns.push(user::Column::Username);
    }
    if hints.avatar_url.is_some() {
        update_columns.push(user::Column::AvatarUrl);
    }

    let mut on_conflict = OnConflict::column(user::Column::Id);
    if update_columns.is_empty() {
        on_conflict.do_nothing();
    } else {
        on_conflict.update_columns(update_columns);
    }

    User::insert(user::ActiveModel {
        id: Set(user_id.to_string()),
        username: Set(hints.username.clone()),
        avatar_url: Set(hints.avatar_url.clone()),
        created_at: Set(Utc::now()),
    })
    .on_conflict(on_conflict)
    .exec_without_returning(db)
    .await?;

    ensure_wallet(db, user_id).await
}

/// Moves `amount` from one wallet to another.
///
/// Input validation happens before any transaction is opened. Sufficiency is
/// checked against the balance read inside the transaction.
#[instrument(skip(db, reason))]
pub async fn transfer(
    db: &DatabaseConnection,
    retry: RetryPolicy,
    from_user_id: &str,
    to_user_id: &str,
    amount: i64,
    guild_id: Option<&str>,
    reason: Option<&str>,
) -> Result<Outcome<TransferReceipt, LedgerError>> {
    if amount <= 0 {
        return Ok(Err(LedgerError::InvalidAmount));
    }
    if from_user_id == to_user_id {
        return Ok(Err(LedgerError::SameUser));
    }

    let outcome = run_serializable(db, retry, "transfer", |txn| {
        Box::pin(transfer_in_txn(
            txn,
            from_user_id.to_string(),
            to_user_id.to_string(),
            amount,
            guild_id.map(str::to_string),
            reason.map(str::to_string),
        ))
    })
    .await?;

    match &outcome {
        Ok(receipt) => info!(
            from_user_id,
            to_user_id,
            amount,
            transaction_id = receipt.transaction_id,
            "transfer committed"
        ),
        Err(rejection) => debug!(code = rejection.code(), "transfer rejected"),
    }
    Ok(outcome)
}

async fn transfer_in_txn(
    txn: &DatabaseTransaction,
    from: String,
    to: String,
    amount: i64,
    guild_id: Option<String>,
    reason: Option<String>,
) -> Result<Outcome<TransferReceipt, LedgerError>> {
    ensure_wallet(txn, &from).await?;
    ensure_wallet(txn, &to).await?;

    let from_balance = read_balance(txn, &from).await?.unwrap_or(0);
    if from_balance < amount {
        return Ok(Err(LedgerError::InsufficientFunds {
            balance: from_balance,
            required: amount,
        }));
    }
    let to_balance = read_balance(txn, &to).await?.unwrap_or(0);
    if to_balance.checked_add(amount).is_none() {
        return Ok(Err(LedgerError::BalanceOverflow));
    }

    let from_balance = apply_delta(txn, &from, -amount).await?;
    let to_balance = apply_delta(txn, &to, amount).await?;
    let row = record(
        txn,
        LedgerEntry {
            from_user_id: Some(from),
            to_user_id: Some(to),
            guild_id,
            reason,
            ..LedgerEntry::new(LedgerKind::Transfer, amount)
        },
    )
    .await?;

    Ok(Ok(TransferReceipt {
        from_balance,
        to_balance,
        transaction_id: row.id,
    }))
}

/// Unconditionally credits a wallet. Operator-only.
#[instrument(skip(db, reason))]
pub async fn admin_add(
    db: &DatabaseConnection,
    retry: RetryPolicy,
    user_id: &str,
    amount: i64,
    guild_id: Option<&str>,
    reason: Option<&str>,
) -> Result<Outcome<BalanceReceipt, LedgerError>> {
    admin_adjust(db, retry, user_id, amount, guild_id, reason, LedgerKind::AdminAdd).await
}

/// Debits a wallet if it can cover the amount. Operator-only.
#[instrument(skip(db, reason))]
pub async fn admin_remove(
    db: &DatabaseConnection,
    retry: RetryPolicy,
    user_id: &str,
    amount: i64,
    guild_id: Option<&str>,
    reason: Option<&str>,
) -> Result<Outcome<BalanceReceipt, LedgerError>> {
    admin_adjust(db, retry, user_id, amount, guild_id, reason, LedgerKind::AdminRemove).await
}

async fn admin_adjust(
    db: &DatabaseConnection,
    retry: RetryPolicy,
    user_id: &str,
    amount: i64,
    guild_id: Option<&str>,
    reason: Option<&str>,
    kind: LedgerKind,
) -> Result<Outcome<BalanceReceipt, LedgerError>> {
    if amount <= 0 {
        return Ok(Err(LedgerError::InvalidAmount));
    }
    let operation = if kind == LedgerKind::AdminAdd {
        "admin_add"
    } else {
        "admin_remove"
    };

    let outcome = run_serializable(db, retry, operation, |txn| {
        Box::pin(admin_adjust_in_txn(
            txn,
            user_id.to_string(),
            amount,
            kind,
            guild_id.map(str::to_string),
            reason.map(str::to_string),
        ))
    })
    .await?;

    if let Ok(receipt) = &outcome {
        info!(user_id, amount, operation, balance = receipt.balance, "balance adjusted");
    }
    Ok(outcome)
}

async fn admin_adjust_in_txn(
    txn: &DatabaseTransaction,
    user_id: String,
    amount: i64,
    kind: LedgerKind,
    guild_id: Option<String>,
    reason: Option<String>,
) -> Result<Outcome<BalanceReceipt, LedgerError>> {
    ensure_wallet(txn, &user_id).await?;
    let balance = read_balance(txn, &user_id).await?.unwrap_or(0);

    let (delta, entry) = if kind == LedgerKind::AdminAdd {
        if balance.checked_add(amount).is_none() {
            return Ok(Err(LedgerError::BalanceOverflow));
        }
        let entry = LedgerEntry {
            to_user_id: Some(user_id.clone()),
            ..LedgerEntry::new(kind, amount)
        };
        (amount, entry)
    } else {
        if balance < amount {
            return Ok(Err(LedgerError::InsufficientFunds {
                balance,
                required: amount,
            }));
        }
        let entry = LedgerEntry {
            from_user_id: Some(user_id.clone()),
            ..LedgerEntry::new(kind, amount)
        };
        (-amount, entry)
    };

    let balance = apply_delta(txn, &user_id, delta).await?;
    let row = record(
        txn,
        LedgerEntry {
            guild_id,
            reason,
            ..entry
        },
    )
    .await?;

    Ok(Ok(BalanceReceipt {
        balance,
        transaction_id: row.id,
    }))
}

/// Newest-first ledger rows where the user sent or received currency.
pub async fn recent_transactions(
    db: &DatabaseConnection,
    user_id: &str,
    limit: u64,
) -> Result<Vec<ledger_transaction::Model>> {
    crate::entities::LedgerTransaction::find()
        .filter(
            Condition::any()
                .add(ledger_transaction::Column::FromUserId.eq(user_id))
                .add(ledger_transaction::Column::ToUserId.eq(user_id)),
        )
        .order_by_desc(ledger_transaction::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Wallets with a positive balance, richest first.
pub async fn top_balances(db: &DatabaseConnection, limit: u64) -> Result<Vec<wallet::Model>> {
    Wallet::find()
        .filter(wallet::Column::Balance.gt(0))
        .order_by_desc(wallet::Column::Balance)
        .order_by_asc(wallet::Column::UserId)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::LedgerTransaction;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase, PaginatorTrait};

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("150"), Ok(150));
        assert_eq!(parse_amount("  42 "), Ok(42));
        assert_eq!(parse_amount("0"), Err(LedgerError::InvalidAmount));
        assert_eq!(parse_amount("-5"), Err(LedgerError::InvalidAmount));
        assert_eq!(parse_amount("+5"), Err(LedgerError::InvalidAmount));
        assert_eq!(parse_amount("1.5"), Err(LedgerError::InvalidAmount));
        assert_eq!(parse_amount("1,000"), Err(LedgerError::InvalidAmount));
        assert_eq!(parse_amount(""), Err(LedgerError::InvalidAmount));
        assert_eq!(
            parse_amount("99999999999999999999999"),
            Err(LedgerError::InvalidAmount)
        );
    }

    #[tokio::test]
    async fn test_transfer_validation_happens_before_storage() -> Result<()> {
        // Any query against this mock would fail, so these must reject up front
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let retry = RetryPolicy::default();

        let zero = transfer(&db, retry, "a", "b", 0, None, None).await?;
        assert_eq!(zero, Err(LedgerError::InvalidAmount));

        let negative = transfer(&db, retry, "a", "b", -10, None, None).await?;
        assert_eq!(negative, Err(LedgerError::InvalidAmount));

        let same = transfer(&db, retry, "a", "a", 10, None, None).await?;
        assert_eq!(same, Err(LedgerError::SameUser));

        let admin = admin_remove(&db, retry, "a", 0, None, None).await?;
        assert_eq!(admin, Err(LedgerError::InvalidAmount));
        Ok(())
    }

    #[tokio::test]
    async fn test_get_balance_does_not_create_wallet() -> Result<()> {
        let db = setup_test_db().await?;

        assert_eq!(get_balance(&db, "ghost").await?, 0);
        assert!(Wallet::find_by_id("ghost".to_string()).one(&db).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_user_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let hints = ProfileHints {
            username: Some("alice".to_string()),
            avatar_url: None,
        };

        ensure_user(&db, "alice", &hints).await?;
        fund(&db, "alice", 50).await?;
        ensure_user(&db, "alice", &ProfileHints::default()).await?;

        // Balance survives the second call, username is kept
        assert_eq!(get_balance(&db, "alice").await?, 50);
        let stored = User::find_by_id("alice".to_string()).one(&db).await?.unwrap();
        assert_eq!(stored.username.as_deref(), Some("alice"));

        let renamed = ProfileHints {
            username: Some("alice2".to_string()),
            avatar_url: None,
        };
        ensure_user(&db, "alice", &renamed).await?;
        let stored = User::find_by_id("alice".to_string()).one(&db).await?.unwrap();
        assert_eq!(stored.username.as_deref(), Some("alice2"));
        assert_eq!(Wallet::find().count(&db).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_moves_funds_and_writes_one_row() -> Result<()> {
        let db = setup_test_db().await?;
        fund(&db, "alice", 100).await?;
        ensure_user(&db, "bob", &ProfileHints::default()).await?;
        let rows_before = LedgerTransaction::find().count(&db).await?;

        let receipt = transfer(
            &db,
            RetryPolicy::default(),
            "alice",
            "bob",
            40,
            Some("guild"),
            Some("lunch"),
        )
        .await?
        .unwrap();

        assert_eq!(receipt.from_balance, 60);
        assert_eq!(receipt.to_balance, 40);
        assert_eq!(LedgerTransaction::find().count(&db).await?, rows_before + 1);

        let row = LedgerTransaction::find_by_id(receipt.transaction_id)
            .one(&db)
            .await?
            .unwrap();
        assert_eq!(row.kind, LedgerKind::Transfer);
        assert_eq!(row.amount, 40);
        assert_eq!(row.from_user_id.as_deref(), Some("alice"));
        assert_eq!(row.to_user_id.as_deref(), Some("bob"));
        assert_eq!(row.guild_id.as_deref(), Some("guild"));
        assert_eq!(row.reason.as_deref(), Some("lunch"));
        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_insufficient_funds_changes_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        fund(&db, "alice", 30).await?;
        ensure_user(&db, "bob", &ProfileHints::default()).await?;
        let rows_before = LedgerTransaction::find().count(&db).await?;

        let outcome = transfer(&db, RetryPolicy::default(), "alice", "bob", 31, None, None).await?;

        assert_eq!(
            outcome,
            Err(LedgerError::InsufficientFunds {
                balance: 30,
                required: 31
            })
        );
        assert_eq!(get_balance(&db, "alice").await?, 30);
        assert_eq!(get_balance(&db, "bob").await?, 0);
        assert_eq!(LedgerTransaction::find().count(&db).await?, rows_before);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_transfers_cannot_overdraw() -> Result<()> {
        let db = setup_test_db().await?;
        fund(&db, "alice", 100).await?;
        ensure_user(&db, "bob", &ProfileHints::default()).await?;
        ensure_user(&db, "carol", &ProfileHints::default()).await?;
        let retry = RetryPolicy::default();

        let (first, second) = tokio::join!(
            transfer(&db, retry, "alice", "bob", 60, None, None),
            transfer(&db, retry, "alice", "carol", 60, None, None),
        );
        let outcomes = [first?, second?];

        let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
        assert_eq!(succeeded, 1);
        assert!(outcomes.iter().any(|o| matches!(
            o,
            Err(LedgerError::InsufficientFunds { balance: 40, required: 60 })
        )));

        // Closed system: no money created or destroyed
        let alice = get_balance(&db, "alice").await?;
        let bob = get_balance(&db, "bob").await?;
        let carol = get_balance(&db, "carol").await?;
        assert_eq!(alice, 40);
        assert_eq!(alice + bob + carol, 100);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_transfers_on_pooled_connections() -> Result<()> {
        let file = setup_file_test_db(8).await?;
        let db = file.db.clone();
        fund(&db, "alice", 100).await?;
        ensure_user(&db, "bob", &ProfileHints::default()).await?;
        let retry = RetryPolicy::new(50);

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let db = db.clone();
                tokio::spawn(async move {
                    transfer(&db, retry, "alice", "bob", 30, None, Some("rush")).await
                })
            })
            .collect();
        let mut outcomes = Vec::new();
        for handle in handles {
            // Every task must finish with a business outcome, never a storage error
            outcomes.push(handle.await.unwrap()?);
        }

        assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 3);
        assert!(outcomes.iter().filter(|o| o.is_err()).all(|o| matches!(
            o,
            Err(LedgerError::InsufficientFunds { balance: 10, required: 30 })
        )));

        let alice = get_balance(&db, "alice").await?;
        let bob = get_balance(&db, "bob").await?;
        assert_eq!(alice, 10);
        assert_eq!(alice + bob, 100);
        let transfers = LedgerTransaction::find()
            .filter(ledger_transaction::Column::Kind.eq(LedgerKind::Transfer))
            .count(&db)
            .await?;
        assert_eq!(transfers, 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_admin_add_and_remove() -> Result<()> {
        let db = setup_test_db().await?;
        let retry = RetryPolicy::default();

        let added = admin_add(&db, retry, "dave", 500, None, Some("event prize"))
            .await?
            .unwrap();
        assert_eq!(added.balance, 500);

        let removed = admin_remove(&db, retry, "dave", 200, None, None)
            .await?
            .unwrap();
        assert_eq!(removed.balance, 300);

        let too_much = admin_remove(&db, retry, "dave", 301, None, None).await?;
        assert_eq!(
            too_much,
            Err(LedgerError::InsufficientFunds {
                balance: 300,
                required: 301
            })
        );
        assert_eq!(get_balance(&db, "dave").await?, 300);

        let rows = recent_transactions(&db, "dave", 10).await?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].kind, LedgerKind::AdminRemove);
        assert_eq!(rows[0].amount, 200);
        assert_eq!(rows[0].from_user_id.as_deref(), Some("dave"));
        assert_eq!(rows[1].kind, LedgerKind::AdminAdd);
        assert_eq!(rows[1].to_user_id.as_deref(), Some("dave"));
        Ok(())
    }

    #[tokio::test]
    async fn test_admin_add_overflow_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        fund(&db, "rich", i64::MAX - 1).await?;

        let outcome = admin_add(&db, RetryPolicy::default(), "rich", 2, None, None).await?;
        assert_eq!(outcome, Err(LedgerError::BalanceOverflow));
        assert_eq!(get_balance(&db, "rich").await?, i64::MAX - 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_top_balances_orders_richest_first() -> Result<()> {
        let db = setup_test_db().await?;
        fund(&db, "a", 10).await?;
        fund(&db, "b", 30).await?;
        fund(&db, "c", 20).await?;
        ensure_user(&db, "broke", &ProfileHints::default()).await?;

        let top = top_balances(&db, 2).await?;
        let ids: Vec<_> = top.iter().map(|w| w.user_id.as_str()).collect();
        assert_eq!(ids, ["b", "c"]);
        Ok(())
    }
}
