//! Shared test utilities for the economy core.
//!
//! This module provides helpers for setting up an in-memory or file-backed
//! database and creating wallets, shop items and games with sensible defaults.

use crate::{
    core::{
        ledger::{self, ProfileHints},
        shop::{self, NewItem},
        txn::RetryPolicy,
    },
    entities::{CoinflipGame, ItemKind, coinflip_game, shop_item},
    errors::{Error, Result},
};
use chrono::Duration;
use sea_orm::{ConnectOptions, DatabaseConnection, DbErr, prelude::*, sea_query::Expr};
use std::path::PathBuf;

/// Creates an in-memory `SQLite` database with all tables initialized.
///
/// The pool holds exactly one connection so every query, including
/// concurrently running transactions, sees the same in-memory database.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = sea_orm::Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// A `SQLite` database file shared by a pool of several connections.
///
/// Unlike [`setup_test_db`], transactions running on different tasks really
/// contend for the write lock. The file is removed on drop.
pub struct FileTestDb {
    /// Pooled connection to the file
    pub db: DatabaseConnection,
    path: PathBuf,
}

impl Drop for FileTestDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm", "-journal"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

/// Creates a fresh database file in the temp directory with all tables
/// initialized and up to `max_connections` pooled connections.
pub async fn setup_file_test_db(max_connections: u32) -> Result<FileTestDb> {
    let path = std::env::temp_dir().join(format!("luazinha-test-{}.db", uuid::Uuid::new_v4()));
    let mut options = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
    options
        .max_connections(max_connections)
        .min_connections(1)
        .sqlx_logging(false);
    let db = sea_orm::Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok(FileTestDb { db, path })
}

/// Ensures `user_id` exists and credits it with `amount` through the ledger.
pub async fn fund(db: &DatabaseConnection, user_id: &str, amount: i64) -> Result<()> {
    ledger::ensure_user(db, user_id, &ProfileHints::default()).await?;
    ledger::admin_add(db, RetryPolicy::default(), user_id, amount, None, Some("test funding"))
        .await?
        .map_err(|e| Error::Database(DbErr::Custom(format!("funding {user_id}: {e}"))))?;
    Ok(())
}

/// A global, non-stackable reroll ticket with the given name and price.
#[must_use]
pub fn ticket_item(name: &str, price: i64) -> NewItem {
    NewItem {
        guild_id: None,
        name: name.to_string(),
        description: None,
        kind: ItemKind::WaifuRerollTicket,
        price,
        stackable: false,
        metadata: serde_json::json!({}),
    }
}

/// Inserts a catalog item, failing the test if it is rejected.
pub async fn create_test_item(db: &DatabaseConnection, item: NewItem) -> Result<shop_item::Model> {
    shop::create_item(db, item)
        .await?
        .map_err(|e| Error::Database(DbErr::Custom(format!("creating item: {e}"))))
}

/// Moves a game's creation time `age` into the past.
pub async fn backdate_game(db: &DatabaseConnection, game_id: &str, age: Duration) -> Result<()> {
    let game = CoinflipGame::find_by_id(game_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| Error::Database(DbErr::RecordNotFound(game_id.to_string())))?;

    CoinflipGame::update_many()
        .col_expr(
            coinflip_game::Column::CreatedAt,
            Expr::value(game.created_at - age),
        )
        .filter(coinflip_game::Column::Id.eq(game_id))
        .exec(db)
        .await?;
    Ok(())
}
