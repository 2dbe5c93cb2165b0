//! Database configuration module.
//!
//! This module handles database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs without hand-written SQL.

use crate::entities::{CoinflipGame, InventoryItem, LedgerTransaction, Purchase, ShopItem, User, Wallet};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/luazinha.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable, falling
/// back to a local `SQLite` file.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the configured database.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {database_url}");
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all economy tables if they do not exist yet.
///
/// Users are created before wallets so the wallet foreign key resolves, and
/// shop items before purchases before inventory items for the same reason.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, User).await?;
    create_table(db, &schema, Wallet).await?;
    create_table(db, &schema, LedgerTransaction).await?;
    create_table(db, &schema, CoinflipGame).await?;
    create_table(db, &schema, ShopItem).await?;
    create_table(db, &schema, Purchase).await?;
    create_table(db, &schema, InventoryItem).await?;

    info!("Database tables ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        CoinflipGameModel, InventoryItemModel, LedgerTransactionModel, PurchaseModel,
        ShopItemModel, UserModel, WalletModel,
    };
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<UserModel> = User::find().limit(1).all(&db).await?;
        let _: Vec<WalletModel> = Wallet::find().limit(1).all(&db).await?;
        let _: Vec<LedgerTransactionModel> = LedgerTransaction::find().limit(1).all(&db).await?;
        let _: Vec<CoinflipGameModel> = CoinflipGame::find().limit(1).all(&db).await?;
        let _: Vec<ShopItemModel> = ShopItem::find().limit(1).all(&db).await?;
        let _: Vec<PurchaseModel> = Purchase::find().limit(1).all(&db).await?;
        let _: Vec<InventoryItemModel> = InventoryItem::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}
