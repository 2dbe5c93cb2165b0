//! Ledger transaction entity - Append-only audit trail of balance changes.
//!
//! Every balance mutation writes exactly one row here in the same database
//! transaction, with `amount` equal to the applied delta. Rows are never
//! updated or deleted.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of balance-affecting event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    /// User-to-user transfer
    #[sea_orm(string_value = "transfer")]
    Transfer,
    /// Operator credit
    #[sea_orm(string_value = "admin_add")]
    AdminAdd,
    /// Operator debit
    #[sea_orm(string_value = "admin_remove")]
    AdminRemove,
    /// Stake taken from one side of a coinflip
    #[sea_orm(string_value = "coinflip_bet")]
    CoinflipBet,
    /// Pot paid to the coinflip winner
    #[sea_orm(string_value = "coinflip_payout")]
    CoinflipPayout,
    /// Debit for a shop purchase
    #[sea_orm(string_value = "shop_purchase")]
    ShopPurchase,
}

/// Ledger transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_transactions")]
pub struct Model {
    /// Unique identifier, monotonically increasing
    #[sea_orm(primary_key)]
    pub id: i64,
    /// What kind of event this row documents
    pub kind: LedgerKind,
    /// Positive amount moved
    pub amount: i64,
    /// Debited user, if any
    pub from_user_id: Option<String>,
    /// Credited user, if any
    pub to_user_id: Option<String>,
    /// Discord guild the event happened in
    pub guild_id: Option<String>,
    /// Free-text reason supplied by the caller
    pub reason: Option<String>,
    /// Structured context (game id, purchase id, role, ...)
    pub metadata: Option<Json>,
    /// When the row was written
    pub created_at: DateTimeUtc,
}

/// Ledger rows reference users by id only; no foreign keys are enforced.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
