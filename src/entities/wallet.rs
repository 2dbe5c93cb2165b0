//! Wallet entity - Per-user balance of the virtual currency.
//!
//! The balance is never negative. It is only mutated through relative
//! increments/decrements inside serializable transactions (see `core::ledger`).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Wallet database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    /// Owner's Discord user ID, one wallet per user
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    /// Current balance in whole currency units
    pub balance: i64,
    /// When the balance was last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Wallet and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each wallet belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
