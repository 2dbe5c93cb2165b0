//! User entity - A Discord user known to the economy.
//!
//! Rows are created lazily by `ensure_user` the first time a user takes part in
//! any economic interaction. Profile fields are display hints only.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Discord user ID (snowflake as string)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Last known username
    pub username: Option<String>,
    /// Last known avatar URL
    pub avatar_url: Option<String>,
    /// When the user was first seen
    pub created_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has exactly one wallet
    #[sea_orm(has_one = "super::wallet::Entity")]
    Wallet,
}

impl Related<super::wallet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
