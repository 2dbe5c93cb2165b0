//! Shop item entity - Catalog entry that can be bought with the currency.
//!
//! Items with no `guild_id` are global. Kind-specific parameters live in
//! `metadata` (see `core::shop::validate_metadata`).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What an item does once owned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Time-limited XP multiplier
    #[sea_orm(string_value = "xp_boost")]
    XpBoost,
    /// Ticket for one extra waifu roll
    #[sea_orm(string_value = "waifu_reroll_ticket")]
    WaifuRerollTicket,
    /// Discord role granted for a limited time
    #[sea_orm(string_value = "temp_role")]
    TempRole,
    /// Colored nickname for a limited time
    #[sea_orm(string_value = "nick_color")]
    NickColor,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::XpBoost => "xp_boost",
            Self::WaifuRerollTicket => "waifu_reroll_ticket",
            Self::TempRole => "temp_role",
            Self::NickColor => "nick_color",
        };
        f.write_str(label)
    }
}

/// Shop item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shop_items")]
pub struct Model {
    /// Unique identifier for the item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning guild, `None` for global items
    pub guild_id: Option<String>,
    /// Display name
    pub name: String,
    /// Optional description shown in the catalog
    pub description: Option<String>,
    /// Behaviour of the item once owned
    pub kind: ItemKind,
    /// Unit price in whole currency units
    pub price: i64,
    /// Disabled items cannot be bought
    pub enabled: bool,
    /// Whether repeated units share one inventory row
    pub stackable: bool,
    /// Kind-specific parameters
    pub metadata: Json,
    /// When the item was created
    pub created_at: DateTimeUtc,
    /// When the item was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `ShopItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One item is referenced by many purchases
    #[sea_orm(has_many = "super::purchase::Entity")]
    Purchases,
}

impl Related<super::purchase::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchases.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
