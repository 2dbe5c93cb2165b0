//! Inventory item entity - Owned, consumable units.
//!
//! Invariants: `used_quantity <= quantity`, and once `activated_at` is set the
//! row can never be activated again. `revoked_at` is set at most once, after
//! the expired Discord effect was removed.

use super::shop_item::ItemKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Inventory item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    /// Unique identifier for the inventory row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner
    pub user_id: String,
    /// Guild the item is usable in, `None` for everywhere
    pub guild_id: Option<String>,
    /// Purchase that created this row
    pub purchase_id: Option<i64>,
    /// Item behaviour, copied from the shop item
    pub kind: ItemKind,
    /// Display name, copied from the shop item
    pub name: String,
    /// Units owned in this row
    pub quantity: i32,
    /// Units already consumed, never above `quantity`
    pub used_quantity: i32,
    /// Kind-specific parameters, copied from the shop item
    pub metadata: Json,
    /// When the item was activated
    pub activated_at: Option<DateTimeUtc>,
    /// When the activated effect ends
    pub expires_at: Option<DateTimeUtc>,
    /// When an expired role or color was taken back from the member
    pub revoked_at: Option<DateTimeUtc>,
    /// When the row was created
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Units that can still be consumed.
    #[must_use]
    pub const fn remaining(&self) -> i32 {
        self.quantity - self.used_quantity
    }
}

/// Defines relationships between `InventoryItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each inventory row may come from one purchase
    #[sea_orm(
        belongs_to = "super::purchase::Entity",
        from = "Column::PurchaseId",
        to = "super::purchase::Column::Id"
    )]
    Purchase,
}

impl Related<super::purchase::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchase.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
