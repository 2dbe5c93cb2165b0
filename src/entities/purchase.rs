//! Purchase entity - One buy action in the shop.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Purchase database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchases")]
pub struct Model {
    /// Unique identifier for the purchase
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Buyer
    pub user_id: String,
    /// Guild the purchase happened in
    pub guild_id: Option<String>,
    /// Item bought
    pub shop_item_id: i64,
    /// Units bought
    pub quantity: i32,
    /// Price times quantity, computed server-side
    pub total: i64,
    /// When the purchase was made
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Purchase and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each purchase references one shop item
    #[sea_orm(
        belongs_to = "super::shop_item::Entity",
        from = "Column::ShopItemId",
        to = "super::shop_item::Column::Id"
    )]
    ShopItem,
    /// One purchase materializes one or more inventory items
    #[sea_orm(has_many = "super::inventory_item::Entity")]
    InventoryItems,
}

impl Related<super::shop_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShopItem.def()
    }
}

impl Related<super::inventory_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
