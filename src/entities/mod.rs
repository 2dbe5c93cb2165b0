//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the economy tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod coinflip_game;
pub mod inventory_item;
pub mod ledger_transaction;
pub mod purchase;
pub mod shop_item;
pub mod user;
pub mod wallet;

// Re-export specific types to avoid conflicts
pub use coinflip_game::{
    CoinSide, CoinflipStatus, Column as CoinflipGameColumn, Entity as CoinflipGame,
    Model as CoinflipGameModel,
};
pub use inventory_item::{
    Column as InventoryItemColumn, Entity as InventoryItem, Model as InventoryItemModel,
};
pub use ledger_transaction::{
    Column as LedgerTransactionColumn, Entity as LedgerTransaction, LedgerKind,
    Model as LedgerTransactionModel,
};
pub use purchase::{Column as PurchaseColumn, Entity as Purchase, Model as PurchaseModel};
pub use shop_item::{Column as ShopItemColumn, Entity as ShopItem, ItemKind, Model as ShopItemModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
pub use wallet::{Column as WalletColumn, Entity as Wallet, Model as WalletModel};
