//! Shop business logic - Catalog management and the purchase pipeline.
//!
//! A purchase is one serializable transaction: the item is re-read (scoped to
//! global or the buyer's guild), the total is computed here from the stored
//! price, the wallet is debited, and the `Purchase` row, the inventory rows and
//! the `shop_purchase` ledger row are written together. Stackable items
//! materialize one row holding the whole quantity; other items get one row
//! per unit so each can be activated and expire on its own.

use crate::{
    config::economy::{EconomyConfig, ShopItemConfig},
    core::{
        ledger::{self, LedgerEntry},
        txn::{RetryPolicy, run_serializable},
    },
    entities::{ItemKind, LedgerKind, ShopItem, inventory_item, purchase, shop_item},
    errors::{Error, Outcome, Result},
};
use chrono::{Duration, Utc};
use sea_orm::{Condition, DatabaseTransaction, QueryOrder, Set, prelude::*};
use serde_json::json;
use thiserror::Error as ThisError;
use tracing::{debug, info, instrument};

/// Longest effect duration accepted in item metadata (ten years).
const MAX_DURATION_MINUTES: f64 = 5_256_000.0;

/// Business-rule failures of shop operations.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ShopError {
    /// Quantity outside the accepted range
    #[error("quantity must be between 1 and {max}")]
    InvalidQuantity {
        /// Largest accepted quantity
        max: i32,
    },
    /// No item with that id visible from this guild
    #[error("item not found")]
    ItemNotFound,
    /// Item exists but cannot be bought right now
    #[error("item is not available")]
    ItemDisabled,
    /// Wallet cannot cover the total
    #[error("insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds {
        /// Freshly read balance
        balance: i64,
        /// Computed total
        required: i64,
    },
    /// Price is negative or the total does not fit
    #[error("invalid price")]
    InvalidPrice,
    /// Kind-specific metadata is missing or malformed
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),
}

impl ShopError {
    /// Stable snake_case code for callers and logs.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidQuantity { .. } => "invalid_quantity",
            Self::ItemNotFound => "item_not_found",
            Self::ItemDisabled => "item_disabled",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::InvalidPrice => "invalid_price",
            Self::InvalidMetadata(_) => "invalid_metadata",
        }
    }
}

/// Decoded, validated item metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemEffect {
    /// XP multiplier for a duration
    XpBoost {
        /// Factor applied to earned XP, always above 1
        multiplier: f64,
        /// How long the boost lasts
        duration: Duration,
    },
    /// Consumed one unit at a time
    RerollTicket,
    /// Role granted for a duration
    TempRole {
        /// Discord role id
        role_id: String,
        /// How long the role is kept
        duration: Duration,
    },
    /// Nickname color for a duration
    NickColor {
        /// `#RRGGBB`
        color: String,
        /// How long the color is kept
        duration: Duration,
    },
}

fn duration_minutes(metadata: &Json) -> std::result::Result<Duration, String> {
    let minutes = metadata
        .get("durationMinutes")
        .and_then(Json::as_f64)
        .ok_or("durationMinutes must be a number")?;
    if !minutes.is_finite() || minutes <= 0.0 || minutes > MAX_DURATION_MINUTES {
        return Err(format!(
            "durationMinutes must be greater than 0 and at most {MAX_DURATION_MINUTES}"
        ));
    }
    #[allow(clippy::cast_possible_truncation)]
    let millis = (minutes * 60_000.0).round() as i64;
    Ok(Duration::milliseconds(millis))
}

fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].bytes().all(|b| b.is_ascii_hexdigit())
}

/// Decodes the metadata contract of `kind`.
///
/// # Errors
/// Returns a human-readable description of the first problem found.
pub fn parse_effect(kind: ItemKind, metadata: &Json) -> std::result::Result<ItemEffect, String> {
    match kind {
        ItemKind::XpBoost => {
            let multiplier = metadata
                .get("multiplier")
                .and_then(Json::as_f64)
                .ok_or("multiplier must be a number")?;
            if !multiplier.is_finite() || multiplier <= 1.0 {
                return Err("multiplier must be greater than 1".to_string());
            }
            Ok(ItemEffect::XpBoost {
                multiplier,
                duration: duration_minutes(metadata)?,
            })
        }
        ItemKind::WaifuRerollTicket => Ok(ItemEffect::RerollTicket),
        ItemKind::TempRole => {
            let role_id = metadata
                .get("roleId")
                .and_then(Json::as_str)
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .ok_or("roleId must be a non-empty string")?;
            Ok(ItemEffect::TempRole {
                role_id: role_id.to_string(),
                duration: duration_minutes(metadata)?,
            })
        }
        ItemKind::NickColor => {
            let color = metadata
                .get("color")
                .and_then(Json::as_str)
                .filter(|c| is_hex_color(c))
                .ok_or("color must look like #RRGGBB")?;
            Ok(ItemEffect::NickColor {
                color: color.to_uppercase(),
                duration: duration_minutes(metadata)?,
            })
        }
    }
}

/// Checks metadata before an item is persisted.
pub fn validate_metadata(kind: ItemKind, metadata: &Json) -> Outcome<(), ShopError> {
    parse_effect(kind, metadata)
        .map(|_| ())
        .map_err(ShopError::InvalidMetadata)
}

/// Tunables for the shop.
#[derive(Debug, Clone, Copy)]
pub struct ShopSettings {
    /// Transaction retry cap
    pub retry: RetryPolicy,
    /// Largest quantity in one purchase
    pub max_quantity: i32,
}

impl Default for ShopSettings {
    fn default() -> Self {
        Self::from(&EconomyConfig::default())
    }
}

impl From<&EconomyConfig> for ShopSettings {
    fn from(config: &EconomyConfig) -> Self {
        Self {
            retry: RetryPolicy::new(config.max_attempts),
            max_quantity: config.max_purchase_quantity.max(1),
        }
    }
}

/// A new catalog entry.
#[derive(Debug, Clone)]
pub struct NewItem {
    /// Owning guild, `None` for global
    pub guild_id: Option<String>,
    /// Display name
    pub name: String,
    /// Catalog description
    pub description: Option<String>,
    /// Behaviour
    pub kind: ItemKind,
    /// Unit price
    pub price: i64,
    /// Whether units share one inventory row
    pub stackable: bool,
    /// Kind-specific parameters
    pub metadata: Json,
}

impl From<&ShopItemConfig> for NewItem {
    fn from(item: &ShopItemConfig) -> Self {
        Self {
            guild_id: item.guild_id.clone(),
            name: item.name.clone(),
            description: item.description.clone(),
            kind: item.kind,
            price: item.price,
            stackable: item.stackable,
            metadata: item.metadata.clone(),
        }
    }
}

/// A buy action.
#[derive(Debug, Clone)]
pub struct PurchaseRequest {
    /// Buyer
    pub user_id: String,
    /// Guild the purchase happens in
    pub guild_id: Option<String>,
    /// Item being bought
    pub shop_item_id: i64,
    /// Units to buy
    pub quantity: i32,
    /// Optional note stored on the ledger row
    pub reason: Option<String>,
}

/// Result of a successful purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseReceipt {
    /// Purchase row id
    pub purchase_id: i64,
    /// Inventory rows created
    pub inventory_item_ids: Vec<i64>,
    /// Wallet balance after the debit
    pub balance: i64,
    /// Amount charged
    pub total: i64,
}

/// Adds an item to the catalog after validating price and metadata.
#[instrument(skip(db, item), fields(name = %item.name, kind = %item.kind))]
pub async fn create_item(
    db: &DatabaseConnection,
    item: NewItem,
) -> Result<Outcome<shop_item::Model, ShopError>> {
    if item.price < 0 {
        return Ok(Err(ShopError::InvalidPrice));
    }
    if let Err(rejection) = validate_metadata(item.kind, &item.metadata) {
        return Ok(Err(rejection));
    }
    // A stacked row can only be activated once, which would swallow every other unit
    if item.stackable && item.kind != ItemKind::WaifuRerollTicket {
        return Ok(Err(ShopError::InvalidMetadata(format!(
            "{} items cannot be stackable",
            item.kind
        ))));
    }

    let now = Utc::now();
    let model = shop_item::ActiveModel {
        guild_id: Set(item.guild_id),
        name: Set(item.name),
        description: Set(item.description),
        kind: Set(item.kind),
        price: Set(item.price),
        enabled: Set(true),
        stackable: Set(item.stackable),
        metadata: Set(item.metadata),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(item_id = model.id, "shop item created");
    Ok(Ok(model))
}

/// Enables or disables an item.
pub async fn set_item_enabled(
    db: &DatabaseConnection,
    item_id: i64,
    enabled: bool,
) -> Result<Outcome<shop_item::Model, ShopError>> {
    let Some(item) = ShopItem::find_by_id(item_id).one(db).await? else {
        return Ok(Err(ShopError::ItemNotFound));
    };

    let mut active: shop_item::ActiveModel = item.into();
    active.enabled = Set(enabled);
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;

    info!(item_id, enabled, "shop item availability changed");
    Ok(Ok(updated))
}

fn visible_from(guild_id: Option<&str>) -> Condition {
    let global = Condition::any().add(shop_item::Column::GuildId.is_null());
    match guild_id {
        Some(guild) => global.add(shop_item::Column::GuildId.eq(guild)),
        None => global,
    }
}

/// Enabled items visible from `guild_id` (global ones included), cheapest first.
pub async fn list_items(
    db: &DatabaseConnection,
    guild_id: Option<&str>,
) -> Result<Vec<shop_item::Model>> {
    ShopItem::find()
        .filter(visible_from(guild_id))
        .filter(shop_item::Column::Enabled.eq(true))
        .order_by_asc(shop_item::Column::Price)
        .order_by_asc(shop_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Inserts configured catalog entries that are not present yet.
///
/// Items are matched by name and guild, so running this on every start is
/// safe. Returns how many items were inserted.
///
/// # Errors
/// Returns [`Error::Config`] for an entry with a negative price or bad metadata.
pub async fn seed_items(db: &DatabaseConnection, items: &[ShopItemConfig]) -> Result<usize> {
    let mut inserted = 0;
    for item in items {
        let guild_filter = match &item.guild_id {
            Some(guild) => shop_item::Column::GuildId.eq(guild.as_str()),
            None => shop_item::Column::GuildId.is_null(),
        };
        let existing = ShopItem::find()
            .filter(shop_item::Column::Name.eq(item.name.as_str()))
            .filter(guild_filter)
            .one(db)
            .await?;
        if existing.is_some() {
            debug!(name = %item.name, "shop item already present");
            continue;
        }

        if let Err(rejection) = create_item(db, NewItem::from(item)).await? {
            return Err(Error::Config {
                message: format!("shop item '{}': {rejection}", item.name),
            });
        }
        inserted += 1;
    }

    info!(inserted, configured = items.len(), "shop catalog seeded");
    Ok(inserted)
}

/// Buys `quantity` units of an item.
#[instrument(skip(db, settings, request), fields(user_id = %request.user_id, item_id = request.shop_item_id, quantity = request.quantity))]
pub async fn purchase(
    db: &DatabaseConnection,
    settings: &ShopSettings,
    request: PurchaseRequest,
) -> Result<Outcome<PurchaseReceipt, ShopError>> {
    if request.quantity < 1 || request.quantity > settings.max_quantity {
        return Ok(Err(ShopError::InvalidQuantity {
            max: settings.max_quantity,
        }));
    }

    let outcome = run_serializable(db, settings.retry, "shop_purchase", |txn| {
        Box::pin(purchase_in_txn(txn, request.clone()))
    })
    .await?;

    match &outcome {
        Ok(receipt) => info!(
            purchase_id = receipt.purchase_id,
            total = receipt.total,
            rows = receipt.inventory_item_ids.len(),
            "purchase committed"
        ),
        Err(rejection) => debug!(code = rejection.code(), "purchase rejected"),
    }
    Ok(outcome)
}

async fn purchase_in_txn(
    txn: &DatabaseTransaction,
    request: PurchaseRequest,
) -> Result<Outcome<PurchaseReceipt, ShopError>> {
    let PurchaseRequest {
        user_id,
        guild_id,
        shop_item_id,
        quantity,
        reason,
    } = request;

    ledger::ensure_wallet(txn, &user_id).await?;

    let Some(item) = ShopItem::find_by_id(shop_item_id)
        .filter(visible_from(guild_id.as_deref()))
        .one(txn)
        .await?
    else {
        return Ok(Err(ShopError::ItemNotFound));
    };
    if !item.enabled {
        return Ok(Err(ShopError::ItemDisabled));
    }

    let total = match item.price.checked_mul(i64::from(quantity)) {
        Some(total) if item.price >= 0 => total,
        _ => return Ok(Err(ShopError::InvalidPrice)),
    };
    let balance = ledger::read_balance(txn, &user_id).await?.unwrap_or(0);
    if balance < total {
        return Ok(Err(ShopError::InsufficientFunds {
            balance,
            required: total,
        }));
    }

    let balance = if total > 0 {
        ledger::apply_delta(txn, &user_id, -total).await?
    } else {
        balance
    };

    let now = Utc::now();
    let purchase_row = purchase::ActiveModel {
        user_id: Set(user_id.clone()),
        guild_id: Set(guild_id.clone()),
        shop_item_id: Set(item.id),
        quantity: Set(quantity),
        total: Set(total),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    let (rows, per_row) = if item.stackable {
        (1, quantity)
    } else {
        (quantity, 1)
    };
    let mut inventory_item_ids = Vec::new();
    for _ in 0..rows {
        let row = inventory_item::ActiveModel {
            user_id: Set(user_id.clone()),
            guild_id: Set(guild_id.clone()),
            purchase_id: Set(Some(purchase_row.id)),
            kind: Set(item.kind),
            name: Set(item.name.clone()),
            quantity: Set(per_row),
            used_quantity: Set(0),
            metadata: Set(item.metadata.clone()),
            activated_at: Set(None),
            expires_at: Set(None),
            revoked_at: Set(None),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        inventory_item_ids.push(row.id);
    }

    // Free items move no currency, so they leave no ledger row
    if total > 0 {
        ledger::record(
            txn,
            LedgerEntry {
                from_user_id: Some(user_id),
                guild_id,
                reason,
                metadata: Some(json!({
                    "shopItemId": item.id,
                    "purchaseId": purchase_row.id,
                    "itemName": item.name,
                    "kind": item.kind,
                    "quantity": quantity,
                    "unitPrice": item.price,
                })),
                ..LedgerEntry::new(LedgerKind::ShopPurchase, total)
            },
        )
        .await?;
    }

    Ok(Ok(PurchaseReceipt {
        purchase_id: purchase_row.id,
        inventory_item_ids,
        balance,
        total,
    }))
}
