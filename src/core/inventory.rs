//! Inventory business logic - One-shot activation of owned items.
//!
//! Every activation is a guarded transition inside its own serializable
//! transaction: the row must belong to the caller, be usable in the caller's
//! guild, still have an unused unit and never have been activated. Role and
//! nickname effects are applied through [`RoleEffects`] before the row is
//! updated; if Discord refuses, nothing is written. Once their timer ends,
//! [`revoke_expired_grants`] takes roles and colors back and marks the rows
//! revoked so each grant is undone exactly once.

use crate::{
    core::{
        shop::{ItemEffect, parse_effect},
        txn::{RetryPolicy, run_serializable},
    },
    entities::{InventoryItem, ItemKind, inventory_item},
    errors::{Outcome, Result},
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use sea_orm::{Condition, DatabaseTransaction, QueryOrder, prelude::*, sea_query::Expr};
use std::sync::Arc;
use thiserror::Error as ThisError;
use tracing::{debug, info, instrument, warn};

/// Platform side effects needed by role-like items.
#[async_trait]
pub trait RoleEffects: Send + Sync {
    /// Grants `role_id` to the member.
    async fn grant_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> std::result::Result<(), String>;

    /// Applies a `#RRGGBB` nickname color to the member.
    async fn apply_nick_color(
        &self,
        guild_id: &str,
        user_id: &str,
        color: &str,
    ) -> std::result::Result<(), String>;

    /// Removes `role_id` from the member.
    async fn revoke_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> std::result::Result<(), String>;

    /// Removes the `#RRGGBB` nickname color from the member.
    async fn remove_nick_color(
        &self,
        guild_id: &str,
        user_id: &str,
        color: &str,
    ) -> std::result::Result<(), String>;
}

/// Business-rule failures of inventory operations.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum InventoryError {
    /// No such item owned by the caller
    #[error("item not found in your inventory")]
    NotFound,
    /// Item belongs to another guild, or needs a guild and none was given
    #[error("this item can only be used in its own server")]
    NotInGuild,
    /// Every unit was consumed
    #[error("item already used")]
    AlreadyUsed,
    /// Item was activated before
    #[error("item is already active")]
    AlreadyActive,
    /// Item does not support this action
    #[error("a {actual} item cannot be used this way")]
    WrongKind {
        /// Kind of the stored item
        actual: ItemKind,
    },
    /// Stored metadata does not satisfy the kind's contract
    #[error("item metadata is invalid: {0}")]
    InvalidMetadata(String),
    /// Discord refused the side effect
    #[error("discord action failed: {0}")]
    DiscordActionFailed(String),
}

impl InventoryError {
    /// Stable snake_case code for callers and logs.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::NotInGuild => "not_in_guild",
            Self::AlreadyUsed => "already_used",
            Self::AlreadyActive => "already_active",
            Self::WrongKind { .. } => "wrong_kind",
            Self::InvalidMetadata(_) => "invalid_metadata",
            Self::DiscordActionFailed(_) => "discord_action_failed",
        }
    }
}

/// Who is using which item, and where.
#[derive(Debug, Clone)]
pub struct UseRequest {
    /// Caller
    pub user_id: String,
    /// Guild of the interaction
    pub guild_id: Option<String>,
    /// Inventory row
    pub inventory_item_id: i64,
}

/// State of an item after a successful activation or consumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationReceipt {
    /// Inventory row
    pub inventory_item_id: i64,
    /// Item kind
    pub kind: ItemKind,
    /// When the effect started, `None` for consumed tickets
    pub activated_at: Option<DateTimeUtc>,
    /// When the effect ends
    pub expires_at: Option<DateTimeUtc>,
    /// Units left after this use
    pub remaining: i32,
}

/// Activates an XP boost.
#[instrument(skip(db, request), fields(user_id = %request.user_id, item_id = request.inventory_item_id))]
pub async fn activate_xp_boost(
    db: &DatabaseConnection,
    retry: RetryPolicy,
    request: UseRequest,
) -> Result<Outcome<ActivationReceipt, InventoryError>> {
    activate(db, retry, None, request, ItemKind::XpBoost, "activate_xp_boost").await
}

/// Grants the item's role and starts its timer.
#[instrument(skip(db, effects, request), fields(user_id = %request.user_id, item_id = request.inventory_item_id))]
pub async fn activate_role(
    db: &DatabaseConnection,
    retry: RetryPolicy,
    effects: Arc<dyn RoleEffects>,
    request: UseRequest,
) -> Result<Outcome<ActivationReceipt, InventoryError>> {
    activate(db, retry, Some(effects), request, ItemKind::TempRole, "activate_role").await
}

/// Applies the item's nickname color and starts its timer.
#[instrument(skip(db, effects, request), fields(user_id = %request.user_id, item_id = request.inventory_item_id))]
pub async fn activate_nick_color(
    db: &DatabaseConnection,
    retry: RetryPolicy,
    effects: Arc<dyn RoleEffects>,
    request: UseRequest,
) -> Result<Outcome<ActivationReceipt, InventoryError>> {
    activate(
        db,
        retry,
        Some(effects),
        request,
        ItemKind::NickColor,
        "activate_nick_color",
    )
    .await
}

async fn activate(
    db: &DatabaseConnection,
    retry: RetryPolicy,
    effects: Option<Arc<dyn RoleEffects>>,
    request: UseRequest,
    kind: ItemKind,
    operation: &'static str,
) -> Result<Outcome<ActivationReceipt, InventoryError>> {
    let outcome = run_serializable(db, retry, operation, |txn| {
        Box::pin(activate_in_txn(txn, effects.clone(), request.clone(), kind))
    })
    .await?;

    match &outcome {
        Ok(receipt) => info!(
            item_id = receipt.inventory_item_id,
            kind = %receipt.kind,
            expires_at = ?receipt.expires_at,
            "item activated"
        ),
        Err(rejection) => debug!(operation, code = rejection.code(), "activation rejected"),
    }
    Ok(outcome)
}

/// Loads the caller's row and applies the ownership, guild and one-shot guards.
async fn load_usable(
    txn: &DatabaseTransaction,
    request: &UseRequest,
) -> Result<Outcome<inventory_item::Model, InventoryError>> {
    let Some(item) = InventoryItem::find_by_id(request.inventory_item_id)
        .one(txn)
        .await?
    else {
        return Ok(Err(InventoryError::NotFound));
    };
    if item.user_id != request.user_id {
        return Ok(Err(InventoryError::NotFound));
    }
    if let Some(item_guild) = &item.guild_id {
        if request.guild_id.as_ref() != Some(item_guild) {
            return Ok(Err(InventoryError::NotInGuild));
        }
    }
    if item.activated_at.is_some() {
        return Ok(Err(InventoryError::AlreadyActive));
    }
    if item.remaining() <= 0 {
        return Ok(Err(InventoryError::AlreadyUsed));
    }
    Ok(Ok(item))
}

async fn activate_in_txn(
    txn: &DatabaseTransaction,
    effects: Option<Arc<dyn RoleEffects>>,
    request: UseRequest,
    kind: ItemKind,
) -> Result<Outcome<ActivationReceipt, InventoryError>> {
    let item = match load_usable(txn, &request).await? {
        Ok(item) => item,
        Err(rejection) => return Ok(Err(rejection)),
    };
    if item.kind != kind {
        return Ok(Err(InventoryError::WrongKind { actual: item.kind }));
    }
    let effect = match parse_effect(item.kind, &item.metadata) {
        Ok(effect) => effect,
        Err(message) => return Ok(Err(InventoryError::InvalidMetadata(message))),
    };

    let duration = match &effect {
        ItemEffect::XpBoost { duration, .. }
        | ItemEffect::TempRole { duration, .. }
        | ItemEffect::NickColor { duration, .. } => *duration,
        ItemEffect::RerollTicket => return Ok(Err(InventoryError::WrongKind { actual: kind })),
    };

    // The platform effect must succeed before the activation is persisted
    let needs_discord = matches!(
        effect,
        ItemEffect::TempRole { .. } | ItemEffect::NickColor { .. }
    );
    if let (true, Some(effects)) = (needs_discord, &effects) {
        let Some(guild_id) = request.guild_id.as_deref() else {
            return Ok(Err(InventoryError::NotInGuild));
        };
        let applied = match &effect {
            ItemEffect::TempRole { role_id, .. } => {
                effects.grant_role(guild_id, &request.user_id, role_id).await
            }
            ItemEffect::NickColor { color, .. } => {
                effects.apply_nick_color(guild_id, &request.user_id, color).await
            }
            _ => Ok(()),
        };
        if let Err(message) = applied {
            warn!(item_id = item.id, error = %message, "discord refused item effect");
            return Ok(Err(InventoryError::DiscordActionFailed(message)));
        }
    }

    let now = Utc::now();
    let expires_at = now + duration;
    let mut update = InventoryItem::update_many();
    if needs_discord {
        // Revocation has to happen in the guild the effect was applied to
        update = update.col_expr(
            inventory_item::Column::GuildId,
            Expr::value(request.guild_id.clone()),
        );
    }
    let result = update
        .col_expr(inventory_item::Column::ActivatedAt, Expr::value(now))
        .col_expr(inventory_item::Column::ExpiresAt, Expr::value(expires_at))
        .col_expr(
            inventory_item::Column::UsedQuantity,
            Expr::col(inventory_item::Column::UsedQuantity).add(1),
        )
        .filter(inventory_item::Column::Id.eq(item.id))
        .filter(inventory_item::Column::ActivatedAt.is_null())
        .filter(
            Expr::col(inventory_item::Column::UsedQuantity)
                .lt(Expr::col(inventory_item::Column::Quantity)),
        )
        .exec(txn)
        .await?;
    if result.rows_affected != 1 {
        return Ok(Err(InventoryError::AlreadyActive));
    }

    Ok(Ok(ActivationReceipt {
        inventory_item_id: item.id,
        kind: item.kind,
        activated_at: Some(now),
        expires_at: Some(expires_at),
        remaining: item.remaining() - 1,
    }))
}

/// Uses up one unit of an item that has no timed effect.
#[instrument(skip(db, request), fields(user_id = %request.user_id, item_id = request.inventory_item_id))]
pub async fn consume_simple(
    db: &DatabaseConnection,
    retry: RetryPolicy,
    request: UseRequest,
) -> Result<Outcome<ActivationReceipt, InventoryError>> {
    let outcome = run_serializable(db, retry, "consume_simple", |txn| {
        Box::pin(consume_in_txn(txn, request.clone()))
    })
    .await?;

    match &outcome {
        Ok(receipt) => info!(
            item_id = receipt.inventory_item_id,
            remaining = receipt.remaining,
            "item consumed"
        ),
        Err(rejection) => debug!(code = rejection.code(), "consumption rejected"),
    }
    Ok(outcome)
}

async fn consume_in_txn(
    txn: &DatabaseTransaction,
    request: UseRequest,
) -> Result<Outcome<ActivationReceipt, InventoryError>> {
    let item = match load_usable(txn, &request).await? {
        Ok(item) => item,
        Err(rejection) => return Ok(Err(rejection)),
    };
    if item.kind != ItemKind::WaifuRerollTicket {
        return Ok(Err(InventoryError::WrongKind { actual: item.kind }));
    }

    let result = InventoryItem::update_many()
        .col_expr(
            inventory_item::Column::UsedQuantity,
            Expr::col(inventory_item::Column::UsedQuantity).add(1),
        )
        .filter(inventory_item::Column::Id.eq(item.id))
        .filter(inventory_item::Column::ActivatedAt.is_null())
        .filter(
            Expr::col(inventory_item::Column::UsedQuantity)
                .lt(Expr::col(inventory_item::Column::Quantity)),
        )
        .exec(txn)
        .await?;
    if result.rows_affected != 1 {
        return Ok(Err(InventoryError::AlreadyUsed));
    }

    Ok(Ok(ActivationReceipt {
        inventory_item_id: item.id,
        kind: item.kind,
        activated_at: None,
        expires_at: None,
        remaining: item.remaining() - 1,
    }))
}

fn usable_in(guild_id: Option<&str>) -> Condition {
    let everywhere = Condition::any().add(inventory_item::Column::GuildId.is_null());
    match guild_id {
        Some(guild) => everywhere.add(inventory_item::Column::GuildId.eq(guild)),
        None => everywhere,
    }
}

/// Items the user still owns: unused units or an effect that has not expired.
pub async fn list_inventory(
    db: &DatabaseConnection,
    user_id: &str,
    guild_id: Option<&str>,
) -> Result<Vec<inventory_item::Model>> {
    let now = Utc::now();
    let items = InventoryItem::find()
        .filter(inventory_item::Column::UserId.eq(user_id))
        .filter(usable_in(guild_id))
        .order_by_asc(inventory_item::Column::Id)
        .all(db)
        .await?;

    Ok(items
        .into_iter()
        .filter(|item| {
            let active = item.expires_at.is_some_and(|at| at > now);
            (item.activated_at.is_none() && item.remaining() > 0) || active
        })
        .collect())
}

/// Product of the multipliers of every boost active at `now`, 1.0 when none.
pub async fn active_xp_multiplier(
    db: &DatabaseConnection,
    user_id: &str,
    guild_id: Option<&str>,
    now: DateTimeUtc,
) -> Result<f64> {
    let boosts = InventoryItem::find()
        .filter(inventory_item::Column::UserId.eq(user_id))
        .filter(inventory_item::Column::Kind.eq(ItemKind::XpBoost))
        .filter(usable_in(guild_id))
        .filter(inventory_item::Column::ActivatedAt.is_not_null())
        .filter(inventory_item::Column::ExpiresAt.gt(now))
        .all(db)
        .await?;

    let mut multiplier = 1.0;
    for boost in boosts {
        match parse_effect(boost.kind, &boost.metadata) {
            Ok(ItemEffect::XpBoost { multiplier: m, .. }) => multiplier *= m,
            _ => warn!(item_id = boost.id, "active boost has unreadable metadata"),
        }
    }
    Ok(multiplier)
}

/// Activated role and nickname items whose effect ended at or before `now`
/// and was not revoked yet.
pub async fn expired_role_grants(
    db: &DatabaseConnection,
    now: DateTimeUtc,
) -> Result<Vec<inventory_item::Model>> {
    InventoryItem::find()
        .filter(inventory_item::Column::Kind.is_in([ItemKind::TempRole, ItemKind::NickColor]))
        .filter(inventory_item::Column::ActivatedAt.is_not_null())
        .filter(inventory_item::Column::ExpiresAt.lte(now))
        .filter(inventory_item::Column::RevokedAt.is_null())
        .order_by_asc(inventory_item::Column::ExpiresAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Takes back every expired role and nickname color, returning how many rows
/// were marked revoked.
///
/// A grant whose Discord call fails stays pending and is retried on the next
/// sweep. Rows with unreadable metadata or no guild are marked revoked without
/// a Discord call since there is nothing that could be removed.
#[instrument(skip(db, effects))]
pub async fn revoke_expired_grants(
    db: &DatabaseConnection,
    retry: RetryPolicy,
    effects: Arc<dyn RoleEffects>,
    now: DateTimeUtc,
) -> Result<usize> {
    let mut revoked = 0;
    for grant in expired_role_grants(db, now).await? {
        let removed = match (&grant.guild_id, parse_effect(grant.kind, &grant.metadata)) {
            (Some(guild_id), Ok(ItemEffect::TempRole { role_id, .. })) => {
                effects.revoke_role(guild_id, &grant.user_id, &role_id).await
            }
            (Some(guild_id), Ok(ItemEffect::NickColor { color, .. })) => {
                effects.remove_nick_color(guild_id, &grant.user_id, &color).await
            }
            _ => {
                warn!(item_id = grant.id, "expired grant cannot be revoked on discord");
                Ok(())
            }
        };
        if let Err(message) = removed {
            warn!(item_id = grant.id, error = %message, "failed to revoke expired grant");
            continue;
        }

        let item_id = grant.id;
        let marked: Outcome<bool, InventoryError> =
            run_serializable(db, retry, "revoke_expired_grant", |txn| {
                Box::pin(mark_revoked_in_txn(txn, item_id, now))
            })
            .await?;
        if marked == Ok(true) {
            info!(item_id, kind = %grant.kind, user_id = %grant.user_id, "expired grant revoked");
            revoked += 1;
        }
    }
    Ok(revoked)
}

async fn mark_revoked_in_txn(
    txn: &DatabaseTransaction,
    item_id: i64,
    now: DateTimeUtc,
) -> Result<Outcome<bool, InventoryError>> {
    let result = InventoryItem::update_many()
        .col_expr(inventory_item::Column::RevokedAt, Expr::value(now))
        .filter(inventory_item::Column::Id.eq(item_id))
        .filter(inventory_item::Column::RevokedAt.is_null())
        .exec(txn)
        .await?;
    Ok(Ok(result.rows_affected == 1))
}

/// Time left on an active effect, `None` when inactive or expired.
#[must_use]
pub fn time_left(item: &inventory_item::Model, now: DateTimeUtc) -> Option<Duration> {
    item.expires_at
        .map(|at| at - now)
        .filter(|left| *left > Duration::zero())
}
