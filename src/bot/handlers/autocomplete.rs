//! Autocomplete handlers for Discord slash command parameters.

use crate::{bot::BotData, core::shop, errors::Error};

/// Discord shows at most this many suggestions.
const MAX_SUGGESTIONS: usize = 25;

/// Provides autocomplete suggestions for shop item names.
///
/// Only items enabled and visible in the caller's guild are offered. The bare
/// name is returned so it matches what `/shop buy` resolves.
pub async fn autocomplete_shop_item(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let guild_id = ctx.guild_id().map(|id| id.to_string());
    let Ok(items) = shop::list_items(&ctx.data().database, guild_id.as_deref()).await else {
        return Vec::new();
    };

    let partial_lower = partial.to_lowercase();
    let mut matching: Vec<String> = items
        .into_iter()
        .filter(|item| item.name.to_lowercase().contains(&partial_lower))
        .map(|item| item.name)
        .take(MAX_SUGGESTIONS)
        .collect();

    matching.sort();
    matching
}
