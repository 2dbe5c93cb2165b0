//! Shop Discord commands - `/shop list|buy`, `/inventory` and `/use`.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData, ensure_member,
            handlers::{autocomplete, roles::DiscordRoleEffects},
        },
        core::{
            inventory::{self, ActivationReceipt, InventoryError, UseRequest},
            shop::{self, PurchaseRequest, ShopError},
        },
        entities::ItemKind,
        errors::{Error, Result},
    };
    use chrono::Utc;
    use poise::serenity_prelude as serenity;
    use std::{fmt::Write, sync::Arc};

    fn describe_shop_rejection(rejection: &ShopError, currency: &str) -> String {
        match rejection {
            ShopError::InsufficientFunds { balance, required } => format!(
                "❌ Insufficient funds! You have **{balance} {currency}** but this costs **{required} {currency}**."
            ),
            other => format!("❌ {other}"),
        }
    }

    /// Browse and buy items.
    #[poise::command(slash_command, subcommands("shop_list", "shop_buy"))]
    pub async fn shop(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Use `/shop list` or `/shop buy`.").await?;
        Ok(())
    }

    /// Lists the items for sale here.
    #[poise::command(slash_command, rename = "list")]
    pub async fn shop_list(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        let guild_id = ctx.guild_id().map(|id| id.to_string());
        let items = shop::list_items(&data.database, guild_id.as_deref()).await?;

        if items.is_empty() {
            ctx.say("🛒 The shop is empty.").await?;
            return Ok(());
        }

        let fields: Vec<_> = items
            .into_iter()
            .map(|item| {
                let name = format!("{} - {} {}", item.name, item.price, data.economy.currency_name);
                let mut value = item.description.unwrap_or_else(|| item.kind.to_string());
                if item.stackable {
                    value.push_str(" (stackable)");
                }
                (name, value, false)
            })
            .collect();

        let embed = serenity::CreateEmbed::default()
            .title("🛒 Shop")
            .color(0x0058_65F2)
            .fields(fields);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Buys an item.
    #[poise::command(slash_command, rename = "buy")]
    pub async fn shop_buy(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Item to buy"]
        #[autocomplete = "autocomplete::autocomplete_shop_item"]
        item: String,
        #[description = "How many (defaults to 1)"] quantity: Option<i32>,
    ) -> Result<()> {
        let data = ctx.data();
        let currency = &data.economy.currency_name;
        let guild_id = ctx.guild_id().map(|id| id.to_string());

        let wanted = item.trim().to_lowercase();
        let catalog = shop::list_items(&data.database, guild_id.as_deref()).await?;
        let Some(found) = catalog.into_iter().find(|i| i.name.to_lowercase() == wanted) else {
            ctx.say(format!("❌ No item called '{item}' here. See `/shop list`."))
                .await?;
            return Ok(());
        };

        ensure_member(&data.database, ctx.author()).await?;
        let request = PurchaseRequest {
            user_id: ctx.author().id.to_string(),
            guild_id,
            shop_item_id: found.id,
            quantity: quantity.unwrap_or(1),
            reason: None,
        };

        match shop::purchase(&data.database, &data.shop_settings(), request).await? {
            Ok(receipt) => {
                ctx.say(format!(
                    "✅ Bought **{}** for **{} {currency}**. Balance: **{} {currency}**. Inventory ids: {}",
                    found.name,
                    receipt.total,
                    receipt.balance,
                    receipt
                        .inventory_item_ids
                        .iter()
                        .map(|id| format!("`{id}`"))
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
                .await?;
            }
            Err(rejection) => {
                ctx.say(describe_shop_rejection(&rejection, currency)).await?;
            }
        }
        Ok(())
    }

    /// Shows what you own.
    #[poise::command(slash_command, prefix_command)]
    pub async fn inventory(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        ensure_member(&data.database, ctx.author()).await?;
        let guild_id = ctx.guild_id().map(|id| id.to_string());
        let items = inventory::list_inventory(
            &data.database,
            &ctx.author().id.to_string(),
            guild_id.as_deref(),
        )
        .await?;

        if items.is_empty() {
            ctx.say("🎒 Your inventory is empty.").await?;
            return Ok(());
        }

        let now = Utc::now();
        let mut description = String::new();
        for item in &items {
            let state = match inventory::time_left(item, now) {
                Some(left) => format!("active, {} min left", left.num_minutes().max(1)),
                None => format!("{}/{} left", item.remaining(), item.quantity),
            };
            writeln!(description, "`{}` **{}** - {state}", item.id, item.name)?;
        }

        let embed = serenity::CreateEmbed::default()
            .title("🎒 Inventory")
            .color(0x0058_65F2)
            .description(description)
            .footer(serenity::CreateEmbedFooter::new("Use an item with /use <id>"));
        ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        Ok(())
    }

    /// Activates or consumes an item you own.
    #[poise::command(slash_command, rename = "use")]
    pub async fn use_item(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Inventory id from /inventory"] item_id: i64,
    ) -> Result<()> {
        let data = ctx.data();
        let user_id = ctx.author().id.to_string();
        let guild_id = ctx.guild_id().map(|id| id.to_string());
        ensure_member(&data.database, ctx.author()).await?;

        let owned = inventory::list_inventory(&data.database, &user_id, guild_id.as_deref()).await?;
        let Some(kind) = owned.iter().find(|i| i.id == item_id).map(|i| i.kind) else {
            ctx.say(format!("❌ {}", InventoryError::NotFound)).await?;
            return Ok(());
        };

        let request = UseRequest {
            user_id,
            guild_id,
            inventory_item_id: item_id,
        };
        let effects = Arc::new(DiscordRoleEffects::new(Arc::clone(
            &ctx.serenity_context().http,
        )));
        let outcome = match kind {
            ItemKind::XpBoost => {
                inventory::activate_xp_boost(&data.database, data.retry(), request).await?
            }
            ItemKind::TempRole => {
                inventory::activate_role(&data.database, data.retry(), effects, request).await?
            }
            ItemKind::NickColor => {
                inventory::activate_nick_color(&data.database, data.retry(), effects, request)
                    .await?
            }
            ItemKind::WaifuRerollTicket => {
                inventory::consume_simple(&data.database, data.retry(), request).await?
            }
        };

        let text = match outcome {
            Ok(ActivationReceipt {
                expires_at: Some(expires_at),
                ..
            }) => format!("✨ Activated! It lasts until <t:{}:f>.", expires_at.timestamp()),
            Ok(receipt) => format!("✅ Used. {} left.", receipt.remaining),
            Err(InventoryError::DiscordActionFailed(reason)) => format!(
                "❌ Discord refused the change ({reason}). Your item was not used."
            ),
            Err(rejection) => format!("❌ {rejection}"),
        };
        ctx.say(text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
