//! Economy Discord commands - `balance`, `pay`, `leaderboard`, `history` and `eco`.
//!
//! Amounts arrive as text and are parsed with `ledger::parse_amount`, so signs,
//! decimals and separators are refused before anything reaches the ledger.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, ensure_member},
        core::ledger::{self, LedgerError},
        entities::LedgerKind,
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    const LEADERBOARD_SIZE: u64 = 10;
    const HISTORY_SIZE: u64 = 10;

    fn describe_rejection(rejection: &LedgerError, currency: &str) -> String {
        match rejection {
            LedgerError::InsufficientFunds { balance, required } => format!(
                "❌ Insufficient funds! You have **{balance} {currency}** but need **{required} {currency}**."
            ),
            other => format!("❌ {other}"),
        }
    }

    /// Shows your balance, or another member's.
    #[poise::command(slash_command, prefix_command)]
    pub async fn balance(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Member to look up (defaults to you)"] user: Option<serenity::User>,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let target = user.as_ref().unwrap_or_else(|| ctx.author());
        ensure_member(db, target).await?;

        let amount = ledger::get_balance(db, &target.id.to_string()).await?;
        ctx.say(format!(
            "💰 **{}** has **{amount} {}**.",
            target.name,
            ctx.data().economy.currency_name
        ))
        .await?;
        Ok(())
    }

    /// Sends currency to another member.
    #[poise::command(slash_command, prefix_command, guild_only)]
    pub async fn pay(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Who receives the money"] user: serenity::User,
        #[description = "Whole amount to send"] amount: String,
        #[description = "Optional note"] reason: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let currency = &data.economy.currency_name;
        let amount = match ledger::parse_amount(&amount) {
            Ok(amount) => amount,
            Err(rejection) => {
                ctx.say(describe_rejection(&rejection, currency)).await?;
                return Ok(());
            }
        };
        if user.bot {
            ctx.say("❌ Bots don't have wallets.").await?;
            return Ok(());
        }

        ensure_member(&data.database, ctx.author()).await?;
        ensure_member(&data.database, &user).await?;
        let guild_id = ctx.guild_id().map(|id| id.to_string());

        let outcome = ledger::transfer(
            &data.database,
            data.retry(),
            &ctx.author().id.to_string(),
            &user.id.to_string(),
            amount,
            guild_id.as_deref(),
            reason.as_deref(),
        )
        .await?;

        match outcome {
            Ok(receipt) => {
                ctx.say(format!(
                    "✅ Sent **{amount} {currency}** to <@{}>. Your balance: **{} {currency}**.",
                    user.id, receipt.from_balance
                ))
                .await?;
            }
            Err(rejection) => {
                ctx.say(describe_rejection(&rejection, currency)).await?;
            }
        }
        Ok(())
    }

    /// Lists the richest members.
    #[poise::command(slash_command, prefix_command)]
    pub async fn leaderboard(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        let wallets = ledger::top_balances(&data.database, LEADERBOARD_SIZE).await?;

        if wallets.is_empty() {
            ctx.say("🏆 Nobody has any money yet.").await?;
            return Ok(());
        }

        let mut description = String::new();
        for (rank, wallet) in wallets.iter().enumerate() {
            writeln!(
                description,
                "**{}.** <@{}> - {} {}",
                rank + 1,
                wallet.user_id,
                wallet.balance,
                data.economy.currency_name
            )?;
        }

        let embed = serenity::CreateEmbed::default()
            .title("🏆 Leaderboard")
            .color(0x00F1_C40F)
            .description(description);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Shows your latest ledger entries.
    #[poise::command(slash_command, prefix_command)]
    pub async fn history(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        let user_id = ctx.author().id.to_string();
        let rows = ledger::recent_transactions(&data.database, &user_id, HISTORY_SIZE).await?;

        if rows.is_empty() {
            ctx.say("📜 No transactions yet.").await?;
            return Ok(());
        }

        let mut description = String::new();
        for row in rows {
            let incoming = row.to_user_id.as_deref() == Some(user_id.as_str());
            let sign = if incoming { '+' } else { '-' };
            let label = match row.kind {
                LedgerKind::Transfer if incoming => "transfer received",
                LedgerKind::Transfer => "transfer sent",
                LedgerKind::AdminAdd => "staff credit",
                LedgerKind::AdminRemove => "staff debit",
                LedgerKind::CoinflipBet => "coinflip stake",
                LedgerKind::CoinflipPayout => "coinflip win",
                LedgerKind::ShopPurchase => "shop purchase",
            };
            writeln!(
                description,
                "`#{}` {sign}{} - {label} <t:{}:R>",
                row.id,
                row.amount,
                row.created_at.timestamp()
            )?;
        }

        let embed = serenity::CreateEmbed::default()
            .title(format!("📜 History ({})", data.economy.currency_name))
            .color(0x0058_65F2)
            .description(description);
        ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        Ok(())
    }

    /// Staff tools for adjusting balances.
    #[poise::command(
        slash_command,
        guild_only,
        required_permissions = "MANAGE_GUILD",
        subcommands("eco_add", "eco_remove")
    )]
    pub async fn eco(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Use `/eco add` or `/eco remove`.").await?;
        Ok(())
    }

    /// Credits a member's wallet.
    #[poise::command(slash_command, rename = "add", required_permissions = "MANAGE_GUILD")]
    pub async fn eco_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Member to credit"] user: serenity::User,
        #[description = "Whole amount"] amount: String,
        #[description = "Why"] reason: Option<String>,
    ) -> Result<()> {
        adjust(ctx, user, amount, reason, true).await
    }

    /// Debits a member's wallet.
    #[poise::command(slash_command, rename = "remove", required_permissions = "MANAGE_GUILD")]
    pub async fn eco_remove(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Member to debit"] user: serenity::User,
        #[description = "Whole amount"] amount: String,
        #[description = "Why"] reason: Option<String>,
    ) -> Result<()> {
        adjust(ctx, user, amount, reason, false).await
    }

    async fn adjust(
        ctx: poise::Context<'_, BotData, Error>,
        user: serenity::User,
        amount: String,
        reason: Option<String>,
        credit: bool,
    ) -> Result<()> {
        let data = ctx.data();
        let currency = &data.economy.currency_name;
        let amount = match ledger::parse_amount(&amount) {
            Ok(amount) => amount,
            Err(rejection) => {
                ctx.say(describe_rejection(&rejection, currency)).await?;
                return Ok(());
            }
        };

        ensure_member(&data.database, &user).await?;
        let user_id = user.id.to_string();
        let guild_id = ctx.guild_id().map(|id| id.to_string());
        let reason = reason.unwrap_or_else(|| format!("by {}", ctx.author().name));

        let outcome = if credit {
            ledger::admin_add(
                &data.database,
                data.retry(),
                &user_id,
                amount,
                guild_id.as_deref(),
                Some(&reason),
            )
            .await?
        } else {
            ledger::admin_remove(
                &data.database,
                data.retry(),
                &user_id,
                amount,
                guild_id.as_deref(),
                Some(&reason),
            )
            .await?
        };

        match outcome {
            Ok(receipt) => {
                let verb = if credit { "Added" } else { "Removed" };
                ctx.say(format!(
                    "✅ {verb} **{amount} {currency}** for <@{user_id}>. New balance: **{} {currency}**.",
                    receipt.balance
                ))
                .await?;
            }
            Err(LedgerError::InsufficientFunds { balance, .. }) => {
                ctx.say(format!(
                    "❌ <@{user_id}> only has **{balance} {currency}**."
                ))
                .await?;
            }
            Err(rejection) => {
                ctx.say(describe_rejection(&rejection, currency)).await?;
            }
        }
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
