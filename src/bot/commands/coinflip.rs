//! Coinflip Discord commands - `/coinflip challenge|accept|decline|verify`.
//!
//! The challenge message is remembered in the bot's session store so that
//! accepting or declining can edit it in place.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, ChallengeMessage, ensure_member},
        core::{
            coinflip::{self, CoinflipError, FairnessReport, NewBet},
            ledger,
        },
        entities::CoinSide,
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use tracing::warn;

    #[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
    pub enum SideChoice {
        #[name = "heads"]
        Heads,
        #[name = "tails"]
        Tails,
    }

    impl From<SideChoice> for CoinSide {
        fn from(choice: SideChoice) -> Self {
            match choice {
                SideChoice::Heads => Self::Heads,
                SideChoice::Tails => Self::Tails,
            }
        }
    }

    fn describe_rejection(rejection: &CoinflipError, currency: &str) -> String {
        match rejection {
            CoinflipError::InsufficientFunds {
                user_id,
                balance,
                required,
            } => format!(
                "❌ <@{user_id}> can't cover the bet: has **{balance} {currency}**, needs **{required} {currency}**."
            ),
            CoinflipError::Expired => "⌛ This bet has expired.".to_string(),
            other => format!("❌ {other}"),
        }
    }

    /// Replaces the content of the original challenge message, if we still know it.
    async fn update_challenge(ctx: poise::Context<'_, BotData, Error>, game_id: &str, text: &str) {
        let Some(challenge) = ctx.data().challenges.remove(&game_id.to_string()).await else {
            return;
        };
        let edit = serenity::EditMessage::new().content(text);
        if let Err(e) = challenge
            .channel_id
            .edit_message(ctx.http(), challenge.message_id, edit)
            .await
        {
            warn!(game_id, error = %e, "could not edit challenge message");
        }
    }

    /// Picks the explicit game id, or the oldest bet waiting on the caller.
    async fn resolve_game_id(
        ctx: poise::Context<'_, BotData, Error>,
        game: Option<String>,
    ) -> Result<Option<String>> {
        if let Some(game) = game {
            return Ok(Some(game.trim().to_string()));
        }
        let pending = coinflip::pending_for_user(
            &ctx.data().database,
            &ctx.data().coinflip_settings(),
            &ctx.author().id.to_string(),
        )
        .await?;
        Ok(pending.into_iter().next().map(|view| view.game_id))
    }

    /// Two-player coin flip bets with verifiable results.
    #[poise::command(
        slash_command,
        guild_only,
        subcommands(
            "coinflip_challenge",
            "coinflip_accept",
            "coinflip_decline",
            "coinflip_verify"
        )
    )]
    pub async fn coinflip(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Use `/coinflip challenge`, `/coinflip accept`, `/coinflip decline` or `/coinflip verify`.")
            .await?;
        Ok(())
    }

    /// Challenges a member to a coin flip.
    #[poise::command(slash_command, rename = "challenge", guild_only)]
    pub async fn coinflip_challenge(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Who you want to play against"] opponent: serenity::User,
        #[description = "Stake per player"] amount: String,
        #[description = "Your side"] side: SideChoice,
    ) -> Result<()> {
        let data = ctx.data();
        let currency = &data.economy.currency_name;
        let amount = match ledger::parse_amount(&amount) {
            Ok(amount) => amount,
            Err(rejection) => {
                ctx.say(format!("❌ {rejection}")).await?;
                return Ok(());
            }
        };
        if opponent.bot {
            ctx.say("❌ Bots don't gamble.").await?;
            return Ok(());
        }

        ensure_member(&data.database, ctx.author()).await?;
        ensure_member(&data.database, &opponent).await?;

        let bet = NewBet {
            challenger_id: ctx.author().id.to_string(),
            opponent_id: opponent.id.to_string(),
            bet_amount: amount,
            challenger_side: side.into(),
            guild_id: ctx.guild_id().map(|id| id.to_string()),
            channel_id: Some(ctx.channel_id().to_string()),
        };
        let created = match coinflip::create_bet(&data.database, &data.coinflip_settings(), bet).await? {
            Ok(created) => created,
            Err(rejection) => {
                ctx.say(describe_rejection(&rejection, currency)).await?;
                return Ok(());
            }
        };

        let challenger_side = CoinSide::from(side);
        let reply = ctx
            .say(format!(
                "🪙 <@{}> challenges <@{}> to a coin flip for **{amount} {currency}** each!\n\
                <@{}> takes **{challenger_side}**, <@{}> gets **{}**.\n\
                Game: `{}`\n\
                Seed commitment (SHA-256): `{}`\n\
                Answer with `/coinflip accept` or `/coinflip decline` within {} minutes.",
                ctx.author().id,
                opponent.id,
                ctx.author().id,
                opponent.id,
                challenger_side.opposite(),
                created.game_id,
                created.server_seed_hash,
                data.economy.coinflip_expiry_minutes,
            ))
            .await?;

        let message = reply.message().await?;
        data.challenges
            .insert(
                created.game_id,
                ChallengeMessage {
                    channel_id: message.channel_id,
                    message_id: message.id,
                },
            )
            .await;
        Ok(())
    }

    /// Accepts a bet made against you.
    #[poise::command(slash_command, rename = "accept", guild_only)]
    pub async fn coinflip_accept(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Game id (defaults to the oldest bet waiting on you)"] game: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let currency = &data.economy.currency_name;
        let Some(game_id) = resolve_game_id(ctx, game).await? else {
            ctx.say("❌ Nobody is waiting on you.").await?;
            return Ok(());
        };
        ensure_member(&data.database, ctx.author()).await?;

        let outcome =
            coinflip::accept_bet(&data.database, &data.coinflip_settings(), &game_id, &ctx.author().id.to_string())
                .await?;
        let settled = match outcome {
            Ok(settled) => settled,
            Err(rejection) => {
                let text = describe_rejection(&rejection, currency);
                if matches!(rejection, CoinflipError::Expired) {
                    update_challenge(ctx, &game_id, &text).await;
                }
                ctx.say(text).await?;
                return Ok(());
            }
        };

        let text = format!(
            "🪙 The coin landed on **{}**! <@{}> wins **{} {currency}**.\n\
            Balances: <@{}> **{}**, <@{}> **{}**.\n\
            Seed: `{}`\n\
            Commitment: `{}`",
            settled.result_side,
            settled.winner_id,
            settled.bet_amount.saturating_mul(2),
            settled.winner_id,
            settled.winner_balance,
            settled.loser_id,
            settled.loser_balance,
            settled.server_seed,
            settled.server_seed_hash,
        );
        update_challenge(ctx, &game_id, &text).await;
        ctx.say(text).await?;
        Ok(())
    }

    /// Declines a bet made against you.
    #[poise::command(slash_command, rename = "decline", guild_only)]
    pub async fn coinflip_decline(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Game id (defaults to the oldest bet waiting on you)"] game: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let Some(game_id) = resolve_game_id(ctx, game).await? else {
            ctx.say("❌ Nobody is waiting on you.").await?;
            return Ok(());
        };

        let outcome = coinflip::decline_bet(
            &data.database,
            &data.coinflip_settings(),
            &game_id,
            &ctx.author().id.to_string(),
        )
        .await?;
        match outcome {
            Ok(()) => {
                let text = format!("🚫 <@{}> declined the coin flip.", ctx.author().id);
                update_challenge(ctx, &game_id, &text).await;
                ctx.say(text).await?;
            }
            Err(rejection) => {
                ctx.say(describe_rejection(&rejection, &data.economy.currency_name))
                    .await?;
            }
        }
        Ok(())
    }

    /// Recomputes a finished flip from its revealed seed.
    #[poise::command(slash_command, rename = "verify")]
    pub async fn coinflip_verify(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Game id"] game: String,
    ) -> Result<()> {
        let outcome = coinflip::verify_game(&ctx.data().database, game.trim()).await?;
        let report = match outcome {
            Ok(report) => report,
            Err(rejection) => {
                ctx.say(describe_rejection(&rejection, &ctx.data().economy.currency_name))
                    .await?;
                return Ok(());
            }
        };

        let FairnessReport {
            game_id,
            server_seed,
            server_seed_hash,
            result_side,
            verdict,
        } = report;
        let (title, color) = match verdict {
            Ok(()) => ("✅ Flip verified".to_string(), 0x0057_F287),
            Err(reason) => (format!("⚠️ Verification failed: {}", reason.code()), 0x00ED_4245),
        };

        let embed = serenity::CreateEmbed::default()
            .title(title)
            .color(color)
            .field("Game", format!("`{game_id}`"), false)
            .field("Seed", format!("`{server_seed}`"), false)
            .field("SHA-256(seed)", format!("`{server_seed_hash}`"), false)
            .field("Result", result_side.to_string(), true)
            .field(
                "Rule",
                "first byte of SHA-256(seed:game) even → heads, odd → tails",
                false,
            );
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
