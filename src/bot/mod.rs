//! Bot layer - Discord-specific interface and command handlers
//!
//! This module provides the Discord interface for the economy: slash
//! commands, autocomplete, the serenity-backed role effects used by inventory
//! activation, and the short-lived session store correlating coinflip games
//! with their challenge messages.

/// Discord command implementations (economy, coinflip, shop, giveaway, general)
pub mod commands;
/// Discord interaction handlers (autocomplete, role effects)
pub mod handlers;
/// Expiring keyed store for per-interaction state
pub mod session;

use crate::{
    config::economy::EconomyConfig,
    core::{
        coinflip::CoinflipSettings,
        inventory,
        ledger::{self, ProfileHints},
        shop::ShopSettings,
        txn::RetryPolicy,
    },
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use session::SessionStore;
use std::{sync::Arc, time::Duration};
use handlers::roles::DiscordRoleEffects;
use tracing::{error, info, instrument, warn};

/// How often expired sessions are swept.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
/// How often expired role and color grants are taken back.
const ROLE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Where a coinflip challenge was posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeMessage {
    /// Channel of the challenge
    pub channel_id: serenity::ChannelId,
    /// Message announcing the challenge
    pub message_id: serenity::MessageId,
}

/// Shared data available to all bot commands.
/// This structure holds the database connection, the economy tunables and the
/// in-memory challenge sessions.
pub struct BotData {
    /// Database connection for all database operations
    pub database: DatabaseConnection,
    /// Economy tunables loaded from config.toml
    pub economy: EconomyConfig,
    /// Coinflip game id to challenge message, expiring with the bet
    pub challenges: Arc<SessionStore<String, ChallengeMessage>>,
}

impl BotData {
    /// Creates a new `BotData` instance.
    /// Challenge sessions live as long as a bet stays acceptable.
    #[must_use]
    pub fn new(database: DatabaseConnection, economy: EconomyConfig) -> Self {
        let minutes = u64::try_from(economy.coinflip_expiry_minutes.max(1)).unwrap_or(15);
        Self {
            database,
            challenges: Arc::new(SessionStore::new(Duration::from_secs(minutes * 60))),
            economy,
        }
    }

    /// Retry policy for ledger operations.
    #[must_use]
    pub const fn retry(&self) -> RetryPolicy {
        RetryPolicy::new(self.economy.max_attempts)
    }

    /// Settings for the coinflip engine.
    #[must_use]
    pub fn coinflip_settings(&self) -> CoinflipSettings {
        CoinflipSettings::from(&self.economy)
    }

    /// Settings for the shop.
    #[must_use]
    pub fn shop_settings(&self) -> ShopSettings {
        ShopSettings::from(&self.economy)
    }
}

/// Bootstraps the wallet of a Discord user, refreshing their profile.
pub async fn ensure_member(db: &DatabaseConnection, user: &serenity::User) -> Result<()> {
    let hints = ProfileHints {
        username: Some(user.name.clone()),
        avatar_url: user.avatar_url(),
    };
    ledger::ensure_user(db, &user.id.to_string(), &hints).await
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {error:?}");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {:?}", ctx.command().name, error);
            if let Err(e) = ctx
                .say("❌ Something went wrong on our side. Please try again in a moment.")
                .await
            {
                error!("Failed to send error message: {e}");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

/// Builds the poise framework and runs the Discord client until it stops.
#[instrument(skip(token, data))]
pub async fn run_bot(token: String, data: BotData) -> Result<()> {
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let sessions = Arc::clone(&data.challenges);
                tokio::spawn(async move {
                    let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
                    loop {
                        interval.tick().await;
                        sessions.sweep().await;
                    }
                });

                let db = data.database.clone();
                let retry = data.retry();
                let effects = Arc::new(DiscordRoleEffects::new(Arc::clone(&ctx.http)));
                tokio::spawn(async move {
                    let mut interval = tokio::time::interval(ROLE_SWEEP_INTERVAL);
                    loop {
                        interval.tick().await;
                        match inventory::revoke_expired_grants(&db, retry, effects.clone(), chrono::Utc::now()).await {
                            Ok(0) => {}
                            Ok(revoked) => info!(revoked, "revoked expired role grants"),
                            Err(e) => warn!("Role revocation sweep failed: {e}"),
                        }
                    }
                });

                Ok(data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::GUILDS | serenity::GatewayIntents::GUILD_MEMBERS;

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| error!("Error creating client: {e:?}"))?;

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| error!("Client error: {e:?}"))?;
    Ok(())
}
