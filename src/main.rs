use dotenvy::dotenv;
use luazinha_bot::{
    bot::{self, BotData},
    config::{database, economy},
    core::shop,
    errors::{Error, Result},
};
use std::env;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Tracing first so configuration problems are visible
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. .env is optional, variables may come from the environment
    dotenv().ok();

    // 3. Economy tunables and shop catalog
    let config = economy::load_default_config()
        .inspect(|c| info!("Loaded configuration with {} shop items", c.shop_items.len()))
        .inspect_err(|e| error!("Failed to load configuration: {e}"))?;

    // 4. Database and schema
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database schema ready"))
        .inspect_err(|e| error!("Failed to create tables: {e}"))?;

    // 5. Seed the catalog, existing items are left alone
    shop::seed_items(&db, &config.shop_items)
        .await
        .inspect(|created| info!("Seeded {created} new shop items"))
        .inspect_err(|e| error!("Failed to seed shop items: {e}"))?;

    // 6. Run the bot
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {e}"))
        .map_err(Error::EnvVar)?;

    bot::run_bot(token, BotData::new(db, config.economy)).await
}
