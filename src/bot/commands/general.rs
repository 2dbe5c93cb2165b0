//! General Discord commands - ping and help.
//! These commands don't touch the economy and only describe what the bot can do.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let currency = &ctx.data().economy.currency_name;
        let help_text = format!(
            "**Luazinha Economy Help**\n\
            Everything here is paid in **{currency}**.\n\n\
            **Wallet**\n\
            • `/balance [user]` - Shows a balance.\n\
            • `/pay <user> <amount> [reason]` - Sends currency to someone.\n\
            • `/leaderboard` - Richest members.\n\
            • `/history` - Your latest ledger entries.\n\n\
            **Coinflip**\n\
            • `/coinflip challenge <user> <amount> <side>` - Proposes a bet. Nothing is charged until it is accepted.\n\
            • `/coinflip accept [game]` / `/coinflip decline [game]` - Answers a bet made against you.\n\
            • `/coinflip verify <game>` - Recomputes a finished flip from its revealed seed.\n\n\
            **Shop**\n\
            • `/shop list` - Items for sale here.\n\
            • `/shop buy <item> [quantity]` - Buys an item.\n\
            • `/inventory` - What you own.\n\
            • `/use <item_id>` - Activates or consumes an owned item.\n\n\
            **Staff**\n\
            • `/eco add|remove <user> <amount> [reason]` - Adjusts a balance.\n\
            • `/giveaway assign <prizes> <winners>` - Splits a prize list between winners."
        );

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
