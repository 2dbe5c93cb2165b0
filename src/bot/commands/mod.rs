//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Coinflip betting commands
pub mod coinflip;

/// Wallet and ledger commands
pub mod economy;

/// General utility commands
pub mod general;

/// Giveaway commands
pub mod giveaway;

/// Shop and inventory commands
pub mod shop;

use crate::{bot::BotData, errors::Error};

// Export commands
pub use coinflip::*;
pub use economy::*;
pub use general::*;
pub use giveaway::*;
pub use shop::*;

/// Every top-level command registered with Discord.
#[must_use]
pub fn all() -> Vec<poise::Command<BotData, Error>> {
    vec![
        ping(),
        help(),
        balance(),
        pay(),
        leaderboard(),
        history(),
        eco(),
        coinflip(),
        shop(),
        inventory(),
        use_item(),
        giveaway(),
    ]
}
