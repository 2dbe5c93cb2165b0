//! Coinflip game entity - One two-party bet proposal.
//!
//! Games start `pending` and move exactly once to a terminal status. The
//! server seed stays secret until the game completes; only its SHA-256 hash is
//! published at creation time.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Face of the coin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum CoinSide {
    /// Heads
    #[sea_orm(string_value = "heads")]
    Heads,
    /// Tails
    #[sea_orm(string_value = "tails")]
    Tails,
}

impl CoinSide {
    /// The other face.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Heads => Self::Tails,
            Self::Tails => Self::Heads,
        }
    }
}

impl fmt::Display for CoinSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Heads => f.write_str("heads"),
            Self::Tails => f.write_str("tails"),
        }
    }
}

/// Lifecycle status of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum CoinflipStatus {
    /// Waiting for the opponent
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Accepted and settled
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Rejected by the opponent
    #[sea_orm(string_value = "declined")]
    Declined,
    /// Left pending past the acceptance window
    #[sea_orm(string_value = "expired")]
    Expired,
}

/// Coinflip game database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coinflip_games")]
pub struct Model {
    /// Game identifier, bound into the result hash
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// User who proposed the bet
    pub challenger_id: String,
    /// User who may accept or decline
    pub opponent_id: String,
    /// Stake paid by each side
    pub bet_amount: i64,
    /// Side chosen by the challenger; the opponent holds the other one
    pub challenger_side: CoinSide,
    /// Current lifecycle status
    pub status: CoinflipStatus,
    /// Secret seed, revealed once the game completes
    pub server_seed: String,
    /// SHA-256 commitment to `server_seed`, public from creation
    pub server_seed_hash: String,
    /// Guild the bet was issued in
    pub guild_id: Option<String>,
    /// Channel the bet was issued in
    pub channel_id: Option<String>,
    /// Flip result, set on completion
    pub result_side: Option<CoinSide>,
    /// Winner, set on completion
    pub winner_id: Option<String>,
    /// When the game was proposed
    pub created_at: DateTimeUtc,
    /// When the game reached a terminal status
    pub resolved_at: Option<DateTimeUtc>,
}

/// `CoinflipGame` has no enforced relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
