//! Coinflip business logic - Two-party bets settled by a commit-reveal flip.
//!
//! A challenger proposes a bet against one opponent. Nothing is escrowed at
//! proposal time; the server seed commitment is published immediately. When
//! the opponent accepts, one serializable transaction checks both balances,
//! flips the coin, debits both stakes, pays the pot to the winner, writes the
//! three ledger rows and marks the game completed. The status check and the
//! transition happen in the same transaction, so a game resolves exactly once.
//!
//! ```text
//! pending --accept--> completed
//! pending --decline--> declined
//! pending --(window elapsed, accept attempted)--> expired
//! ```

use crate::{
    config::economy::EconomyConfig,
    core::{
        fairness::{self, VerifyError},
        ledger::{self, LedgerEntry},
        txn::{RetryPolicy, run_serializable},
    },
    entities::{CoinSide, CoinflipGame, CoinflipStatus, LedgerKind, coinflip_game},
    errors::{Outcome, Result},
};
use chrono::{Duration, Utc};
use sea_orm::{DatabaseTransaction, QueryOrder, Set, prelude::*};
use serde_json::json;
use thiserror::Error as ThisError;
use tracing::{debug, info, instrument};

/// Business-rule failures of coinflip operations.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum CoinflipError {
    /// No game with that id
    #[error("game not found")]
    NotFound,
    /// Game already reached a terminal status
    #[error("game already resolved")]
    AlreadyResolved,
    /// Caller is not the designated opponent
    #[error("only the challenged user can answer this bet")]
    NotOpponent,
    /// One side cannot cover the stake
    #[error("{user_id} has {balance} but the bet is {required}")]
    InsufficientFunds {
        /// User who is short
        user_id: String,
        /// Their freshly read balance
        balance: i64,
        /// Stake required
        required: i64,
    },
    /// Stake is not a positive amount the pot can hold
    #[error("bet amount must be a positive whole number")]
    InvalidAmount,
    /// Challenger and opponent are the same user
    #[error("cannot bet against yourself")]
    SameUser,
    /// Acceptance window elapsed
    #[error("bet expired")]
    Expired,
    /// Seed is not revealed yet
    #[error("game has not been resolved yet")]
    NotResolved,
    /// Paying the pot would overflow the winner's balance
    #[error("balance would overflow")]
    BalanceOverflow,
}

impl CoinflipError {
    /// Stable snake_case code for callers and logs.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::AlreadyResolved => "already_resolved",
            Self::NotOpponent => "not_opponent",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::InvalidAmount => "invalid_amount",
            Self::SameUser => "same_user",
            Self::Expired => "expired",
            Self::NotResolved => "not_resolved",
            Self::BalanceOverflow => "balance_overflow",
        }
    }
}

/// Tunables for the coinflip engine.
#[derive(Debug, Clone, Copy)]
pub struct CoinflipSettings {
    /// Transaction retry cap
    pub retry: RetryPolicy,
    /// How long a pending bet can be accepted
    pub expiry: Duration,
    /// Random bytes per server seed
    pub seed_bytes: usize,
}

impl Default for CoinflipSettings {
    fn default() -> Self {
        Self::from(&EconomyConfig::default())
    }
}

impl From<&EconomyConfig> for CoinflipSettings {
    fn from(config: &EconomyConfig) -> Self {
        Self {
            retry: RetryPolicy::new(config.max_attempts),
            expiry: Duration::minutes(config.coinflip_expiry_minutes),
            seed_bytes: config.seed_bytes,
        }
    }
}

/// A bet proposal.
#[derive(Debug, Clone)]
pub struct NewBet {
    /// User proposing the bet
    pub challenger_id: String,
    /// User being challenged
    pub opponent_id: String,
    /// Stake per side
    pub bet_amount: i64,
    /// Side the challenger picks
    pub challenger_side: CoinSide,
    /// Guild of the interaction
    pub guild_id: Option<String>,
    /// Channel of the interaction
    pub channel_id: Option<String>,
}

/// Public data of a freshly created bet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedBet {
    /// Game identifier
    pub game_id: String,
    /// Commitment to the secret seed
    pub server_seed_hash: String,
}

/// Settlement of an accepted bet, including the revealed seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledBet {
    /// Game identifier
    pub game_id: String,
    /// Flip result
    pub result_side: CoinSide,
    /// Winner of the pot
    pub winner_id: String,
    /// Loser of the stake
    pub loser_id: String,
    /// Stake per side
    pub bet_amount: i64,
    /// Winner balance after payout
    pub winner_balance: i64,
    /// Loser balance after the stake was taken
    pub loser_balance: i64,
    /// Revealed seed
    pub server_seed: String,
    /// Commitment published at creation
    pub server_seed_hash: String,
}

/// A game as it may be shown to anyone: the seed only once it is revealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameView {
    /// Game identifier
    pub game_id: String,
    /// Challenger
    pub challenger_id: String,
    /// Opponent
    pub opponent_id: String,
    /// Stake per side
    pub bet_amount: i64,
    /// Challenger's side
    pub challenger_side: CoinSide,
    /// Lifecycle status
    pub status: CoinflipStatus,
    /// Commitment to the seed
    pub server_seed_hash: String,
    /// Seed, present only for completed games
    pub server_seed: Option<String>,
    /// Flip result
    pub result_side: Option<CoinSide>,
    /// Winner
    pub winner_id: Option<String>,
    /// Creation time
    pub created_at: DateTimeUtc,
    /// Resolution time
    pub resolved_at: Option<DateTimeUtc>,
}

impl From<coinflip_game::Model> for GameView {
    fn from(game: coinflip_game::Model) -> Self {
        let revealed = game.status == CoinflipStatus::Completed;
        Self {
            game_id: game.id,
            challenger_id: game.challenger_id,
            opponent_id: game.opponent_id,
            bet_amount: game.bet_amount,
            challenger_side: game.challenger_side,
            status: game.status,
            server_seed_hash: game.server_seed_hash,
            server_seed: revealed.then_some(game.server_seed),
            result_side: game.result_side,
            winner_id: game.winner_id,
            created_at: game.created_at,
            resolved_at: game.resolved_at,
        }
    }
}

/// Result of auditing a completed game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FairnessReport {
    /// Game identifier
    pub game_id: String,
    /// Revealed seed
    pub server_seed: String,
    /// Published commitment
    pub server_seed_hash: String,
    /// Stored result
    pub result_side: CoinSide,
    /// `Ok` when seed, commitment and result all agree
    pub verdict: std::result::Result<(), VerifyError>,
}

/// Proposes a bet and publishes the seed commitment. No funds move.
#[instrument(skip(db, settings, bet), fields(challenger = %bet.challenger_id, opponent = %bet.opponent_id))]
pub async fn create_bet(
    db: &DatabaseConnection,
    settings: &CoinflipSettings,
    bet: NewBet,
) -> Result<Outcome<CreatedBet, CoinflipError>> {
    if bet.bet_amount <= 0 || bet.bet_amount.checked_mul(2).is_none() {
        return Ok(Err(CoinflipError::InvalidAmount));
    }
    if bet.challenger_id == bet.opponent_id {
        return Ok(Err(CoinflipError::SameUser));
    }

    let game_id = uuid::Uuid::new_v4().to_string();
    let server_seed = fairness::generate_server_seed_hex(settings.seed_bytes);
    let server_seed_hash = fairness::compute_server_seed_hash(&server_seed);

    let game = coinflip_game::Model {
        id: game_id,
        challenger_id: bet.challenger_id,
        opponent_id: bet.opponent_id,
        bet_amount: bet.bet_amount,
        challenger_side: bet.challenger_side,
        status: CoinflipStatus::Pending,
        server_seed,
        server_seed_hash,
        guild_id: bet.guild_id,
        channel_id: bet.channel_id,
        result_side: None,
        winner_id: None,
        created_at: Utc::now(),
        resolved_at: None,
    };

    let outcome = run_serializable(db, settings.retry, "coinflip_create", |txn| {
        Box::pin(insert_game(txn, game.clone()))
    })
    .await?;

    if let Ok(created) = &outcome {
        info!(game_id = %created.game_id, "coinflip bet created");
    }
    Ok(outcome)
}

async fn insert_game(
    txn: &DatabaseTransaction,
    game: coinflip_game::Model,
) -> Result<Outcome<CreatedBet, CoinflipError>> {
    ledger::ensure_wallet(txn, &game.challenger_id).await?;
    ledger::ensure_wallet(txn, &game.opponent_id).await?;

    let created = CreatedBet {
        game_id: game.id.clone(),
        server_seed_hash: game.server_seed_hash.clone(),
    };
    coinflip_game::ActiveModel::from(game)
        .reset_all()
        .insert(txn)
        .await?;
    Ok(Ok(created))
}

/// Loads a game and checks it can still be answered by `user_id`.
async fn load_pending(
    txn: &DatabaseTransaction,
    game_id: &str,
    user_id: &str,
) -> Result<Outcome<coinflip_game::Model, CoinflipError>> {
    let Some(game) = CoinflipGame::find_by_id(game_id.to_string()).one(txn).await? else {
        return Ok(Err(CoinflipError::NotFound));
    };
    if game.status != CoinflipStatus::Pending {
        return Ok(Err(CoinflipError::AlreadyResolved));
    }
    if game.opponent_id != user_id {
        return Ok(Err(CoinflipError::NotOpponent));
    }
    Ok(Ok(game))
}

/// Moves a pending game to a terminal status, guarded on it still being pending.
async fn transition(
    txn: &DatabaseTransaction,
    game_id: &str,
    changes: coinflip_game::ActiveModel,
) -> Result<bool> {
    let result = CoinflipGame::update_many()
        .set(changes)
        .filter(coinflip_game::Column::Id.eq(game_id))
        .filter(coinflip_game::Column::Status.eq(CoinflipStatus::Pending))
        .exec(txn)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Opponent rejects the bet. No funds move.
#[instrument(skip(db, settings))]
pub async fn decline_bet(
    db: &DatabaseConnection,
    settings: &CoinflipSettings,
    game_id: &str,
    user_id: &str,
) -> Result<Outcome<(), CoinflipError>> {
    let outcome = run_serializable(db, settings.retry, "coinflip_decline", |txn| {
        Box::pin(decline_in_txn(txn, game_id.to_string(), user_id.to_string()))
    })
    .await?;

    match &outcome {
        Ok(()) => info!(game_id, "coinflip bet declined"),
        Err(rejection) => debug!(game_id, code = rejection.code(), "decline rejected"),
    }
    Ok(outcome)
}

async fn decline_in_txn(
    txn: &DatabaseTransaction,
    game_id: String,
    user_id: String,
) -> Result<Outcome<(), CoinflipError>> {
    if let Err(rejection) = load_pending(txn, &game_id, &user_id).await? {
        return Ok(Err(rejection));
    }

    let changes = coinflip_game::ActiveModel {
        status: Set(CoinflipStatus::Declined),
        resolved_at: Set(Some(Utc::now())),
        ..Default::default()
    };
    if !transition(txn, &game_id, changes).await? {
        return Ok(Err(CoinflipError::AlreadyResolved));
    }
    Ok(Ok(()))
}

/// Opponent accepts: both stakes are taken and the winner is paid, atomically.
///
/// A pending bet past its acceptance window is marked `expired` and rejected.
#[instrument(skip(db, settings))]
pub async fn accept_bet(
    db: &DatabaseConnection,
    settings: &CoinflipSettings,
    game_id: &str,
    user_id: &str,
) -> Result<Outcome<SettledBet, CoinflipError>> {
    let expiry = settings.expiry;
    let outcome = run_serializable(db, settings.retry, "coinflip_accept", |txn| {
        Box::pin(accept_in_txn(
            txn,
            game_id.to_string(),
            user_id.to_string(),
            expiry,
        ))
    })
    .await?;

    match &outcome {
        Ok(settled) => info!(
            game_id,
            winner_id = %settled.winner_id,
            result = %settled.result_side,
            amount = settled.bet_amount,
            "coinflip bet settled"
        ),
        Err(CoinflipError::Expired) => {
            expire_game(db, settings, game_id).await?;
            info!(game_id, "coinflip bet expired");
        }
        Err(rejection) => debug!(game_id, code = rejection.code(), "accept rejected"),
    }
    Ok(outcome)
}

async fn accept_in_txn(
    txn: &DatabaseTransaction,
    game_id: String,
    user_id: String,
    expiry: Duration,
) -> Result<Outcome<SettledBet, CoinflipError>> {
    // 1. Game must still be pending and answered by its opponent
    let game = match load_pending(txn, &game_id, &user_id).await? {
        Ok(game) => game,
        Err(rejection) => return Ok(Err(rejection)),
    };
    let now = Utc::now();
    if now - game.created_at > expiry {
        return Ok(Err(CoinflipError::Expired));
    }
    let amount = game.bet_amount;

    // 2-3. Both sides must cover the stake right now
    for side in [&game.challenger_id, &game.opponent_id] {
        ledger::ensure_wallet(txn, side).await?;
        let balance = ledger::read_balance(txn, side).await?.unwrap_or(0);
        if balance < amount {
            return Ok(Err(CoinflipError::InsufficientFunds {
                user_id: side.clone(),
                balance,
                required: amount,
            }));
        }
    }

    // 4. Flip
    let result_side = fairness::compute_coinflip_result_side(&game.server_seed, &game.id);
    let (winner_id, loser_id) = if result_side == game.challenger_side {
        (game.challenger_id.clone(), game.opponent_id.clone())
    } else {
        (game.opponent_id.clone(), game.challenger_id.clone())
    };
    let Some(pot) = amount.checked_mul(2) else {
        return Ok(Err(CoinflipError::InvalidAmount));
    };
    let winner_before = ledger::read_balance(txn, &winner_id).await?.unwrap_or(0);
    if (winner_before - amount).checked_add(pot).is_none() {
        return Ok(Err(CoinflipError::BalanceOverflow));
    }

    // 5-6. Take both stakes, pay the pot
    ledger::apply_delta(txn, &game.challenger_id, -amount).await?;
    ledger::apply_delta(txn, &game.opponent_id, -amount).await?;
    let winner_balance = ledger::apply_delta(txn, &winner_id, pot).await?;
    let loser_balance = ledger::read_balance(txn, &loser_id).await?.unwrap_or(0);

    // 7. Three ledger rows
    for (player, role) in [
        (&game.challenger_id, "challenger"),
        (&game.opponent_id, "opponent"),
    ] {
        ledger::record(
            txn,
            LedgerEntry {
                from_user_id: Some(player.clone()),
                guild_id: game.guild_id.clone(),
                metadata: Some(json!({ "gameId": game.id, "role": role })),
                ..LedgerEntry::new(LedgerKind::CoinflipBet, amount)
            },
        )
        .await?;
    }
    ledger::record(
        txn,
        LedgerEntry {
            to_user_id: Some(winner_id.clone()),
            guild_id: game.guild_id.clone(),
            metadata: Some(json!({
                "gameId": game.id,
                "resultSide": result_side,
                "serverSeedHash": game.server_seed_hash,
            })),
            ..LedgerEntry::new(LedgerKind::CoinflipPayout, pot)
        },
    )
    .await?;

    // 8. Terminal transition
    let changes = coinflip_game::ActiveModel {
        status: Set(CoinflipStatus::Completed),
        result_side: Set(Some(result_side)),
        winner_id: Set(Some(winner_id.clone())),
        resolved_at: Set(Some(now)),
        ..Default::default()
    };
    if !transition(txn, &game.id, changes).await? {
        return Ok(Err(CoinflipError::AlreadyResolved));
    }

    Ok(Ok(SettledBet {
        game_id: game.id,
        result_side,
        winner_id,
        loser_id,
        bet_amount: amount,
        winner_balance,
        loser_balance,
        server_seed: game.server_seed,
        server_seed_hash: game.server_seed_hash,
    }))
}

async fn expire_game(
    db: &DatabaseConnection,
    settings: &CoinflipSettings,
    game_id: &str,
) -> Result<()> {
    let outcome: Outcome<(), CoinflipError> =
        run_serializable(db, settings.retry, "coinflip_expire", |txn| {
            Box::pin(expire_in_txn(txn, game_id.to_string()))
        })
        .await?;
    if let Err(rejection) = outcome {
        debug!(game_id, code = rejection.code(), "game resolved before it could expire");
    }
    Ok(())
}

async fn expire_in_txn(
    txn: &DatabaseTransaction,
    game_id: String,
) -> Result<Outcome<(), CoinflipError>> {
    let changes = coinflip_game::ActiveModel {
        status: Set(CoinflipStatus::Expired),
        resolved_at: Set(Some(Utc::now())),
        ..Default::default()
    };
    if transition(txn, &game_id, changes).await? {
        Ok(Ok(()))
    } else {
        Ok(Err(CoinflipError::AlreadyResolved))
    }
}

/// Looks up a game without exposing an unrevealed seed.
pub async fn get_game(db: &DatabaseConnection, game_id: &str) -> Result<Option<GameView>> {
    Ok(CoinflipGame::find_by_id(game_id.to_string())
        .one(db)
        .await?
        .map(GameView::from))
}

/// Bets waiting on `user_id` that can still be accepted, oldest first.
pub async fn pending_for_user(
    db: &DatabaseConnection,
    settings: &CoinflipSettings,
    user_id: &str,
) -> Result<Vec<GameView>> {
    let oldest_open = Utc::now() - settings.expiry;
    Ok(CoinflipGame::find()
        .filter(coinflip_game::Column::OpponentId.eq(user_id))
        .filter(coinflip_game::Column::Status.eq(CoinflipStatus::Pending))
        .filter(coinflip_game::Column::CreatedAt.gte(oldest_open))
        .order_by_asc(coinflip_game::Column::CreatedAt)
        .all(db)
        .await?
        .into_iter()
        .map(GameView::from)
        .collect())
}

/// Re-runs the commit-reveal verification on a completed game.
pub async fn verify_game(
    db: &DatabaseConnection,
    game_id: &str,
) -> Result<Outcome<FairnessReport, CoinflipError>> {
    let Some(game) = CoinflipGame::find_by_id(game_id.to_string()).one(db).await? else {
        return Ok(Err(CoinflipError::NotFound));
    };
    let (CoinflipStatus::Completed, Some(result_side)) = (game.status, game.result_side) else {
        return Ok(Err(CoinflipError::NotResolved));
    };

    let verdict = fairness::verify_coinflip_result(
        &game.server_seed,
        &game.server_seed_hash,
        &game.id,
        result_side,
    );
    Ok(Ok(FairnessReport {
        game_id: game.id,
        server_seed: game.server_seed,
        server_seed_hash: game.server_seed_hash,
        result_side,
        verdict,
    }))
}
