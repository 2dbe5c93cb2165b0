//! Core business logic - framework-agnostic economy operations.
//!
//! Nothing in here knows about Discord. Mutating operations run through
//! [`txn::run_serializable`] and report business failures as typed errors
//! inside an [`Outcome`](crate::errors::Outcome).

/// Coinflip bets between two users
pub mod coinflip;
/// Commit-reveal coin flip primitives
pub mod fairness;
/// Inventory activation and queries
pub mod inventory;
/// Wallets, transfers and the audit ledger
pub mod ledger;
/// Giveaway prize allocation
pub mod prizes;
/// Shop catalog and purchases
pub mod shop;
/// Serializable transaction retry helper
pub mod txn;
