//! Commit-reveal coin flip.
//!
//! At bet creation a random server seed is generated and only its SHA-256
//! digest is published. When the bet resolves, the side is derived from
//! `SHA256(seed || ":" || game_id)`: an even first byte is heads, an odd one is
//! tails. Revealing the seed afterwards lets anyone recompute both the
//! commitment and the result. Binding the game id into the hash keeps one seed
//! from predicting outcomes of other games.
//!
//! This module is pure: no storage, no I/O.

use crate::entities::CoinSide;
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Minimum number of random bytes in a server seed.
pub const MIN_SEED_BYTES: usize = 32;

/// Why a revealed coinflip failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// The revealed seed does not hash to the published commitment
    #[error("server seed does not match the published hash")]
    SeedHashMismatch,
    /// The seed is genuine but yields a different side than claimed
    #[error("claimed side does not match the side derived from the seed")]
    ResultSideMismatch,
}

impl VerifyError {
    /// Stable snake_case code for callers and logs.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::SeedHashMismatch => "seed_hash_mismatch",
            Self::ResultSideMismatch => "result_side_mismatch",
        }
    }
}

/// Generates a hex-encoded random seed of at least [`MIN_SEED_BYTES`] bytes.
#[must_use]
pub fn generate_server_seed_hex(byte_length: usize) -> String {
    let mut bytes = vec![0_u8; byte_length.max(MIN_SEED_BYTES)];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Lowercase hex SHA-256 of the seed string; this is the public commitment.
#[must_use]
pub fn compute_server_seed_hash(seed: &str) -> String {
    hex::encode(Sha256::digest(seed.as_bytes()))
}

/// Derives the flip result for one game from the seed.
#[must_use]
pub fn compute_coinflip_result_side(seed: &str, game_id: &str) -> CoinSide {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(b":");
    hasher.update(game_id.as_bytes());
    let digest = hasher.finalize();

    if digest[0] & 1 == 0 {
        CoinSide::Heads
    } else {
        CoinSide::Tails
    }
}

/// Checks a revealed seed against its commitment and the claimed side.
///
/// The commitment is checked first, so a tampered seed always reports
/// [`VerifyError::SeedHashMismatch`].
pub fn verify_coinflip_result(
    seed: &str,
    seed_hash: &str,
    game_id: &str,
    claimed_side: CoinSide,
) -> Result<(), VerifyError> {
    if !compute_server_seed_hash(seed).eq_ignore_ascii_case(seed_hash.trim()) {
        return Err(VerifyError::SeedHashMismatch);
    }
    if compute_coinflip_result_side(seed, game_id) != claimed_side {
        return Err(VerifyError::ResultSideMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_hash_is_sha256_hex() {
        let hash = compute_server_seed_hash("server_seed_abc");
        assert_eq!(hash.len(), 64);
        assert!(hash.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
        // Known vector: SHA-256 of the empty string
        assert_eq!(
            compute_server_seed_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_generated_seeds_are_long_and_distinct() {
        let a = generate_server_seed_hex(32);
        let b = generate_server_seed_hex(32);
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);

        // Short requests are raised to the minimum
        assert_eq!(generate_server_seed_hex(4).len(), MIN_SEED_BYTES * 2);
        assert_eq!(generate_server_seed_hex(48).len(), 96);
    }

    #[test]
    fn test_result_side_is_deterministic() {
        let first = compute_coinflip_result_side("server_seed_abc", "game-1");
        for _ in 0..10 {
            assert_eq!(compute_coinflip_result_side("server_seed_abc", "game-1"), first);
        }
    }

    #[test]
    fn test_result_side_follows_first_byte_parity() {
        let seed = "server_seed_abc";
        for game_id in ["a", "b", "c", "game-42", "0f7c"] {
            let digest = Sha256::digest(format!("{seed}:{game_id}").as_bytes());
            let expected = if digest[0] % 2 == 0 {
                CoinSide::Heads
            } else {
                CoinSide::Tails
            };
            assert_eq!(compute_coinflip_result_side(seed, game_id), expected);
        }
    }

    #[test]
    fn test_both_sides_occur() {
        let seed = generate_server_seed_hex(32);
        let heads = (0..200)
            .filter(|i| compute_coinflip_result_side(&seed, &i.to_string()) == CoinSide::Heads)
            .count();
        assert!(heads > 0 && heads < 200);
    }

    #[test]
    fn test_verify_round_trip() {
        for game_id in ["g1", "g2", "g3", "g4"] {
            let seed = generate_server_seed_hex(32);
            let hash = compute_server_seed_hash(&seed);
            let side = compute_coinflip_result_side(&seed, game_id);
            assert_eq!(verify_coinflip_result(&seed, &hash, game_id, side), Ok(()));
        }
    }

    #[test]
    fn test_verify_detects_tampering() {
        let seed = "server_seed_abc";
        let hash = compute_server_seed_hash(seed);
        let side = compute_coinflip_result_side(seed, "g1");

        assert_eq!(
            verify_coinflip_result("server_seed_abd", &hash, "g1", side),
            Err(VerifyError::SeedHashMismatch)
        );
        assert_eq!(
            verify_coinflip_result(seed, &compute_server_seed_hash("other"), "g1", side),
            Err(VerifyError::SeedHashMismatch)
        );
        assert_eq!(
            verify_coinflip_result(seed, &hash, "g1", side.opposite()),
            Err(VerifyError::ResultSideMismatch)
        );
        // Uppercase commitments are accepted
        assert_eq!(
            verify_coinflip_result(seed, &hash.to_uppercase(), "g1", side),
            Ok(())
        );
    }
}
