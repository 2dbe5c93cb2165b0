//! Economy configuration loading from config.toml
//!
//! This module loads the economy tunables (retry cap, coinflip expiry window,
//! purchase limits) and the shop catalog used to seed the database on startup.
//! Every field has a default, so a missing `[economy]` table or a missing file
//! still yields a working configuration.

use crate::entities::ItemKind;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Economy tunables
    #[serde(default)]
    pub economy: EconomyConfig,
    /// Shop items to seed
    #[serde(default)]
    pub shop_items: Vec<ShopItemConfig>,
}

/// Tunables for the ledger, coinflip and shop engines
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EconomyConfig {
    /// Display name of the currency
    pub currency_name: String,
    /// Attempt cap for serializable transactions
    pub max_attempts: u32,
    /// Minutes a coinflip challenge stays acceptable
    pub coinflip_expiry_minutes: i64,
    /// Largest quantity accepted by a single purchase
    pub max_purchase_quantity: i32,
    /// Random bytes in a coinflip server seed
    pub seed_bytes: usize,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            currency_name: "luazinhas".to_string(),
            max_attempts: 5,
            coinflip_expiry_minutes: 15,
            max_purchase_quantity: 50,
            seed_bytes: 32,
        }
    }
}

/// Configuration for a single catalog item
#[derive(Debug, Deserialize, Clone)]
pub struct ShopItemConfig {
    /// Display name
    pub name: String,
    /// Optional catalog description
    #[serde(default)]
    pub description: Option<String>,
    /// Item behaviour
    pub kind: ItemKind,
    /// Unit price
    pub price: i64,
    /// Whether units share one inventory row
    #[serde(default)]
    pub stackable: bool,
    /// Guild scope, absent for global items
    #[serde(default)]
    pub guild_id: Option<String>,
    /// Kind-specific parameters
    #[serde(default = "empty_metadata")]
    pub metadata: serde_json::Value,
}

fn empty_metadata() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read, the TOML syntax is invalid,
/// or a field has the wrong type.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();
    debug!("Loading configuration from {path_ref:?}");
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path_ref:?}: {e}"),
    })?;

    parse_config(&contents)
}

/// Parses configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<Config> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from `LUAZINHA_CONFIG` (default `./config.toml`).
///
/// A missing file is not an error: defaults are used and a warning is logged.
pub fn load_default_config() -> Result<Config> {
    let path = std::env::var("LUAZINHA_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    if !Path::new(&path).exists() {
        warn!("Config file {path} not found, using defaults");
        return Ok(Config::default());
    }
    load_config(path)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r##"
            [economy]
            currency_name = "moons"
            max_attempts = 3
            coinflip_expiry_minutes = 5

            [[shop_items]]
            name = "Reroll"
            kind = "waifu_reroll_ticket"
            price = 50
            stackable = true

            [[shop_items]]
            name = "Red Name"
            kind = "nick_color"
            price = 100
            guild_id = "42"
            metadata = { color = "#FF0000", durationMinutes = 1440 }
        "##;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.economy.currency_name, "moons");
        assert_eq!(config.economy.max_attempts, 3);
        assert_eq!(config.economy.coinflip_expiry_minutes, 5);
        // Untouched fields keep their defaults
        assert_eq!(config.economy.max_purchase_quantity, 50);
        assert_eq!(config.economy.seed_bytes, 32);

        assert_eq!(config.shop_items.len(), 2);
        assert_eq!(config.shop_items[0].kind, ItemKind::WaifuRerollTicket);
        assert!(config.shop_items[0].stackable);
        assert_eq!(config.shop_items[1].metadata["durationMinutes"], 1440);
        assert_eq!(config.shop_items[1].guild_id.as_deref(), Some("42"));
        assert!(!config.shop_items[1].stackable);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.economy.max_attempts, 5);
        assert_eq!(config.economy.currency_name, "luazinhas");
        assert!(config.shop_items.is_empty());
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let toml_str = r#"
            [[shop_items]]
            name = "Mystery"
            kind = "lootbox"
            price = 5
        "#;
        assert!(matches!(
            parse_config(toml_str),
            Err(Error::Config { message: _ })
        ));
    }
}
