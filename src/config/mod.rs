/// Database configuration and connection management
pub mod database;

/// Economy tunables and shop seed catalog loading from config.toml
pub mod economy;
