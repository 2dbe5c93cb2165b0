//! Discord interaction handlers
//!
//! Autocomplete for command parameters and the serenity side of inventory
//! effects.

/// Autocomplete handlers for shop item names
pub mod autocomplete;
/// Role grants performed on behalf of inventory items
pub mod roles;
