//! Serenity-backed [`RoleEffects`] used when members activate role items and
//! when expired grants are swept.

use crate::core::inventory::RoleEffects;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::{num::NonZeroU64, sync::Arc};
use tracing::{debug, info};

const AUDIT_REASON: &str = "luazinha shop item";

/// Grants roles through the Discord HTTP API.
#[derive(Clone)]
pub struct DiscordRoleEffects {
    http: Arc<serenity::Http>,
}

impl DiscordRoleEffects {
    /// Wraps the client's HTTP handle.
    #[must_use]
    pub const fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

fn snowflake(raw: &str, what: &str) -> Result<u64, String> {
    raw.trim()
        .parse::<NonZeroU64>()
        .map(NonZeroU64::get)
        .map_err(|_| format!("invalid {what} id '{raw}'"))
}

fn colour_role_name(color: &str) -> String {
    format!("color {color}")
}

/// Parses `#RRGGBB` into the integer Discord expects.
fn colour_value(color: &str) -> Result<u32, String> {
    color
        .strip_prefix('#')
        .and_then(|hex| u32::from_str_radix(hex, 16).ok())
        .ok_or_else(|| format!("invalid color '{color}'"))
}

#[async_trait]
impl RoleEffects for DiscordRoleEffects {
    async fn grant_role(&self, guild_id: &str, user_id: &str, role_id: &str) -> Result<(), String> {
        let guild = serenity::GuildId::new(snowflake(guild_id, "guild")?);
        let user = serenity::UserId::new(snowflake(user_id, "user")?);
        let role = serenity::RoleId::new(snowflake(role_id, "role")?);

        self.http
            .add_member_role(guild, user, role, Some(AUDIT_REASON))
            .await
            .map_err(|e| e.to_string())?;
        info!(guild_id, user_id, role_id, "granted role");
        Ok(())
    }

    async fn apply_nick_color(&self, guild_id: &str, user_id: &str, color: &str) -> Result<(), String> {
        let guild = serenity::GuildId::new(snowflake(guild_id, "guild")?);
        let user = serenity::UserId::new(snowflake(user_id, "user")?);
        let role_name = colour_role_name(color);

        let roles = guild.roles(&*self.http).await.map_err(|e| e.to_string())?;
        let existing = roles
            .values()
            .find(|role| role.name == role_name)
            .map(|role| role.id);
        let role = match existing {
            Some(id) => id,
            None => {
                debug!(guild_id, role_name, "creating color role");
                let builder = serenity::EditRole::new()
                    .name(&role_name)
                    .colour(colour_value(color)?)
                    .audit_log_reason(AUDIT_REASON);
                guild
                    .create_role(&*self.http, builder)
                    .await
                    .map_err(|e| e.to_string())?
                    .id
            }
        };

        self.http
            .add_member_role(guild, user, role, Some(AUDIT_REASON))
            .await
            .map_err(|e| e.to_string())?;
        info!(guild_id, user_id, color, "applied nick color");
        Ok(())
    }

    async fn revoke_role(&self, guild_id: &str, user_id: &str, role_id: &str) -> Result<(), String> {
        let guild = serenity::GuildId::new(snowflake(guild_id, "guild")?);
        let user = serenity::UserId::new(snowflake(user_id, "user")?);
        let role = serenity::RoleId::new(snowflake(role_id, "role")?);

        self.http
            .remove_member_role(guild, user, role, Some(AUDIT_REASON))
            .await
            .map_err(|e| e.to_string())?;
        info!(guild_id, user_id, role_id, "revoked role");
        Ok(())
    }

    async fn remove_nick_color(&self, guild_id: &str, user_id: &str, color: &str) -> Result<(), String> {
        let guild = serenity::GuildId::new(snowflake(guild_id, "guild")?);
        let user = serenity::UserId::new(snowflake(user_id, "user")?);
        let role_name = colour_role_name(color);

        let roles = guild.roles(&*self.http).await.map_err(|e| e.to_string())?;
        let Some(role) = roles.values().find(|role| role.name == role_name).map(|role| role.id) else {
            // Deleted by a moderator, nothing left to take back
            debug!(guild_id, role_name, "color role already gone");
            return Ok(());
        };

        self.http
            .remove_member_role(guild, user, role, Some(AUDIT_REASON))
            .await
            .map_err(|e| e.to_string())?;
        info!(guild_id, user_id, color, "removed nick color");
        Ok(())
    }
}
