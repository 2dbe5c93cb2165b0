//! Giveaway Discord commands - `/giveaway assign`.
//!
//! Winners are given as `@user pref1, pref2; @user2 pref3` and prizes as a
//! comma or newline separated list where `Name (xN)` means N copies.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        core::prizes::{self, Assignment, Winner},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    /// Extracts the user id of a `<@123>` or `<@!123>` mention.
    pub(crate) fn parse_mention(text: &str) -> Option<String> {
        let id = text
            .trim()
            .strip_prefix("<@")?
            .strip_suffix('>')?
            .trim_start_matches('!');
        (!id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())).then(|| id.to_string())
    }

    /// Parses `@user pref1, pref2; @user2 pref3` into winners, skipping malformed entries.
    pub(crate) fn parse_winners(text: &str) -> Vec<Winner> {
        text.split(';')
            .filter_map(|entry| {
                let entry = entry.trim();
                let (mention, rest) = entry.split_once(char::is_whitespace).unwrap_or((entry, ""));
                let user_id = parse_mention(mention)?;
                let preferences = rest
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect();
                Some(Winner {
                    user_id,
                    preferences,
                })
            })
            .collect()
    }

    /// Splits a prize list on commas and newlines.
    pub(crate) fn parse_prizes(text: &str) -> Vec<String> {
        text.split([',', '\n'])
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// One line per winner with the prize they received.
    pub(crate) fn render_assignments(assignments: &[Assignment]) -> Result<String> {
        let mut description = String::new();
        for assignment in assignments {
            match &assignment.prize {
                Some(prize) => {
                    writeln!(description, "🎁 <@{}> → **{}**", assignment.user_id, prize.name)?;
                }
                None => writeln!(description, "😔 <@{}> → nothing left", assignment.user_id)?,
            }
        }
        Ok(description)
    }

    /// Giveaway helpers for staff.
    #[poise::command(
        slash_command,
        guild_only,
        required_permissions = "MANAGE_GUILD",
        subcommands("giveaway_assign")
    )]
    pub async fn giveaway(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Use `/giveaway assign`.").await?;
        Ok(())
    }

    /// Splits a prize list between winners by their preferences.
    #[poise::command(slash_command, rename = "assign", required_permissions = "MANAGE_GUILD")]
    pub async fn giveaway_assign(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Prizes, comma separated; `Key (x2)` means two keys"] prizes: String,
        #[description = "Winners in order: `@user pref1, pref2; @user2 pref`"] winners: String,
    ) -> Result<()> {
        let winners = parse_winners(&winners);
        let prizes = parse_prizes(&prizes);
        if winners.is_empty() || prizes.is_empty() {
            ctx.say("❌ I need at least one winner mention and one prize.")
                .await?;
            return Ok(());
        }

        let description = render_assignments(&prizes::assign_prizes(&winners, &prizes))?;

        let embed = serenity::CreateEmbed::default()
            .title("🎉 Giveaway results")
            .color(0x00EB_459E)
            .description(description);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_mention() {
            assert_eq!(parse_mention("<@123>"), Some("123".to_string()));
            assert_eq!(parse_mention(" <@!456> "), Some("456".to_string()));
            assert_eq!(parse_mention("<@&789>"), None);
            assert_eq!(parse_mention("@someone"), None);
            assert_eq!(parse_mention("<@>"), None);
        }

        #[test]
        fn test_parse_winners() {
            let winners = parse_winners("<@1> Key A, Nitro; <@2>;  nonsense ; <@3>   Role ");
            assert_eq!(winners.len(), 3);
            assert_eq!(winners[0].user_id, "1");
            assert_eq!(winners[0].preferences, ["Key A", "Nitro"]);
            assert!(winners[1].preferences.is_empty());
            assert_eq!(winners[2].preferences, ["Role"]);
        }

        #[test]
        fn test_parse_prizes() {
            assert_eq!(
                parse_prizes("Key A (x2), Nitro\nRole,, "),
                ["Key A (x2)", "Nitro", "Role"]
            );
        }

        #[test]
        fn test_render_assignments() {
            let winners = parse_winners("<@1> Nitro; <@2> Nitro");
            let rendered =
                render_assignments(&prizes::assign_prizes(&winners, &parse_prizes("Nitro"))).unwrap();
            assert_eq!(rendered, "🎁 <@1> → **Nitro**\n😔 <@2> → nothing left\n");
        }
    }
}

// Re-export all commands
pub use inner::*;
