//! Giveaway prize assignment.
//!
//! Prize labels may carry a quantity suffix: `"Key A (x2)"` is two copies of
//! `"Key A"`. Labels are pooled by normalized name (case-insensitive, inner
//! whitespace collapsed). Winners are served in input order: each gets the
//! first preference that still has copies and that they do not already hold,
//! otherwise the first pool entry they do not hold, otherwise nothing.

use std::collections::{HashMap, HashSet};

/// One giveaway winner and their ordered wishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Winner {
    /// Discord user id
    pub user_id: String,
    /// Prize names, most wanted first
    pub preferences: Vec<String>,
}

/// A prize handed to a winner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignedPrize {
    /// Prize name as first written in the prize list, without the suffix
    pub name: String,
    /// Position of that first label in the prize list
    pub index: usize,
}

/// Outcome for one winner; `prize` is `None` once the pool ran dry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Discord user id
    pub user_id: String,
    /// Assigned prize
    pub prize: Option<AssignedPrize>,
}

#[derive(Debug)]
struct PoolEntry {
    key: String,
    name: String,
    index: usize,
    available: u32,
}

/// Lowercases and collapses whitespace so labels compare loosely.
#[must_use]
pub fn normalize_prize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Splits `"Name (xN)"` into the name and `N`; anything else counts once.
#[must_use]
pub fn parse_prize_label(label: &str) -> (String, u32) {
    let trimmed = label.trim();
    let suffix = trimmed
        .strip_suffix(')')
        .and_then(|rest| rest.rfind('(').map(|open| (&rest[..open], &rest[open + 1..])));

    if let Some((name, inner)) = suffix {
        let count = inner
            .trim()
            .strip_prefix(['x', 'X'])
            .and_then(|digits| digits.trim().parse::<u32>().ok())
            .filter(|count| *count >= 1);
        if let Some(count) = count {
            let name = name.trim();
            if !name.is_empty() {
                return (name.to_string(), count);
            }
        }
    }
    (trimmed.to_string(), 1)
}

fn build_pool(prizes: &[String]) -> Vec<PoolEntry> {
    let mut pool: Vec<PoolEntry> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();

    for (index, label) in prizes.iter().enumerate() {
        let (name, count) = parse_prize_label(label);
        let key = normalize_prize_name(&name);
        if key.is_empty() {
            continue;
        }
        if let Some(&slot) = by_key.get(&key) {
            pool[slot].available = pool[slot].available.saturating_add(count);
        } else {
            by_key.insert(key.clone(), pool.len());
            pool.push(PoolEntry {
                key,
                name,
                index,
                available: count,
            });
        }
    }
    pool
}

/// Assigns prizes to winners in order without exceeding any prize's quantity.
#[must_use]
pub fn assign_prizes(winners: &[Winner], prizes: &[String]) -> Vec<Assignment> {
    let mut pool = build_pool(prizes);
    let mut held: HashMap<&str, HashSet<String>> = HashMap::new();

    winners
        .iter()
        .map(|winner| {
            let owned = held.entry(winner.user_id.as_str()).or_default();
            let can_take = |entry: &PoolEntry| entry.available > 0 && !owned.contains(&entry.key);

            let preferred = winner.preferences.iter().find_map(|wish| {
                let key = normalize_prize_name(wish);
                pool.iter().position(|entry| entry.key == key && can_take(entry))
            });
            let slot = preferred.or_else(|| pool.iter().position(can_take));

            let prize = slot.map(|slot| {
                let entry = &mut pool[slot];
                entry.available -= 1;
                owned.insert(entry.key.clone());
                AssignedPrize {
                    name: entry.name.clone(),
                    index: entry.index,
                }
            });

            Assignment {
                user_id: winner.user_id.clone(),
                prize,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn winner(id: &str, preferences: &[&str]) -> Winner {
        Winner {
            user_id: id.to_string(),
            preferences: preferences.iter().map(ToString::to_string).collect(),
        }
    }

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    fn names(assignments: &[Assignment]) -> Vec<Option<&str>> {
        assignments
            .iter()
            .map(|a| a.prize.as_ref().map(|p| p.name.as_str()))
            .collect()
    }

    #[test]
    fn test_parse_prize_label() {
        assert_eq!(parse_prize_label("Key A (x2)"), ("Key A".to_string(), 2));
        assert_eq!(parse_prize_label("  Nitro (X3)  "), ("Nitro".to_string(), 3));
        assert_eq!(parse_prize_label("Key B ( x 4 )"), ("Key B".to_string(), 4));
        assert_eq!(parse_prize_label("Key A"), ("Key A".to_string(), 1));
        assert_eq!(parse_prize_label("Game (x0)"), ("Game (x0)".to_string(), 1));
        assert_eq!(parse_prize_label("Game (deluxe)"), ("Game (deluxe)".to_string(), 1));
        assert_eq!(parse_prize_label("(x2)"), ("(x2)".to_string(), 1));
    }

    #[test]
    fn test_normalize_prize_name() {
        assert_eq!(normalize_prize_name("  Key   A "), "key a");
        assert_eq!(normalize_prize_name("KEY a"), normalize_prize_name("key A"));
    }

    #[test]
    fn test_single_copy_goes_to_first_winner() {
        let result = assign_prizes(
            &[winner("u1", &["Key A"]), winner("u2", &["Key A"])],
            &labels(&["Key A (x1)"]),
        );
        assert_eq!(
            result[0].prize,
            Some(AssignedPrize {
                name: "Key A".to_string(),
                index: 0
            })
        );
        assert_eq!(result[1].prize, None);
    }

    #[test]
    fn test_preferences_then_fallback() {
        let pool = labels(&["Steam Key (x2)", "Nitro", "Role"]);
        let result = assign_prizes(
            &[
                winner("u1", &["nitro", "steam key"]),
                winner("u2", &["NITRO"]),
                winner("u3", &["Unknown"]),
                winner("u4", &[]),
                winner("u5", &["Nitro"]),
            ],
            &pool,
        );
        assert_eq!(
            names(&result),
            [
                Some("Nitro"),
                Some("Steam Key"),
                Some("Steam Key"),
                Some("Role"),
                None
            ]
        );
        assert_eq!(result[3].prize.as_ref().unwrap().index, 2);
    }

    #[test]
    fn test_repeat_winner_never_gets_same_prize_twice() {
        let result = assign_prizes(
            &[winner("u1", &["Key"]), winner("u1", &["Key"])],
            &labels(&["Key (x2)", "Badge"]),
        );
        assert_eq!(names(&result), [Some("Key"), Some("Badge")]);

        let exhausted = assign_prizes(
            &[winner("u1", &[]), winner("u1", &[])],
            &labels(&["Key (x5)"]),
        );
        assert_eq!(names(&exhausted), [Some("Key"), None]);
    }

    #[test]
    fn test_duplicate_labels_merge() {
        let result = assign_prizes(
            &[winner("a", &["key"]), winner("b", &["key"]), winner("c", &["key"])],
            &labels(&["Key", "Badge", "key (x1)"]),
        );
        assert_eq!(names(&result), [Some("Key"), Some("Key"), Some("Badge")]);
        assert!(result[..2]
            .iter()
            .all(|a| a.prize.as_ref().unwrap().index == 0));
    }

    #[test]
    fn test_quantity_bound_holds() {
        let pool = labels(&["A (x2)", "B (x1)", "C (x3)"]);
        let winners: Vec<_> = (0..10)
            .map(|i| winner(&format!("u{i}"), &["A", "B"]))
            .collect();
        let result = assign_prizes(&winners, &pool);

        let count = |name: &str| {
            result
                .iter()
                .filter(|a| a.prize.as_ref().is_some_and(|p| p.name == name))
                .count()
        };
        assert_eq!(count("A"), 2);
        assert_eq!(count("B"), 1);
        assert_eq!(count("C"), 3);
        assert_eq!(result.iter().filter(|a| a.prize.is_none()).count(), 4);
    }
}
