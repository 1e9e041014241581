//! Team-Name Matching
//!
//! Canonicalizes free-text team names into short, stable join keys so that
//! records from different institutions can be reconciled, and houses the
//! match resolver built on top of those keys.

pub mod resolver;

pub use resolver::MatchResolver;

/// Diacritic letters used by the source locale; kept alongside ASCII
/// alphanumerics when stripping punctuation.
const LOCALE_DIACRITICS: &[char] = &['č', 'Č', 'š', 'Š', 'ž', 'Ž'];

/// Canonicalize a free-text team name into a stable join key.
///
/// Deterministic, pure and total on non-empty input. The key is built from
/// the longest one or two tokens of the cleaned name, which makes it robust
/// to abbreviations, club suffixes and sponsor prefixes that differ across
/// sources. Distinct teams sharing a long token can collide; that is an
/// accepted trade-off of the keying scheme.
pub fn normalize_team_name(raw_name: &str) -> String {
    let cleaned: String = raw_name
        .chars()
        .filter(|c| {
            c.is_ascii_alphanumeric() || c.is_whitespace() || LOCALE_DIACRITICS.contains(c)
        })
        .collect();

    let lowered = cleaned.to_lowercase();
    let mut tokens: Vec<&str> = lowered.split_whitespace().collect();
    if tokens.is_empty() {
        return String::new();
    }

    // Stable sort: equal-length tokens keep their original relative order.
    tokens.sort_by_key(|t| t.chars().count());

    if tokens.len() < 2 {
        return tokens[0].to_string();
    }

    let first = tokens[tokens.len() - 2];
    let second = tokens[tokens.len() - 1];
    if first.chars().count() == second.chars().count() {
        format!("{} {}", first, second)
    } else {
        second.to_string()
    }
}
