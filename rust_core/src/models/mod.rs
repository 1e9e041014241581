// Shared models for Betscan Rust services
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

// ============================================================================
// Sport & Institution Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sport {
    Football,
}

impl Sport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::Football => "FOOTBALL",
        }
    }

    /// Integer tag used by the persisted schema.
    pub fn as_id(&self) -> i32 {
        match self {
            Sport::Football => 1,
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(Sport::Football),
            _ => None,
        }
    }
}

/// Closed set of betting institutions the system ingests from.
///
/// The integer ids are part of the persisted schema; the human-readable
/// names are used in reporting only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BettingInstitution {
    Olimpwin,
    Zlatnik,
    Admiral,
    Meridian,
    Volcano,
    Sbbet,
    Premier,
    Sansa,
    Lob,
    Lvbet,
    Maxbet,
}

impl BettingInstitution {
    pub const ALL: [BettingInstitution; 11] = [
        BettingInstitution::Olimpwin,
        BettingInstitution::Zlatnik,
        BettingInstitution::Admiral,
        BettingInstitution::Meridian,
        BettingInstitution::Volcano,
        BettingInstitution::Sbbet,
        BettingInstitution::Premier,
        BettingInstitution::Sansa,
        BettingInstitution::Lob,
        BettingInstitution::Lvbet,
        BettingInstitution::Maxbet,
    ];

    pub fn as_id(&self) -> i32 {
        match self {
            BettingInstitution::Olimpwin => 1,
            BettingInstitution::Zlatnik => 2,
            BettingInstitution::Admiral => 3,
            BettingInstitution::Meridian => 4,
            BettingInstitution::Volcano => 5,
            BettingInstitution::Sbbet => 6,
            BettingInstitution::Premier => 7,
            BettingInstitution::Sansa => 8,
            BettingInstitution::Lob => 9,
            BettingInstitution::Lvbet => 10,
            BettingInstitution::Maxbet => 11,
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|i| i.as_id() == id)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BettingInstitution::Olimpwin => "OLIMP",
            BettingInstitution::Zlatnik => "ZLATNIK",
            BettingInstitution::Admiral => "ADMIRAL",
            BettingInstitution::Meridian => "MERIDIAN",
            BettingInstitution::Volcano => "VOLCANO",
            BettingInstitution::Sbbet => "SBBET",
            BettingInstitution::Premier => "PREMIER",
            BettingInstitution::Sansa => "SANSA",
            BettingInstitution::Lob => "LOB",
            BettingInstitution::Lvbet => "LVBET",
            BettingInstitution::Maxbet => "MAXBET",
        }
    }
}

// ============================================================================
// Outcome Codes & Odds
// ============================================================================

/// Football match outcome codes as published by the institutions.
///
/// `1`/`x`/`2` are the plain result markets; `1x`/`x2`/`12` are the
/// double-chance markets covering two results at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "1")]
    HomeWin,
    #[serde(rename = "x")]
    Draw,
    #[serde(rename = "2")]
    AwayWin,
    #[serde(rename = "1x")]
    HomeOrDraw,
    #[serde(rename = "x2")]
    DrawOrAway,
    #[serde(rename = "12")]
    HomeOrAway,
}

impl Outcome {
    /// The three pairs of outcomes that jointly cover every possible result.
    pub const COMPLEMENTARY_PAIRS: [(Outcome, Outcome); 3] = [
        (Outcome::Draw, Outcome::HomeOrAway),
        (Outcome::HomeWin, Outcome::DrawOrAway),
        (Outcome::AwayWin, Outcome::HomeOrDraw),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::HomeWin => "1",
            Outcome::Draw => "x",
            Outcome::AwayWin => "2",
            Outcome::HomeOrDraw => "1x",
            Outcome::DrawOrAway => "x2",
            Outcome::HomeOrAway => "12",
        }
    }
}

/// Mapping from outcome code to decimal price. Any subset of codes may be
/// present; missing codes are simply absent from aggregation.
pub type OddsMap = BTreeMap<Outcome, f64>;

// ============================================================================
// Canonical Match Entity
// ============================================================================

/// Identifier of one ingestion run. Scopes deduplication so records from a
/// new run never merge into stale rows left by a prior, unrelated run.
pub type BatchId = i64;

/// The canonical entity for one real-world fixture as the ingestion
/// pipeline currently understands it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: Uuid,
    /// Normalized join keys (output of the team-name normalizer).
    pub player_home: String,
    pub player_away: String,
    /// Raw names as published by the institution that created the row.
    pub player_home_display: String,
    pub player_away_display: String,
    pub sport: Sport,
    pub date_time: DateTime<Utc>,
    pub league: Option<String>,
    pub tournament: Option<String>,
    pub batch: BatchId,
    /// Every institution that has contributed odds for this match.
    pub contributors: BTreeSet<BettingInstitution>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Match {
    pub fn has_contributor(&self, institution: BettingInstitution) -> bool {
        self.contributors.contains(&institution)
    }
}

/// One institution's current view of one match's market.
///
/// Composite identity is (institution, match_id): a second snapshot from the
/// same institution replaces the payload, it never creates a second row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OddsSnapshot {
    pub id: Uuid,
    pub institution: BettingInstitution,
    pub match_id: Uuid,
    pub odds: OddsMap,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Fetch-Adapter Records
// ============================================================================

/// Odds-free match descriptor, as handed to the resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchDescriptor {
    pub player_home: String,
    pub player_away: String,
    pub player_home_display: String,
    pub player_away_display: String,
    pub sport: Sport,
    pub date_time: DateTime<Utc>,
    pub league: Option<String>,
    pub tournament: Option<String>,
}

/// One raw normalized record produced by a fetch adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchOddsRecord {
    pub player_home: String,
    pub player_away: String,
    pub player_home_display: String,
    pub player_away_display: String,
    pub sport: Sport,
    pub date_time: DateTime<Utc>,
    pub league: Option<String>,
    pub tournament: Option<String>,
    pub bet_odds: OddsMap,
}

impl MatchOddsRecord {
    /// Separate the odds payload from the match descriptor.
    pub fn into_parts(self) -> (MatchDescriptor, OddsMap) {
        let MatchOddsRecord {
            player_home,
            player_away,
            player_home_display,
            player_away_display,
            sport,
            date_time,
            league,
            tournament,
            bet_odds,
        } = self;
        (
            MatchDescriptor {
                player_home,
                player_away,
                player_home_display,
                player_away_display,
                sport,
                date_time,
                league,
                tournament,
            },
            bet_odds,
        )
    }
}

// ============================================================================
// Arbitrage Opportunity (derived, never persisted)
// ============================================================================

/// A complementary-outcome pair whose best cross-institution odds cover
/// every possible result for less than the payout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrageOpportunity {
    pub match_id: Uuid,
    pub player_home: String,
    pub player_away: String,
    pub date_time: DateTime<Utc>,
    pub league: Option<String>,
    pub first_outcome: Outcome,
    pub second_outcome: Outcome,
    pub first_institution: BettingInstitution,
    pub second_institution: BettingInstitution,
    pub first_odd: f64,
    pub second_odd: f64,
    /// Total Arbitrage Percentage: 100/odd summed over both legs.
    pub tap: f64,
}

impl ArbitrageOpportunity {
    /// Guaranteed margin over a fully hedged stake, in percent.
    pub fn profit_margin(&self) -> f64 {
        100.0 - self.tap
    }

    /// One-line report string.
    pub fn summary(&self) -> String {
        format!(
            "{} vs {} ({}): {} @ {:.2} [{}] + {} @ {:.2} [{}] => TAP {:.2}",
            self.player_home,
            self.player_away,
            self.date_time.format("%Y-%m-%d %H:%M"),
            self.first_outcome.as_str(),
            self.first_odd,
            self.first_institution.display_name(),
            self.second_outcome.as_str(),
            self.second_odd,
            self.second_institution.display_name(),
            self.tap,
        )
    }
}
