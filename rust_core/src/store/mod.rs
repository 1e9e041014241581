//! Persistence boundary for reconciled matches and odds snapshots.
//!
//! The resolver and the arbitrage scanner only ever talk to the
//! [`MatchStore`] trait; the concrete table layout and migrations are owned
//! by the persistence layer behind it. Two implementations are provided:
//! an in-memory store for tests and offline runs, and a Postgres store.

use crate::models::{BatchId, BettingInstitution, Match, OddsMap, OddsSnapshot, Sport};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::{PgMatchStore, PgStoreConfig};

/// Store of canonical `Match` rows and per-institution `OddsSnapshot` rows.
///
/// Absence is never an error here: lookups return `Option`/empty vectors and
/// "create" is a normal branch for the callers.
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Matches within `batch` at the given kickoff time where either
    /// normalized name matches, excluding rows the institution already
    /// contributed to. Deduplication is batch-scoped: rows from prior,
    /// unrelated runs are never candidates.
    ///
    /// Candidates are returned oldest-first (by `created_at`) so that
    /// callers picking "the first exact match" are deterministic.
    async fn candidate_matches(
        &self,
        batch: BatchId,
        sport: Sport,
        player_home: &str,
        player_away: &str,
        date_time: DateTime<Utc>,
        exclude: BettingInstitution,
    ) -> Result<Vec<Match>>;

    /// Row within `batch` matching both normalized names exactly at the
    /// given kickoff time, if one exists (oldest if several do).
    async fn exact_match_in_batch(
        &self,
        batch: BatchId,
        sport: Sport,
        player_home: &str,
        player_away: &str,
        date_time: DateTime<Utc>,
    ) -> Result<Option<Match>>;

    /// Persist a freshly created match row.
    async fn create_match(&self, m: Match) -> Result<Match>;

    /// Extend a match's contributor set and return the updated row.
    async fn add_contributor(
        &self,
        match_id: Uuid,
        institution: BettingInstitution,
    ) -> Result<Match>;

    /// All matches for a sport with kickoff on or after `from`.
    async fn matches_for_sport(&self, sport: Sport, from: DateTime<Utc>) -> Result<Vec<Match>>;

    /// Upsert the odds payload for (institution, match). Replaces the whole
    /// payload; never creates a second row for the same key.
    async fn upsert_odds(
        &self,
        institution: BettingInstitution,
        match_id: Uuid,
        odds: OddsMap,
    ) -> Result<OddsSnapshot>;

    /// Snapshots for a match in stable load order (insertion order, ties by
    /// institution id).
    async fn odds_for_match(&self, match_id: Uuid) -> Result<Vec<OddsSnapshot>>;
}
