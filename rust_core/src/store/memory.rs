//! In-memory `MatchStore` implementation.
//!
//! Backs the test suite and offline runs. Ordering mirrors the Postgres
//! store: candidates come back oldest-first, snapshots in insertion order.

use super::MatchStore;
use crate::models::{BatchId, BettingInstitution, Match, OddsMap, OddsSnapshot, Sport};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    matches: FxHashMap<Uuid, Match>,
    /// Keyed by (institution, match); `seq` preserves insertion order.
    odds: FxHashMap<(BettingInstitution, Uuid), OddsSnapshot>,
    seq: FxHashMap<(BettingInstitution, Uuid), u64>,
    next_seq: u64,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of match rows currently held. Test helper.
    pub fn match_count(&self) -> usize {
        self.inner.read().matches.len()
    }

    /// Number of odds snapshot rows currently held. Test helper.
    pub fn odds_count(&self) -> usize {
        self.inner.read().odds.len()
    }
}

fn sorted_oldest_first(mut rows: Vec<Match>) -> Vec<Match> {
    rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    rows
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn candidate_matches(
        &self,
        batch: BatchId,
        sport: Sport,
        player_home: &str,
        player_away: &str,
        date_time: DateTime<Utc>,
        exclude: BettingInstitution,
    ) -> Result<Vec<Match>> {
        let inner = self.inner.read();
        let rows = inner
            .matches
            .values()
            .filter(|m| {
                m.batch == batch
                    && m.sport == sport
                    && m.date_time == date_time
                    && (m.player_home == player_home || m.player_away == player_away)
                    && !m.has_contributor(exclude)
            })
            .cloned()
            .collect();
        Ok(sorted_oldest_first(rows))
    }

    async fn exact_match_in_batch(
        &self,
        batch: BatchId,
        sport: Sport,
        player_home: &str,
        player_away: &str,
        date_time: DateTime<Utc>,
    ) -> Result<Option<Match>> {
        let inner = self.inner.read();
        let rows = inner
            .matches
            .values()
            .filter(|m| {
                m.batch == batch
                    && m.sport == sport
                    && m.date_time == date_time
                    && m.player_home == player_home
                    && m.player_away == player_away
            })
            .cloned()
            .collect();
        Ok(sorted_oldest_first(rows).into_iter().next())
    }

    async fn create_match(&self, m: Match) -> Result<Match> {
        let mut inner = self.inner.write();
        inner.matches.insert(m.id, m.clone());
        Ok(m)
    }

    async fn add_contributor(
        &self,
        match_id: Uuid,
        institution: BettingInstitution,
    ) -> Result<Match> {
        let mut inner = self.inner.write();
        let row = inner
            .matches
            .get_mut(&match_id)
            .ok_or_else(|| anyhow!("match {} not found", match_id))?;
        row.contributors.insert(institution);
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn matches_for_sport(&self, sport: Sport, from: DateTime<Utc>) -> Result<Vec<Match>> {
        let inner = self.inner.read();
        let rows = inner
            .matches
            .values()
            .filter(|m| m.sport == sport && m.date_time >= from)
            .cloned()
            .collect();
        Ok(sorted_oldest_first(rows))
    }

    async fn upsert_odds(
        &self,
        institution: BettingInstitution,
        match_id: Uuid,
        odds: OddsMap,
    ) -> Result<OddsSnapshot> {
        let mut inner = self.inner.write();
        let key = (institution, match_id);
        let now = Utc::now();

        let existing = inner.odds.get(&key).map(|e| (e.id, e.created_at));
        let snapshot = match existing {
            Some((id, created_at)) => OddsSnapshot {
                id,
                institution,
                match_id,
                odds,
                created_at,
                updated_at: now,
            },
            None => {
                let seq = inner.next_seq;
                inner.next_seq += 1;
                inner.seq.insert(key, seq);
                OddsSnapshot {
                    id: Uuid::new_v4(),
                    institution,
                    match_id,
                    odds,
                    created_at: now,
                    updated_at: now,
                }
            }
        };

        inner.odds.insert(key, snapshot.clone());
        Ok(snapshot)
    }

    async fn odds_for_match(&self, match_id: Uuid) -> Result<Vec<OddsSnapshot>> {
        let inner = self.inner.read();
        let mut rows: Vec<(u64, OddsSnapshot)> = inner
            .odds
            .iter()
            .filter(|((_, mid), _)| *mid == match_id)
            .map(|(key, snap)| (inner.seq.get(key).copied().unwrap_or(u64::MAX), snap.clone()))
            .collect();
        rows.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then(a.1.institution.as_id().cmp(&b.1.institution.as_id()))
        });
        Ok(rows.into_iter().map(|(_, snap)| snap).collect())
    }
}
