//! Match Resolver
//!
//! Find-or-create with merge: resolves an incoming match descriptor to the
//! canonical `Match` row for the real-world fixture it describes, creating
//! one when no prior institution has reported it.

use crate::matching::normalize_team_name;
use crate::models::{BettingInstitution, Match, MatchDescriptor};
use crate::pipeline::BatchContext;
use crate::store::MatchStore;
use anyhow::Result;
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Resolves incoming records against the store.
///
/// The find-or-create sequence is not safe under unserialized concurrent
/// execution against the same batch; callers keep all `resolve` calls on a
/// single logical timeline (the batch coordinator does).
pub struct MatchResolver {
    store: Arc<dyn MatchStore>,
}

impl MatchResolver {
    pub fn new(store: Arc<dyn MatchStore>) -> Self {
        Self { store }
    }

    /// Resolve a descriptor to its canonical match row.
    ///
    /// Candidate rows belong to the current batch and share the kickoff
    /// time and at least one normalized name with the descriptor; rows the
    /// institution already contributed to are never candidates, and rows
    /// from prior, unrelated runs never merge. With more than one candidate, only rows where
    /// both names match survive, oldest first. A unique survivor is merged
    /// (contributor set extended). Otherwise an exact same-batch row is
    /// returned unmodified, and failing that a new row is created. Absence
    /// is not an error.
    pub async fn resolve(
        &self,
        descriptor: &MatchDescriptor,
        batch: &BatchContext,
        institution: BettingInstitution,
    ) -> Result<Match> {
        // Descriptors normally arrive with normalized keys already, but the
        // lookup must never depend on the adapter having done so.
        let player_home = normalize_team_name(&descriptor.player_home);
        let player_away = normalize_team_name(&descriptor.player_away);

        let candidates = self
            .store
            .candidate_matches(
                batch.id,
                descriptor.sport,
                &player_home,
                &player_away,
                descriptor.date_time,
                institution,
            )
            .await?;

        // One-sided name hits are enough for a unique candidate; with several,
        // only rows matching both names disambiguate (the OR search can pull
        // in a different fixture sharing one normalized key at the same
        // kickoff time). Surviving ties resolve to the oldest row, which the
        // store guarantees comes first.
        let merged = if candidates.len() == 1 {
            candidates.into_iter().next()
        } else {
            candidates
                .into_iter()
                .find(|m| m.player_home == player_home && m.player_away == player_away)
        };

        if let Some(existing) = merged {
            debug!(
                match_id = %existing.id,
                institution = institution.display_name(),
                "merging institution into existing match"
            );
            return self.store.add_contributor(existing.id, institution).await;
        }

        // The OR search excludes rows this institution contributed to, so a
        // record it already created earlier in the batch would otherwise be
        // duplicated here.
        if let Some(existing) = self
            .store
            .exact_match_in_batch(
                batch.id,
                descriptor.sport,
                &player_home,
                &player_away,
                descriptor.date_time,
            )
            .await?
        {
            debug!(
                match_id = %existing.id,
                "exact match already present in batch, returning unmodified"
            );
            return Ok(existing);
        }

        let now = Utc::now();
        let row = Match {
            id: Uuid::new_v4(),
            player_home,
            player_away,
            player_home_display: descriptor.player_home_display.clone(),
            player_away_display: descriptor.player_away_display.clone(),
            sport: descriptor.sport,
            date_time: descriptor.date_time,
            league: descriptor.league.clone(),
            tournament: descriptor.tournament.clone(),
            batch: batch.id,
            contributors: BTreeSet::from([institution]),
            created_at: now,
            updated_at: now,
        };

        debug!(
            match_id = %row.id,
            home = %row.player_home,
            away = %row.player_away,
            "creating new match row"
        );
        self.store.create_match(row).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sport;
    use crate::store::MemoryStore;
    use chrono::{DateTime, TimeZone, Utc};

    fn kickoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 2, 5, 18, 30, 0).unwrap()
    }

    fn descriptor(home: &str, away: &str) -> MatchDescriptor {
        MatchDescriptor {
            player_home: normalize_team_name(home),
            player_away: normalize_team_name(away),
            player_home_display: home.to_string(),
            player_away_display: away.to_string(),
            sport: Sport::Football,
            date_time: kickoff(),
            league: Some("Premier League".to_string()),
            tournament: None,
        }
    }

    fn setup() -> (Arc<MemoryStore>, MatchResolver) {
        let store = Arc::new(MemoryStore::new());
        let resolver = MatchResolver::new(store.clone());
        (store, resolver)
    }

    #[tokio::test]
    async fn test_two_institutions_resolve_to_one_match() {
        let (store, resolver) = setup();
        let batch = BatchContext::new();

        let first = resolver
            .resolve(
                &descriptor("FC Barcelona", "Real Madrid"),
                &batch,
                BettingInstitution::Meridian,
            )
            .await
            .unwrap();
        let second = resolver
            .resolve(
                &descriptor("Barcelona", "Madrid CF Real"),
                &batch,
                BettingInstitution::Volcano,
            )
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.match_count(), 1);
        // The second call's contributor set is a superset of the first's.
        assert!(second.contributors.is_superset(&first.contributors));
        assert!(second.has_contributor(BettingInstitution::Volcano));
    }

    #[tokio::test]
    async fn test_different_batches_never_merge() {
        let (store, resolver) = setup();
        let first_batch = BatchContext::new();
        let second_batch = BatchContext::new();

        let first = resolver
            .resolve(
                &descriptor("FC Barcelona", "Real Madrid"),
                &first_batch,
                BettingInstitution::Meridian,
            )
            .await
            .unwrap();
        // Candidate search is batch-scoped, so even a different institution
        // reporting the identical fixture in a new run creates a fresh row
        // instead of merging into the stale one.
        let second = resolver
            .resolve(
                &descriptor("FC Barcelona", "Real Madrid"),
                &second_batch,
                BettingInstitution::Volcano,
            )
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(store.match_count(), 2);
        assert!(!second.has_contributor(BettingInstitution::Meridian));
    }

    #[tokio::test]
    async fn test_same_institution_same_batch_reuses_row() {
        let (store, resolver) = setup();
        let batch = BatchContext::new();

        let first = resolver
            .resolve(
                &descriptor("FC Barcelona", "Real Madrid"),
                &batch,
                BettingInstitution::Meridian,
            )
            .await
            .unwrap();
        let second = resolver
            .resolve(
                &descriptor("FC Barcelona", "Real Madrid"),
                &batch,
                BettingInstitution::Meridian,
            )
            .await
            .unwrap();

        // The exact-in-batch guard returns the row unmodified instead of
        // creating a duplicate.
        assert_eq!(first.id, second.id);
        assert_eq!(store.match_count(), 1);
        assert_eq!(second.contributors, first.contributors);
    }

    #[tokio::test]
    async fn test_or_collision_narrowed_by_exact_pair() {
        let (store, resolver) = setup();
        let batch = BatchContext::new();

        // Two different fixtures at the same kickoff sharing the away key.
        let game_one = resolver
            .resolve(
                &descriptor("FC Barcelona", "Real Madrid"),
                &batch,
                BettingInstitution::Meridian,
            )
            .await
            .unwrap();
        let game_two = resolver
            .resolve(
                &descriptor("Sevilla", "Real Madrid"),
                &batch,
                BettingInstitution::Meridian,
            )
            .await
            .unwrap();
        assert_ne!(game_one.id, game_two.id);

        // A second institution reporting the first fixture sees both rows
        // through the OR search; only the exact (home AND away) row merges.
        let merged = resolver
            .resolve(
                &descriptor("Barcelona", "Real Madrid"),
                &batch,
                BettingInstitution::Volcano,
            )
            .await
            .unwrap();

        assert_eq!(merged.id, game_one.id);
        assert!(merged.has_contributor(BettingInstitution::Volcano));
        assert_eq!(store.match_count(), 2);
    }

    #[tokio::test]
    async fn test_one_sided_hit_still_merges_unique_candidate() {
        let (_store, resolver) = setup();
        let batch = BatchContext::new();

        let created = resolver
            .resolve(
                &descriptor("FC Barcelona", "Real Madrid"),
                &batch,
                BettingInstitution::Meridian,
            )
            .await
            .unwrap();

        // The second institution canonicalizes the away side differently
        // ("Real" alone), so only the home key matches. A unique candidate
        // merges even on a one-sided hit.
        let merged = resolver
            .resolve(
                &MatchDescriptor {
                    player_away: "real".to_string(),
                    player_away_display: "Real".to_string(),
                    ..descriptor("FC Barcelona", "Real Madrid")
                },
                &batch,
                BettingInstitution::Volcano,
            )
            .await
            .unwrap();

        assert_eq!(merged.id, created.id);
        assert!(merged.has_contributor(BettingInstitution::Volcano));
    }
}
