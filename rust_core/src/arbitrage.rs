//! Arbitrage detection over reconciled matches.
//!
//! For each match the scanner picks, per outcome, the single best odd across
//! all institutions' snapshots, then walks the complementary-outcome pairs.
//! A pair whose Total Arbitrage Percentage (TAP) falls below the threshold is
//! a guaranteed-profit opportunity regardless of the fixture's result.

use crate::models::{
    ArbitrageOpportunity, BettingInstitution, Match, OddsSnapshot, Outcome, Sport,
};
use crate::store::MatchStore;
use anyhow::Result;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info};

/// Total Arbitrage Percentage for one complementary pair of odds.
///
/// 100/odd is the stake (per 100 payout) needed to cover that leg; below
/// 100.0 in total, the combined stake is less than the guaranteed payout.
pub fn tap(first_odd: f64, second_odd: f64) -> f64 {
    (1.0 / first_odd) * 100.0 + (1.0 / second_odd) * 100.0
}

/// Best available odd for one outcome and the institution quoting it.
#[derive(Debug, Clone, Copy)]
struct BestLeg {
    institution: BettingInstitution,
    odd: f64,
}

pub struct ArbitrageScanner {
    store: Arc<dyn MatchStore>,
    tap_threshold: f64,
}

impl ArbitrageScanner {
    pub fn new(store: Arc<dyn MatchStore>) -> Self {
        Self {
            store,
            tap_threshold: 100.0,
        }
    }

    /// Lower thresholds only surface larger margins.
    pub fn with_tap_threshold(mut self, tap_threshold: f64) -> Self {
        self.tap_threshold = tap_threshold;
        self
    }

    /// Scan every match of `sport` starting at or after `from`.
    ///
    /// Matches with odds from fewer than two institutions cannot arbitrage
    /// and are skipped without touching their snapshots.
    pub async fn find_opportunities(
        &self,
        sport: Sport,
        from: DateTime<Utc>,
    ) -> Result<Vec<ArbitrageOpportunity>> {
        let matches = self.store.matches_for_sport(sport, from).await?;
        debug!(matches = matches.len(), "scanning matches for arbitrage");

        let mut scored: Vec<(Match, Vec<OddsSnapshot>)> = Vec::new();
        for m in matches {
            if m.contributors.len() < 2 {
                continue;
            }
            let snapshots = self.store.odds_for_match(m.id).await?;
            if snapshots.len() < 2 {
                continue;
            }
            scored.push((m, snapshots));
        }

        let threshold = self.tap_threshold;
        let mut opportunities: Vec<ArbitrageOpportunity> = scored
            .par_iter()
            .flat_map(|(m, snapshots)| scan_match(m, snapshots, threshold))
            .collect();

        // Deterministic report order independent of rayon scheduling.
        opportunities.sort_by(|a, b| {
            (a.date_time, a.match_id, a.first_outcome)
                .cmp(&(b.date_time, b.match_id, b.first_outcome))
        });

        info!(
            sport = sport.as_str(),
            opportunities = opportunities.len(),
            "arbitrage scan finished"
        );
        Ok(opportunities)
    }
}

fn scan_match(
    m: &Match,
    snapshots: &[OddsSnapshot],
    threshold: f64,
) -> Vec<ArbitrageOpportunity> {
    let mut opportunities = Vec::new();

    for (first_outcome, second_outcome) in Outcome::COMPLEMENTARY_PAIRS {
        let first = best_leg(snapshots, first_outcome);
        let second = best_leg(snapshots, second_outcome);
        let (Some(first), Some(second)) = (first, second) else {
            continue;
        };

        let pair_tap = tap(first.odd, second.odd);
        if pair_tap < threshold {
            opportunities.push(ArbitrageOpportunity {
                match_id: m.id,
                player_home: m.player_home_display.clone(),
                player_away: m.player_away_display.clone(),
                date_time: m.date_time,
                league: m.league.clone(),
                first_outcome,
                second_outcome,
                first_institution: first.institution,
                second_institution: second.institution,
                first_odd: first.odd,
                second_odd: second.odd,
                tap: pair_tap,
            });
        }
    }

    opportunities
}

/// Strictly-greater comparison keeps the earliest snapshot on ties.
fn best_leg(snapshots: &[OddsSnapshot], outcome: Outcome) -> Option<BestLeg> {
    let mut best: Option<BestLeg> = None;
    for snapshot in snapshots {
        let Some(&odd) = snapshot.odds.get(&outcome) else {
            continue;
        };
        match best {
            Some(current) if odd <= current.odd => {}
            _ => {
                best = Some(BestLeg {
                    institution: snapshot.institution,
                    odd,
                })
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OddsMap;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    async fn seed(
        store: &Arc<MemoryStore>,
        legs: &[(BettingInstitution, OddsMap)],
    ) -> Match {
        let contributors: BTreeSet<_> = legs.iter().map(|(i, _)| *i).collect();
        let m = store
            .create_match(Match {
                id: Uuid::new_v4(),
                player_home: "barcelona".to_string(),
                player_away: "madrid".to_string(),
                player_home_display: "FC Barcelona".to_string(),
                player_away_display: "Real Madrid".to_string(),
                sport: Sport::Football,
                date_time: Utc.with_ymd_and_hms(2022, 2, 5, 18, 30, 0).unwrap(),
                league: Some("La Liga".to_string()),
                tournament: None,
                batch: 1,
                contributors,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await
            .unwrap();
        for (institution, odds) in legs {
            store
                .upsert_odds(*institution, m.id, odds.clone())
                .await
                .unwrap();
        }
        m
    }

    fn from_epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_tap_formula() {
        // 100/3 + 100/1.8 = 33.33.. + 55.55.. = 88.88..
        let value = tap(3.0, 1.8);
        assert!((value - 88.888888).abs() < 1e-4);
        assert!(value < 100.0);

        // 100/4 + 100/1.2 = 25 + 83.33.. = 108.33..
        let no_arb = tap(4.0, 1.2);
        assert!(no_arb > 100.0);
    }

    #[tokio::test]
    async fn test_profitable_pair_reported() {
        let store = Arc::new(MemoryStore::new());
        seed(
            &store,
            &[
                (
                    BettingInstitution::Meridian,
                    OddsMap::from([(Outcome::Draw, 3.0)]),
                ),
                (
                    BettingInstitution::Volcano,
                    OddsMap::from([(Outcome::HomeOrAway, 1.8)]),
                ),
            ],
        )
        .await;

        let scanner = ArbitrageScanner::new(store);
        let found = scanner
            .find_opportunities(Sport::Football, from_epoch())
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        let opp = &found[0];
        assert_eq!(opp.first_outcome, Outcome::Draw);
        assert_eq!(opp.second_outcome, Outcome::HomeOrAway);
        assert_eq!(opp.first_institution, BettingInstitution::Meridian);
        assert_eq!(opp.second_institution, BettingInstitution::Volcano);
        assert!((opp.tap - tap(3.0, 1.8)).abs() < 1e-9);
        assert!(opp.profit_margin() > 0.0);
    }

    #[tokio::test]
    async fn test_pairs_judged_independently_across_institutions() {
        let store = Arc::new(MemoryStore::new());
        seed(
            &store,
            &[
                (
                    BettingInstitution::Meridian,
                    OddsMap::from([
                        (Outcome::HomeWin, 1.5),
                        (Outcome::Draw, 4.0),
                        (Outcome::AwayWin, 6.0),
                    ]),
                ),
                (
                    BettingInstitution::Volcano,
                    OddsMap::from([
                        (Outcome::HomeOrDraw, 1.3),
                        (Outcome::DrawOrAway, 2.5),
                        (Outcome::HomeOrAway, 1.2),
                    ]),
                ),
            ],
        )
        .await;

        let scanner = ArbitrageScanner::new(store);
        let found = scanner
            .find_opportunities(Sport::Football, from_epoch())
            .await
            .unwrap();

        // (x @ 4.0, 12 @ 1.2) = 25 + 83.3 = 108.3 and (1 @ 1.5, x2 @ 2.5)
        // = 66.7 + 40 = 106.7 are above fair, but (2 @ 6.0, 1x @ 1.3)
        // = 16.7 + 76.9 = 93.6 is a real opportunity.
        assert_eq!(found.len(), 1);
        let opp = &found[0];
        assert_eq!(opp.first_outcome, Outcome::AwayWin);
        assert_eq!(opp.second_outcome, Outcome::HomeOrDraw);
        assert_eq!(opp.first_institution, BettingInstitution::Meridian);
        assert_eq!(opp.second_institution, BettingInstitution::Volcano);
        assert!((opp.first_odd - 6.0).abs() < 1e-9);
        assert!((opp.second_odd - 1.3).abs() < 1e-9);
        assert!((opp.tap - tap(6.0, 1.3)).abs() < 1e-9);
        assert!(!found
            .iter()
            .any(|o| o.first_outcome == Outcome::Draw
                && o.second_outcome == Outcome::HomeOrAway));
    }

    #[tokio::test]
    async fn test_above_fair_books_not_reported() {
        let store = Arc::new(MemoryStore::new());
        seed(
            &store,
            &[
                (
                    BettingInstitution::Meridian,
                    OddsMap::from([
                        (Outcome::HomeWin, 1.5),
                        (Outcome::Draw, 4.0),
                        (Outcome::AwayWin, 4.0),
                    ]),
                ),
                (
                    BettingInstitution::Volcano,
                    OddsMap::from([
                        (Outcome::HomeOrDraw, 1.3),
                        (Outcome::DrawOrAway, 2.5),
                        (Outcome::HomeOrAway, 1.2),
                    ]),
                ),
            ],
        )
        .await;

        let scanner = ArbitrageScanner::new(store);
        let found = scanner
            .find_opportunities(Sport::Football, from_epoch())
            .await
            .unwrap();

        // Best pairs: (x @ 4.0, 12 @ 1.2) = 108.3, (1 @ 1.5, x2 @ 2.5)
        // = 106.7, (2 @ 4.0, 1x @ 1.3) = 101.9. All above fair.
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_single_institution_never_scanned() {
        let store = Arc::new(MemoryStore::new());
        seed(
            &store,
            &[(
                BettingInstitution::Meridian,
                OddsMap::from([(Outcome::Draw, 10.0), (Outcome::HomeOrAway, 10.0)]),
            )],
        )
        .await;

        let scanner = ArbitrageScanner::new(store);
        let found = scanner
            .find_opportunities(Sport::Football, from_epoch())
            .await
            .unwrap();

        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_best_leg_prefers_higher_odd_across_institutions() {
        let store = Arc::new(MemoryStore::new());
        seed(
            &store,
            &[
                (
                    BettingInstitution::Meridian,
                    OddsMap::from([(Outcome::Draw, 2.5), (Outcome::HomeOrAway, 1.8)]),
                ),
                (
                    BettingInstitution::Volcano,
                    OddsMap::from([(Outcome::Draw, 3.0), (Outcome::HomeOrAway, 1.7)]),
                ),
            ],
        )
        .await;

        let scanner = ArbitrageScanner::new(store);
        let found = scanner
            .find_opportunities(Sport::Football, from_epoch())
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].first_institution, BettingInstitution::Volcano);
        assert_eq!(found[0].second_institution, BettingInstitution::Meridian);
    }

    #[tokio::test]
    async fn test_tie_keeps_first_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let m = seed(
            &store,
            &[
                (
                    BettingInstitution::Meridian,
                    OddsMap::from([(Outcome::Draw, 3.0)]),
                ),
                (
                    BettingInstitution::Volcano,
                    OddsMap::from([(Outcome::Draw, 3.0), (Outcome::HomeOrAway, 1.8)]),
                ),
            ],
        )
        .await;

        let snapshots = store.odds_for_match(m.id).await.unwrap();
        let best = best_leg(&snapshots, Outcome::Draw).unwrap();
        assert_eq!(best.institution, BettingInstitution::Meridian);
    }

    #[tokio::test]
    async fn test_missing_outcome_side_skips_pair() {
        let store = Arc::new(MemoryStore::new());
        seed(
            &store,
            &[
                (
                    BettingInstitution::Meridian,
                    OddsMap::from([(Outcome::Draw, 50.0)]),
                ),
                (
                    BettingInstitution::Volcano,
                    OddsMap::from([(Outcome::HomeOrDraw, 50.0)]),
                ),
            ],
        )
        .await;

        // No complementary counterpart exists for either quoted outcome.
        let scanner = ArbitrageScanner::new(store);
        let found = scanner
            .find_opportunities(Sport::Football, from_epoch())
            .await
            .unwrap();
        assert!(found.is_empty());
    }
}
