//! Ingestion pipeline.
//!
//! One ingestion run: a `BatchContext` is created, every
//! (institution, sport) pair is fetched through the provider registry, and
//! each record is resolved and its odds upserted. Fetches run with bounded
//! concurrency; all resolver and odds writes stay on the coordinator's own
//! task, the single-writer discipline the resolver requires.

use crate::matching::MatchResolver;
use crate::models::{BatchId, BettingInstitution, MatchOddsRecord, Sport};
use crate::providers::ProviderRegistry;
use crate::store::MatchStore;
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One ingestion run's logical epoch.
///
/// Created once per run and threaded as a parameter through coordinator and
/// resolver calls; never shared mutable state.
#[derive(Debug, Clone)]
pub struct BatchContext {
    pub id: BatchId,
    pub started_at: DateTime<Utc>,
}

impl BatchContext {
    pub fn new() -> Self {
        Self {
            id: rand::thread_rng().gen::<u32>() as BatchId,
            started_at: Utc::now(),
        }
    }
}

impl Default for BatchContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives one pass over all (institution, sport) pairs.
pub struct BatchCoordinator {
    registry: Arc<ProviderRegistry>,
    store: Arc<dyn MatchStore>,
    fetch_concurrency: usize,
}

impl BatchCoordinator {
    pub fn new(registry: Arc<ProviderRegistry>, store: Arc<dyn MatchStore>) -> Self {
        Self {
            registry,
            store,
            fetch_concurrency: 4,
        }
    }

    /// One fetch worker per institution, bounded.
    pub fn with_fetch_concurrency(mut self, fetch_concurrency: usize) -> Self {
        self.fetch_concurrency = fetch_concurrency.max(1);
        self
    }

    /// Run one ingestion batch and return its id so callers can correlate.
    ///
    /// A failing or unregistered provider contributes zero records for this
    /// run; a malformed record is skipped. Neither aborts the batch.
    pub async fn run_ingestion_batch(
        &self,
        institutions: &[BettingInstitution],
        sports: &[Sport],
    ) -> Result<BatchId> {
        let batch = BatchContext::new();
        let resolver = MatchResolver::new(self.store.clone());

        info!(
            batch = batch.id,
            institutions = institutions.len(),
            sports = sports.len(),
            "starting ingestion batch"
        );

        let mut fetch_tasks = Vec::new();
        for &institution in institutions {
            for &sport in sports {
                match self.registry.get(institution) {
                    Some(provider) => fetch_tasks.push(async move {
                        (institution, sport, provider.fetch_matches(sport).await)
                    }),
                    None => warn!(
                        institution = institution.display_name(),
                        "no provider registered, institution contributes nothing this batch"
                    ),
                }
            }
        }

        let mut fetches =
            stream::iter(fetch_tasks).buffer_unordered(self.fetch_concurrency);

        while let Some((institution, sport, result)) = fetches.next().await {
            let records = match result {
                Ok(records) => records,
                Err(e) => {
                    warn!(
                        institution = institution.display_name(),
                        error = %e,
                        "unable to fetch match odds, institution contributes nothing this batch"
                    );
                    continue;
                }
            };

            info!(
                institution = institution.display_name(),
                sport = sport.as_str(),
                records = records.len(),
                "fetched records"
            );

            for record in records {
                if let Err(e) = self.ingest_record(&resolver, &batch, institution, record).await {
                    warn!(
                        institution = institution.display_name(),
                        error = %e,
                        "skipping malformed record"
                    );
                }
            }
        }

        info!(batch = batch.id, "ingestion batch finished");
        Ok(batch.id)
    }

    async fn ingest_record(
        &self,
        resolver: &MatchResolver,
        batch: &BatchContext,
        institution: BettingInstitution,
        record: MatchOddsRecord,
    ) -> Result<()> {
        validate_record(&record)?;

        let (descriptor, odds) = record.into_parts();
        let resolved = resolver.resolve(&descriptor, batch, institution).await?;
        debug!(
            match_id = %resolved.id,
            home = %resolved.player_home,
            away = %resolved.player_away,
            "upserting odds snapshot"
        );
        self.store.upsert_odds(institution, resolved.id, odds).await?;
        Ok(())
    }
}

fn validate_record(record: &MatchOddsRecord) -> Result<()> {
    if record.player_home_display.trim().is_empty() || record.player_away_display.trim().is_empty()
    {
        bail!("record is missing a player name");
    }
    for (outcome, odd) in &record.bet_odds {
        if !odd.is_finite() || *odd <= 0.0 {
            bail!("unparsable odd {} for outcome {}", odd, outcome.as_str());
        }
    }
    Ok(())
}
