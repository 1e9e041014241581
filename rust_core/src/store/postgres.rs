//! Postgres `MatchStore` implementation.
//!
//! Plain `sqlx::query` against the `sport_match` and `sport_match_odds`
//! tables. Table layout and migrations are owned by the persistence layer;
//! this module only reads and writes the agreed columns. The contributor
//! set is stored as an `int[]` column of institution ids.

use super::MatchStore;
use crate::models::{BatchId, BettingInstitution, Match, OddsMap, OddsSnapshot, Sport};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::collections::BTreeSet;
use std::env;
use std::time::Duration;
use uuid::Uuid;

/// Connection pool settings, overridable from the environment.
#[derive(Debug, Clone)]
pub struct PgStoreConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PgStoreConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

impl PgStoreConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_connections: env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_connections),
            min_connections: env::var("DB_MIN_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.min_connections),
            acquire_timeout: env::var("DB_ACQUIRE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.acquire_timeout),
        }
    }
}

pub struct PgMatchStore {
    pool: PgPool,
}

impl PgMatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a pool and wrap it in a store.
    pub async fn connect(database_url: &str, config: &PgStoreConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(database_url)
            .await
            .context("Failed to create database connection pool")?;

        tracing::info!(
            "Database pool created: max={}, min={}",
            config.max_connections,
            config.min_connections
        );

        Ok(Self::new(pool))
    }
}

const MATCH_COLUMNS: &str = "id, player_home, player_away, player_home_display, \
     player_away_display, date_time, sport, league, tournament, batch, \
     betting_institution, created_at, updated_at";

fn match_from_row(row: &PgRow) -> Result<Match> {
    let sport_id: i32 = row.try_get("sport")?;
    let sport =
        Sport::from_id(sport_id).ok_or_else(|| anyhow!("unknown sport id {}", sport_id))?;

    let contributor_ids: Vec<i32> = row.try_get("betting_institution")?;
    let mut contributors = BTreeSet::new();
    for id in contributor_ids {
        contributors.insert(
            BettingInstitution::from_id(id)
                .ok_or_else(|| anyhow!("unknown institution id {}", id))?,
        );
    }

    Ok(Match {
        id: row.try_get("id")?,
        player_home: row.try_get("player_home")?,
        player_away: row.try_get("player_away")?,
        player_home_display: row.try_get("player_home_display")?,
        player_away_display: row.try_get("player_away_display")?,
        sport,
        date_time: row.try_get("date_time")?,
        league: row.try_get("league")?,
        tournament: row.try_get("tournament")?,
        batch: row.try_get("batch")?,
        contributors,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn snapshot_from_row(row: &PgRow) -> Result<OddsSnapshot> {
    let institution_id: i32 = row.try_get("betting_institution")?;
    let institution = BettingInstitution::from_id(institution_id)
        .ok_or_else(|| anyhow!("unknown institution id {}", institution_id))?;

    let odds_json: serde_json::Value = row.try_get("odds")?;
    let odds: OddsMap =
        serde_json::from_value(odds_json).context("malformed odds payload in sport_match_odds")?;

    Ok(OddsSnapshot {
        id: row.try_get("id")?,
        institution,
        match_id: row.try_get("match_id")?,
        odds,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl MatchStore for PgMatchStore {
    async fn candidate_matches(
        &self,
        batch: BatchId,
        sport: Sport,
        player_home: &str,
        player_away: &str,
        date_time: DateTime<Utc>,
        exclude: BettingInstitution,
    ) -> Result<Vec<Match>> {
        let rows = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM sport_match \
             WHERE batch = $1 AND sport = $2 AND date_time = $3 \
               AND (player_home = $4 OR player_away = $5) \
               AND NOT ($6 = ANY(betting_institution)) \
             ORDER BY created_at, id"
        ))
        .bind(batch)
        .bind(sport.as_id())
        .bind(date_time)
        .bind(player_home)
        .bind(player_away)
        .bind(exclude.as_id())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(match_from_row).collect()
    }

    async fn exact_match_in_batch(
        &self,
        batch: BatchId,
        sport: Sport,
        player_home: &str,
        player_away: &str,
        date_time: DateTime<Utc>,
    ) -> Result<Option<Match>> {
        let row = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM sport_match \
             WHERE batch = $1 AND sport = $2 AND date_time = $3 \
               AND player_home = $4 AND player_away = $5 \
             ORDER BY created_at, id LIMIT 1"
        ))
        .bind(batch)
        .bind(sport.as_id())
        .bind(date_time)
        .bind(player_home)
        .bind(player_away)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    async fn create_match(&self, m: Match) -> Result<Match> {
        let contributor_ids: Vec<i32> = m.contributors.iter().map(|c| c.as_id()).collect();

        sqlx::query(
            "INSERT INTO sport_match ( \
                 id, player_home, player_away, player_home_display, \
                 player_away_display, date_time, sport, league, tournament, \
                 batch, betting_institution, created_at, updated_at \
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(m.id)
        .bind(&m.player_home)
        .bind(&m.player_away)
        .bind(&m.player_home_display)
        .bind(&m.player_away_display)
        .bind(m.date_time)
        .bind(m.sport.as_id())
        .bind(&m.league)
        .bind(&m.tournament)
        .bind(m.batch)
        .bind(&contributor_ids)
        .bind(m.created_at)
        .bind(m.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(m)
    }

    async fn add_contributor(
        &self,
        match_id: Uuid,
        institution: BettingInstitution,
    ) -> Result<Match> {
        let row = sqlx::query(&format!(
            "UPDATE sport_match \
             SET betting_institution = CASE \
                     WHEN $2 = ANY(betting_institution) THEN betting_institution \
                     ELSE array_append(betting_institution, $2) \
                 END, \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {MATCH_COLUMNS}"
        ))
        .bind(match_id)
        .bind(institution.as_id())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| anyhow!("match {} not found", match_id))?;

        match_from_row(&row)
    }

    async fn matches_for_sport(&self, sport: Sport, from: DateTime<Utc>) -> Result<Vec<Match>> {
        let rows = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM sport_match \
             WHERE sport = $1 AND date_time >= $2 \
             ORDER BY created_at, id"
        ))
        .bind(sport.as_id())
        .bind(from)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(match_from_row).collect()
    }

    async fn upsert_odds(
        &self,
        institution: BettingInstitution,
        match_id: Uuid,
        odds: OddsMap,
    ) -> Result<OddsSnapshot> {
        let odds_json = serde_json::to_value(&odds)?;

        let row = sqlx::query(
            "INSERT INTO sport_match_odds ( \
                 id, betting_institution, odds, match_id, created_at, updated_at \
             ) VALUES ($1, $2, $3, $4, NOW(), NOW()) \
             ON CONFLICT (betting_institution, match_id) DO UPDATE \
                 SET odds = EXCLUDED.odds, updated_at = NOW() \
             RETURNING id, betting_institution, odds, match_id, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(institution.as_id())
        .bind(odds_json)
        .bind(match_id)
        .fetch_one(&self.pool)
        .await?;

        snapshot_from_row(&row)
    }

    async fn odds_for_match(&self, match_id: Uuid) -> Result<Vec<OddsSnapshot>> {
        let rows = sqlx::query(
            "SELECT id, betting_institution, odds, match_id, created_at, updated_at \
             FROM sport_match_odds \
             WHERE match_id = $1 \
             ORDER BY created_at, betting_institution",
        )
        .bind(match_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(snapshot_from_row).collect()
    }
}
