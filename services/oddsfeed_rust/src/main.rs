mod config;

use crate::config::Config;
use anyhow::{Context, Result};
use betscan_core::pipeline::BatchCoordinator;
use betscan_core::providers::ProviderRegistry;
use betscan_core::store::{MatchStore, PgMatchStore, PgStoreConfig};
use betscan_core::{ArbitrageScanner, Sport};
use chrono::{Duration as ChronoDuration, Utc};
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const SPORTS: &[Sport] = &[Sport::Football];

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!("Starting Odds Feed Service...");

    // Config
    let config = Config::from_env();

    // Database
    let store = PgMatchStore::connect(&config.database_url, &PgStoreConfig::from_env())
        .await
        .context("Failed to connect to database")?;
    let store: Arc<dyn MatchStore> = Arc::new(store);

    // Providers
    let registry = Arc::new(ProviderRegistry::with_defaults());
    let institutions = registry.institutions();
    info!(
        institutions = institutions.len(),
        "provider registry initialized"
    );

    let coordinator = BatchCoordinator::new(registry, store.clone())
        .with_fetch_concurrency(config.fetch_concurrency);
    let scanner = ArbitrageScanner::new(store).with_tap_threshold(config.tap_threshold);

    info!(
        interval_secs = config.scan_interval_secs,
        "entering ingest/scan loop"
    );

    loop {
        match coordinator.run_ingestion_batch(&institutions, SPORTS).await {
            Ok(batch_id) => info!(batch = batch_id, "ingestion batch complete"),
            Err(e) => error!("Ingestion batch failed: {}", e),
        }

        let from = Utc::now() - ChronoDuration::minutes(config.scan_lookback_mins);
        for &sport in SPORTS {
            match scanner.find_opportunities(sport, from).await {
                Ok(opportunities) => {
                    for opportunity in &opportunities {
                        info!("ARBITRAGE: {}", opportunity.summary());
                    }
                }
                Err(e) => error!("Arbitrage scan failed: {}", e),
            }
        }

        tokio::time::sleep(Duration::from_secs(config.scan_interval_secs)).await;
    }
}
