//! Core library for the Betscan odds platform.
//!
//! Fetch adapters pull 1x2 and double-chance markets from betting
//! institutions, the matching layer reconciles records that describe the
//! same real-world fixture, the store keeps canonical matches with
//! per-institution odds snapshots, and the arbitrage scanner searches the
//! merged books for complementary-outcome pairs priced below fair.

pub mod arbitrage;
pub mod matching;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod store;

pub use arbitrage::{tap, ArbitrageScanner};
pub use matching::{normalize_team_name, MatchResolver};
pub use models::{
    ArbitrageOpportunity, BatchId, BettingInstitution, Match, MatchOddsRecord, OddsMap,
    OddsSnapshot, Outcome, Sport,
};
pub use pipeline::{BatchContext, BatchCoordinator};
pub use providers::{OddsProvider, ProviderError, ProviderRegistry};
pub use store::{MatchStore, MemoryStore, PgMatchStore, PgStoreConfig};
