//! Odds provider abstractions.
//!
//! Defines the `OddsProvider` trait implemented once per betting
//! institution (API client or scraper). The batch coordinator only ever
//! consumes this one normalized interface; a provider failure means zero
//! records for that institution this run, never an aborted batch.

use crate::models::{BettingInstitution, MatchOddsRecord, Sport};
use async_trait::async_trait;

pub mod http;
pub mod meridian;
pub mod registry;

pub use registry::ProviderRegistry;

/// Error taxonomy for fetch adapters.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("response code {0} is not a valid successful code")]
    BadResponseCode(reqwest::StatusCode),

    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("no data: {0}")]
    NoData(String),

    #[error("invalid match data: {0}")]
    InvalidMatchData(String),
}

/// One institution's fetch adapter.
///
/// Implementations own their sessions (HTTP client, browser) and produce
/// already-normalized match+odds records; any subset of outcome codes may
/// be present per record.
#[async_trait]
pub trait OddsProvider: Send + Sync {
    /// Fetch all currently published match+odds records for a sport.
    async fn fetch_matches(&self, sport: Sport) -> Result<Vec<MatchOddsRecord>, ProviderError>;

    /// The institution this adapter speaks for.
    fn institution(&self) -> BettingInstitution;

    /// Provider name for logging and debugging.
    fn provider_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::NoData("no leagues to be parsed".to_string());
        assert_eq!(err.to_string(), "no data: no leagues to be parsed");

        let err = ProviderError::BadResponseCode(reqwest::StatusCode::BAD_GATEWAY);
        assert!(err.to_string().contains("502"));
    }
}
