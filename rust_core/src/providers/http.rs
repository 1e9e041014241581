//! Shared HTTP plumbing for API-backed providers.

use super::ProviderError;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Thin wrapper over `reqwest` with the status handling every API client
/// needs: non-2xx responses become `ProviderError::BadResponseCode`.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
}

impl ApiClient {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// GET a JSON document.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::BadResponseCode(status));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}
