//! Provider Registry
//!
//! Lookup table from betting institution to its fetch adapter. The batch
//! coordinator routes every (institution, sport) pair through here; an
//! unregistered institution simply contributes nothing.

use super::meridian::{MeridianConfig, MeridianProvider};
use super::OddsProvider;
use crate::models::BettingInstitution;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub struct ProviderRegistry {
    providers: HashMap<BettingInstitution, Arc<dyn OddsProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Create a registry with every bundled provider registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(MeridianProvider::new(MeridianConfig::default())));

        info!(
            "ProviderRegistry initialized with {} providers",
            registry.providers.len()
        );
        registry
    }

    /// Register a provider under its own institution.
    pub fn register(&mut self, provider: Arc<dyn OddsProvider>) {
        info!(
            institution = provider.institution().display_name(),
            provider = provider.provider_name(),
            "registering provider"
        );
        self.providers.insert(provider.institution(), provider);
    }

    pub fn get(&self, institution: BettingInstitution) -> Option<Arc<dyn OddsProvider>> {
        self.providers.get(&institution).cloned()
    }

    pub fn has_provider(&self, institution: BettingInstitution) -> bool {
        self.providers.contains_key(&institution)
    }

    /// All registered institutions.
    pub fn institutions(&self) -> Vec<BettingInstitution> {
        let mut institutions: Vec<BettingInstitution> = self.providers.keys().copied().collect();
        institutions.sort_by_key(|i| i.as_id());
        institutions
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
