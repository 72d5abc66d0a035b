//! Cost-ordered provider catalog.

use std::path::Path;

use crate::config::{Config, ConfigError, Provider, RoutingConfig};

/// Ordered set of providers, sorted ascending by `cost_per_1k_tokens`.
///
/// Built once at startup and treated as read-only for the process lifetime.
/// The sort is stable, so providers with equal rates keep their declaration
/// order from the config file.
#[derive(Debug, Clone)]
pub struct ProviderCatalog {
    providers: Vec<Provider>,
    routing: RoutingConfig,
}

impl ProviderCatalog {
    /// Build a catalog from already-validated providers.
    pub fn new(mut providers: Vec<Provider>, routing: RoutingConfig) -> Self {
        providers.sort_by(|a, b| a.cost_per_1k_tokens.total_cmp(&b.cost_per_1k_tokens));
        Self { providers, routing }
    }

    /// Load and validate a catalog from a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Config::from_file(path)?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: Config) -> Self {
        Self::new(config.providers, config.routing)
    }

    /// Providers in ascending cost order.
    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn routing(&self) -> &RoutingConfig {
        &self.routing
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
