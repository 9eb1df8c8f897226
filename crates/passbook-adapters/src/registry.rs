//! In-memory registry of bank adapters with lookup by id and by site domain.

use crate::adapter::BankAdapter;
use crate::banks::{AllyAdapter, AmexAdapter, CitiAdapter, FidelityAdapter, WellsFargoAdapter};
use passbook_core::{AdapterError, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Adapters indexed by bank id.
///
/// Cloning is cheap and clones share the same set of adapters.
#[derive(Clone)]
pub struct AdapterRegistry {
    adapters: Arc<RwLock<HashMap<&'static str, Arc<dyn BankAdapter>>>>,
}

impl AdapterRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            adapters: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a registry holding every built-in adapter.
    #[must_use]
    pub fn with_default_adapters() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(AllyAdapter::new()));
        registry.register(Arc::new(AmexAdapter::new()));
        registry.register(Arc::new(CitiAdapter::new()));
        registry.register(Arc::new(FidelityAdapter::new()));
        registry.register(Arc::new(WellsFargoAdapter::new()));
        info!(count = registry.len(), "registered bank adapters");
        registry
    }

    /// Add an adapter, replacing any previous adapter with the same id.
    pub fn register(&self, adapter: Arc<dyn BankAdapter>) {
        let mut adapters = self.adapters.write().expect("acquire write lock on adapters");
        let bank_id = adapter.bank_id();
        if adapters.insert(bank_id, adapter).is_some() {
            debug!(bank_id, "replaced bank adapter");
        }
    }

    /// Get an adapter by bank id.
    ///
    /// # Errors
    /// Returns [`AdapterError::UnknownBank`] if no adapter is registered under `bank_id`.
    pub fn get(&self, bank_id: &str) -> Result<Arc<dyn BankAdapter>> {
        let adapters = self.adapters.read().expect("acquire read lock on adapters");
        adapters
            .get(bank_id)
            .cloned()
            .ok_or_else(|| AdapterError::UnknownBank {
                bank_id: bank_id.to_string(),
            })
    }

    /// Find the adapter whose domains cover `host`.
    ///
    /// `host` matches a domain when equal to it or a subdomain of it, so
    /// `online.citi.com` selects the adapter declaring `citi.com`.
    #[must_use]
    pub fn for_domain(&self, host: &str) -> Option<Arc<dyn BankAdapter>> {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        let adapters = self.adapters.read().expect("acquire read lock on adapters");
        adapters
            .values()
            .find(|adapter| {
                adapter.domains().iter().any(|domain| {
                    host == *domain
                        || host
                            .strip_suffix(domain)
                            .is_some_and(|prefix| prefix.ends_with('.'))
                })
            })
            .cloned()
    }

    /// Registered bank ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<&'static str> {
        let adapters = self.adapters.read().expect("acquire read lock on adapters");
        let mut ids: Vec<&'static str> = adapters.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registered adapters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.read().expect("acquire read lock on adapters").len()
    }

    /// Whether no adapters are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
