//! Region to provider routing.

use std::collections::BTreeMap;
use std::sync::Arc;

use courtside_core::Region;
use courtside_providers::CourtProvider;

/// The providers available to the engine, one per region.
#[derive(Clone, Default)]
pub struct ProviderSet {
    providers: BTreeMap<Region, Arc<dyn CourtProvider>>,
}

impl ProviderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `provider` for the region it serves, replacing any other.
    pub fn with(mut self, provider: Arc<dyn CourtProvider>) -> Self {
        self.providers.insert(provider.region(), provider);
        self
    }

    pub fn get(&self, region: Region) -> Option<&Arc<dyn CourtProvider>> {
        self.providers.get(&region)
    }

    /// Registered regions in order.
    pub fn regions(&self) -> impl Iterator<Item = Region> + '_ {
        self.providers.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.providers.values().map(|p| p.name()))
            .finish()
    }
}
