use std::sync::Arc;

use tracing::debug;

use super::{AggregateTargetSource, ProcessTargetSource, Target, TargetRegistry, TargetSource};
use crate::engine::EngineBuild;
use crate::memory::ProcessProvider;

/// A discovery source tied to one engine build.
pub trait RteProvider: TargetSource {
    fn build(&self) -> &EngineBuild;

    /// Whether caches of `cache_version` can be poked into this provider's
    /// targets.
    fn supports(&self, cache_version: &str) -> bool;
}

impl<P: ProcessProvider> RteProvider for ProcessTargetSource<P> {
    fn build(&self) -> &EngineBuild {
        ProcessTargetSource::build(self)
    }

    fn supports(&self, cache_version: &str) -> bool {
        self.build().name == cache_version
    }
}

struct ProviderSource(Arc<dyn RteProvider>);

impl TargetSource for ProviderSource {
    fn find_targets(&self) -> Vec<Target> {
        self.0.find_targets()
    }
}

/// Registry of providers; hands out target registries per cache.
#[derive(Default, Clone)]
pub struct RteService {
    providers: Vec<Arc<dyn RteProvider>>,
}

impl RteService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: impl RteProvider + 'static) {
        self.providers.push(Arc::new(provider));
    }

    pub fn providers(&self) -> impl Iterator<Item = &dyn RteProvider> {
        self.providers.iter().map(|p| p.as_ref())
    }

    /// Build a registry over every provider that supports the cache.
    pub fn target_registry(&self, cache_version: &str) -> TargetRegistry {
        let mut source = AggregateTargetSource::new();
        for provider in &self.providers {
            if provider.supports(cache_version) {
                source.push(ProviderSource(Arc::clone(provider)));
            }
        }
        debug!(
            "{} provider(s) support cache version {}",
            source.len(),
            cache_version
        );
        TargetRegistry::new(source)
    }
}
