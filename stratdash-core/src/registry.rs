//! Strategy registry — resolves strategy ids to trait objects.
//!
//! Built once with [`StrategyRegistry::with_builtins`] and shared read-only
//! afterwards (it is `Send + Sync`, so an `Arc` or a plain reference works
//! across threads). Iteration order is registration order.

use std::sync::Arc;

use crate::strategies::{BuyAndHold, DonchianBreakout, MaCrossover, Strategy, SupportResistance};

/// Errors that can occur while building a registry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("strategy id '{0}' is already registered")]
    DuplicateId(String),
}

#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn Strategy>>,
}

impl StrategyRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in strategy.
    pub fn with_builtins() -> Self {
        Self {
            strategies: vec![
                Arc::new(SupportResistance),
                Arc::new(MaCrossover),
                Arc::new(DonchianBreakout),
                Arc::new(BuyAndHold),
            ],
        }
    }

    pub fn register(&mut self, strategy: Arc<dyn Strategy>) -> Result<(), RegistryError> {
        if self.get(strategy.id()).is_some() {
            return Err(RegistryError::DuplicateId(strategy.id().to_string()));
        }
        self.strategies.push(strategy);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Strategy>> {
        self.strategies.iter().find(|s| s.id() == id).cloned()
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.id()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Strategy>> {
        self.strategies.iter()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}
