use std::collections::HashMap;
use std::sync::Arc;

use super::{MomentumStrategy, PriceActionStrategy, ScalpingStrategy, StrategyBridge, SwingStrategy};
use crate::error::AppError;
use crate::services::BrokerBridge;

/// Identifiers the dashboard has historically sent for the same strategy.
const ALIASES: &[(&str, &str)] = &[("priceAction", "price_action")];

/// Registry mapping strategy identifiers to their implementations.
///
/// Lookups never fall back: an unknown identifier is an error.
pub struct StrategyRegistry {
    strategies: HashMap<String, Arc<dyn StrategyBridge>>,
}

impl StrategyRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Registry with the four script-backed families.
    pub fn with_builtin(broker: Arc<BrokerBridge>) -> Self {
        let mut registry = Self::new();
        registry.register(SwingStrategy::new(broker.clone()));
        registry.register(MomentumStrategy::new(broker.clone()));
        registry.register(ScalpingStrategy::new(broker.clone()));
        registry.register(PriceActionStrategy::new(broker));
        registry
    }

    /// Register a strategy under its own name, replacing any previous one.
    pub fn register<S>(&mut self, strategy: S)
    where
        S: StrategyBridge + 'static,
    {
        self.register_arc(Arc::new(strategy));
    }

    pub fn register_arc(&mut self, strategy: Arc<dyn StrategyBridge>) {
        self.strategies.insert(strategy.name().to_string(), strategy);
    }

    fn canonical<'a>(&self, id: &'a str) -> &'a str {
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == id)
            .map(|(_, canonical)| *canonical)
            .unwrap_or(id)
    }

    /// Resolve a strategy by identifier.
    pub fn resolve(&self, id: &str) -> Result<Arc<dyn StrategyBridge>, AppError> {
        self.strategies
            .get(self.canonical(id))
            .cloned()
            .ok_or_else(|| AppError::UnknownStrategy(id.to_string()))
    }

    /// Check an identifier without resolving it.
    pub fn validate(&self, id: &str) -> Result<(), AppError> {
        self.resolve(id).map(|_| ())
    }

    /// Registered identifiers, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.strategies.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BrokerConfig;

    fn builtin() -> StrategyRegistry {
        StrategyRegistry::with_builtin(Arc::new(BrokerBridge::new(BrokerConfig::default())))
    }

    #[test]
    fn test_builtin_families() {
        assert_eq!(
            builtin().ids(),
            vec!["momentum", "price_action", "scalping", "swing"]
        );
    }

    #[test]
    fn test_unknown_strategy_is_an_error() {
        let err = builtin().validate("martingale").unwrap_err();
        match err {
            AppError::UnknownStrategy(id) => assert_eq!(id, "martingale"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_empty_registry_has_no_fallback() {
        assert!(StrategyRegistry::new().resolve("swing").is_err());
    }

    #[test]
    fn test_alias_resolves_to_canonical() {
        let registry = builtin();
        assert_eq!(registry.resolve("priceAction").unwrap().name(), "price_action");
    }
}
