//! Analysis Executor
//!
//! Runs a single strategy evaluation for one (user, symbol) pair. Strategy
//! failures, panics and timeouts become [`Decision::Error`] so a batch can carry on;
//! only an unknown strategy identifier is returned as an error.

use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::services::strategies::{StrategyRegistry, StrategyRequest};
use crate::types::{Decision, IndicatorConfig};

pub struct AnalysisExecutor {
    registry: Arc<StrategyRegistry>,
    timeout: Duration,
}

impl AnalysisExecutor {
    pub fn new(registry: Arc<StrategyRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub async fn evaluate(
        &self,
        user_id: &str,
        symbol: &str,
        strategy_id: &str,
        indicators: &IndicatorConfig,
    ) -> Result<Decision, AppError> {
        let strategy = self.registry.resolve(strategy_id)?;

        let request = StrategyRequest {
            user_id: user_id.to_string(),
            symbol: symbol.to_string(),
            indicators: indicators.clone(),
        };

        debug!("Evaluating {} for {} ({})", strategy.name(), symbol, user_id);

        let evaluation = AssertUnwindSafe(strategy.evaluate(&request)).catch_unwind();

        let decision = match tokio::time::timeout(self.timeout, evaluation).await {
            Ok(Ok(Ok(decision))) => decision,
            Ok(Ok(Err(e))) => {
                warn!("Strategy {} failed for {}: {}", strategy.name(), symbol, e);
                Decision::Error(e.to_string())
            }
            Ok(Err(_)) => {
                error!("Strategy {} panicked for {}", strategy.name(), symbol);
                Decision::Error("strategy panicked".to_string())
            }
            Err(_) => {
                warn!(
                    "Strategy {} timed out for {} after {:?}",
                    strategy.name(),
                    symbol,
                    self.timeout
                );
                Decision::Error(format!("timed out after {}ms", self.timeout.as_millis()))
            }
        };

        if decision.is_actionable() {
            info!("{} decision for {}: {:?}", strategy.name(), symbol, decision);
        }

        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::strategies::{StrategyBridge, StrategyFuture};

    struct Fixed(&'static str, Decision);

    impl StrategyBridge for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        fn evaluate<'a>(&'a self, _request: &'a StrategyRequest) -> StrategyFuture<'a> {
            let decision = self.1.clone();
            Box::pin(async move { Ok(decision) })
        }
    }

    struct Failing;

    impl StrategyBridge for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn evaluate<'a>(&'a self, _request: &'a StrategyRequest) -> StrategyFuture<'a> {
            Box::pin(async { Err(AppError::ExternalFailure("terminal offline".to_string())) })
        }
    }

    struct Stalled;

    impl StrategyBridge for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        fn evaluate<'a>(&'a self, _request: &'a StrategyRequest) -> StrategyFuture<'a> {
            Box::pin(async {
                std::future::pending::<()>().await;
                Ok(Decision::Hold)
            })
        }
    }

    fn executor() -> AnalysisExecutor {
        let mut registry = StrategyRegistry::new();
        registry.register(Fixed("swing", Decision::Buy));
        registry.register(Failing);
        registry.register(Stalled);
        AnalysisExecutor::new(Arc::new(registry), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_returns_strategy_decision() {
        let decision = executor()
            .evaluate("u1", "EURUSD", "swing", &IndicatorConfig::default())
            .await
            .unwrap();
        assert_eq!(decision, Decision::Buy);
    }

    #[tokio::test]
    async fn test_unknown_strategy_propagates() {
        let err = executor()
            .evaluate("u1", "EURUSD", "martingale", &IndicatorConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownStrategy(_)));
    }

    #[tokio::test]
    async fn test_failure_becomes_error_decision() {
        let decision = executor()
            .evaluate("u1", "EURUSD", "failing", &IndicatorConfig::default())
            .await
            .unwrap();
        match decision {
            Decision::Error(reason) => assert!(reason.contains("terminal offline")),
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_error_decision() {
        let decision = executor()
            .evaluate("u1", "EURUSD", "stalled", &IndicatorConfig::default())
            .await
            .unwrap();
        assert_eq!(decision, Decision::Error("timed out after 5000ms".to_string()));
    }
}
