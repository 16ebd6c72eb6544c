//! Price action strategy
//!
//! Reads candle structure rather than indicators, so the indicator periods
//! are ignored. The script takes fixed lot and stop distances instead.

use std::sync::Arc;

use super::{parse_signal, StrategyBridge, StrategyFuture, StrategyRequest};
use crate::services::BrokerBridge;

pub const PRICE_ACTION_SCRIPT: &str = "price_action_script.py";

const LOT_SIZE: f64 = 0.1;
const STOP_LOSS_PIPS: u32 = 10;
const TAKE_PROFIT_PIPS: u32 = 20;

pub struct PriceActionStrategy {
    broker: Arc<BrokerBridge>,
}

impl PriceActionStrategy {
    pub fn new(broker: Arc<BrokerBridge>) -> Self {
        Self { broker }
    }

    pub fn script_args(request: &StrategyRequest) -> Vec<String> {
        vec![
            request.symbol.clone(),
            LOT_SIZE.to_string(),
            STOP_LOSS_PIPS.to_string(),
            TAKE_PROFIT_PIPS.to_string(),
        ]
    }
}

impl StrategyBridge for PriceActionStrategy {
    fn name(&self) -> &str {
        "price_action"
    }

    fn evaluate<'a>(&'a self, request: &'a StrategyRequest) -> StrategyFuture<'a> {
        Box::pin(async move {
            let output = self
                .broker
                .run_strategy(PRICE_ACTION_SCRIPT, &Self::script_args(request))
                .await?;
            parse_signal(&output)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IndicatorConfig;

    #[test]
    fn test_script_args_ignore_indicators() {
        let request = StrategyRequest {
            user_id: "u1".to_string(),
            symbol: "XAUUSD".to_string(),
            indicators: IndicatorConfig {
                rsi_period: 99,
                ..IndicatorConfig::default()
            },
        };
        assert_eq!(
            PriceActionStrategy::script_args(&request),
            vec!["XAUUSD", "0.1", "10", "20"]
        );
    }
}
