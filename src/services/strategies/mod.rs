//! Trading Strategies
//!
//! Every strategy family implements [`StrategyBridge`]: given a user, a symbol
//! and indicator periods, produce a [`Decision`]. The built-in families run
//! their analysis script through the broker bridge and read back a signal.

pub mod momentum;
pub mod price_action;
pub mod registry;
pub mod scalping;
pub mod swing;

pub use momentum::MomentumStrategy;
pub use price_action::PriceActionStrategy;
pub use registry::StrategyRegistry;
pub use scalping::ScalpingStrategy;
pub use swing::SwingStrategy;

use std::future::Future;
use std::pin::Pin;

use crate::error::AppError;
use crate::types::{Decision, IndicatorConfig};

/// Inputs of one strategy evaluation.
#[derive(Debug, Clone)]
pub struct StrategyRequest {
    pub user_id: String,
    pub symbol: String,
    pub indicators: IndicatorConfig,
}

pub type StrategyFuture<'a> = Pin<Box<dyn Future<Output = Result<Decision, AppError>> + Send + 'a>>;

/// Capability shared by all strategy families.
pub trait StrategyBridge: Send + Sync {
    /// Registry identifier, e.g. `"swing"`
    fn name(&self) -> &str;

    /// Evaluate the strategy for one symbol.
    fn evaluate<'a>(&'a self, request: &'a StrategyRequest) -> StrategyFuture<'a>;
}

/// Read the signal from a strategy script's stdout.
///
/// Scripts may print diagnostics before the signal; only the last non-empty
/// line counts.
pub fn parse_signal(output: &str) -> Result<Decision, AppError> {
    let last = output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .unwrap_or("");

    Decision::from_signal(last).ok_or_else(|| {
        AppError::ExternalFailure(format!("unrecognized strategy output: {:?}", last))
    })
}
