//! Bot state and analysis types

use serde::{Deserialize, Serialize};

/// Snapshot of the process-wide auto-trading state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BotState {
    /// Whether a recurring auto-trade job is registered.
    pub auto_trading_active: bool,
    /// Whether an analysis pass (batch or on-demand) is executing.
    pub is_analyzing: bool,
}

impl BotState {
    pub fn status(&self) -> BotStatus {
        if self.auto_trading_active {
            BotStatus::Active
        } else {
            BotStatus::Inactive
        }
    }
}

/// Auto-trading status as shown to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotStatus {
    Active,
    Inactive,
}

/// Wire form of [`BotState`], shared by the HTTP status endpoint and the
/// websocket channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotStatusPayload {
    pub status: BotStatus,
    pub is_analyzing: bool,
}

impl From<BotState> for BotStatusPayload {
    fn from(state: BotState) -> Self {
        Self {
            status: state.status(),
            is_analyzing: state.is_analyzing,
        }
    }
}

/// Parameters of an active auto-trade schedule.
///
/// Replaced only by a stop followed by a new start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfig {
    pub user_id: String,
    pub volume: f64,
    pub strategy: String,
    pub interval_minutes: u32,
}

impl ScheduleConfig {
    /// Tick period in minutes, never below one.
    pub fn period_minutes(&self) -> u32 {
        self.interval_minutes.max(1)
    }
}

/// Indicator periods handed to every strategy evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorConfig {
    #[serde(rename = "shortTermMAPeriod")]
    pub short_term_ma_period: u32,
    #[serde(rename = "longTermMAPeriod")]
    pub long_term_ma_period: u32,
    pub rsi_period: u32,
    pub macd_short_period: u32,
    pub macd_long_period: u32,
    pub macd_signal_period: u32,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            short_term_ma_period: 5,
            long_term_ma_period: 20,
            rsi_period: 14,
            macd_short_period: 12,
            macd_long_period: 26,
            macd_signal_period: 9,
        }
    }
}

impl IndicatorConfig {
    /// Periods in the positional order the strategy scripts expect.
    pub fn as_args(&self) -> Vec<String> {
        [
            self.short_term_ma_period,
            self.long_term_ma_period,
            self.rsi_period,
            self.macd_short_period,
            self.macd_long_period,
            self.macd_signal_period,
        ]
        .iter()
        .map(|p| p.to_string())
        .collect()
    }
}

/// Outcome of evaluating one strategy for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "reason", rename_all = "snake_case")]
pub enum Decision {
    Buy,
    Sell,
    Hold,
    Error(String),
}

impl Decision {
    /// Parse a strategy signal word. Returns `None` for anything unrecognized.
    pub fn from_signal(signal: &str) -> Option<Self> {
        match signal.trim().to_ascii_lowercase().as_str() {
            "buy" => Some(Decision::Buy),
            "sell" => Some(Decision::Sell),
            "hold" | "none" | "" => Some(Decision::Hold),
            _ => None,
        }
    }

    /// Buy or Sell: something the caller may turn into an order.
    pub fn is_actionable(&self) -> bool {
        matches!(self, Decision::Buy | Decision::Sell)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Decision::Error(_))
    }

    /// Order side for actionable decisions.
    pub fn side(&self) -> Option<&'static str> {
        match self {
            Decision::Buy => Some("buy"),
            Decision::Sell => Some("sell"),
            _ => None,
        }
    }
}

/// Decision for one symbol within a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolOutcome {
    pub symbol: String,
    pub decision: Decision,
}

/// Result of one full pass over a user's symbol set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub user_id: String,
    pub strategy: String,
    /// Unix timestamp (ms)
    pub started_at: i64,
    /// Unix timestamp (ms)
    pub finished_at: i64,
    pub outcomes: Vec<SymbolOutcome>,
    /// Set when the batch could not run at all (e.g. symbols unavailable).
    pub error: Option<String>,
}

impl BatchReport {
    pub fn count(&self, predicate: impl Fn(&Decision) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.decision)).count()
    }

    pub fn error_count(&self) -> usize {
        self.count(Decision::is_error)
    }

    pub fn actionable_count(&self) -> usize {
        self.count(Decision::is_actionable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_payload_wire_format() {
        let payload = BotStatusPayload::from(BotState {
            auto_trading_active: true,
            is_analyzing: false,
        });
        let json = serde_json::to_value(payload).unwrap();
        assert_eq!(json["status"], "Active");
        assert_eq!(json["isAnalyzing"], false);
    }

    #[test]
    fn test_signal_parsing() {
        assert_eq!(Decision::from_signal("BUY\n"), Some(Decision::Buy));
        assert_eq!(Decision::from_signal(" sell "), Some(Decision::Sell));
        assert_eq!(Decision::from_signal("none"), Some(Decision::Hold));
        assert_eq!(Decision::from_signal("maybe"), None);
    }

    #[test]
    fn test_period_never_below_one() {
        let config = ScheduleConfig {
            user_id: "u1".to_string(),
            volume: 0.1,
            strategy: "momentum".to_string(),
            interval_minutes: 0,
        };
        assert_eq!(config.period_minutes(), 1);
    }

    #[test]
    fn test_indicator_args_order() {
        assert_eq!(
            IndicatorConfig::default().as_args(),
            vec!["5", "20", "14", "12", "26", "9"]
        );
    }

    #[test]
    fn test_indicator_config_uses_original_field_names() {
        let json = serde_json::to_value(IndicatorConfig::default()).unwrap();
        assert_eq!(json["shortTermMAPeriod"], 5);
        assert_eq!(json["macdSignalPeriod"], 9);
    }
}
