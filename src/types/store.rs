//! Persisted record types

use serde::{Deserialize, Serialize};

/// A brokerage account that has logged in at least once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub login: String,
    pub server: String,
    /// Unix timestamp (ms)
    pub created_at: i64,
}

/// A ticker saved to a user's watch list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolRecord {
    pub id: i64,
    pub user_id: String,
    pub symbol: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: String,
    pub user_id: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub symbol: Option<String>,
    pub created_at: i64,
}

/// Outcome of an order handed to the broker bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    Placed,
    Failed,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Placed => "placed",
            TradeStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "placed" => TradeStatus::Placed,
            _ => TradeStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    pub id: String,
    pub user_id: String,
    pub symbol: String,
    pub volume: f64,
    /// "buy" or "sell"
    pub action: String,
    pub status: TradeStatus,
    /// Broker output or failure reason
    pub detail: Option<String>,
    pub created_at: i64,
}
