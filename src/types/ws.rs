use super::{BotState, BotStatus};
use serde::{Deserialize, Serialize};

/// Incoming WebSocket message from client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask for the current bot status again
    GetStatus,
}

/// Outgoing WebSocket message to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    BotStatus {
        status: BotStatus,
        is_analyzing: bool,
    },
    Error {
        error: String,
    },
}

impl From<BotState> for ServerMessage {
    fn from(state: BotState) -> Self {
        ServerMessage::BotStatus {
            status: state.status(),
            is_analyzing: state.is_analyzing,
        }
    }
}
