use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::services::BotStateMachine;
use crate::types::{BotState, ServerMessage};

/// Pushes bot status to connected dashboard clients.
///
/// Delivery is best-effort: a client whose channel has closed is dropped on
/// the next broadcast.
pub struct StatusNotifier {
    clients: DashMap<Uuid, mpsc::UnboundedSender<String>>,
    state: Arc<BotStateMachine>,
}

impl StatusNotifier {
    pub fn new(state: Arc<BotStateMachine>) -> Arc<Self> {
        Arc::new(Self {
            clients: DashMap::new(),
            state,
        })
    }

    /// Register a client and send it the current status.
    ///
    /// The client is registered before the snapshot is read, so a transition
    /// racing the connect reaches it through `broadcast`.
    pub fn on_observer_connect(&self, tx: mpsc::UnboundedSender<String>) -> Uuid {
        let client_id = Uuid::new_v4();
        self.clients.insert(client_id, tx);
        self.send_snapshot(client_id);
        client_id
    }

    /// Send the current status to a single client.
    pub fn send_snapshot(&self, client_id: Uuid) {
        // Holding the entry keeps a concurrent broadcast behind this send
        let Some(client) = self.clients.get(&client_id) else {
            return;
        };
        if let Some(json) = encode(self.state.snapshot()) {
            let _ = client.send(json);
        }
    }

    /// Send a message to a single client.
    pub fn send_to(&self, client_id: Uuid, message: &ServerMessage) {
        if let (Some(client), Ok(json)) = (self.clients.get(&client_id), serde_json::to_string(message)) {
            let _ = client.send(json);
        }
    }

    pub fn unregister(&self, client_id: Uuid) {
        self.clients.remove(&client_id);
    }

    /// Send `state` to every client.
    pub fn broadcast(&self, state: BotState) {
        let Some(json) = encode(state) else {
            return;
        };
        self.clients.retain(|client_id, tx| {
            let open = tx.send(json.clone()).is_ok();
            if !open {
                debug!("Dropping closed status client {}", client_id);
            }
            open
        });
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Relay every state transition to the clients.
    pub fn spawn_forwarder(self: &Arc<Self>) -> JoinHandle<()> {
        let notifier = self.clone();
        let mut events = self.state.subscribe();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(state) => notifier.broadcast(state),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Status forwarder lagged by {} updates, resending snapshot", skipped);
                        notifier.broadcast(notifier.state.snapshot());
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

fn encode(state: BotState) -> Option<String> {
    serde_json::to_string(&ServerMessage::from(state)).ok()
}
