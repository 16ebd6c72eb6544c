//! Order Dispatcher
//!
//! Turning a decision into an order is a separate step from analysis. Buy and
//! Sell decisions are queued here and a background worker places them through
//! the broker, recording each outcome as a trade.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::services::SqliteStore;
use crate::types::{Decision, TradeRecord, TradeStatus};

/// An order the worker should place.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderIntent {
    pub user_id: String,
    pub symbol: String,
    pub volume: f64,
    pub side: &'static str,
}

impl OrderIntent {
    /// Build an intent for Buy/Sell decisions; `None` for anything else.
    pub fn from_decision(
        user_id: &str,
        symbol: &str,
        volume: f64,
        decision: &Decision,
    ) -> Option<Self> {
        decision.side().map(|side| Self {
            user_id: user_id.to_string(),
            symbol: symbol.to_string(),
            volume,
            side,
        })
    }
}

/// Capability to place an order with the broker.
pub trait OrderPlacer: Send + Sync {
    fn place_order<'a>(
        &'a self,
        order: &'a OrderIntent,
    ) -> Pin<Box<dyn Future<Output = Result<String, AppError>> + Send + 'a>>;
}

/// Handle for queueing orders. Cheap to clone.
#[derive(Clone)]
pub struct OrderDispatcher {
    tx: mpsc::UnboundedSender<OrderIntent>,
    closing: Arc<watch::Sender<bool>>,
}

impl OrderDispatcher {
    /// Start the worker. It exits once every dispatcher handle is dropped,
    /// or after `close` once the queue is drained.
    pub fn spawn(placer: Arc<dyn OrderPlacer>, store: Arc<SqliteStore>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (closing, closing_rx) = watch::channel(false);
        let handle = tokio::spawn(run_worker(rx, closing_rx, placer, store));
        (
            Self {
                tx,
                closing: Arc::new(closing),
            },
            handle,
        )
    }

    /// Stop accepting orders. Orders already queued are still placed.
    pub fn close(&self) {
        self.closing.send_replace(true);
    }

    /// Queue an order without waiting. Returns false if the worker is gone.
    pub fn dispatch(&self, intent: OrderIntent) -> bool {
        match self.tx.send(intent) {
            Ok(()) => true,
            Err(e) => {
                warn!("Order worker stopped, dropping order for {}", e.0.symbol);
                false
            }
        }
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<OrderIntent>,
    mut closing: watch::Receiver<bool>,
    placer: Arc<dyn OrderPlacer>,
    store: Arc<SqliteStore>,
) {
    let mut draining = false;

    loop {
        tokio::select! {
            biased;
            intent = rx.recv() => match intent {
                Some(intent) => place(intent, placer.as_ref(), &store).await,
                None => break,
            },
            _ = closing.changed(), if !draining => {
                info!("Order queue closing, placing what is left");
                rx.close();
                draining = true;
            }
        }
    }

    info!("Order worker stopped");
}

async fn place(intent: OrderIntent, placer: &dyn OrderPlacer, store: &SqliteStore) {
    let (status, detail) = match placer.place_order(&intent).await {
        Ok(output) => {
            info!(
                "Trade opened: {} {} {} for {}",
                intent.side, intent.volume, intent.symbol, intent.user_id
            );
            (TradeStatus::Placed, Some(output).filter(|o| !o.is_empty()))
        }
        Err(e) => {
            error!("Order for {} failed: {}", intent.symbol, e);
            (TradeStatus::Failed, Some(e.to_string()))
        }
    };

    let record = TradeRecord {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: intent.user_id,
        symbol: intent.symbol,
        volume: intent.volume,
        action: intent.side.to_string(),
        status,
        detail,
        created_at: chrono::Utc::now().timestamp_millis(),
    };

    if let Err(e) = store.record_trade(&record) {
        error!("Failed to record trade {}: {}", record.id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPlacer {
        orders: Mutex<Vec<OrderIntent>>,
    }

    impl OrderPlacer for RecordingPlacer {
        fn place_order<'a>(
            &'a self,
            order: &'a OrderIntent,
        ) -> Pin<Box<dyn Future<Output = Result<String, AppError>> + Send + 'a>> {
            Box::pin(async move {
                self.orders.lock().unwrap().push(order.clone());
                if order.symbol == "BADSYM" {
                    Err(AppError::ExternalFailure("symbol not visible".to_string()))
                } else {
                    Ok("ticket 42".to_string())
                }
            })
        }
    }

    #[test]
    fn test_intent_only_for_actionable_decisions() {
        assert!(OrderIntent::from_decision("u1", "EURUSD", 0.1, &Decision::Hold).is_none());
        assert!(
            OrderIntent::from_decision("u1", "EURUSD", 0.1, &Decision::Error("x".into()))
                .is_none()
        );
        let intent = OrderIntent::from_decision("u1", "EURUSD", 0.1, &Decision::Sell).unwrap();
        assert_eq!(intent.side, "sell");
    }

    #[tokio::test]
    async fn test_worker_places_and_records() {
        let placer = Arc::new(RecordingPlacer::default());
        let store = Arc::new(SqliteStore::new_in_memory().unwrap());
        let (dispatcher, handle) = OrderDispatcher::spawn(placer.clone(), store.clone());

        assert!(dispatcher.dispatch(
            OrderIntent::from_decision("u1", "EURUSD", 0.1, &Decision::Buy).unwrap()
        ));
        assert!(dispatcher.dispatch(
            OrderIntent::from_decision("u1", "BADSYM", 0.1, &Decision::Sell).unwrap()
        ));

        drop(dispatcher);
        handle.await.unwrap();

        assert_eq!(placer.orders.lock().unwrap().len(), 2);

        let trades = store.list_trades(None, 10).unwrap();
        assert_eq!(trades.len(), 2);
        let placed = trades.iter().find(|t| t.symbol == "EURUSD").unwrap();
        assert_eq!(placed.status, TradeStatus::Placed);
        assert_eq!(placed.detail.as_deref(), Some("ticket 42"));
        let failed = trades.iter().find(|t| t.symbol == "BADSYM").unwrap();
        assert_eq!(failed.status, TradeStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_drains_queue_while_handles_remain() {
        struct SlowPlacer;
        impl OrderPlacer for SlowPlacer {
            fn place_order<'a>(
                &'a self,
                _order: &'a OrderIntent,
            ) -> Pin<Box<dyn Future<Output = Result<String, AppError>> + Send + 'a>> {
                Box::pin(async {
                    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
                    Ok(String::new())
                })
            }
        }

        let store = Arc::new(SqliteStore::new_in_memory().unwrap());
        let (dispatcher, handle) = OrderDispatcher::spawn(Arc::new(SlowPlacer), store.clone());
        // Scheduler and on-demand runner keep their own copies alive
        let held = dispatcher.clone();

        for symbol in ["EURUSD", "GBPUSD", "USDJPY"] {
            assert!(dispatcher.dispatch(
                OrderIntent::from_decision("u1", symbol, 0.1, &Decision::Buy).unwrap()
            ));
        }

        dispatcher.close();
        tokio::time::timeout(std::time::Duration::from_secs(30), handle)
            .await
            .expect("worker exits after draining")
            .unwrap();

        assert_eq!(store.list_trades(Some("u1"), 10).unwrap().len(), 3);
        assert!(!held.dispatch(
            OrderIntent::from_decision("u1", "AUDUSD", 0.1, &Decision::Sell).unwrap()
        ));
    }
}
