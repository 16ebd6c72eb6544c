//! Autotrader - scheduled strategy execution for a brokerage terminal

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod types;
pub mod websocket;

use axum::{http::HeaderValue, routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use config::Config;
use services::{
    AnalysisExecutor, BotStateMachine, BrokerBridge, OnDemandRunner, OrderDispatcher, Scheduler,
    SqliteStore, StrategyRegistry,
};
use websocket::StatusNotifier;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<SqliteStore>,
    pub broker: Arc<BrokerBridge>,
    pub bot_state: Arc<BotStateMachine>,
    pub scheduler: Arc<Scheduler>,
    pub on_demand: Arc<OnDemandRunner>,
    pub notifier: Arc<StatusNotifier>,
}

impl AppState {
    /// Wire the trading core together.
    ///
    /// `orders` is `None` when order placement is disabled. The notifier's
    /// forwarder is not started here, see [`StatusNotifier::spawn_forwarder`].
    pub fn new(
        config: Config,
        store: Arc<SqliteStore>,
        broker: Arc<BrokerBridge>,
        registry: StrategyRegistry,
        orders: Option<OrderDispatcher>,
    ) -> Self {
        let bot_state = Arc::new(BotStateMachine::new());
        let executor = Arc::new(AnalysisExecutor::new(
            Arc::new(registry),
            strategy_deadline(&config),
        ));

        let scheduler = Arc::new(Scheduler::new(
            bot_state.clone(),
            executor.clone(),
            store.clone(),
            orders.clone(),
        ));
        let on_demand = Arc::new(OnDemandRunner::new(
            bot_state.clone(),
            executor,
            store.clone(),
            orders,
        ));
        let notifier = StatusNotifier::new(bot_state.clone());

        Self {
            config: Arc::new(config),
            store,
            broker,
            bot_state,
            scheduler,
            on_demand,
            notifier,
        }
    }
}

/// The executor's deadline sits just above the script deadline so a hung
/// script is reported by the bridge, which also kills it.
fn strategy_deadline(config: &Config) -> Duration {
    config.broker.strategy_timeout + Duration::from_secs(5)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            warn!("Invalid CORS origin {:?}, allowing any origin", origin);
            cors.allow_origin(Any)
        }
    }
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(api::router())
        .route("/ws", get(websocket::ws_handler))
        .layer(cors_layer(&state.config.cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
