use anyhow::Context;
use autotrader::config::Config;
use autotrader::services::{BrokerBridge, OrderDispatcher, SqliteStore, StrategyRegistry};
use autotrader::AppState;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const ORDER_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "autotrader=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!("Starting autotrader on {}:{}", config.host, config.port);

    let store = Arc::new(
        SqliteStore::new(&config.database_path)
            .with_context(|| format!("opening database {}", config.database_path))?,
    );
    let broker = Arc::new(BrokerBridge::new(config.broker.clone()));
    let registry = StrategyRegistry::with_builtin(broker.clone());
    info!("Strategies available: {}", registry.ids().join(", "));

    let order_queue = if config.place_orders {
        info!("Order placement enabled");
        Some(OrderDispatcher::spawn(broker.clone(), store.clone()))
    } else {
        info!("Order placement disabled, decisions are only logged");
        None
    };
    let orders = order_queue.as_ref().map(|(dispatcher, _)| dispatcher.clone());

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(config, store, broker, registry, orders);
    let _forwarder = state.notifier.spawn_forwarder();
    let scheduler = state.scheduler.clone();

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Autotrader listening on {}", addr);

    axum::serve(listener, autotrader::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await;

    if let Some((dispatcher, worker)) = order_queue {
        dispatcher.close();
        match tokio::time::timeout(ORDER_DRAIN_TIMEOUT, worker).await {
            Ok(Ok(())) => info!("Order queue drained"),
            Ok(Err(e)) => error!("Order worker ended abnormally: {}", e),
            Err(_) => warn!("Order queue not drained after {:?}", ORDER_DRAIN_TIMEOUT),
        }
    }

    info!("Autotrader stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
