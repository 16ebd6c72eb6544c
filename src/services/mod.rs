pub mod bot_state;
pub mod broker;
pub mod executor;
pub mod on_demand;
pub mod orders;
pub mod scheduler;
pub mod sqlite_store;
pub mod strategies;

pub use bot_state::{AnalysisGuard, BotStateMachine};
pub use broker::{BrokerBridge, LoginOutcome, TradeManagerCommand};
pub use executor::AnalysisExecutor;
pub use on_demand::OnDemandRunner;
pub use orders::{OrderDispatcher, OrderIntent, OrderPlacer};
pub use scheduler::{Scheduler, TradingRepository};
pub use sqlite_store::SqliteStore;
pub use strategies::{StrategyBridge, StrategyRegistry};
