#![allow(dead_code)]

use autotrader::config::Config;
use autotrader::error::AppError;
use autotrader::services::strategies::{StrategyBridge, StrategyFuture, StrategyRequest};
use autotrader::services::{BrokerBridge, SqliteStore, StrategyRegistry};
use autotrader::types::{Decision, IndicatorConfig};
use autotrader::AppState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Lets a test hold a strategy call open.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

/// Strategy with canned answers per symbol. Unknown symbols hold.
pub struct Scripted {
    name: &'static str,
    answers: HashMap<&'static str, Result<Decision, String>>,
    gate: Option<Arc<Gate>>,
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<String>>,
    pub last_indicators: Mutex<Option<IndicatorConfig>>,
}

impl Scripted {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            answers: HashMap::new(),
            gate: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            last_indicators: Mutex::new(None),
        }
    }

    pub fn answer(mut self, symbol: &'static str, decision: Decision) -> Self {
        self.answers.insert(symbol, Ok(decision));
        self
    }

    pub fn fail(mut self, symbol: &'static str, reason: &str) -> Self {
        self.answers.insert(symbol, Err(reason.to_string()));
        self
    }

    pub fn gated(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StrategyBridge for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    fn evaluate<'a>(&'a self, request: &'a StrategyRequest) -> StrategyFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.symbol.clone());
            *self.last_indicators.lock().unwrap() = Some(request.indicators.clone());

            if let Some(gate) = &self.gate {
                gate.entered.notify_one();
                gate.release.notified().await;
            }

            match self.answers.get(request.symbol.as_str()) {
                Some(Ok(decision)) => Ok(decision.clone()),
                Some(Err(reason)) => Err(AppError::ExternalFailure(reason.clone())),
                None => Ok(Decision::Hold),
            }
        })
    }
}

/// Application state over an in-memory store with the given strategies.
pub fn app_state(strategies: Vec<Arc<Scripted>>) -> AppState {
    app_state_with(Config::default(), strategies)
}

pub fn app_state_with(config: Config, strategies: Vec<Arc<Scripted>>) -> AppState {
    let store = Arc::new(SqliteStore::new_in_memory().unwrap());
    let broker = Arc::new(BrokerBridge::new(config.broker.clone()));

    let mut registry = StrategyRegistry::new();
    for strategy in strategies {
        registry.register_arc(strategy);
    }

    AppState::new(config, store, broker, registry, None)
}

pub fn symbols(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
