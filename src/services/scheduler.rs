//! Auto-Trade Scheduler
//!
//! Owns the single recurring auto-trade job. Each tick takes the analysis
//! lock, reads the user's current symbol set and evaluates the configured
//! strategy for every symbol in order. A tick that finds the lock taken is
//! skipped, never queued.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::services::orders::{OrderDispatcher, OrderIntent};
use crate::services::{AnalysisExecutor, AnalysisGuard, BotStateMachine};
use crate::types::{BatchReport, Decision, IndicatorConfig, ScheduleConfig, SymbolOutcome};

/// Persistence collaborator consulted at the start of every analysis pass.
pub trait TradingRepository: Send + Sync {
    /// The user's saved symbols, in saved order.
    fn fetch_symbols<'a>(
        &'a self,
        user_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, AppError>> + Send + 'a>>;

    /// The user's indicator periods, or the defaults.
    fn indicator_config<'a>(
        &'a self,
        user_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<IndicatorConfig, AppError>> + Send + 'a>>;
}

/// Validate start parameters and build the schedule config.
pub fn schedule_config(
    user_id: &str,
    volume: f64,
    strategy: &str,
    interval_minutes: u32,
) -> Result<ScheduleConfig, AppError> {
    if user_id.trim().is_empty() {
        return Err(AppError::InvalidInput("User ID is required".to_string()));
    }
    if !(volume.is_finite() && volume > 0.0) {
        return Err(AppError::InvalidInput("Volume must be positive".to_string()));
    }
    if strategy.trim().is_empty() {
        return Err(AppError::InvalidInput("Strategy is required".to_string()));
    }

    Ok(ScheduleConfig {
        user_id: user_id.to_string(),
        volume,
        strategy: strategy.to_string(),
        interval_minutes,
    })
}

/// The live recurring job.
struct JobHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl JobHandle {
    fn cancel(&self) {
        // The job may already have exited
        let _ = self.shutdown.send(true);
    }
}

/// State shared between the scheduler and its job task.
struct Shared {
    state: Arc<BotStateMachine>,
    executor: Arc<AnalysisExecutor>,
    repository: Arc<dyn TradingRepository>,
    orders: Option<OrderDispatcher>,
    last_report: Mutex<Option<BatchReport>>,
}

impl Shared {
    async fn run_batch(&self, config: &ScheduleConfig) -> Result<BatchReport, AppError> {
        let guard = self.state.begin_analysis()?;
        Ok(self.analyze(config, guard).await)
    }

    /// Evaluate every symbol while `_guard` holds the analysis lock.
    async fn analyze(&self, config: &ScheduleConfig, _guard: AnalysisGuard<'_>) -> BatchReport {
        let started_at = chrono::Utc::now().timestamp_millis();
        let mut report = BatchReport {
            user_id: config.user_id.clone(),
            strategy: config.strategy.clone(),
            started_at,
            finished_at: started_at,
            outcomes: Vec::new(),
            error: None,
        };

        match self.load_inputs(&config.user_id).await {
            Ok((symbols, indicators)) => {
                debug!("Batch over {} symbols for {}", symbols.len(), config.user_id);
                for symbol in symbols {
                    let decision = self
                        .executor
                        .evaluate(&config.user_id, &symbol, &config.strategy, &indicators)
                        .await
                        .unwrap_or_else(|e| Decision::Error(e.to_string()));

                    self.handle_decision(config, &symbol, &decision);
                    report.outcomes.push(SymbolOutcome { symbol, decision });
                }
            }
            Err(e) => {
                error!("Could not load batch inputs for {}: {}", config.user_id, e);
                report.error = Some(e.to_string());
            }
        }

        report.finished_at = chrono::Utc::now().timestamp_millis();
        info!(
            "Batch for {} finished: {} symbols, {} actionable, {} errors",
            config.user_id,
            report.outcomes.len(),
            report.actionable_count(),
            report.error_count()
        );

        *self
            .last_report
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(report.clone());

        report
    }

    async fn load_inputs(&self, user_id: &str) -> Result<(Vec<String>, IndicatorConfig), AppError> {
        let symbols = self.repository.fetch_symbols(user_id).await?;
        let indicators = self.repository.indicator_config(user_id).await?;
        Ok((symbols, indicators))
    }

    fn handle_decision(&self, config: &ScheduleConfig, symbol: &str, decision: &Decision) {
        let Some(intent) = OrderIntent::from_decision(&config.user_id, symbol, config.volume, decision)
        else {
            return;
        };

        match &self.orders {
            Some(orders) => {
                orders.dispatch(intent);
            }
            None => info!(
                "Order placement disabled, not sending {} {} {}",
                intent.side, intent.volume, intent.symbol
            ),
        }
    }

    /// One scheduled tick. Lock contention skips the tick, and so does a
    /// schedule that was stopped after the tick fired.
    async fn tick(&self, config: &ScheduleConfig) {
        match self.state.begin_scheduled_analysis(config) {
            Ok(guard) => {
                self.analyze(config, guard).await;
            }
            Err(AppError::Busy) => warn!("Analysis already in progress, skipping tick"),
            Err(AppError::NotActive) => debug!("Schedule for {} stopped, skipping tick", config.user_id),
            Err(e) => error!("Auto-trade tick failed: {}", e),
        }
    }
}

async fn run_job(
    shared: Arc<Shared>,
    config: ScheduleConfig,
    first_tick: Instant,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }

        if *shutdown.borrow() {
            break;
        }

        shared.tick(&config).await;
    }

    info!("Auto-trade job for {} stopped", config.user_id);
}

/// Auto-trade scheduler. At most one job exists at any time.
pub struct Scheduler {
    shared: Arc<Shared>,
    job: Mutex<Option<JobHandle>>,
}

impl Scheduler {
    pub fn new(
        state: Arc<BotStateMachine>,
        executor: Arc<AnalysisExecutor>,
        repository: Arc<dyn TradingRepository>,
        orders: Option<OrderDispatcher>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state,
                executor,
                repository,
                orders,
                last_report: Mutex::new(None),
            }),
            job: Mutex::new(None),
        }
    }

    fn job(&self) -> MutexGuard<'_, Option<JobHandle>> {
        self.job.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start auto-trading. The first tick fires one full period from now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        &self,
        user_id: &str,
        volume: f64,
        strategy: &str,
        interval_minutes: u32,
    ) -> Result<ScheduleConfig, AppError> {
        let config = schedule_config(user_id, volume, strategy, interval_minutes)?;
        self.shared.executor.registry().validate(&config.strategy)?;

        let mut job = self.job();
        self.shared.state.try_activate(config.clone())?;

        if let Some(stale) = job.take() {
            warn!("Replacing a job left behind by an earlier schedule");
            stale.cancel();
        }

        let period = Duration::from_secs(60 * u64::from(config.period_minutes()));
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_job(
            self.shared.clone(),
            config.clone(),
            Instant::now() + period,
            period,
            shutdown_rx,
        ));
        *job = Some(JobHandle { shutdown, task });

        info!(
            "Auto-trade started for {}: strategy={} volume={} every {}m",
            config.user_id,
            config.strategy,
            config.volume,
            config.period_minutes()
        );
        Ok(config)
    }

    /// Stop auto-trading. No tick begins after this returns; a tick already
    /// running finishes on its own.
    pub fn stop(&self) -> Result<ScheduleConfig, AppError> {
        let mut job = self.job();
        let config = self.shared.state.deactivate()?;

        if let Some(handle) = job.take() {
            handle.cancel();
        }

        info!("Auto-trade stopped for {}", config.user_id);
        Ok(config)
    }

    /// Run one batch immediately under the analysis lock.
    pub async fn run_batch(&self, config: &ScheduleConfig) -> Result<BatchReport, AppError> {
        self.shared.run_batch(config).await
    }

    /// Report of the most recent completed batch.
    pub fn last_report(&self) -> Option<BatchReport> {
        self.shared
            .last_report
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a job is registered.
    pub fn has_job(&self) -> bool {
        self.job().is_some()
    }

    /// Stop any schedule and wait for its job to finish. Used at teardown.
    pub async fn shutdown(&self) {
        let handle = {
            let mut job = self.job();
            if self.shared.state.deactivate().is_ok() {
                info!("Auto-trade stopped for shutdown");
            }
            job.take()
        };

        if let Some(handle) = handle {
            handle.cancel();
            if let Err(e) = handle.task.await {
                error!("Auto-trade job ended abnormally: {}", e);
            }
        }
    }
}
