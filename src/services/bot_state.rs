//! Bot State Machine
//!
//! Owns the process-wide auto-trading status and the analysis lock. All
//! mutation goes through the transition methods below; every transition is
//! published to subscribers.

use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::AppError;
use crate::types::{BotState, ScheduleConfig};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct Inner {
    /// Present exactly while auto-trading is active.
    config: Option<ScheduleConfig>,
    analyzing: bool,
}

impl Inner {
    fn snapshot(&self) -> BotState {
        BotState {
            auto_trading_active: self.config.is_some(),
            is_analyzing: self.analyzing,
        }
    }
}

/// Process-wide auto-trading state.
pub struct BotStateMachine {
    inner: Mutex<Inner>,
    events: broadcast::Sender<BotState>,
}

impl BotStateMachine {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Mutex::new(Inner::default()),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send the current state while the caller still holds the lock, so
    /// subscribers see transitions in the order they were applied.
    fn publish(&self, inner: &Inner) -> BotState {
        let state = inner.snapshot();
        // No subscribers is fine
        let _ = self.events.send(state);
        state
    }

    fn log_transition(state: BotState) {
        debug!(
            "Bot state: active={} analyzing={}",
            state.auto_trading_active, state.is_analyzing
        );
    }

    /// Inactive -> Active. Rejected without changes when already active.
    pub fn try_activate(&self, config: ScheduleConfig) -> Result<(), AppError> {
        let state = {
            let mut inner = self.lock();
            if inner.config.is_some() {
                return Err(AppError::AlreadyActive);
            }
            inner.config = Some(config);
            self.publish(&inner)
        };
        Self::log_transition(state);
        Ok(())
    }

    /// Active -> Inactive, handing back the retired config.
    pub fn deactivate(&self) -> Result<ScheduleConfig, AppError> {
        let (config, state) = {
            let mut inner = self.lock();
            let config = inner.config.take().ok_or(AppError::NotActive)?;
            (config, self.publish(&inner))
        };
        Self::log_transition(state);
        Ok(config)
    }

    /// Take the analysis lock without waiting.
    ///
    /// The returned guard releases the lock when dropped, so every exit path
    /// of an analysis pass ends the analysis.
    pub fn begin_analysis(&self) -> Result<AnalysisGuard<'_>, AppError> {
        let state = {
            let mut inner = self.lock();
            if inner.analyzing {
                return Err(AppError::Busy);
            }
            inner.analyzing = true;
            self.publish(&inner)
        };
        Self::log_transition(state);
        Ok(AnalysisGuard { machine: self })
    }

    /// Take the analysis lock for a scheduled tick of `config`.
    ///
    /// Fails with `NotActive` once that schedule has been stopped, checked
    /// under the same lock as `deactivate`.
    pub fn begin_scheduled_analysis(
        &self,
        config: &ScheduleConfig,
    ) -> Result<AnalysisGuard<'_>, AppError> {
        let state = {
            let mut inner = self.lock();
            if inner.config.as_ref() != Some(config) {
                return Err(AppError::NotActive);
            }
            if inner.analyzing {
                return Err(AppError::Busy);
            }
            inner.analyzing = true;
            self.publish(&inner)
        };
        Self::log_transition(state);
        Ok(AnalysisGuard { machine: self })
    }

    /// Clear the analysis flag. Always succeeds.
    pub fn end_analysis(&self) {
        let state = {
            let mut inner = self.lock();
            inner.analyzing = false;
            self.publish(&inner)
        };
        Self::log_transition(state);
    }

    pub fn snapshot(&self) -> BotState {
        self.lock().snapshot()
    }

    /// Config of the active schedule, if any.
    pub fn config(&self) -> Option<ScheduleConfig> {
        self.lock().config.clone()
    }

    pub fn is_active(&self) -> bool {
        self.lock().config.is_some()
    }

    /// Receive every state published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<BotState> {
        self.events.subscribe()
    }
}

impl Default for BotStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Held for the duration of one analysis pass.
#[must_use = "dropping the guard ends the analysis immediately"]
pub struct AnalysisGuard<'a> {
    machine: &'a BotStateMachine,
}

impl Drop for AnalysisGuard<'_> {
    fn drop(&mut self) {
        self.machine.end_analysis();
    }
}
