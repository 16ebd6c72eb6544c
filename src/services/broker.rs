//! Broker Bridge
//!
//! The brokerage terminal is driven through external scripts. Each call spawns
//! the configured interpreter, waits for it under a deadline and normalizes
//! every failure into [`AppError::ExternalFailure`].

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::BrokerConfig;
use crate::error::AppError;
use crate::services::orders::{OrderIntent, OrderPlacer};

pub const LOGIN_SCRIPT: &str = "mt5_login.py";
pub const TRADE_MANAGER_SCRIPT: &str = "mt5_trade_manager.py";
pub const ORDER_SCRIPT: &str = "place_trade.py";

/// Result of a terminal login attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginOutcome {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Position management commands understood by the trade manager script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeManagerCommand {
    GetOpenTrades,
    CloseAllTrades,
    CloseTradesInProfit,
    CloseTradesInLoss,
    IsAutotradeActive,
    SetAutotrade(bool),
}

impl TradeManagerCommand {
    pub fn args(&self) -> Vec<String> {
        match self {
            TradeManagerCommand::GetOpenTrades => vec!["get_open_trades".to_string()],
            TradeManagerCommand::CloseAllTrades => vec!["close_all_trades".to_string()],
            TradeManagerCommand::CloseTradesInProfit => {
                vec!["close_trades_in_profit".to_string()]
            }
            TradeManagerCommand::CloseTradesInLoss => vec!["close_trades_in_loss".to_string()],
            TradeManagerCommand::IsAutotradeActive => vec!["is_autotrade_active".to_string()],
            TradeManagerCommand::SetAutotrade(enabled) => {
                vec!["set_autotrade".to_string(), enabled.to_string()]
            }
        }
    }
}

/// Process-based bridge to the brokerage terminal.
pub struct BrokerBridge {
    config: BrokerConfig,
}

impl BrokerBridge {
    pub fn new(config: BrokerConfig) -> Self {
        Self { config }
    }

    fn script_path(&self, script: &str) -> PathBuf {
        self.config.scripts_dir.join(script)
    }

    /// Run a script and return its stdout.
    ///
    /// A timeout kills the child process. A non-zero exit status is a
    /// failure; stderr output on success is only logged.
    pub async fn run_script(
        &self,
        script: &str,
        args: &[String],
        deadline: Duration,
    ) -> Result<String, AppError> {
        let path = self.script_path(script);
        debug!("Running {} {:?}", path.display(), args);

        let mut command = Command::new(&self.config.python_bin);
        command
            .arg(&path)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(deadline, command.output())
            .await
            .map_err(|_| {
                AppError::ExternalFailure(format!(
                    "{} timed out after {}ms",
                    script,
                    deadline.as_millis()
                ))
            })?
            .map_err(|e| AppError::ExternalFailure(format!("failed to run {}: {}", script, e)))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(AppError::ExternalFailure(format!(
                "{} exited with {}: {}",
                script,
                output.status,
                stderr.trim()
            )));
        }
        if !stderr.trim().is_empty() {
            warn!("{} stderr: {}", script, stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run a strategy analysis script under the strategy deadline.
    pub async fn run_strategy(&self, script: &str, args: &[String]) -> Result<String, AppError> {
        self.run_script(script, args, self.config.strategy_timeout).await
    }

    /// Log in to the brokerage terminal.
    pub async fn login(
        &self,
        login: &str,
        password: &str,
        server: &str,
    ) -> Result<LoginOutcome, AppError> {
        let args = [login.to_string(), password.to_string(), server.to_string()];
        let stdout = self
            .run_script(LOGIN_SCRIPT, &args, self.config.broker_timeout)
            .await?;

        let outcome: LoginOutcome = serde_json::from_str(last_line(&stdout)).map_err(|e| {
            AppError::ExternalFailure(format!("unparseable login response: {}", e))
        })?;

        info!("Broker login for {} on {}: success={}", login, server, outcome.success);
        Ok(outcome)
    }

    /// Send a market order for `symbol`.
    pub async fn place_order(
        &self,
        symbol: &str,
        volume: f64,
        side: &str,
    ) -> Result<String, AppError> {
        if symbol.is_empty() || volume <= 0.0 {
            return Err(AppError::InvalidInput("Invalid trade parameters".to_string()));
        }
        let args = [symbol.to_string(), volume.to_string(), side.to_string()];
        let stdout = self
            .run_script(ORDER_SCRIPT, &args, self.config.broker_timeout)
            .await?;
        info!("Order sent: {} {} {}", side, volume, symbol);
        Ok(stdout.trim().to_string())
    }

    /// Run a trade manager command and parse its JSON answer.
    pub async fn trade_manager(
        &self,
        command: TradeManagerCommand,
    ) -> Result<serde_json::Value, AppError> {
        let stdout = self
            .run_script(TRADE_MANAGER_SCRIPT, &command.args(), self.config.broker_timeout)
            .await?;

        serde_json::from_str(last_line(&stdout)).map_err(|e| {
            AppError::ExternalFailure(format!("unparseable trade manager response: {}", e))
        })
    }
}

fn last_line(output: &str) -> &str {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .unwrap_or("")
}

impl OrderPlacer for BrokerBridge {
    fn place_order<'a>(
        &'a self,
        order: &'a OrderIntent,
    ) -> Pin<Box<dyn Future<Output = Result<String, AppError>> + Send + 'a>> {
        Box::pin(async move {
            BrokerBridge::place_order(self, &order.symbol, order.volume, order.side).await
        })
    }
}
