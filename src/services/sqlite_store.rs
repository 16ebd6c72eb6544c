//! SQLite persistence layer.
//!
//! Stores the records around the trading core:
//! - Users (brokerage login and server, never the password)
//! - Saved symbols per user, in insertion order
//! - Feedback
//! - Per-user strategy settings (indicator periods)
//! - Trades placed through the order dispatcher

use rusqlite::{params, Connection, OptionalExtension, Row};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AppError;
use crate::services::scheduler::TradingRepository;
use crate::types::{Feedback, IndicatorConfig, SymbolRecord, TradeRecord, TradeStatus, User};

/// SQLite store for users, symbols and trading records.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl SqliteStore {
    /// Create a new SQLite store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        info!("SQLite store initialized");
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing).
    pub fn new_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        debug!("In-memory SQLite store initialized");
        Ok(store)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Initialize database schema.
    fn init_schema(&self) -> Result<(), rusqlite::Error> {
        let conn = self.conn();

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                login TEXT UNIQUE NOT NULL,
                server TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS symbols (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_symbols_user ON symbols(user_id);

            CREATE TABLE IF NOT EXISTS feedback (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                rating INTEGER NOT NULL,
                comment TEXT,
                symbol TEXT,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS strategy_settings (
                user_id TEXT PRIMARY KEY,
                settings_json TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS trades (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                volume REAL NOT NULL,
                action TEXT NOT NULL,
                status TEXT NOT NULL,
                detail TEXT,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_trades_created ON trades(created_at DESC);",
        )?;

        info!("SQLite schema initialized");
        Ok(())
    }

    // ========== Users ==========

    fn user_from_row(row: &Row<'_>) -> Result<User, rusqlite::Error> {
        Ok(User {
            id: row.get(0)?,
            login: row.get(1)?,
            server: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    pub fn find_user_by_login(&self, login: &str) -> Result<Option<User>, rusqlite::Error> {
        self.conn()
            .query_row(
                "SELECT id, login, server, created_at FROM users WHERE login = ?1",
                params![login],
                Self::user_from_row,
            )
            .optional()
    }

    pub fn get_user(&self, id: &str) -> Result<Option<User>, rusqlite::Error> {
        self.conn()
            .query_row(
                "SELECT id, login, server, created_at FROM users WHERE id = ?1",
                params![id],
                Self::user_from_row,
            )
            .optional()
    }

    pub fn create_user(&self, login: &str, server: &str) -> Result<User, rusqlite::Error> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            login: login.to_string(),
            server: server.to_string(),
            created_at: now_ms(),
        };
        self.conn().execute(
            "INSERT INTO users (id, login, server, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![user.id, user.login, user.server, user.created_at],
        )?;
        info!("Created user {} for login {}", user.id, user.login);
        Ok(user)
    }

    // ========== Symbols ==========

    /// Symbols of a user in the order they were saved.
    pub fn get_symbols(&self, user_id: &str) -> Result<Vec<SymbolRecord>, rusqlite::Error> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, symbol, created_at FROM symbols
             WHERE user_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(SymbolRecord {
                id: row.get(0)?,
                user_id: row.get(1)?,
                symbol: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;
        rows.collect()
    }

    /// Replace a user's whole symbol list atomically.
    pub fn replace_symbols(
        &self,
        user_id: &str,
        symbols: &[String],
    ) -> Result<Vec<SymbolRecord>, rusqlite::Error> {
        {
            let mut conn = self.conn();
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM symbols WHERE user_id = ?1", params![user_id])?;
            let created_at = now_ms();
            for symbol in symbols {
                tx.execute(
                    "INSERT INTO symbols (user_id, symbol, created_at) VALUES (?1, ?2, ?3)",
                    params![user_id, symbol, created_at],
                )?;
            }
            tx.commit()?;
        }
        debug!("Saved {} symbols for {}", symbols.len(), user_id);
        self.get_symbols(user_id)
    }

    /// Delete one symbol. Returns the number of rows removed.
    pub fn delete_symbol(&self, user_id: &str, symbol: &str) -> Result<usize, rusqlite::Error> {
        self.conn().execute(
            "DELETE FROM symbols WHERE user_id = ?1 AND symbol = ?2",
            params![user_id, symbol],
        )
    }

    // ========== Feedback ==========

    pub fn create_feedback(
        &self,
        user_id: &str,
        rating: i64,
        comment: Option<&str>,
        symbol: Option<&str>,
    ) -> Result<Feedback, rusqlite::Error> {
        let feedback = Feedback {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            rating,
            comment: comment.map(str::to_string),
            symbol: symbol.map(str::to_string),
            created_at: now_ms(),
        };
        self.conn().execute(
            "INSERT INTO feedback (id, user_id, rating, comment, symbol, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                feedback.id,
                feedback.user_id,
                feedback.rating,
                feedback.comment,
                feedback.symbol,
                feedback.created_at
            ],
        )?;
        Ok(feedback)
    }

    // ========== Strategy settings ==========

    pub fn get_indicator_config(
        &self,
        user_id: &str,
    ) -> Result<Option<IndicatorConfig>, AppError> {
        let json: Option<String> = self
            .conn()
            .query_row(
                "SELECT settings_json FROM strategy_settings WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn save_indicator_config(
        &self,
        user_id: &str,
        config: &IndicatorConfig,
    ) -> Result<(), AppError> {
        let json = serde_json::to_string(config)?;
        self.conn().execute(
            "INSERT INTO strategy_settings (user_id, settings_json, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                settings_json = excluded.settings_json,
                updated_at = excluded.updated_at",
            params![user_id, json, now_ms()],
        )?;
        Ok(())
    }

    // ========== Trades ==========

    pub fn record_trade(&self, trade: &TradeRecord) -> Result<(), rusqlite::Error> {
        self.conn().execute(
            "INSERT INTO trades (id, user_id, symbol, volume, action, status, detail, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                trade.id,
                trade.user_id,
                trade.symbol,
                trade.volume,
                trade.action,
                trade.status.as_str(),
                trade.detail,
                trade.created_at
            ],
        )?;
        Ok(())
    }

    /// Most recent trades first, optionally for one user.
    pub fn list_trades(
        &self,
        user_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<TradeRecord>, rusqlite::Error> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, symbol, volume, action, status, detail, created_at
             FROM trades
             WHERE ?1 IS NULL OR user_id = ?1
             ORDER BY created_at DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, limit as i64], |row| {
            let status: String = row.get(5)?;
            Ok(TradeRecord {
                id: row.get(0)?,
                user_id: row.get(1)?,
                symbol: row.get(2)?,
                volume: row.get(3)?,
                action: row.get(4)?,
                status: TradeStatus::parse(&status),
                detail: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?;
        rows.collect()
    }
}

impl TradingRepository for SqliteStore {
    fn fetch_symbols<'a>(
        &'a self,
        user_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, AppError>> + Send + 'a>> {
        Box::pin(async move {
            let records = self.get_symbols(user_id)?;
            Ok(records.into_iter().map(|r| r.symbol).collect())
        })
    }

    fn indicator_config<'a>(
        &'a self,
        user_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<IndicatorConfig, AppError>> + Send + 'a>> {
        Box::pin(async move { Ok(self.get_indicator_config(user_id)?.unwrap_or_default()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        SqliteStore::new_in_memory().unwrap()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_user_roundtrip() {
        let store = store();
        assert!(store.find_user_by_login("1234").unwrap().is_none());

        let user = store.create_user("1234", "Demo-Server").unwrap();
        let found = store.find_user_by_login("1234").unwrap().unwrap();
        assert_eq!(found, user);
        assert_eq!(store.get_user(&user.id).unwrap().unwrap().server, "Demo-Server");
    }

    #[test]
    fn test_duplicate_login_rejected() {
        let store = store();
        store.create_user("1234", "A").unwrap();
        assert!(store.create_user("1234", "B").is_err());
    }

    #[test]
    fn test_symbols_keep_saved_order() {
        let store = store();
        store
            .replace_symbols("u1", &strings(&["GBPUSD", "EURUSD", "XAUUSD"]))
            .unwrap();

        let symbols: Vec<String> = store
            .get_symbols("u1")
            .unwrap()
            .into_iter()
            .map(|r| r.symbol)
            .collect();
        assert_eq!(symbols, strings(&["GBPUSD", "EURUSD", "XAUUSD"]));
    }

    #[test]
    fn test_replace_symbols_drops_previous_list() {
        let store = store();
        store.replace_symbols("u1", &strings(&["EURUSD", "GBPUSD"])).unwrap();
        store.replace_symbols("u2", &strings(&["USDJPY"])).unwrap();

        let saved = store.replace_symbols("u1", &strings(&["XAUUSD"])).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].symbol, "XAUUSD");
        assert_eq!(store.get_symbols("u2").unwrap().len(), 1);
    }

    #[test]
    fn test_delete_symbol() {
        let store = store();
        store.replace_symbols("u1", &strings(&["EURUSD", "GBPUSD"])).unwrap();

        assert_eq!(store.delete_symbol("u1", "EURUSD").unwrap(), 1);
        assert_eq!(store.delete_symbol("u1", "EURUSD").unwrap(), 0);
        assert_eq!(store.get_symbols("u1").unwrap()[0].symbol, "GBPUSD");
    }

    #[test]
    fn test_feedback() {
        let store = store();
        let feedback = store
            .create_feedback("u1", 4, Some("good entries"), Some("EURUSD"))
            .unwrap();
        assert_eq!(feedback.rating, 4);
        assert_eq!(feedback.symbol.as_deref(), Some("EURUSD"));
    }

    #[test]
    fn test_indicator_config_upsert() {
        let store = store();
        assert!(store.get_indicator_config("u1").unwrap().is_none());

        let mut config = IndicatorConfig::default();
        store.save_indicator_config("u1", &config).unwrap();
        config.rsi_period = 21;
        store.save_indicator_config("u1", &config).unwrap();

        assert_eq!(store.get_indicator_config("u1").unwrap().unwrap().rsi_period, 21);
    }

    #[tokio::test]
    async fn test_repository_reads_latest_state() {
        let store = store();
        store.replace_symbols("u1", &strings(&["EURUSD"])).unwrap();
        assert_eq!(store.fetch_symbols("u1").await.unwrap(), strings(&["EURUSD"]));

        store.replace_symbols("u1", &strings(&["GBPUSD", "USDJPY"])).unwrap();
        assert_eq!(
            store.fetch_symbols("u1").await.unwrap(),
            strings(&["GBPUSD", "USDJPY"])
        );
        assert_eq!(store.indicator_config("u1").await.unwrap(), IndicatorConfig::default());
    }

    #[test]
    fn test_list_trades_filters_by_user() {
        let store = store();
        for (i, user) in ["u1", "u2", "u1"].iter().enumerate() {
            store
                .record_trade(&TradeRecord {
                    id: format!("t{}", i),
                    user_id: user.to_string(),
                    symbol: "EURUSD".to_string(),
                    volume: 0.1,
                    action: "buy".to_string(),
                    status: TradeStatus::Placed,
                    detail: None,
                    created_at: i as i64,
                })
                .unwrap();
        }

        assert_eq!(store.list_trades(None, 10).unwrap().len(), 3);
        let mine = store.list_trades(Some("u1"), 10).unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].id, "t2");
    }
}
