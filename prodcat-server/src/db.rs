//! Single-connection MySQL access with transparent reconnect.
//!
//! The catalog API runs every query through one shared `MySqlConnection`
//! (not a pool). When the transport drops, the manager replaces the handle
//! with a freshly handshaken one and re-runs the in-flight query; callers
//! only observe the added latency. The handle lives behind a tokio mutex,
//! so at most one reconnect is in flight and concurrent callers queue on
//! the lock instead of racing their own reconnects.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use sqlx::mysql::{
    MySql, MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlDatabaseError, MySqlRow,
};
use sqlx::query::Query;
use sqlx::{ConnectOptions, Connection};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use prodcat_core::DbConfig;

/// Fixed delay between reconnect attempts.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Database errors surfaced to callers. Transient connection failures are
/// retried internally and never appear here.
#[derive(Debug, Error)]
pub enum DbError {
    /// Non-transient query failure (syntax, constraint). Never retried.
    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// Connection-layer failure that could not be classified as transient,
    /// or a bounded retry policy that ran out of attempts.
    #[error("database connection failed: {0}")]
    Fatal(#[source] sqlx::Error),
}

/// Lifecycle of the shared connection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Failed,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Failed => "failed",
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ConnectionState::Connecting => 0,
            ConnectionState::Connected => 1,
            ConnectionState::Failed => 2,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => ConnectionState::Connected,
            2 => ConnectionState::Failed,
            _ => ConnectionState::Connecting,
        }
    }
}

/// Reconnect behavior. The default preserves the infinite-retry contract:
/// keep trying every `delay` until the backend comes back.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay between handshake attempts.
    pub delay: Duration,
    /// Give up after this many attempts. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: RECONNECT_DELAY,
            max_attempts: None,
        }
    }
}

/// Positional query argument.
#[derive(Debug, Clone)]
pub enum Param {
    Int(i64),
    Text(String),
}

/// Owns the single shared connection handle.
pub struct ConnectionManager {
    config: DbConfig,
    /// Session timezone, normalized to MySQL's `+HH:MM` offset form.
    timezone: String,
    policy: RetryPolicy,
    state: AtomicU8,
    conn: Mutex<Option<MySqlConnection>>,
}

impl ConnectionManager {
    /// Create a manager with the default (infinite) retry policy.
    /// No I/O happens until the first query.
    pub fn new(config: &DbConfig) -> Self {
        Self::with_policy(config, RetryPolicy::default())
    }

    pub fn with_policy(config: &DbConfig, policy: RetryPolicy) -> Self {
        Self {
            timezone: normalize_timezone(&config.timezone),
            config: config.clone(),
            policy,
            state: AtomicU8::new(ConnectionState::Connecting.as_u8()),
            conn: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Relaxed))
    }

    /// Establish the connection eagerly. Queries connect lazily anyway;
    /// this exists so startup can begin the handshake in the background.
    pub async fn ensure_connected(&self) -> Result<(), DbError> {
        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            *guard = Some(self.reconnect().await?);
        }
        Ok(())
    }

    /// Probe the current handle. Drops it on failure so the next query
    /// reconnects.
    pub async fn ping(&self) -> Result<(), DbError> {
        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            *guard = Some(self.reconnect().await?);
        }
        if let Some(conn) = guard.as_mut() {
            if let Err(err) = conn.ping().await {
                self.set_state(ConnectionState::Failed);
                *guard = None;
                return Err(DbError::Fatal(err));
            }
        }
        Ok(())
    }

    /// Run a query and return all rows.
    ///
    /// Dispatch: with a live handle the query runs directly; with no handle
    /// (initial state, or dropped after a failure) the reconnect protocol
    /// runs first. A transient error drops the handle and loops back, so the
    /// original query is re-attempted after each successful reconnect.
    pub async fn fetch_all(&self, sql: &str, params: &[Param]) -> Result<Vec<MySqlRow>, DbError> {
        let mut guard = self.conn.lock().await;
        dispatch_with_reconnect(
            &mut *guard,
            || self.reconnect(),
            |mut conn| async move {
                let result = build_query(sql, params).fetch_all(&mut conn).await;
                (conn, result)
            },
            || self.set_state(ConnectionState::Failed),
        )
        .await
    }

    /// The reconnect protocol: build a fresh handle, handshake, and only
    /// then hand it back for the shared slot. Callers never see a
    /// half-initialized connection.
    async fn reconnect(&self) -> Result<MySqlConnection, DbError> {
        self.set_state(ConnectionState::Connecting);
        match connect_with_retry(&self.policy, || self.connect_once()).await {
            Ok(conn) => {
                self.set_state(ConnectionState::Connected);
                info!(
                    host = %self.config.host,
                    port = self.config.port,
                    database = %self.config.database,
                    "database connection established"
                );
                Ok(conn)
            }
            Err(err) => {
                self.set_state(ConnectionState::Failed);
                Err(DbError::Fatal(err))
            }
        }
    }

    async fn connect_once(&self) -> Result<MySqlConnection, sqlx::Error> {
        debug!(
            host = %self.config.host,
            port = self.config.port,
            "attempting database connection"
        );
        let mut conn = self.connect_options().connect().await?;
        sqlx::query("SET time_zone = ?")
            .bind(self.timezone.as_str())
            .execute(&mut conn)
            .await?;
        Ok(conn)
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .username(&self.config.user)
            .password(&self.config.password)
            .database(&self.config.database)
            .charset(&self.config.charset)
    }

    fn set_state(&self, next: ConnectionState) {
        let prev = ConnectionState::from_u8(self.state.swap(next.as_u8(), Ordering::Relaxed));
        if prev != next {
            debug!(
                from = prev.as_str(),
                to = next.as_str(),
                "connection state changed"
            );
        }
    }
}

/// Retry `connect` until it succeeds, sleeping the policy delay between
/// attempts. Every handshake failure retries, whatever the error kind; a
/// bounded policy returns the last error once attempts run out. The sleep
/// is a plain `tokio::time::sleep`, so dropping the future (shutdown)
/// cancels the loop.
async fn connect_with_retry<T, E, F, Fut>(policy: &RetryPolicy, mut connect: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match connect().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!(error = %err, attempt, "database handshake failed");
                if let Some(max) = policy.max_attempts {
                    if attempt >= max {
                        return Err(err);
                    }
                }
                sleep(policy.delay).await;
            }
        }
    }
}

/// Drives one caller's query to completion over the shared slot: fill the
/// slot via `connect` when empty, run the query, and on a transient error
/// drop the dead handle and go around again, so the original query is
/// re-run after each successful reconnect. A non-transient server error
/// hands the live connection back (the query was bad, the connection is
/// fine); an unclassified error drops it. Generic over the connection type
/// so the loop is testable without a server.
async fn dispatch_with_reconnect<C, T, Conn, ConnFut, Run, RunFut>(
    slot: &mut Option<C>,
    mut connect: Conn,
    mut run: Run,
    mut on_failure: impl FnMut(),
) -> Result<T, DbError>
where
    Conn: FnMut() -> ConnFut,
    ConnFut: std::future::Future<Output = Result<C, DbError>>,
    Run: FnMut(C) -> RunFut,
    RunFut: std::future::Future<Output = (C, Result<T, sqlx::Error>)>,
{
    loop {
        let conn = match slot.take() {
            Some(conn) => conn,
            None => connect().await?,
        };
        let (conn, result) = run(conn).await;
        match result {
            Ok(value) => {
                *slot = Some(conn);
                return Ok(value);
            }
            Err(err) if is_transient(&err) => {
                warn!(error = %err, "transient database error, dropping connection");
                on_failure();
            }
            Err(err) if err.as_database_error().is_some() => {
                *slot = Some(conn);
                return Err(DbError::Query(err));
            }
            Err(err) => {
                on_failure();
                return Err(DbError::Fatal(err));
            }
        }
    }
}

fn build_query<'q>(sql: &'q str, params: &'q [Param]) -> Query<'q, MySql, MySqlArguments> {
    let mut query = sqlx::query(sql);
    for param in params {
        query = match param {
            Param::Int(value) => query.bind(*value),
            Param::Text(value) => query.bind(value.as_str()),
        };
    }
    query
}

/// Whether an error is a connection-layer failure expected to resolve via
/// reconnect. Anything else is surfaced to the caller.
fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        // connection lost / refused, broken transport, malformed packets
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::Protocol(_) => true,
        sqlx::Error::Database(db) => {
            let errno = db
                .try_downcast_ref::<MySqlDatabaseError>()
                .map(|e| e.number());
            is_transient_db_code(db.code().as_deref(), errno)
        }
        _ => false,
    }
}

/// Server-reported codes that signal a dead or dying connection:
/// SQLSTATE class 08 (connection exception), 1053 (server shutdown in
/// progress), 1927 (connection killed), 2006 (server gone away), 2013
/// (lost connection during query).
fn is_transient_db_code(sqlstate: Option<&str>, errno: Option<u16>) -> bool {
    if matches!(errno, Some(1053 | 1927 | 2006 | 2013)) {
        return true;
    }
    matches!(sqlstate, Some(code) if code.starts_with("08"))
}

/// Normalize config timezone strings like "utc+5:30" to MySQL's "+05:30"
/// offset form. Named zones and anything unrecognized pass through
/// verbatim.
fn normalize_timezone(tz: &str) -> String {
    let trimmed = tz.trim();
    let rest = trimmed
        .strip_prefix("utc")
        .or_else(|| trimmed.strip_prefix("UTC"))
        .unwrap_or(trimmed);
    if rest.is_empty() {
        return "+00:00".into();
    }
    let (sign, body) = match rest.as_bytes()[0] {
        b'+' => ('+', &rest[1..]),
        b'-' => ('-', &rest[1..]),
        _ => return trimmed.to_string(),
    };
    let (hours, minutes) = match body.split_once(':') {
        Some((h, m)) => (h, m),
        None => (body, "00"),
    };
    match (hours.parse::<u8>(), minutes.parse::<u8>()) {
        (Ok(h), Ok(m)) if h <= 14 && m < 60 => format!("{sign}{h:02}:{m:02}"),
        _ => trimmed.to_string(),
    }
}
