/*!
 * Database connection management.
 *
 * This module handles SQLite connection creation and initialization, and
 * hands out connections from a bounded pool. Blocking SQLite calls always run
 * on tokio's blocking thread pool via `spawn_blocking`.
 */

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::schema;

/// Default database filename
const DEFAULT_DB_FILENAME: &str = "cityinfo.db";

/// Default database directory name under user's data directory
const DEFAULT_DB_DIRNAME: &str = "cityinfo";

/// Path reported for in-memory databases
const IN_MEMORY_PATH: &str = ":memory:";

/// Default upper bound on simultaneously checked-out connections
pub const DEFAULT_MAX_CONNECTIONS: usize = 8;

/// Default time SQLite waits on a locked database before failing
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Pool sizing and per-connection settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    /// Maximum number of connections checked out at once
    pub max_connections: usize,
    /// SQLite busy timeout applied to every connection
    pub busy_timeout_ms: u64,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

/// Bounded pool of SQLite connections
///
/// Cloning the pool is cheap and every clone shares the same connections and
/// permits. Connections are opened lazily up to `max_connections` and go back
/// to the idle list when their [`PooledConnection`] guard is dropped.
#[derive(Clone)]
pub struct ConnectionPool {
    /// Path to the database file
    db_path: PathBuf,
    /// Whether this pool wraps a private in-memory database
    in_memory: bool,
    /// Pool settings
    options: PoolOptions,
    /// Connections currently not checked out
    idle: Arc<Mutex<Vec<Connection>>>,
    /// One permit per connection that may be checked out
    permits: Arc<Semaphore>,
}

impl ConnectionPool {
    /// Create a new pool at the default location
    pub fn new_default(options: PoolOptions) -> Result<Self> {
        let db_path = Self::default_database_path()?;
        Self::new(&db_path, options)
    }

    /// Create a new pool for the database file at the specified path
    pub fn new<P: AsRef<Path>>(db_path: P, options: PoolOptions) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory: {:?}", parent)
                })?;
            }
        }

        info!(
            "Opening database at: {:?} (max {} connections)",
            db_path, options.max_connections
        );

        let conn = open_configured(&db_path, options.busy_timeout_ms)?;
        schema::initialize_schema(&conn)?;

        Ok(Self::from_first_connection(db_path, false, options, conn))
    }

    /// Create an in-memory database (for testing)
    ///
    /// A private in-memory database only exists on the connection that
    /// created it, so the pool is always limited to that one connection.
    pub fn new_in_memory() -> Result<Self> {
        debug!("Creating in-memory database");

        let conn = Connection::open_in_memory().context("Failed to create in-memory database")?;
        let options = PoolOptions {
            max_connections: 1,
            ..PoolOptions::default()
        };
        schema::configure_connection(&conn, options.busy_timeout_ms)?;
        schema::initialize_schema(&conn)?;

        Ok(Self::from_first_connection(
            PathBuf::from(IN_MEMORY_PATH),
            true,
            options,
            conn,
        ))
    }

    fn from_first_connection(
        db_path: PathBuf,
        in_memory: bool,
        options: PoolOptions,
        conn: Connection,
    ) -> Self {
        let max_connections = options.max_connections.max(1);
        Self {
            db_path,
            in_memory,
            options: PoolOptions {
                max_connections,
                ..options
            },
            idle: Arc::new(Mutex::new(vec![conn])),
            permits: Arc::new(Semaphore::new(max_connections)),
        }
    }

    /// Get the default database path
    pub fn default_database_path() -> Result<PathBuf> {
        let base_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;

        Ok(base_dir.join(DEFAULT_DB_DIRNAME).join(DEFAULT_DB_FILENAME))
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Whether the pool wraps an in-memory database
    pub fn is_in_memory(&self) -> bool {
        self.in_memory
    }

    /// Maximum number of connections that can be checked out at once
    pub fn max_connections(&self) -> usize {
        self.options.max_connections
    }

    /// Number of opened connections currently waiting in the pool
    pub fn idle_connections(&self) -> usize {
        self.idle.lock().len()
    }

    /// Check out a connection, waiting for a free slot if the pool is exhausted
    pub async fn acquire(&self) -> Result<PooledConnection> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| anyhow!("Connection pool closed: {}", e))?;

        let idle = self.idle.lock().pop();
        let conn = match idle {
            Some(conn) => conn,
            None if self.in_memory => {
                return Err(anyhow!("In-memory database connection was lost"));
            }
            None => {
                debug!("Opening additional pooled connection to {:?}", self.db_path);
                open_configured(&self.db_path, self.options.busy_timeout_ms)?
            }
        };

        Ok(PooledConnection {
            conn: Some(conn),
            idle: self.idle.clone(),
            _permit: permit,
        })
    }

    /// Execute a database operation asynchronously using spawn_blocking
    pub async fn execute_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.acquire().await?;

        tokio::task::spawn_blocking(move || f(conn.connection()?))
            .await
            .context("Database task panicked")?
    }

    /// Begin a transaction on a dedicated connection
    ///
    /// The returned handle owns its connection until it is committed, rolled
    /// back or dropped, so it can be held across other awaits. Dropping it
    /// without finishing rolls the transaction back.
    pub async fn begin_async(&self) -> Result<PooledTransaction> {
        let conn = self.acquire().await?;

        let conn = tokio::task::spawn_blocking(move || -> Result<PooledConnection> {
            conn.connection()?
                .execute_batch("BEGIN IMMEDIATE")
                .context("Failed to begin transaction")?;
            Ok(conn)
        })
        .await
        .context("Database task panicked")??;

        Ok(PooledTransaction { conn: Some(conn) })
    }
}

fn open_configured(db_path: &Path, busy_timeout_ms: u64) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database: {:?}", db_path))?;
    schema::configure_connection(&conn, busy_timeout_ms)?;
    Ok(conn)
}

/// A connection checked out of a [`ConnectionPool`]
pub struct PooledConnection {
    conn: Option<Connection>,
    idle: Arc<Mutex<Vec<Connection>>>,
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    /// Borrow the underlying connection
    pub fn connection(&self) -> Result<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| anyhow!("Pooled connection already released"))
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if !conn.is_autocommit() {
                warn!("Connection returned to pool inside a transaction, rolling back");
                if let Err(e) = conn.execute_batch("ROLLBACK") {
                    warn!("Rollback on connection release failed: {}", e);
                }
            }
            self.idle.lock().push(conn);
        }
    }
}

/// An open transaction holding a pooled connection
pub struct PooledTransaction {
    conn: Option<PooledConnection>,
}

impl PooledTransaction {
    /// Run a statement inside the transaction
    pub async fn execute_async<F, T>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self
            .conn
            .take()
            .ok_or_else(|| anyhow!("Transaction already finished"))?;

        let (conn, result) = tokio::task::spawn_blocking(move || {
            let result = conn.connection().and_then(f);
            (conn, result)
        })
        .await
        .context("Database transaction task panicked")?;

        self.conn = Some(conn);
        result
    }

    /// Commit the transaction and release the connection
    pub async fn commit(mut self) -> Result<()> {
        self.finish("COMMIT").await
    }

    /// Roll the transaction back and release the connection
    pub async fn rollback(mut self) -> Result<()> {
        self.finish("ROLLBACK").await
    }

    async fn finish(&mut self, statement: &'static str) -> Result<()> {
        let conn = self
            .conn
            .take()
            .ok_or_else(|| anyhow!("Transaction already finished"))?;

        tokio::task::spawn_blocking(move || -> Result<()> {
            conn.connection()?
                .execute_batch(statement)
                .with_context(|| format!("Failed to {} transaction", statement))?;
            Ok(())
        })
        .await
        .context("Database transaction task panicked")?
    }
}
