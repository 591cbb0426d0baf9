//! Connection Pool
//!
//! A fixed set of `SQLite` connections opened at bootstrap and shared by
//! every call. Checkout is round-robin: `acquire` advances an atomic cursor
//! to pick a slot and awaits that slot's mutex. The returned guard releases
//! the connection on drop, so every exit path (including early returns on
//! error) hands it back.
//!
//! The pool is constructed once by process bootstrap and injected into the
//! components that need it; nothing in this crate opens ad-hoc connections
//! outside of tests.

use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

use crate::error::{DocketError, Result};

const BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Fixed-size pool of `SQLite` connections
pub struct ConnectionPool {
    connections: Vec<Mutex<Connection>>,
    cursor: AtomicUsize,
}

impl ConnectionPool {
    /// Open `size` connections against the database file
    ///
    /// A `size` of zero is clamped to one. The database file is created if
    /// it does not exist.
    pub fn open(path: &Path, size: usize) -> Result<Self> {
        let size = size.max(1);
        let mut connections = Vec::with_capacity(size);
        for _ in 0..size {
            connections.push(Mutex::new(open_connection(path)?));
        }

        Ok(Self { connections, cursor: AtomicUsize::new(0) })
    }

    /// Check out one connection, waiting if its slot is in use
    pub async fn acquire(&self) -> MutexGuard<'_, Connection> {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        self.connections[idx].lock().await
    }

    /// Number of pooled connections
    #[must_use]
    pub fn size(&self) -> usize {
        self.connections.len()
    }
}

/// Open one `SQLite` connection with the pragmas the pool relies on
///
/// WAL mode lets the audit workers write while readers hold other pooled
/// connections; the busy timeout covers the remaining write contention.
fn open_connection(path: &Path) -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

    let conn = Connection::open_with_flags(path, flags)
        .map_err(|e| DocketError::config(format!("Failed to open SQLite database: {e}")))?;

    conn.execute_batch("PRAGMA journal_mode = WAL;")
        .map_err(|e| DocketError::config(format!("Failed to set journal mode: {e}")))?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(|e| DocketError::config(format!("Failed to set busy timeout: {e}")))?;

    Ok(conn)
}
