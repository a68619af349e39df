//! A fixed pool of read-only connections.
//!
//! SQLite serves concurrent readers without coordination, so the pool is
//! just N long-lived connections behind per-connection mutexes with a
//! round-robin checkout. Queries run on blocking threads; a guard is held
//! only for the duration of one statement batch, never across await
//! points.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rusqlite::Connection;

use propscope_core::error::Result;

use crate::{open_read_only, probe};

/// Default number of pooled connections.
pub const DEFAULT_POOL_SIZE: usize = 4;

pub struct ReadPool {
    connections: Vec<Mutex<Connection>>,
    next: AtomicUsize,
    row_count: i64,
}

impl ReadPool {
    /// Open `size` read-only connections and probe the first one.
    ///
    /// Opening happens once at process start; any failure here is fatal.
    pub fn open(path: &Path, size: usize) -> Result<Self> {
        let size = size.max(1);
        let mut connections = Vec::with_capacity(size);
        for _ in 0..size {
            connections.push(Mutex::new(open_read_only(path)?));
        }

        let row_count = probe(&connections[0].lock())?;
        tracing::info!(
            path = %path.display(),
            connections = size,
            rows = row_count,
            "Opened read-only transaction store"
        );

        Ok(Self {
            connections,
            next: AtomicUsize::new(0),
            row_count,
        })
    }

    /// Total rows observed at open time.
    pub fn row_count(&self) -> i64 {
        self.row_count
    }

    /// Run a closure against one pooled connection.
    ///
    /// Checkout prefers an idle connection, falling back to blocking on
    /// the round-robin choice when all are busy.
    pub fn with<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let start = self.next.fetch_add(1, Ordering::Relaxed);
        let len = self.connections.len();

        for offset in 0..len {
            if let Some(guard) = self.connections[(start + offset) % len].try_lock() {
                return f(&guard);
            }
        }

        let guard = self.connections[start % len].lock();
        f(&guard)
    }
}
