//! Bounded free-list pool of idle Oracle connections

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::config::ConnectionParameters;
use crate::connection::OracleConnection;
use crate::error::Result;
use crate::util::lock;

/// Default number of idle connections the pool retains
pub const DEFAULT_POOL_CAPACITY: usize = 8;

/// A bounded free list of idle connections plus the parameters needed to
/// open fresh ones.
///
/// The capacity bounds only *retained idle* connections: `acquire` opens
/// a new connection whenever the list is empty, without limiting how many
/// are open concurrently. A connection is exclusively owned either by the
/// pool (idle) or by exactly one caller (busy); `acquire`/`release` is
/// the ownership transfer. The pool is shared by the catalog and by every
/// active scan.
pub struct OracleConnectionPool {
    params: ConnectionParameters,
    idle: Mutex<Vec<Arc<OracleConnection>>>,
    capacity: usize,
}

impl OracleConnectionPool {
    /// Create a pool that opens connections with `params` and retains up
    /// to `capacity` idle ones.
    pub fn new(params: ConnectionParameters, capacity: usize) -> Self {
        info!(capacity, host = %params.host, "creating oracle connection pool");
        Self {
            params,
            idle: Mutex::new(Vec::new()),
            capacity,
        }
    }

    /// Parameters used to open new connections.
    pub fn params(&self) -> &ConnectionParameters {
        &self.params
    }

    /// Take an idle connection, or open a fresh one when none is idle.
    pub fn acquire(&self) -> Result<Arc<OracleConnection>> {
        if let Some(conn) = lock(&self.idle).pop() {
            debug!("reusing idle oracle connection");
            return Ok(conn);
        }
        debug!("pool empty, opening new oracle connection");
        Ok(Arc::new(OracleConnection::open(&self.params)?))
    }

    /// Return a connection to the free list, or drop it when the list is
    /// at capacity (the native handle is released on drop).
    pub fn release(&self, conn: Arc<OracleConnection>) {
        let mut idle = lock(&self.idle);
        if idle.len() < self.capacity {
            idle.push(conn);
        }
    }

    /// Drop every idle connection.
    pub fn clear(&self) {
        debug!("clearing oracle connection pool");
        lock(&self.idle).clear();
    }

    /// Current pool state, for diagnostics.
    pub fn state(&self) -> PoolState {
        PoolState {
            idle_connections: lock(&self.idle).len(),
            capacity: self.capacity,
        }
    }
}

impl std::fmt::Debug for OracleConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("OracleConnectionPool")
            .field("host", &self.params.host)
            .field("idle_connections", &state.idle_connections)
            .field("capacity", &state.capacity)
            .finish()
    }
}

/// Snapshot of the pool's free list
#[derive(Debug, Clone, Copy)]
pub struct PoolState {
    /// Idle connections currently retained
    pub idle_connections: usize,

    /// Maximum idle connections retained
    pub capacity: usize,
}

impl std::fmt::Display for PoolState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "idle={}/{}", self.idle_connections, self.capacity)
    }
}
