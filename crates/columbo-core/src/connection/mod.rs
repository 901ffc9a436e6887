//! Connection attribution.
//!
//! A local source port is the key tying an application fetch to the kernel connection that
//! served it. The observer keeps the set of ports already attributed for the run, so each
//! port yields at most one record whether it came from a connection-table snapshot or was
//! captured directly from the transfer handle.

mod proc_net;

use std::collections::HashSet;
use std::fmt;
use std::net::IpAddr;

use crate::error::VerifyError;

pub use proc_net::ProcNetTcp;

/// One outbound TCP connection: our local port and the peer's address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection {
    pub local_port: u16,
    pub remote_ip: IpAddr,
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{} -> {}", self.local_port, self.remote_ip)
    }
}

/// Something that can list this process's current outbound TCP connections.
pub trait ConnectionSource: Send {
    /// Connections in table order. Fails with `ResourceUnavailable` when the platform or
    /// privileges do not allow enumeration.
    fn snapshot(&self) -> Result<Vec<Connection>, VerifyError>;
}

/// Seen-port bookkeeping for one run.
#[derive(Debug, Default)]
pub struct ConnectionObserver {
    seen: HashSet<u16>,
}

impl ConnectionObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot `source` and return the connections whose local port was not seen before,
    /// in table order. Returned ports are marked seen.
    pub fn observe_new(&mut self, source: &dyn ConnectionSource) -> Result<Vec<Connection>, VerifyError> {
        let snapshot = source.snapshot()?;
        let total = snapshot.len();
        let fresh: Vec<Connection> = snapshot
            .into_iter()
            .filter(|c| self.seen.insert(c.local_port))
            .collect();
        tracing::debug!(total, new = fresh.len(), "connection table snapshot");
        Ok(fresh)
    }

    /// Attribute a connection captured directly from a transfer. Returns `None` if its
    /// port was already attributed (e.g. a reused keep-alive connection).
    pub fn claim(&mut self, connection: Connection) -> Option<Connection> {
        if self.seen.insert(connection.local_port) {
            Some(connection)
        } else {
            tracing::debug!(%connection, "local port already attributed");
            None
        }
    }

    pub fn is_seen(&self, port: u16) -> bool {
        self.seen.contains(&port)
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}
