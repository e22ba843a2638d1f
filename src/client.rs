//! Per-connection state. A `ConnState` is created once per accepted TCP connection and threaded
//! through every command dispatched on it; `ClientRecord` is the snapshot of that state the
//! server registry keeps for `CLIENT LIST`/`CLIENT KILL` and for tracking attached slaves.

use std::net::SocketAddr;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientRole {
    Normal,
    Master,
    Slave,
}

/// Live, per-connection handle. There is no portable raw file descriptor in a `tokio::net`
/// connection, so this crate uses the client id (derived from the registration counter) where
/// the original admin commands (`trysync`, `client kill`) key off of a numeric fd.
pub struct ConnState {
    pub id: u64,
    pub addr: SocketAddr,
    pub role: ClientRole,
    /// Port the peer announced via `REPLCONF listening-port`-equivalent, if it ever identified
    /// itself as a slave. `None` until `trysync` is issued on this connection.
    pub announced_port: Option<u16>,
}

impl ConnState {
    pub fn new(id: u64, addr: SocketAddr) -> Self {
        ConnState { id, addr, role: ClientRole::Normal, announced_port: None }
    }
}

/// What the server registry remembers about a connection, independent of the connection task
/// itself still being alive to answer a `CLIENT KILL`.
#[derive(Debug, Clone)]
pub struct ClientRecord {
    pub id: u64,
    pub addr: SocketAddr,
    pub role: ClientRole,
    pub connected_at: Instant,
}

/// A slave attached via `trysync`/psync, tracked separately from the general client registry so
/// `CLIENT LIST` and replication bookkeeping (`PURGELOGSTO`'s safety margin) don't have to filter
/// the whole registry on every call.
#[derive(Debug, Clone)]
pub struct SlaveInfo {
    pub client_id: u64,
    pub addr: SocketAddr,
    /// The binlog position this slave last acknowledged.
    pub acked_filenum: u32,
    pub acked_offset: u64,
}
