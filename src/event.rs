use std::net::SocketAddr;

use tokio::net::tcp::OwnedWriteHalf;

/// Events flowing from per-connection read tasks into the single event-handler task that owns
/// the live connection table. Every connection gets its own read loop, but all state mutation
/// and dispatch happens on one task, so the connection table is only ever touched mutably from
/// one place.
pub enum RedisEvent {
    ClientConnected {
        client_id: u64,
        addr: SocketAddr,
        writer: OwnedWriteHalf,
    },
    Request {
        client_id: u64,
        args: Vec<String>,
    },
    ClientDisconnected {
        client_id: u64,
    },
}
