//! Server-wide control state: replication mode bits, the master/slave state machine, the
//! readonly flag, the client/slave registries and the server's uptime/counters used by `INFO`.
//!
//! Lock ordering (acquire in this order, release in reverse, never hold two at once across an
//! `.await` unless nested this way): `state` (repl/ms state + master coordinates) before
//! `binlog`'s internal producer lock before `clients`. `readonly` is always a leaf lock. The
//! storage engine's own lock is independent of all four and never taken while any of these are
//! held.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;

use rand::Rng;
use tokio::sync::{Mutex, RwLock, Semaphore};

use crate::client::{ClientRecord, ClientRole, SlaveInfo};

/// `repl_state`'s three independent bits: a standalone server is `SINGLE`; a server acting as a
/// master for at least one slave additionally sets `MASTER`; a server that issued `SLAVEOF` sets
/// `SLAVE`. Nothing stops a node being `MASTER | SLAVE` at once (a sub-replica), mirroring the
/// original bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplState(u8);

impl ReplState {
    pub const SINGLE: ReplState = ReplState(1);
    pub const MASTER: ReplState = ReplState(2);
    pub const SLAVE: ReplState = ReplState(4);

    pub fn contains(&self, bit: ReplState) -> bool {
        self.0 & bit.0 != 0
    }

    pub fn insert(&mut self, bit: ReplState) {
        self.0 |= bit.0;
    }

    pub fn remove(&mut self, bit: ReplState) {
        self.0 &= !bit.0;
    }
}

impl Default for ReplState {
    fn default() -> Self {
        ReplState::SINGLE
    }
}

/// The slave-side handshake progress, driven by `SLAVEOF`/`trysync`/`ucanpsync`/`syncerror`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsState {
    Offline,
    Connect,
    Connecting,
    Connected,
    Single,
}

struct StateInner {
    repl_state: ReplState,
    ms_state: MsState,
    master_host: Option<String>,
    /// Stored as the master's *announced* replication-listener port, i.e. the configured port
    /// plus the `+100` offset the original wire protocol applies; see `connect_info()`.
    master_port: Option<u16>,
}

pub struct ServerState {
    state: Mutex<StateInner>,
    readonly: RwLock<bool>,
    clients: Mutex<HashMap<u64, ClientRecord>>,
    slaves: Mutex<Vec<SlaveInfo>>,
    /// Held in exclusive mode by suspend-flagged commands (`dump`, `loaddb`, `flushall`,
    /// `shutdown`, `readonly`) so they never interleave with each other or with anything else.
    suspend: Semaphore,
    next_client_id: Mutex<u64>,
    pub start_time: Instant,
    pub replid: String,
    pub self_port: u16,
}

impl ServerState {
    pub fn new(self_port: u16) -> Self {
        let replid: String = {
            let mut rng = rand::thread_rng();
            (0..40).map(|_| std::char::from_digit(rng.gen_range(0..16), 16).unwrap()).collect()
        };
        ServerState {
            state: Mutex::new(StateInner {
                repl_state: ReplState::SINGLE,
                ms_state: MsState::Single,
                master_host: None,
                master_port: None,
            }),
            readonly: RwLock::new(false),
            clients: Mutex::new(HashMap::new()),
            slaves: Mutex::new(Vec::new()),
            suspend: Semaphore::new(1),
            next_client_id: Mutex::new(1),
            start_time: Instant::now(),
            replid,
            self_port,
        }
    }

    pub async fn next_client_id(&self) -> u64 {
        let mut guard = self.next_client_id.lock().await;
        let id = *guard;
        *guard += 1;
        id
    }

    pub async fn acquire_suspend(&self) -> tokio::sync::SemaphorePermit<'_> {
        self.suspend.acquire().await.expect("suspend semaphore is never closed")
    }

    // -- replication state machine --------------------------------------------------------

    pub async fn repl_state(&self) -> ReplState {
        self.state.lock().await.repl_state
    }

    pub async fn ms_state(&self) -> MsState {
        self.state.lock().await.ms_state
    }

    pub async fn set_ms_state(&self, ms_state: MsState) {
        self.state.lock().await.ms_state = ms_state;
    }

    pub async fn master_addr(&self) -> Option<(String, u16)> {
        let inner = self.state.lock().await;
        match (&inner.master_host, inner.master_port) {
            (Some(host), Some(port)) => Some((host.clone(), port)),
            _ => None,
        }
    }

    /// Sets this node up as a slave of `host:port`. `port` is the value the client passed to
    /// `SLAVEOF`; the replication listener on the master side actually answers on `port + 100`,
    /// a quirk of the wire protocol this crate preserves rather than "fixes".
    pub async fn slaveof(&self, host: String, port: u16) {
        let mut inner = self.state.lock().await;
        inner.master_host = Some(host);
        inner.master_port = Some(port);
        inner.repl_state.insert(ReplState::SLAVE);
        inner.repl_state.remove(ReplState::SINGLE);
        inner.ms_state = MsState::Connect;
    }

    pub async fn slaveof_no_one(&self) {
        let mut inner = self.state.lock().await;
        inner.master_host = None;
        inner.master_port = None;
        inner.repl_state.remove(ReplState::SLAVE);
        if !inner.repl_state.contains(ReplState::MASTER) {
            inner.repl_state.insert(ReplState::SINGLE);
        }
        inner.ms_state = MsState::Single;
    }

    pub async fn mark_has_slaves(&self, has_slaves: bool) {
        let mut inner = self.state.lock().await;
        if has_slaves {
            inner.repl_state.insert(ReplState::MASTER);
        } else {
            inner.repl_state.remove(ReplState::MASTER);
        }
    }

    // -- readonly -------------------------------------------------------------------------

    pub async fn is_readonly(&self) -> bool {
        *self.readonly.read().await
    }

    pub async fn set_readonly(&self, value: bool) {
        *self.readonly.write().await = value;
    }

    // -- client registry --------------------------------------------------------------------

    pub async fn register_client(&self, id: u64, addr: SocketAddr, role: ClientRole) {
        self.clients.lock().await.insert(id, ClientRecord { id, addr, role, connected_at: Instant::now() });
    }

    pub async fn set_client_role(&self, id: u64, role: ClientRole) {
        if let Some(record) = self.clients.lock().await.get_mut(&id) {
            record.role = role;
        }
    }

    pub async fn remove_client(&self, id: u64) {
        self.clients.lock().await.remove(&id);
        self.slaves.lock().await.retain(|s| s.client_id != id);
    }

    pub async fn client_list(&self) -> Vec<ClientRecord> {
        self.clients.lock().await.values().cloned().collect()
    }

    pub async fn client_kill(&self, addr: &str) -> bool {
        let mut clients = self.clients.lock().await;
        let id = clients.iter().find(|(_, c)| c.addr.to_string() == addr).map(|(id, _)| *id);
        match id {
            Some(id) => {
                clients.remove(&id);
                true
            }
            None => false,
        }
    }

    // -- slave registry -----------------------------------------------------------------------

    pub async fn register_slave(&self, client_id: u64, addr: SocketAddr) {
        let mut slaves = self.slaves.lock().await;
        if !slaves.iter().any(|s| s.client_id == client_id) {
            slaves.push(SlaveInfo { client_id, addr, acked_filenum: 0, acked_offset: 0 });
        }
        self.set_client_role(client_id, ClientRole::Slave).await;
        drop(slaves);
        self.mark_has_slaves(true).await;
    }

    pub async fn update_slave_ack(&self, client_id: u64, filenum: u32, offset: u64) {
        let mut slaves = self.slaves.lock().await;
        if let Some(slave) = slaves.iter_mut().find(|s| s.client_id == client_id) {
            slave.acked_filenum = filenum;
            slave.acked_offset = offset;
        }
    }

    pub async fn slave_list(&self) -> Vec<SlaveInfo> {
        self.slaves.lock().await.clone()
    }

    pub async fn slave_count(&self) -> usize {
        self.slaves.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_single_and_readonly_false() {
        let s = ServerState::new(6379);
        assert_eq!(s.repl_state().await, ReplState::SINGLE);
        assert_eq!(s.ms_state().await, MsState::Single);
        assert!(!s.is_readonly().await);
    }

    #[tokio::test]
    async fn slaveof_then_no_one_round_trips_to_single() {
        let s = ServerState::new(6379);
        s.slaveof("127.0.0.1".into(), 6380).await;
        assert!(s.repl_state().await.contains(ReplState::SLAVE));
        assert_eq!(s.ms_state().await, MsState::Connect);

        s.slaveof_no_one().await;
        assert!(!s.repl_state().await.contains(ReplState::SLAVE));
        assert!(s.repl_state().await.contains(ReplState::SINGLE));
        assert_eq!(s.ms_state().await, MsState::Single);
    }

    #[tokio::test]
    async fn registering_a_slave_sets_master_bit() {
        let s = ServerState::new(6379);
        let addr: SocketAddr = "127.0.0.1:7000".parse().unwrap();
        s.register_slave(1, addr).await;
        assert!(s.repl_state().await.contains(ReplState::MASTER));
        assert_eq!(s.slave_count().await, 1);
    }

    #[tokio::test]
    async fn removing_the_last_client_drops_its_slave_entry() {
        let s = ServerState::new(6379);
        let addr: SocketAddr = "127.0.0.1:7000".parse().unwrap();
        s.register_slave(1, addr).await;
        s.remove_client(1).await;
        assert_eq!(s.slave_count().await, 0);
    }
}
