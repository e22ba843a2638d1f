use std::collections::HashMap;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tracing::{info, warn};

use crate::client::ConnState;
use crate::context::ServerContext;
use crate::dispatcher;
use crate::event::RedisEvent;

/// Owns the live connection table and is the only place `dispatcher::dispatch` is ever called
/// from: connection bookkeeping and command execution both happen here, off of a single `mpsc`
/// channel, so nothing else needs to coordinate access to per-connection state. Holds the
/// context behind an `Arc` since `replication::connect_to_master` needs its own handle to the
/// same `ServerState`/`Binlog`/`Storage` when replicaof is set.
pub struct EventHandler {
    ctx: Arc<ServerContext>,
    clients: HashMap<u64, (ConnState, OwnedWriteHalf)>,
}

impl EventHandler {
    pub fn new(ctx: Arc<ServerContext>) -> Self {
        EventHandler { ctx, clients: HashMap::new() }
    }

    pub async fn handle_event(&mut self, event: RedisEvent) {
        match event {
            RedisEvent::ClientConnected { client_id, addr, writer } => {
                info!(client_id, %addr, "client connected");
                self.ctx.state.register_client(client_id, addr, crate::client::ClientRole::Normal).await;
                self.clients.insert(client_id, (ConnState::new(client_id, addr), writer));
            }

            RedisEvent::ClientDisconnected { client_id } => {
                info!(client_id, "client disconnected");
                self.ctx.state.remove_client(client_id).await;
                self.clients.remove(&client_id);
            }

            RedisEvent::Request { client_id, args } => {
                let Some((conn, writer)) = self.clients.get_mut(&client_id) else {
                    warn!(client_id, "request from an unregistered client id");
                    return;
                };
                let reply = dispatcher::dispatch(&self.ctx, conn, args).await;
                if let Err(err) = writer.write_all(&reply).await {
                    warn!(client_id, error = %err, "failed writing reply");
                }
            }
        }
    }
}
