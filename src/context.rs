//! Ties the long-lived, shared server pieces together into one value a connection task clones
//! an `Arc` of. This is the Rust stand-in for the process-wide globals (`g_pikaServer`,
//! `g_pikaConf`, ...) the admin commands this crate is grounded on reach for directly.

use std::sync::Arc;

use crate::binlog::Binlog;
use crate::config::Config;
use crate::server_state::ServerState;
use crate::storage::Storage;

pub struct ServerContext {
    pub config: Config,
    pub state: ServerState,
    pub storage: Storage,
    pub binlog: Binlog,
}

pub type SharedContext = Arc<ServerContext>;
