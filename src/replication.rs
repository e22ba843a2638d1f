//! Replication control plane: `SLAVEOF`/`trysync`/`ucanpsync`/`syncerror`/`PURGELOGSTO`, sitting
//! on top of `ServerState` (the state machine bits) and `Binlog` (the durable cursor).
//!
//! Grounded on the admin layer's `SlaveofCmd`/`PikasyncCmd`/`UcanpsyncCmd`/`SyncerrorCmd`/
//! `PurgelogstoCmd` bodies; state transitions and error strings follow those almost verbatim.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{info, warn};

use crate::binlog::parse_segment_name;
use crate::client::{ClientRole, ConnState};
use crate::context::ServerContext;
use crate::errors::ReplicationError;
use crate::server_state::MsState;
use crate::util::construct_redis_command;

/// The three-way outcome `trysync` hands back to the requesting slave, named the way the
/// original wire handshake names them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrysyncOutcome {
    /// Resume is possible from the requested `(filenum, offset)`.
    UcanPsync,
    /// Resume is not possible (tail predates the oldest retained segment, or doesn't exist);
    /// the slave must fall back to a full resync.
    SyncError,
}

/// Implements `SLAVEOF host port [filenum offset]`. Refuses a self-connect (the exact failure
/// mode the original commands guard named "you fucked up") and requires the state machine to
/// currently be `Single`/standalone before transitioning to `Connect`. When a psync-resume tail
/// is given, primes the binlog's producer cursor to that position before the handshake starts.
pub async fn slaveof(
    ctx: &ServerContext,
    host: &str,
    port: u16,
    self_host: &str,
    resume: Option<(u32, u64)>,
) -> Result<(), ReplicationError> {
    if host == self_host && port == ctx.config.port {
        return Err(ReplicationError::SelfConnect);
    }
    if ctx.state.ms_state().await != MsState::Single {
        return Err(ReplicationError::NotSingle);
    }
    let repl_state = ctx.state.repl_state().await;
    if repl_state.contains(crate::server_state::ReplState::SLAVE) {
        return Err(ReplicationError::AlreadySlave);
    }
    if let Some((filenum, offset)) = resume {
        ctx.binlog
            .set_producer_status(filenum, offset)
            .await
            .map_err(|_| ReplicationError::InvalidPsyncTail { filenum, offset })?;
    }
    info!(host, port, "slaveof: becoming a slave");
    ctx.state.slaveof(host.to_string(), port).await;
    Ok(())
}

pub async fn slaveof_no_one(ctx: &ServerContext) -> Result<(), ReplicationError> {
    if !ctx.state.repl_state().await.contains(crate::server_state::ReplState::SLAVE) {
        return Err(ReplicationError::NotSlave);
    }
    info!("slaveof no one: detaching from master");
    ctx.state.slaveof_no_one().await;
    Ok(())
}

/// Implements `trysync`'s psync-tail validation: a slave asking to resume from
/// `(filenum, offset)` can only do so if that segment still exists and `offset` is within both
/// the segment's actual size and `Binlog::MMAP_SIZE`.
pub async fn trysync(ctx: &ServerContext, filenum: u32, offset: u64) -> TrysyncOutcome {
    match ctx.binlog.set_producer_status(filenum, offset).await {
        Ok(()) => TrysyncOutcome::UcanPsync,
        Err(err) => {
            warn!(filenum, offset, error = %err, "trysync: psync tail not resumable");
            TrysyncOutcome::SyncError
        }
    }
}

/// Records that a slave connection has successfully resumed via psync.
pub async fn ucanpsync(ctx: &ServerContext, client_id: u64, addr: std::net::SocketAddr) {
    ctx.state.register_slave(client_id, addr).await;
    ctx.state.set_ms_state(MsState::Connected).await;
}

/// The slave-side counterpart: the master told us to fall back to a full resync.
pub async fn syncerror(ctx: &ServerContext) {
    ctx.state.set_ms_state(MsState::Connecting).await;
}

/// Implements `PURGELOGSTO write2file<N>`: parses the target segment name and purges up to it,
/// refusing if that would eat into the 10-file safety margin below the current consumer `max`.
pub async fn purge_logs_to(ctx: &ServerContext, target: &str) -> Result<u32, ReplicationError> {
    let filenum = parse_segment_name(target).ok_or_else(|| ReplicationError::Other(format!("invalid binlog name: {}", target)))?;
    ctx.binlog
        .purge_logs_to(filenum)
        .await
        .map_err(|err| ReplicationError::Other(err.to_string()))
}

/// Boot-time slave handshake: connects to the configured master's replication listener
/// (`port + 100`, not `port` — the quirk this crate preserves rather than "fixes") and performs
/// `PING` / `TRYSYNC` / apply loop, only ever called once at startup when `replicaof` is set.
pub async fn connect_to_master(ctx: Arc<ServerContext>, host: String, port: u16) {
    ctx.state.slaveof(host.clone(), port).await;
    ctx.state.set_ms_state(MsState::Connecting).await;

    let master_addr = format!("{}:{}", host, port + 100);
    let stream = match TcpStream::connect(&master_addr).await {
        Ok(s) => s,
        Err(err) => {
            warn!(master = master_addr, error = %err, "failed to connect to master");
            ctx.state.set_ms_state(MsState::Offline).await;
            return;
        }
    };
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    if let Err(err) = handshake_roundtrip(&mut write_half, &mut reader, ctx.config.port).await {
        warn!(master = master_addr, error = %err, "handshake with master failed");
        ctx.state.set_ms_state(MsState::Offline).await;
        return;
    }

    info!(master = master_addr, "replication handshake complete, streaming from master");
    ctx.state.set_ms_state(MsState::Connected).await;

    let mut conn = ConnState::new(0, stream_peer_addr(&master_addr));
    conn.role = ClientRole::Master;
    loop {
        match crate::frontend::read_request(&mut reader).await {
            Ok(Some(args)) if !args.is_empty() => {
                crate::dispatcher::dispatch(&ctx, &mut conn, args).await;
            }
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, "lost connection to master");
                break;
            }
        }
    }
    ctx.state.set_ms_state(MsState::Offline).await;
}

fn stream_peer_addr(addr: &str) -> std::net::SocketAddr {
    addr.parse().unwrap_or_else(|_| "0.0.0.0:0".parse().unwrap())
}

async fn handshake_roundtrip<R>(
    writer: &mut (impl AsyncWriteExt + Unpin),
    reader: &mut BufReader<R>,
    self_port: u16,
) -> std::io::Result<()>
where
    R: tokio::io::AsyncRead + Unpin,
{
    writer.write_all(construct_redis_command(&["ping"]).as_bytes()).await?;
    expect_line_containing(reader, "PONG").await?;

    writer
        .write_all(construct_redis_command(&["trysync", &self_port.to_string(), "0", "0"]).as_bytes())
        .await?;
    expect_line_containing(reader, "ucanpsync").await?;
    Ok(())
}

async fn expect_line_containing<R>(reader: &mut BufReader<R>, needle: &str) -> std::io::Result<()>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buf = [0u8; 512];
    let n = reader.read(&mut buf).await?;
    let response = String::from_utf8_lossy(&buf[..n]);
    if response.to_ascii_lowercase().contains(&needle.to_ascii_lowercase()) {
        Ok(())
    } else {
        Err(std::io::Error::new(std::io::ErrorKind::InvalidData, format!("unexpected reply from master: {}", response)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binlog::Binlog;
    use crate::config::{Cli, Config};
    use crate::server_state::ServerState;
    use crate::storage::Storage;

    async fn test_ctx(port: u16) -> ServerContext {
        let cli = Cli {
            conf: None,
            port: Some(port),
            thread_num: None,
            db_path: None,
            log_path: None,
            requirepass: None,
            daemonize: None,
            replicaof: None,
            timeout: None,
            log_level: None,
        };
        let dir = std::env::temp_dir().join(format!("pika-core-replication-test-{}-{}", std::process::id(), port));
        ServerContext {
            config: Config::from_cli(cli).unwrap(),
            state: ServerState::new(port),
            storage: Storage::new(),
            binlog: Binlog::open(dir).await.unwrap(),
        }
    }

    #[tokio::test]
    async fn slaveof_self_connect_is_rejected() {
        let ctx = test_ctx(6379).await;
        let err = slaveof(&ctx, "127.0.0.1", 6379, "127.0.0.1", None).await.unwrap_err();
        assert!(matches!(err, ReplicationError::SelfConnect));
    }

    #[tokio::test]
    async fn slaveof_then_no_one_clears_slave_bit() {
        let ctx = test_ctx(6379).await;
        slaveof(&ctx, "10.0.0.1", 6380, "127.0.0.1", None).await.unwrap();
        assert!(ctx.state.repl_state().await.contains(crate::server_state::ReplState::SLAVE));
        slaveof_no_one(&ctx).await.unwrap();
        assert!(!ctx.state.repl_state().await.contains(crate::server_state::ReplState::SLAVE));
    }

    #[tokio::test]
    async fn slaveof_rejects_a_second_call_while_already_connecting() {
        let ctx = test_ctx(6379).await;
        ctx.state.set_ms_state(MsState::Connect).await;
        let err = slaveof(&ctx, "10.0.0.1", 6380, "127.0.0.1", None).await.unwrap_err();
        assert!(matches!(err, ReplicationError::NotSingle));
    }

    #[tokio::test]
    async fn trysync_against_nonexistent_segment_reports_syncerror() {
        let ctx = test_ctx(6381).await;
        let outcome = trysync(&ctx, 7, 0).await;
        assert_eq!(outcome, TrysyncOutcome::SyncError);
    }

    #[tokio::test]
    async fn purge_logs_to_rejects_bad_segment_name() {
        let ctx = test_ctx(6382).await;
        let err = purge_logs_to(&ctx, "not-a-segment").await.unwrap_err();
        assert!(matches!(err, ReplicationError::Other(_)));
    }
}
