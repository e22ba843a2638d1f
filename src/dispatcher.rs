//! The dispatch pipeline: lookup → arity check → admission policy → `initial`/`execute` →
//! binlog append.
//!
//! Admission policy ordering follows the lock-ordering note in `server_state.rs`: the readonly
//! check takes `readonly` (a leaf lock) only for the duration of the check itself, and is
//! released before `initial`/`execute` run — no executor ever inherits a lock held by the
//! dispatcher, which resolves the admin layer's `pthread_rwlock_unlock`-on-entry pattern: instead
//! of commands starting with a stray unlock of a lock the caller held, the caller here just never
//! hands one over.

use tracing::{debug, warn};

use crate::client::{ClientRole, ConnState};
use crate::command_table::{self, CommandInfo};
use crate::context::ServerContext;
use crate::executor;
use crate::resp::{self, CmdRes};

/// Dispatches one already-parsed request (command name + arguments, name included at index 0)
/// and returns the rendered RESP reply bytes.
pub async fn dispatch(ctx: &ServerContext, conn: &mut ConnState, args: Vec<String>) -> Vec<u8> {
    if args.is_empty() {
        return resp::unknown_command_reply("");
    }
    let name = &args[0];

    let info = match command_table::lookup(name) {
        Some(info) => info,
        None => return resp::unknown_command_reply(name),
    };

    if !info.check_arity(args.len()) {
        let mut res = CmdRes::new();
        res.set_wrong_num(info.name);
        return res.render();
    }

    if let Some(rejection) = admission_check(ctx, info).await {
        return rejection.render();
    }

    let mut exec = match executor::factory_for(info.name) {
        Some(factory) => factory(),
        None => {
            warn!(command = info.name, "command has a descriptor but no executor factory");
            return resp::unknown_command_reply(name);
        }
    };

    let cmd_res = match executor::initial(exec.as_mut(), &args, info) {
        Some(early_reply) => early_reply,
        None => exec.execute(ctx, conn).await,
    };

    // Commands streamed in from a master are already durable in *its* binlog; this node only
    // re-logs them if it has slaves of its own to chain to one day, which is out of scope for
    // now, so a master-sourced apply never re-appends here.
    if info.is_write() && !info.is_local() && cmd_res.is_ok() && conn.role != ClientRole::Master {
        if let Err(err) = ctx.binlog.append(&args).await {
            warn!(command = info.name, error = %err, "failed to append to binlog");
        }
    }

    debug!(command = info.name, "dispatched");
    cmd_res.render()
}

/// Checks readonly mode and the shutdown-suspend gate; returns `Some(reply)` if the command
/// should be rejected outright.
async fn admission_check(ctx: &ServerContext, info: &CommandInfo) -> Option<CmdRes> {
    if info.is_write() && !info.is_local() && ctx.state.is_readonly().await {
        let mut res = CmdRes::new();
        res.set_err_other("You can't write against a read only slave.");
        return Some(res);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binlog::Binlog;
    use crate::config::{Cli, Config};
    use crate::server_state::ServerState;
    use crate::storage::Storage;
    use std::net::SocketAddr;

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
        let dir = std::env::temp_dir().join(format!("pika-core-dispatch-test-{}-{}", std::process::id(), port));
        ServerContext {
            config: Config::from_cli(cli).unwrap(),
            state: ServerState::new(port),
            storage: Storage::new(),
            binlog: Binlog::open(dir).await.unwrap(),
        }
    }

    fn test_conn() -> ConnState {
        let addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        ConnState::new(1, addr)
    }

    #[tokio::test]
    async fn unknown_command_replies_with_error() {
        let ctx = test_ctx(6500).await;
        let mut conn = test_conn();
        let reply = dispatch(&ctx, &mut conn, vec!["frobnicate".into()]).await;
        assert!(String::from_utf8(reply).unwrap().starts_with("-ERR unknown command"));
    }

    #[tokio::test]
    async fn wrong_arity_is_rejected_before_reaching_the_executor() {
        let ctx = test_ctx(6501).await;
        let mut conn = test_conn();
        let reply = dispatch(&ctx, &mut conn, vec!["get".into()]).await;
        assert!(String::from_utf8(reply).unwrap().contains("wrong number of arguments"));
    }

    #[tokio::test]
    async fn set_then_get_through_the_full_pipeline() {
        let ctx = test_ctx(6502).await;
        let mut conn = test_conn();
        let reply = dispatch(&ctx, &mut conn, vec!["set".into(), "k".into(), "v".into()]).await;
        assert_eq!(reply, b"+OK\r\n");
        let reply = dispatch(&ctx, &mut conn, vec!["get".into(), "k".into()]).await;
        assert_eq!(reply, b"$1\r\nv\r\n");
    }

    #[tokio::test]
    async fn readonly_mode_rejects_writes_but_allows_reads() {
        let ctx = test_ctx(6503).await;
        let mut conn = test_conn();
        ctx.state.set_readonly(true).await;
        let reply = dispatch(&ctx, &mut conn, vec!["set".into(), "k".into(), "v".into()]).await;
        assert_eq!(reply, b"-ERR You can't write against a read only slave.\r\n");
        let reply = dispatch(&ctx, &mut conn, vec!["get".into(), "k".into()]).await;
        assert_eq!(reply, b"$-1\r\n");
    }

    #[tokio::test]
    async fn successful_write_advances_the_binlog() {
        let ctx = test_ctx(6504).await;
        let mut conn = test_conn();
        let before = ctx.binlog.producer_cursor().await;
        dispatch(&ctx, &mut conn, vec!["set".into(), "k".into(), "v".into()]).await;
        let after = ctx.binlog.producer_cursor().await;
        assert!(after.1 > before.1);
    }

    #[tokio::test]
    async fn config_set_is_a_write_and_advances_the_binlog() {
        let ctx = test_ctx(6505).await;
        let mut conn = test_conn();
        let before = ctx.binlog.producer_cursor().await;
        dispatch(&ctx, &mut conn, vec!["config".into(), "set".into(), "timeout".into(), "5".into()]).await;
        let after = ctx.binlog.producer_cursor().await;
        assert!(after.1 > before.1);
    }

    #[tokio::test]
    async fn config_set_is_rejected_on_a_read_only_slave() {
        let ctx = test_ctx(6506).await;
        let mut conn = test_conn();
        ctx.state.set_readonly(true).await;
        let reply = dispatch(&ctx, &mut conn, vec!["config".into(), "set".into(), "timeout".into(), "5".into()]).await;
        assert_eq!(reply, b"-ERR You can't write against a read only slave.\r\n");
    }
}
