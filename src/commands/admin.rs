//! Admin commands with no replication-plane involvement: `AUTH`, `PING`, `CLIENT`, `LOADDB`,
//! `FLUSHALL`, `SHUTDOWN`, `DUMP`, `DUMPOFF`, `READONLY`, `SELECT`, `CONFIG`, `INFO`.
//!
//! Grounded on `pika_admin.cc`'s corresponding `::Do` bodies.

use async_trait::async_trait;
use tracing::info;

use crate::client::ConnState;
use crate::command_table::CommandInfo;
use crate::context::ServerContext;
use crate::executor::CommandExecutor;
use crate::introspection;
use crate::resp::CmdRes;

#[derive(Default)]
pub struct AuthCmd {
    password: String,
}

#[async_trait]
impl CommandExecutor for AuthCmd {
    fn clear(&mut self) {
        self.password.clear();
    }

    fn do_initial(&mut self, args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        self.password = args[1].clone();
        Ok(())
    }

    async fn execute(&mut self, ctx: &ServerContext, _conn: &mut ConnState) -> CmdRes {
        let mut res = CmdRes::new();
        let requirepass = ctx.config.requirepass().await;
        if requirepass.is_empty() {
            res.set_err_other("Client sent AUTH, but no password is set");
        } else if self.password == requirepass {
            res.set_ok();
        } else {
            res.set_err_other("invalid password");
        }
        res
    }
}

#[derive(Default)]
pub struct PingCmd;

#[async_trait]
impl CommandExecutor for PingCmd {
    fn do_initial(&mut self, _args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        Ok(())
    }

    async fn execute(&mut self, _ctx: &ServerContext, _conn: &mut ConnState) -> CmdRes {
        let mut res = CmdRes::new();
        res.set_simple_string("PONG");
        res
    }
}

/// `SELECT` is a stub: this crate only ever has one logical database, so any index is accepted
/// and nothing actually switches. Deliberate, not an oversight — there is no second database to
/// switch to.
#[derive(Default)]
pub struct SelectCmd;

#[async_trait]
impl CommandExecutor for SelectCmd {
    fn do_initial(&mut self, args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        if args[1].parse::<i64>().is_err() {
            let mut res = CmdRes::new();
            res.set_out_of_range();
            return Err(res);
        }
        Ok(())
    }

    async fn execute(&mut self, _ctx: &ServerContext, _conn: &mut ConnState) -> CmdRes {
        let mut res = CmdRes::new();
        res.set_ok();
        res
    }
}

/// `CLIENT` has an arity check of its own beyond the descriptor's floor of 2: only
/// `CLIENT LIST` (argc 2) and `CLIENT KILL addr` (argc 3) are valid; anything longer is
/// rejected here rather than by the table.
#[derive(Default)]
pub struct ClientCmd {
    sub: String,
    target_addr: Option<String>,
}

#[async_trait]
impl CommandExecutor for ClientCmd {
    fn clear(&mut self) {
        *self = ClientCmd::default();
    }

    fn do_initial(&mut self, args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        if args.len() > 3 {
            let mut res = CmdRes::new();
            res.set_wrong_num("client");
            return Err(res);
        }
        self.sub = args[1].to_ascii_uppercase();
        self.target_addr = args.get(2).cloned();
        match self.sub.as_str() {
            "LIST" if args.len() == 2 => Ok(()),
            "KILL" if args.len() == 3 => Ok(()),
            _ => {
                let mut res = CmdRes::new();
                res.set_syntax_err();
                Err(res)
            }
        }
    }

    async fn execute(&mut self, ctx: &ServerContext, _conn: &mut ConnState) -> CmdRes {
        let mut res = CmdRes::new();
        match self.sub.as_str() {
            "LIST" => res.append_bulk_string(&introspection::client_list(ctx).await),
            "KILL" => {
                let addr = self.target_addr.as_deref().unwrap_or_default();
                if ctx.state.client_kill(addr).await {
                    res.set_ok();
                } else {
                    res.set_err_other(format!("No such client: {}", addr));
                }
            }
            _ => res.set_syntax_err(),
        }
        res
    }
}

/// `LOADDB <path>`: takes the suspend permit, parses the snapshot file and replaces the whole
/// keyspace.
#[derive(Default)]
pub struct LoaddbCmd {
    path: String,
}

#[async_trait]
impl CommandExecutor for LoaddbCmd {
    fn clear(&mut self) {
        self.path.clear();
    }

    fn do_initial(&mut self, args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        self.path = args[1].clone();
        Ok(())
    }

    async fn execute(&mut self, ctx: &ServerContext, _conn: &mut ConnState) -> CmdRes {
        let _permit = ctx.state.acquire_suspend().await;
        let mut res = CmdRes::new();
        match tokio::fs::File::open(&self.path).await {
            Ok(file) => match crate::rdb::read_snapshot(file).await {
                Ok(entries) => {
                    ctx.storage.load(entries).await;
                    res.set_ok();
                }
                Err(err) => res.set_err_other(format!("failed to parse {}: {}", self.path, err)),
            },
            Err(err) => res.set_err_other(format!("failed to open {}: {}", self.path, err)),
        }
        res
    }
}

#[derive(Default)]
pub struct FlushallCmd;

#[async_trait]
impl CommandExecutor for FlushallCmd {
    fn do_initial(&mut self, _args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        Ok(())
    }

    async fn execute(&mut self, ctx: &ServerContext, _conn: &mut ConnState) -> CmdRes {
        let _permit = ctx.state.acquire_suspend().await;
        ctx.storage.flushall().await;
        let mut res = CmdRes::new();
        res.set_ok();
        res
    }
}

#[derive(Default)]
pub struct ShutdownCmd;

#[async_trait]
impl CommandExecutor for ShutdownCmd {
    fn do_initial(&mut self, _args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        Ok(())
    }

    async fn execute(&mut self, ctx: &ServerContext, _conn: &mut ConnState) -> CmdRes {
        let _permit = ctx.state.acquire_suspend().await;
        info!("shutdown requested");
        std::process::exit(0);
    }
}

#[derive(Default)]
pub struct DumpCmd {
    path: String,
}

#[async_trait]
impl CommandExecutor for DumpCmd {
    fn clear(&mut self) {
        self.path.clear();
    }

    fn do_initial(&mut self, args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        self.path = args.get(1).cloned().unwrap_or_else(|| "./dump.rdb".to_string());
        Ok(())
    }

    async fn execute(&mut self, ctx: &ServerContext, _conn: &mut ConnState) -> CmdRes {
        let _permit = ctx.state.acquire_suspend().await;
        let mut res = CmdRes::new();
        let entries = ctx.storage.snapshot().await;
        match tokio::fs::File::create(&self.path).await {
            Ok(file) => match crate::rdb::write_snapshot(file, &entries).await {
                Ok(()) => res.set_ok(),
                Err(err) => res.set_err_other(format!("failed writing {}: {}", self.path, err)),
            },
            Err(err) => res.set_err_other(format!("failed creating {}: {}", self.path, err)),
        }
        res
    }
}

/// `DUMPOFF` cancels a previously scheduled background dump. This crate's `DUMP` is synchronous
/// (no background dump thread to cancel), so this is a compatibility no-op that always succeeds.
#[derive(Default)]
pub struct DumpoffCmd;

#[async_trait]
impl CommandExecutor for DumpoffCmd {
    fn do_initial(&mut self, _args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        Ok(())
    }

    async fn execute(&mut self, _ctx: &ServerContext, _conn: &mut ConnState) -> CmdRes {
        let mut res = CmdRes::new();
        res.set_ok();
        res
    }
}

#[derive(Default)]
pub struct ReadonlyCmd {
    on: bool,
}

#[async_trait]
impl CommandExecutor for ReadonlyCmd {
    fn clear(&mut self) {
        self.on = false;
    }

    fn do_initial(&mut self, args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        match args[1].to_ascii_lowercase().as_str() {
            "on" => {
                self.on = true;
                Ok(())
            }
            "off" => {
                self.on = false;
                Ok(())
            }
            _ => {
                let mut res = CmdRes::new();
                res.set_syntax_err();
                Err(res)
            }
        }
    }

    async fn execute(&mut self, ctx: &ServerContext, _conn: &mut ConnState) -> CmdRes {
        let _permit = ctx.state.acquire_suspend().await;
        ctx.state.set_readonly(self.on).await;
        let mut res = CmdRes::new();
        res.set_ok();
        res
    }
}

#[derive(Default)]
pub struct ConfigCmd {
    sub: String,
    item: Option<String>,
    value: Option<String>,
}

#[async_trait]
impl CommandExecutor for ConfigCmd {
    fn clear(&mut self) {
        *self = ConfigCmd::default();
    }

    fn do_initial(&mut self, args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        self.sub = args[1].to_ascii_uppercase();
        match self.sub.as_str() {
            "GET" if args.len() == 3 => {
                self.item = Some(args[2].clone());
                Ok(())
            }
            "SET" if args.len() == 4 => {
                self.item = Some(args[2].clone());
                self.value = Some(args[3].clone());
                Ok(())
            }
            _ => {
                let mut res = CmdRes::new();
                res.set_syntax_err();
                Err(res)
            }
        }
    }

    async fn execute(&mut self, ctx: &ServerContext, _conn: &mut ConnState) -> CmdRes {
        let mut res = CmdRes::new();
        match self.sub.as_str() {
            "GET" => {
                let item = self.item.as_deref().unwrap_or_default();
                match ctx.config.get(item).await {
                    Some((key, value)) => {
                        res.append_array_len(2);
                        res.append_bulk_string(&key);
                        res.append_bulk_string(&value);
                    }
                    None => res.set_err_other(crate::config::NO_SUCH_ITEM),
                }
            }
            "SET" => {
                let item = self.item.as_deref().unwrap_or_default();
                let value = self.value.as_deref().unwrap_or_default();
                match ctx.config.set(item, value).await {
                    Ok(()) => res.set_ok(),
                    Err(err) => res.set_err_other(err.to_string()),
                }
            }
            _ => res.set_syntax_err(),
        }
        res
    }
}

#[derive(Default)]
pub struct InfoCmd {
    section: Option<String>,
}

#[async_trait]
impl CommandExecutor for InfoCmd {
    fn clear(&mut self) {
        self.section = None;
    }

    fn do_initial(&mut self, args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        self.section = args.get(1).cloned();
        Ok(())
    }

    async fn execute(&mut self, ctx: &ServerContext, _conn: &mut ConnState) -> CmdRes {
        let body = introspection::build_info(ctx, self.section.as_deref()).await;
        let mut res = CmdRes::new();
        res.append_bulk_string(&body);
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binlog::Binlog;
    use crate::command_table::lookup;
    use crate::config::{Cli, Config};
    use crate::server_state::ServerState;
    use crate::storage::Storage;
    use std::net::SocketAddr;

    async fn test_ctx() -> ServerContext {
        let cli = Cli {
            conf: None,
            port: Some(6400),
            thread_num: None,
            db_path: None,
            log_path: None,
            requirepass: Some("secret".into()),
            daemonize: None,
            replicaof: None,
            timeout: None,
            log_level: None,
        };
        let dir = std::env::temp_dir().join(format!("pika-core-admin-test-{}", std::process::id()));
        ServerContext {
            config: Config::from_cli(cli).unwrap(),
            state: ServerState::new(6400),
            storage: Storage::new(),
            binlog: Binlog::open(dir).await.unwrap(),
        }
    }

    fn test_conn() -> ConnState {
        let addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        ConnState::new(1, addr)
    }

    #[tokio::test]
    async fn auth_with_correct_password_succeeds() {
        let ctx = test_ctx().await;
        let mut conn = test_conn();
        let info = lookup("auth").unwrap();
        let mut cmd = AuthCmd::default();
        cmd.do_initial(&["auth".into(), "secret".into()], info).unwrap();
        let res = cmd.execute(&ctx, &mut conn).await;
        assert!(res.is_ok());
    }

    #[tokio::test]
    async fn auth_with_wrong_password_fails() {
        let ctx = test_ctx().await;
        let mut conn = test_conn();
        let info = lookup("auth").unwrap();
        let mut cmd = AuthCmd::default();
        cmd.do_initial(&["auth".into(), "nope".into()], info).unwrap();
        let res = cmd.execute(&ctx, &mut conn).await;
        assert!(!res.is_ok());
    }

    #[tokio::test]
    async fn client_with_too_many_args_is_wrong_num() {
        let info = lookup("client").unwrap();
        let mut cmd = ClientCmd::default();
        let err = cmd
            .do_initial(&["client".into(), "list".into(), "extra".into(), "extra2".into()], info)
            .unwrap_err();
        assert_eq!(err.kind(), crate::resp::CmdKind::WrongNum);
    }

    #[tokio::test]
    async fn client_list_with_two_args_is_accepted() {
        let info = lookup("client").unwrap();
        let mut cmd = ClientCmd::default();
        assert!(cmd.do_initial(&["client".into(), "list".into()], info).is_ok());
    }

    #[tokio::test]
    async fn select_accepts_any_numeric_index() {
        let ctx = test_ctx().await;
        let mut conn = test_conn();
        let info = lookup("select").unwrap();
        let mut cmd = SelectCmd;
        cmd.do_initial(&["select".into(), "7".into()], info).unwrap();
        let res = cmd.execute(&ctx, &mut conn).await;
        assert!(res.is_ok());
    }

    #[tokio::test]
    async fn config_get_unknown_item_reports_no_such_item() {
        let ctx = test_ctx().await;
        let mut conn = test_conn();
        let info = lookup("config").unwrap();
        let mut cmd = ConfigCmd::default();
        cmd.do_initial(&["config".into(), "get".into(), "bogus".into()], info).unwrap();
        let res = cmd.execute(&ctx, &mut conn).await;
        assert_eq!(res.render(), b"-ERR No such configure item\r\n");
    }
}
