//! String-valued key commands: `GET`/`SET`/`DEL`/`INCR`*/`DECR`*/`GETSET`/`APPEND`/`MGET`.
//!
//! Each is a `CommandExecutor` routed through `Storage` rather than touching a shared
//! `HashMap` directly.

use async_trait::async_trait;

use crate::client::ConnState;
use crate::command_table::CommandInfo;
use crate::context::ServerContext;
use crate::errors::StorageError;
use crate::executor::CommandExecutor;
use crate::resp::CmdRes;

#[derive(Default)]
pub struct GetCmd {
    key: String,
}

#[async_trait]
impl CommandExecutor for GetCmd {
    fn clear(&mut self) {
        self.key.clear();
    }

    fn do_initial(&mut self, args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        self.key = args[1].clone();
        Ok(())
    }

    async fn execute(&mut self, ctx: &ServerContext, _conn: &mut ConnState) -> CmdRes {
        let mut res = CmdRes::new();
        match ctx.storage.get(&self.key).await {
            Some(value) => res.append_bulk_string(&value),
            None => res.append_nil_bulk(),
        }
        res
    }
}

#[derive(Default)]
pub struct SetCmd {
    key: String,
    value: String,
    ex: Option<u64>,
    px: Option<u64>,
}

#[async_trait]
impl CommandExecutor for SetCmd {
    fn clear(&mut self) {
        *self = SetCmd::default();
    }

    fn do_initial(&mut self, args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        self.key = args[1].clone();
        self.value = args[2].clone();
        let mut i = 3;
        while i < args.len() {
            match args[i].to_ascii_uppercase().as_str() {
                "EX" => {
                    let secs = args.get(i + 1).and_then(|v| v.parse().ok()).ok_or_else(err_syntax)?;
                    self.ex = Some(secs);
                    i += 2;
                }
                "PX" => {
                    let ms = args.get(i + 1).and_then(|v| v.parse().ok()).ok_or_else(err_syntax)?;
                    self.px = Some(ms);
                    i += 2;
                }
                _ => return Err(err_syntax()),
            }
        }
        Ok(())
    }

    async fn execute(&mut self, ctx: &ServerContext, _conn: &mut ConnState) -> CmdRes {
        ctx.storage.set(self.key.clone(), self.value.clone(), self.ex, self.px).await;
        let mut res = CmdRes::new();
        res.set_ok();
        res
    }
}

fn err_syntax() -> CmdRes {
    let mut res = CmdRes::new();
    res.set_syntax_err();
    res
}

#[derive(Default)]
pub struct DelCmd {
    keys: Vec<String>,
}

#[async_trait]
impl CommandExecutor for DelCmd {
    fn clear(&mut self) {
        self.keys.clear();
    }

    fn do_initial(&mut self, args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        self.keys = args[1..].to_vec();
        Ok(())
    }

    async fn execute(&mut self, ctx: &ServerContext, _conn: &mut ConnState) -> CmdRes {
        let removed = ctx.storage.del(&self.keys).await;
        let mut res = CmdRes::new();
        res.append_integer(removed);
        res
    }
}

#[derive(Default)]
pub struct MgetCmd {
    keys: Vec<String>,
}

#[async_trait]
impl CommandExecutor for MgetCmd {
    fn clear(&mut self) {
        self.keys.clear();
    }

    fn do_initial(&mut self, args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        self.keys = args[1..].to_vec();
        Ok(())
    }

    async fn execute(&mut self, ctx: &ServerContext, _conn: &mut ConnState) -> CmdRes {
        let values = ctx.storage.mget(&self.keys).await;
        let mut res = CmdRes::new();
        res.append_array_len(values.len() as i64);
        for value in values {
            match value {
                Some(v) => res.append_bulk_string(&v),
                None => res.append_nil_bulk(),
            }
        }
        res
    }
}

#[derive(Default)]
pub struct GetsetCmd {
    key: String,
    value: String,
}

#[async_trait]
impl CommandExecutor for GetsetCmd {
    fn clear(&mut self) {
        *self = GetsetCmd::default();
    }

    fn do_initial(&mut self, args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        self.key = args[1].clone();
        self.value = args[2].clone();
        Ok(())
    }

    async fn execute(&mut self, ctx: &ServerContext, _conn: &mut ConnState) -> CmdRes {
        let previous = ctx.storage.getset(self.key.clone(), self.value.clone()).await;
        let mut res = CmdRes::new();
        match previous {
            Some(v) => res.append_bulk_string(&v),
            None => res.append_nil_bulk(),
        }
        res
    }
}

#[derive(Default)]
pub struct AppendCmd {
    key: String,
    suffix: String,
}

#[async_trait]
impl CommandExecutor for AppendCmd {
    fn clear(&mut self) {
        *self = AppendCmd::default();
    }

    fn do_initial(&mut self, args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        self.key = args[1].clone();
        self.suffix = args[2].clone();
        Ok(())
    }

    async fn execute(&mut self, ctx: &ServerContext, _conn: &mut ConnState) -> CmdRes {
        let len = ctx.storage.append(&self.key, &self.suffix).await;
        let mut res = CmdRes::new();
        res.append_integer(len as i64);
        res
    }
}

/// Shared body for `INCR`/`INCRBY`/`DECR`/`DECRBY`: all four just differ in the fixed delta and
/// its sign.
#[derive(Default)]
pub struct IncrByCmd {
    key: String,
    delta: i64,
    /// Parsed once in `do_initial`, defaulting to the command's implicit `+1`/`-1` for
    /// `INCR`/`DECR`.
    explicit_amount: Option<String>,
    negate: bool,
}

impl IncrByCmd {
    pub fn decrement() -> Self {
        IncrByCmd { negate: true, ..Default::default() }
    }
}

#[async_trait]
impl CommandExecutor for IncrByCmd {
    fn clear(&mut self) {
        let negate = self.negate;
        *self = IncrByCmd { negate, ..Default::default() };
    }

    fn do_initial(&mut self, args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        self.key = args[1].clone();
        if args.len() > 2 {
            self.explicit_amount = Some(args[2].clone());
        }
        Ok(())
    }

    async fn execute(&mut self, ctx: &ServerContext, _conn: &mut ConnState) -> CmdRes {
        let mut res = CmdRes::new();
        let magnitude: i64 = match &self.explicit_amount {
            Some(s) => match s.parse() {
                Ok(v) => v,
                Err(_) => {
                    res.set_out_of_range();
                    return res;
                }
            },
            None => 1,
        };
        let delta = if self.negate { -magnitude } else { magnitude };
        match ctx.storage.incr_by(&self.key, delta).await {
            Ok(next) => res.append_integer(next),
            Err(StorageError::NotAnInteger) => res.set_out_of_range(),
            Err(_) => res.set_err_other("internal storage error"),
        }
        res
    }
}

#[derive(Default)]
pub struct IncrByFloatCmd {
    key: String,
    delta: f64,
}

#[async_trait]
impl CommandExecutor for IncrByFloatCmd {
    fn clear(&mut self) {
        *self = IncrByFloatCmd::default();
    }

    fn do_initial(&mut self, args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        self.key = args[1].clone();
        self.delta = args[2].parse().map_err(|_| {
            let mut res = CmdRes::new();
            res.set_out_of_range();
            res
        })?;
        Ok(())
    }

    async fn execute(&mut self, ctx: &ServerContext, _conn: &mut ConnState) -> CmdRes {
        let mut res = CmdRes::new();
        match ctx.storage.incr_by_float(&self.key, self.delta).await {
            Ok(next) => res.append_bulk_string(&format!("{}", next)),
            Err(_) => res.set_out_of_range(),
        }
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
            port: Some(6399),
            thread_num: None,
            db_path: None,
            log_path: None,
            requirepass: None,
            daemonize: None,
            replicaof: None,
            timeout: None,
            log_level: None,
        };
        let dir = std::env::temp_dir().join(format!("pika-core-kv-test-{}", std::process::id()));
        ServerContext {
            config: Config::from_cli(cli).unwrap(),
            state: ServerState::new(6399),
            storage: Storage::new(),
            binlog: Binlog::open(dir).await.unwrap(),
        }
    }

    fn test_conn() -> ConnState {
        let addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        ConnState::new(1, addr)
    }

    #[tokio::test]
    async fn get_on_missing_key_returns_nil() {
        let ctx = test_ctx().await;
        let mut conn = test_conn();
        let info = lookup("get").unwrap();
        let mut cmd = GetCmd::default();
        cmd.do_initial(&["get".into(), "missing".into()], info).unwrap();
        let res = cmd.execute(&ctx, &mut conn).await;
        assert_eq!(res.render(), b"$-1\r\n");
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let ctx = test_ctx().await;
        let mut conn = test_conn();
        let info = lookup("set").unwrap();
        let mut set_cmd = SetCmd::default();
        set_cmd.do_initial(&["set".into(), "k".into(), "v".into()], info).unwrap();
        set_cmd.execute(&ctx, &mut conn).await;

        let info = lookup("get").unwrap();
        let mut get_cmd = GetCmd::default();
        get_cmd.do_initial(&["get".into(), "k".into()], info).unwrap();
        let res = get_cmd.execute(&ctx, &mut conn).await;
        assert_eq!(res.render(), b"$1\r\nv\r\n");
    }

    #[tokio::test]
    async fn set_with_unknown_option_is_syntax_error() {
        let info = lookup("set").unwrap();
        let mut cmd = SetCmd::default();
        let err = cmd.do_initial(&["set".into(), "k".into(), "v".into(), "NX".into()], info).unwrap_err();
        assert_eq!(err.kind(), crate::resp::CmdKind::SyntaxErr);
    }

    #[tokio::test]
    async fn incr_without_explicit_amount_defaults_to_one() {
        let ctx = test_ctx().await;
        let mut conn = test_conn();
        let info = lookup("incr").unwrap();
        let mut cmd = IncrByCmd::default();
        cmd.do_initial(&["incr".into(), "counter".into()], info).unwrap();
        let res = cmd.execute(&ctx, &mut conn).await;
        assert_eq!(res.render(), b":1\r\n");
    }

    #[tokio::test]
    async fn decrby_subtracts_the_given_amount() {
        let ctx = test_ctx().await;
        let mut conn = test_conn();
        ctx.storage.set("counter".into(), "10".into(), None, None).await;
        let info = lookup("decrby").unwrap();
        let mut cmd = IncrByCmd::decrement();
        cmd.do_initial(&["decrby".into(), "counter".into(), "3".into()], info).unwrap();
        let res = cmd.execute(&ctx, &mut conn).await;
        assert_eq!(res.render(), b":7\r\n");
    }
}
