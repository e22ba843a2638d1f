//! Thin executor wrappers around the replication control plane (`crate::replication`):
//! `SLAVEOF`, `TRYSYNC`, `UCANPSYNC`, `SYNCERROR`, `PIKASYNC`, `PURGELOGSTO`.

use async_trait::async_trait;

use crate::client::{ClientRole, ConnState};
use crate::command_table::CommandInfo;
use crate::context::ServerContext;
use crate::executor::CommandExecutor;
use crate::replication;
use crate::resp::CmdRes;

/// `SLAVEOF host port [filenum offset]`: the trailing pair is a psync-resume tail asking the
/// binlog's producer cursor to be primed to that position before the handshake starts.
#[derive(Default)]
pub struct SlaveofCmd {
    host: String,
    port: u16,
    no_one: bool,
    resume: Option<(u32, u64)>,
}

#[async_trait]
impl CommandExecutor for SlaveofCmd {
    fn clear(&mut self) {
        *self = SlaveofCmd::default();
    }

    fn do_initial(&mut self, args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        if args[1].eq_ignore_ascii_case("no") && args.get(2).is_some_and(|a| a.eq_ignore_ascii_case("one")) {
            self.no_one = true;
            return Ok(());
        }
        self.host = args[1].clone();
        self.port = args.get(2).and_then(|p| p.parse().ok()).ok_or_else(|| {
            let mut res = CmdRes::new();
            res.set_out_of_range();
            res
        })?;
        if args.len() > 3 {
            let filenum: u32 = args.get(3).and_then(|v| v.parse().ok()).ok_or_else(|| {
                let mut res = CmdRes::new();
                res.set_out_of_range();
                res
            })?;
            let offset: u64 = args.get(4).and_then(|v| v.parse().ok()).ok_or_else(|| {
                let mut res = CmdRes::new();
                res.set_out_of_range();
                res
            })?;
            self.resume = Some((filenum, offset));
        }
        Ok(())
    }

    async fn execute(&mut self, ctx: &ServerContext, _conn: &mut ConnState) -> CmdRes {
        let mut res = CmdRes::new();
        let outcome = if self.no_one {
            replication::slaveof_no_one(ctx).await
        } else {
            replication::slaveof(ctx, &self.host, self.port, "127.0.0.1", self.resume).await
        };
        match outcome {
            Ok(()) => res.set_ok(),
            Err(err) => res.set_err_other(err.to_string()),
        }
        res
    }
}

/// `TRYSYNC <host> <filenum> <offset> <port>`: asks whether this master can resume replication
/// from the given binlog position.
#[derive(Default)]
pub struct TrysyncCmd {
    filenum: u32,
    offset: u64,
}

#[async_trait]
impl CommandExecutor for TrysyncCmd {
    fn clear(&mut self) {
        *self = TrysyncCmd::default();
    }

    fn do_initial(&mut self, args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        self.filenum = args[2].parse().map_err(|_| syntax_err())?;
        self.offset = args[3].parse().map_err(|_| syntax_err())?;
        Ok(())
    }

    async fn execute(&mut self, ctx: &ServerContext, conn: &mut ConnState) -> CmdRes {
        let mut res = CmdRes::new();
        match replication::trysync(ctx, self.filenum, self.offset).await {
            replication::TrysyncOutcome::UcanPsync => {
                replication::ucanpsync(ctx, conn.id, conn.addr).await;
                conn.role = ClientRole::Slave;
                res.append_array_len(1);
                res.append_bulk_string("ucanpsync");
            }
            replication::TrysyncOutcome::SyncError => {
                res.append_array_len(1);
                res.append_bulk_string("syncerror");
            }
        }
        res
    }
}

fn syntax_err() -> CmdRes {
    let mut res = CmdRes::new();
    res.set_syntax_err();
    res
}

#[derive(Default)]
pub struct UcanpsyncCmd;

#[async_trait]
impl CommandExecutor for UcanpsyncCmd {
    fn do_initial(&mut self, _args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        Ok(())
    }

    async fn execute(&mut self, ctx: &ServerContext, conn: &mut ConnState) -> CmdRes {
        replication::ucanpsync(ctx, conn.id, conn.addr).await;
        let mut res = CmdRes::new();
        res.set_ok();
        res
    }
}

#[derive(Default)]
pub struct SyncerrorCmd;

#[async_trait]
impl CommandExecutor for SyncerrorCmd {
    fn do_initial(&mut self, _args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        Ok(())
    }

    async fn execute(&mut self, ctx: &ServerContext, _conn: &mut ConnState) -> CmdRes {
        replication::syncerror(ctx).await;
        let mut res = CmdRes::new();
        res.set_ok();
        res
    }
}

/// `PIKASYNC` is the slave-side kickoff of the handshake (`AUTH` + `TRYSYNC` rolled into one
/// request from the client's perspective); on the master side it is answered identically to
/// `TRYSYNC` with a prefixed auth check when `requirepass` is set.
#[derive(Default)]
pub struct PikasyncCmd {
    args: Vec<String>,
}

#[async_trait]
impl CommandExecutor for PikasyncCmd {
    fn clear(&mut self) {
        self.args.clear();
    }

    fn do_initial(&mut self, args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        self.args = args.to_vec();
        Ok(())
    }

    async fn execute(&mut self, ctx: &ServerContext, conn: &mut ConnState) -> CmdRes {
        let mut res = CmdRes::new();
        let requirepass = ctx.config.requirepass().await;
        if !requirepass.is_empty() {
            res.append_array_len(2);
            res.append_bulk_string("auth");
            res.append_bulk_string(&requirepass);
        } else {
            replication::ucanpsync(ctx, conn.id, conn.addr).await;
            res.append_array_len(1);
            res.append_bulk_string("ucanpsync");
        }
        res
    }
}

#[derive(Default)]
pub struct PurgelogstoCmd {
    target: String,
}

#[async_trait]
impl CommandExecutor for PurgelogstoCmd {
    fn clear(&mut self) {
        self.target.clear();
    }

    fn do_initial(&mut self, args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        self.target = args[1].clone();
        Ok(())
    }

    async fn execute(&mut self, ctx: &ServerContext, _conn: &mut ConnState) -> CmdRes {
        let mut res = CmdRes::new();
        match replication::purge_logs_to(ctx, &self.target).await {
            Ok(purged) => {
                res.append_integer(purged as i64);
            }
            Err(err) => res.set_err_other(err.to_string()),
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_table::lookup;

    #[test]
    fn slaveof_no_one_is_recognized_case_insensitively() {
        let info = lookup("slaveof").unwrap();
        let mut cmd = SlaveofCmd::default();
        cmd.do_initial(&["slaveof".into(), "NO".into(), "ONE".into()], info).unwrap();
        assert!(cmd.no_one);
    }

    #[test]
    fn slaveof_with_non_numeric_port_is_out_of_range() {
        let info = lookup("slaveof").unwrap();
        let mut cmd = SlaveofCmd::default();
        let err = cmd.do_initial(&["slaveof".into(), "10.0.0.1".into(), "notaport".into()], info).unwrap_err();
        assert_eq!(err.kind(), crate::resp::CmdKind::OutOfRange);
    }

    #[test]
    fn slaveof_with_resume_tail_parses_filenum_and_offset() {
        let info = lookup("slaveof").unwrap();
        let mut cmd = SlaveofCmd::default();
        cmd.do_initial(
            &["slaveof".into(), "10.0.0.1".into(), "6380".into(), "3".into(), "128".into()],
            info,
        )
        .unwrap();
        assert_eq!(cmd.resume, Some((3, 128)));
    }
}
