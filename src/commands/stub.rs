//! Data-type commands that are registered in the command table (so `lookup`/arity checking work
//! for them) but have no storage engine behind them yet. Every one of these replies with a
//! `NotImplemented`-flavored error instead of silently doing nothing.

use async_trait::async_trait;

use crate::client::ConnState;
use crate::command_table::CommandInfo;
use crate::context::ServerContext;
use crate::executor::CommandExecutor;
use crate::resp::CmdRes;

pub struct NotImplementedCmd {
    name: &'static str,
}

impl NotImplementedCmd {
    pub fn new(name: &'static str) -> Self {
        NotImplementedCmd { name }
    }
}

#[async_trait]
impl CommandExecutor for NotImplementedCmd {
    fn do_initial(&mut self, _args: &[String], _info: &'static CommandInfo) -> Result<(), CmdRes> {
        Ok(())
    }

    async fn execute(&mut self, _ctx: &ServerContext, _conn: &mut ConnState) -> CmdRes {
        let mut res = CmdRes::new();
        res.set_err_other(format!("command not implemented: {}", self.name));
        res
    }
}
