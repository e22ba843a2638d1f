//! The `CommandExecutor` contract every command implements, plus the name → factory registry the
//! dispatcher uses to build a fresh executor per request.
//!
//! Grounded on the admin layer's `Cmd` base class (`Initial`/`Do`/`DoInitial`/`Clear`). Unlike
//! that design, executors here are not pooled: the registry hands back a plain
//! `fn() -> Box<dyn CommandExecutor>`, and the dispatcher constructs one per dispatch. Executors
//! are not `Sync` and are never shared across tasks, so there is nothing to pool against.

use async_trait::async_trait;

use crate::client::ConnState;
use crate::command_table::CommandInfo;
use crate::context::ServerContext;
use crate::resp::CmdRes;

#[async_trait]
pub trait CommandExecutor: Send {
    /// Resets any state left over from a previous use of this executor. Most executors are
    /// single-use (constructed fresh per dispatch) and so never need to override this.
    fn clear(&mut self) {}

    /// Parses and validates `args` against `info`. Returning `Err` short-circuits the dispatch:
    /// the returned `CmdRes` becomes the reply and `execute` is never called.
    fn do_initial(&mut self, args: &[String], info: &'static CommandInfo) -> Result<(), CmdRes>;

    /// Performs the command's side effects and produces the final reply.
    async fn execute(&mut self, ctx: &ServerContext, conn: &mut ConnState) -> CmdRes;
}

/// Runs the `clear` + `do_initial` half of the contract, matching the admin layer's
/// `Cmd::Initial`.
pub fn initial(exec: &mut dyn CommandExecutor, args: &[String], info: &'static CommandInfo) -> Option<CmdRes> {
    exec.clear();
    exec.do_initial(args, info).err()
}

pub type ExecutorFactory = fn() -> Box<dyn CommandExecutor>;

/// Looks up the factory for a command name (case-insensitively). `None` means the name isn't
/// registered at all, distinct from the descriptor table's notion of "known but unimplemented"
/// (data-type stubs still have both a descriptor *and* a factory, just one that always replies
/// `NotImplemented`).
pub fn factory_for(name: &str) -> Option<ExecutorFactory> {
    crate::commands::factory_for(name)
}
