//! Command executor factories, keyed by name, backing `crate::executor::factory_for`.

mod admin;
mod kv;
mod replication;
mod stub;

use crate::executor::CommandExecutor;

macro_rules! not_implemented {
    ($name:literal) => {
        || Box::new(stub::NotImplementedCmd::new($name)) as Box<dyn CommandExecutor>
    };
}

pub fn factory_for(name: &str) -> Option<fn() -> Box<dyn CommandExecutor>> {
    let lower = name.to_ascii_lowercase();
    Some(match lower.as_str() {
        "auth" => || Box::new(admin::AuthCmd::default()) as Box<dyn CommandExecutor>,
        "ping" => || Box::new(admin::PingCmd) as Box<dyn CommandExecutor>,
        "client" => || Box::new(admin::ClientCmd::default()) as Box<dyn CommandExecutor>,
        "loaddb" => || Box::new(admin::LoaddbCmd::default()) as Box<dyn CommandExecutor>,
        "flushall" => || Box::new(admin::FlushallCmd) as Box<dyn CommandExecutor>,
        "shutdown" => || Box::new(admin::ShutdownCmd) as Box<dyn CommandExecutor>,
        "dump" => || Box::new(admin::DumpCmd::default()) as Box<dyn CommandExecutor>,
        "dumpoff" => || Box::new(admin::DumpoffCmd) as Box<dyn CommandExecutor>,
        "readonly" => || Box::new(admin::ReadonlyCmd::default()) as Box<dyn CommandExecutor>,
        "select" => || Box::new(admin::SelectCmd) as Box<dyn CommandExecutor>,
        "config" => || Box::new(admin::ConfigCmd::default()) as Box<dyn CommandExecutor>,
        "info" => || Box::new(admin::InfoCmd::default()) as Box<dyn CommandExecutor>,

        "slaveof" => || Box::new(replication::SlaveofCmd::default()) as Box<dyn CommandExecutor>,
        "trysync" => || Box::new(replication::TrysyncCmd::default()) as Box<dyn CommandExecutor>,
        "ucanpsync" => || Box::new(replication::UcanpsyncCmd) as Box<dyn CommandExecutor>,
        "syncerror" => || Box::new(replication::SyncerrorCmd) as Box<dyn CommandExecutor>,
        "pikasync" => || Box::new(replication::PikasyncCmd::default()) as Box<dyn CommandExecutor>,
        "purgelogsto" => || Box::new(replication::PurgelogstoCmd::default()) as Box<dyn CommandExecutor>,

        "get" => || Box::new(kv::GetCmd::default()) as Box<dyn CommandExecutor>,
        "set" => || Box::new(kv::SetCmd::default()) as Box<dyn CommandExecutor>,
        "del" => || Box::new(kv::DelCmd::default()) as Box<dyn CommandExecutor>,
        "mget" => || Box::new(kv::MgetCmd::default()) as Box<dyn CommandExecutor>,
        "getset" => || Box::new(kv::GetsetCmd::default()) as Box<dyn CommandExecutor>,
        "append" => || Box::new(kv::AppendCmd::default()) as Box<dyn CommandExecutor>,
        "incr" => || Box::new(kv::IncrByCmd::default()) as Box<dyn CommandExecutor>,
        "incrby" => || Box::new(kv::IncrByCmd::default()) as Box<dyn CommandExecutor>,
        "incrbyfloat" => || Box::new(kv::IncrByFloatCmd::default()) as Box<dyn CommandExecutor>,
        "decr" => || Box::new(kv::IncrByCmd::decrement()) as Box<dyn CommandExecutor>,
        "decrby" => || Box::new(kv::IncrByCmd::decrement()) as Box<dyn CommandExecutor>,

        "hset" => not_implemented!("hset"),
        "hget" => not_implemented!("hget"),
        "lpush" => not_implemented!("lpush"),
        "lrange" => not_implemented!("lrange"),
        "sadd" => not_implemented!("sadd"),
        "zadd" => not_implemented!("zadd"),

        _ => return None,
    })
}
