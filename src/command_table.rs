//! Command descriptor table: one `CommandInfo` per command name, holding arity and the packed
//! flag byte the dispatcher uses for admission control.
//!
//! Flag bit layout is carried over unchanged from the admin layer's `CmdFlagsMask`/`CmdFlags`:
//! bit 0 read/write, bits 1-3 command type, bit 4 local-only, bit 5 suspend, bit 6 priority.

use once_cell::sync::Lazy;
use std::collections::HashMap;

pub const RW_MASK: u16 = 0b0000001;
pub const TYPE_MASK: u16 = 0b0001110;
pub const LOCAL_MASK: u16 = 0b0010000;
pub const SUSPEND_MASK: u16 = 0b0100000;
pub const PRIOR_MASK: u16 = 0b1000000;

pub const READ: u16 = 0;
pub const WRITE: u16 = 1;

pub const ADMIN: u16 = 0 << 1;
pub const KV: u16 = 1 << 1;
pub const HASH: u16 = 2 << 1;
pub const LIST: u16 = 3 << 1;
pub const SET: u16 = 4 << 1;
pub const ZSET: u16 = 5 << 1;

pub const NOT_LOCAL: u16 = 0;
pub const LOCAL: u16 = LOCAL_MASK;

pub const NOT_SUSPEND: u16 = 0;
pub const SUSPEND: u16 = SUSPEND_MASK;

pub const NOT_PRIOR: u16 = 0;
pub const PRIOR: u16 = PRIOR_MASK;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdType {
    Admin,
    Kv,
    Hash,
    List,
    Set,
    Zset,
}

#[derive(Debug, Clone, Copy)]
pub struct CommandInfo {
    pub name: &'static str,
    /// `>0`: exact argument count (including the command name itself). `<0`: minimum of
    /// `|arity|` arguments, more are allowed.
    pub arity: i32,
    pub flags: u16,
}

impl CommandInfo {
    pub const fn new(name: &'static str, arity: i32, flags: u16) -> Self {
        CommandInfo { name, arity, flags }
    }

    pub fn is_write(&self) -> bool {
        self.flags & RW_MASK == WRITE
    }

    pub fn cmd_type(&self) -> CmdType {
        match self.flags & TYPE_MASK {
            ADMIN => CmdType::Admin,
            KV => CmdType::Kv,
            HASH => CmdType::Hash,
            LIST => CmdType::List,
            SET => CmdType::Set,
            ZSET => CmdType::Zset,
            _ => CmdType::Admin,
        }
    }

    pub fn is_local(&self) -> bool {
        self.flags & LOCAL_MASK != 0
    }

    pub fn is_suspend(&self) -> bool {
        self.flags & SUSPEND_MASK != 0
    }

    pub fn is_prior(&self) -> bool {
        self.flags & PRIOR_MASK != 0
    }

    /// `true` if `argc` (the full request including the command name) satisfies this
    /// descriptor's arity.
    pub fn check_arity(&self, argc: usize) -> bool {
        let argc = argc as i32;
        if self.arity >= 0 {
            argc == self.arity
        } else {
            argc >= -self.arity
        }
    }
}

macro_rules! cmd {
    ($name:expr, $arity:expr, $($flag:expr)|+) => {
        CommandInfo::new($name, $arity, $($flag)|+)
    };
}

static TABLE: &[CommandInfo] = &[
    // admin
    cmd!("auth", 2, READ | ADMIN | LOCAL),
    cmd!("ping", 1, READ | ADMIN | LOCAL),
    cmd!("client", -2, READ | ADMIN | LOCAL),
    cmd!("slaveof", -3, WRITE | ADMIN),
    cmd!("trysync", 4, READ | ADMIN),
    cmd!("ucanpsync", 1, READ | ADMIN),
    cmd!("syncerror", 1, READ | ADMIN),
    cmd!("pikasync", -2, READ | ADMIN),
    cmd!("loaddb", 2, WRITE | ADMIN | SUSPEND),
    cmd!("flushall", 1, WRITE | ADMIN | SUSPEND),
    cmd!("shutdown", 1, WRITE | ADMIN | SUSPEND),
    cmd!("dump", 1, READ | ADMIN | SUSPEND),
    cmd!("dumpoff", 1, WRITE | ADMIN),
    cmd!("readonly", 3, WRITE | ADMIN | SUSPEND),
    cmd!("select", 2, READ | ADMIN),
    cmd!("config", -3, WRITE | ADMIN),
    cmd!("info", -1, READ | ADMIN),
    cmd!("purgelogsto", 2, WRITE | ADMIN),
    // kv
    cmd!("get", 2, READ | KV),
    cmd!("set", -3, WRITE | KV),
    cmd!("del", -2, WRITE | KV),
    cmd!("incr", 2, WRITE | KV),
    cmd!("incrby", 3, WRITE | KV),
    cmd!("incrbyfloat", 3, WRITE | KV),
    cmd!("decr", 2, WRITE | KV),
    cmd!("decrby", 3, WRITE | KV),
    cmd!("getset", 3, WRITE | KV),
    cmd!("append", 3, WRITE | KV),
    cmd!("mget", -2, READ | KV),
    // stubbed data-type commands (registered, not implemented)
    cmd!("hset", -4, WRITE | HASH),
    cmd!("hget", 3, READ | HASH),
    cmd!("lpush", -3, WRITE | LIST),
    cmd!("lrange", 4, READ | LIST),
    cmd!("sadd", -3, WRITE | SET),
    cmd!("zadd", -4, WRITE | ZSET),
];

static COMMAND_MAP: Lazy<HashMap<&'static str, &'static CommandInfo>> = Lazy::new(|| {
    let mut map = HashMap::with_capacity(TABLE.len());
    for info in TABLE {
        map.insert(info.name, info);
    }
    map
});

/// Looks up a command by name, case-insensitively.
pub fn lookup(name: &str) -> Option<&'static CommandInfo> {
    let lower = name.to_ascii_lowercase();
    COMMAND_MAP.get(lower.as_str()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(lookup("GET").is_some());
        assert!(lookup("Get").is_some());
        assert!(lookup("get").is_some());
    }

    #[test]
    fn unknown_command_is_none() {
        assert!(lookup("frobnicate").is_none());
    }

    #[test]
    fn exact_arity_rejects_extra_args() {
        let info = lookup("ping").unwrap();
        assert!(info.check_arity(1));
        assert!(!info.check_arity(2));
    }

    #[test]
    fn minimum_arity_allows_extra_args() {
        let info = lookup("mget").unwrap();
        assert!(info.check_arity(2));
        assert!(info.check_arity(5));
        assert!(!info.check_arity(1));
    }

    #[test]
    fn flags_decode_as_expected() {
        let info = lookup("slaveof").unwrap();
        assert!(info.is_write());
        assert_eq!(info.cmd_type(), CmdType::Admin);
        assert!(!info.is_local());

        let info = lookup("get").unwrap();
        assert!(!info.is_write());
        assert_eq!(info.cmd_type(), CmdType::Kv);

        let info = lookup("dump").unwrap();
        assert!(info.is_suspend());
    }
}
