use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArgumentError {
    #[error("Argument Error: {0}")]
    General(String),
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("empty request")]
    Empty,
    #[error("unbalanced multi-bulk length")]
    UnbalancedMultiBulk,
    #[error("invalid bulk length")]
    InvalidBulkLength,
    #[error("expected '$', got {0:?}")]
    ExpectedBulk(char),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("wrong number of arguments for '{0}' command")]
    WrongArity(String),
    #[error("server is in readonly mode")]
    ReadonlyMode,
    #[error("command not allowed while server is suspended")]
    Suspended,
    #[error("command not implemented: {0}")]
    NotImplemented(String),
}

#[derive(Error, Debug)]
pub enum ReplicationError {
    #[error("you fucked up, can't connect to itself")]
    SelfConnect,
    #[error("State is not in PIKA_REP_SINGLE")]
    NotSingle,
    #[error("requested psync tail (filenum {filenum}, offset {offset}) is out of range")]
    InvalidPsyncTail { filenum: u32, offset: u64 },
    #[error("already connected to a master")]
    AlreadySlave,
    #[error("not currently a slave")]
    NotSlave,
    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("key not found")]
    NotFound,
    #[error("value is not an integer or out of range")]
    NotAnInteger,
    #[error("value is not a valid float")]
    NotAFloat,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum BinlogError {
    #[error("requested offset is beyond the mapped segment size")]
    OffsetOutOfRange,
    #[error("no such binlog segment: write2file{0}")]
    NoSuchSegment(u32),
    #[error("purge would remove segments within the safety margin")]
    UnsafePurge,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("No such configure item")]
    UnknownItem(String),
    #[error("invalid value for config item {item}: {value}")]
    InvalidValue { item: String, value: String },
}
