//! Startup configuration: CLI flags (via `clap`) optionally layered over a conf file, producing
//! the `Config` that backs `CONFIG GET`/`CONFIG SET` and the values the rest of the server reads
//! at boot.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;
use tokio::sync::RwLock;

use crate::errors::ConfigError;

#[derive(Parser, Debug)]
#[command(name = "pika-core", version, about = "Command-dispatch and replication-control core of a Redis-wire-compatible server")]
pub struct Cli {
    /// Path to a conf file; keys are whitespace-separated `name value` pairs, `#` starts a
    /// comment. CLI flags override whatever the conf file sets.
    #[arg(long)]
    pub conf: Option<PathBuf>,

    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long)]
    pub thread_num: Option<u32>,

    #[arg(long)]
    pub db_path: Option<String>,

    #[arg(long)]
    pub log_path: Option<String>,

    #[arg(long)]
    pub requirepass: Option<String>,

    #[arg(long)]
    pub daemonize: Option<bool>,

    /// `host port`, equivalent to issuing `SLAVEOF host port` right after boot.
    #[arg(long, num_args = 2, value_names = ["HOST", "PORT"])]
    pub replicaof: Option<Vec<String>>,

    #[arg(long)]
    pub timeout: Option<i64>,

    #[arg(long)]
    pub log_level: Option<i64>,
}

/// Item name `CONFIG GET`/`CONFIG SET` render in their unknown-item error, the exact fixed text
/// spec'd for that case regardless of which path (missing item vs. rejected value) produced it.
pub const NO_SUCH_ITEM: &str = "No such configure item";

/// Items `CONFIG SET` is allowed to change at runtime.
struct Mutable {
    timeout: i64,
    requirepass: String,
    log_level: i64,
    slowlog_log_slower_than: i64,
    root_connection_num: i64,
}

pub struct Config {
    pub port: u16,
    pub thread_num: u32,
    pub db_path: String,
    pub log_path: String,
    pub daemonize: bool,
    pub replicaof: Option<(String, u16)>,
    /// Boot-time only; `maxmemory` is an alias reporting this same value.
    pub write_buffer_size: i64,
    mutable: RwLock<Mutable>,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let file_values = match &cli.conf {
            Some(path) => read_conf_file(path)?,
            None => HashMap::new(),
        };

        let port = cli
            .port
            .or_else(|| file_values.get("port").and_then(|v| v.parse().ok()))
            .unwrap_or(9221);
        let thread_num = cli
            .thread_num
            .or_else(|| file_values.get("thread_num").and_then(|v| v.parse().ok()))
            .unwrap_or(4);
        let db_path = cli
            .db_path
            .or_else(|| file_values.get("db_path").cloned())
            .unwrap_or_else(|| "./db".to_string());
        let log_path = cli
            .log_path
            .or_else(|| file_values.get("log_path").cloned())
            .unwrap_or_else(|| "./log".to_string());
        let daemonize = cli
            .daemonize
            .or_else(|| file_values.get("daemonize").map(|v| v == "yes" || v == "true"))
            .unwrap_or(false);
        let requirepass = cli
            .requirepass
            .or_else(|| file_values.get("requirepass").cloned())
            .unwrap_or_default();
        let timeout = cli
            .timeout
            .or_else(|| file_values.get("timeout").and_then(|v| v.parse().ok()))
            .unwrap_or(60);
        let log_level = cli
            .log_level
            .or_else(|| file_values.get("log_level").and_then(|v| v.parse().ok()))
            .unwrap_or(0);
        let slowlog_log_slower_than = file_values
            .get("slowlog_log_slower_than")
            .and_then(|v| v.parse().ok())
            .unwrap_or(10_000);
        let root_connection_num = file_values.get("root_connection_num").and_then(|v| v.parse().ok()).unwrap_or(5000);
        let write_buffer_size = file_values.get("write_buffer_size").and_then(|v| v.parse().ok()).unwrap_or(4_194_304);

        let replicaof = match cli.replicaof {
            Some(pair) if pair.len() == 2 => {
                let port: u16 = pair[1]
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue { item: "replicaof".into(), value: pair[1].clone() })?;
                Some((pair[0].clone(), port))
            }
            _ => file_values.get("slaveof").and_then(|v| {
                let mut parts = v.split_whitespace();
                let host = parts.next()?.to_string();
                let port: u16 = parts.next()?.parse().ok()?;
                Some((host, port))
            }),
        };

        Ok(Config {
            port,
            thread_num,
            db_path,
            log_path,
            daemonize,
            replicaof,
            write_buffer_size,
            mutable: RwLock::new(Mutable {
                timeout,
                requirepass,
                log_level,
                slowlog_log_slower_than,
                root_connection_num,
            }),
        })
    }

    pub async fn get(&self, item: &str) -> Option<(String, String)> {
        let item_lower = item.to_ascii_lowercase();
        match item_lower.as_str() {
            "port" => Some(("port".into(), self.port.to_string())),
            "thread_num" => Some(("thread_num".into(), self.thread_num.to_string())),
            "db_path" => Some(("db_path".into(), self.db_path.clone())),
            "log_path" => Some(("log_path".into(), self.log_path.clone())),
            "daemonize" => Some(("daemonize".into(), if self.daemonize { "yes" } else { "no" }.to_string())),
            "maxmemory" => Some(("maxmemory".into(), self.write_buffer_size.to_string())),
            "write_buffer_size" => Some(("write_buffer_size".into(), self.write_buffer_size.to_string())),
            "timeout" => {
                let m = self.mutable.read().await;
                Some(("timeout".into(), m.timeout.to_string()))
            }
            "requirepass" => {
                let m = self.mutable.read().await;
                Some(("requirepass".into(), m.requirepass.clone()))
            }
            "log_level" => {
                let m = self.mutable.read().await;
                Some(("log_level".into(), m.log_level.to_string()))
            }
            "root_connection_num" => {
                let m = self.mutable.read().await;
                Some(("root_connection_num".into(), m.root_connection_num.to_string()))
            }
            "slowlog_log_slower_than" => {
                let m = self.mutable.read().await;
                Some(("slowlog_log_slower_than".into(), m.slowlog_log_slower_than.to_string()))
            }
            _ => None,
        }
    }

    pub async fn set(&self, item: &str, value: &str) -> Result<(), ConfigError> {
        let item_lower = item.to_ascii_lowercase();
        match item_lower.as_str() {
            "timeout" => {
                let v = value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue { item: item.into(), value: value.into() })?;
                self.mutable.write().await.timeout = v;
                Ok(())
            }
            "requirepass" => {
                self.mutable.write().await.requirepass = value.to_string();
                Ok(())
            }
            "log_level" => {
                let v: i64 = value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue { item: item.into(), value: value.into() })?;
                if !(0..=4).contains(&v) {
                    return Err(ConfigError::InvalidValue { item: item.into(), value: value.into() });
                }
                self.mutable.write().await.log_level = v;
                Ok(())
            }
            "root_connection_num" => {
                let v = value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue { item: item.into(), value: value.into() })?;
                self.mutable.write().await.root_connection_num = v;
                Ok(())
            }
            "slowlog_log_slower_than" => {
                let v = value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue { item: item.into(), value: value.into() })?;
                self.mutable.write().await.slowlog_log_slower_than = v;
                Ok(())
            }
            "port" | "thread_num" | "db_path" | "log_path" | "daemonize" | "maxmemory" | "write_buffer_size" => {
                Err(ConfigError::InvalidValue { item: item.into(), value: "not modifiable at runtime".into() })
            }
            _ => Err(ConfigError::UnknownItem(item.into())),
        }
    }

    pub async fn requirepass(&self) -> String {
        self.mutable.read().await.requirepass.clone()
    }

    pub async fn log_level(&self) -> i64 {
        self.mutable.read().await.log_level
    }
}

fn read_conf_file(path: &std::path::Path) -> Result<HashMap<String, String>, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
    let mut map = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once(char::is_whitespace) {
            map.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with_defaults() -> Cli {
        Cli {
            conf: None,
            port: None,
            thread_num: None,
            db_path: None,
            log_path: None,
            requirepass: None,
            daemonize: None,
            replicaof: None,
            timeout: None,
            log_level: None,
        }
    }

    #[test]
    fn defaults_apply_with_no_cli_or_conf_file() {
        let cfg = Config::from_cli(cli_with_defaults()).unwrap();
        assert_eq!(cfg.port, 9221);
        assert_eq!(cfg.thread_num, 4);
    }

    #[tokio::test]
    async fn config_set_then_get_round_trips_mutable_item() {
        let cfg = Config::from_cli(cli_with_defaults()).unwrap();
        cfg.set("timeout", "120").await.unwrap();
        let (_, value) = cfg.get("timeout").await.unwrap();
        assert_eq!(value, "120");
    }

    #[tokio::test]
    async fn config_set_rejects_immutable_item() {
        let cfg = Config::from_cli(cli_with_defaults()).unwrap();
        assert!(cfg.set("port", "1234").await.is_err());
    }

    #[tokio::test]
    async fn config_set_rejects_unknown_item() {
        let cfg = Config::from_cli(cli_with_defaults()).unwrap();
        assert!(matches!(cfg.set("not-a-real-item", "x").await, Err(ConfigError::UnknownItem(_))));
    }
}
