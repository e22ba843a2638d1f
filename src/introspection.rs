//! `INFO` section assembly and `CLIENT LIST`/`CLIENT KILL` reply formatting. `CONFIG GET`/`SET`
//! themselves are thin enough to live directly on `Config` (see `config.rs`); this module covers
//! the parts that need to read across `ServerContext` as a whole.

use crate::context::ServerContext;

/// Builds the `INFO` reply body. `section` is `None` for the default set of sections, or a
/// lowercase section name (`server`, `replication`, `keyspace`) to restrict to just that one,
/// matching the original command's argument handling.
pub async fn build_info(ctx: &ServerContext, section: Option<&str>) -> String {
    let mut out = String::new();
    let want = |name: &str| match section {
        Some(s) => s.eq_ignore_ascii_case(name),
        None => true,
    };

    if want("server") {
        out.push_str("# Server\r\n");
        out.push_str("pika_version:0.1.0\r\n");
        out.push_str(&format!("os:{}\r\n", std::env::consts::OS));
        out.push_str(&format!("tcp_port:{}\r\n", ctx.config.port));
        out.push_str(&format!("uptime_in_seconds:{}\r\n", ctx.state.start_time.elapsed().as_secs()));
        out.push_str("\r\n");
    }

    if want("replication") {
        let repl_state = ctx.state.repl_state().await;
        let ms_state = ctx.state.ms_state().await;
        let slaves = ctx.state.slave_list().await;
        let (producer_filenum, producer_offset) = ctx.binlog.producer_cursor().await;

        out.push_str("# Replication\r\n");
        out.push_str(&format!(
            "role:{}\r\n",
            if repl_state.contains(crate::server_state::ReplState::SLAVE) { "slave" } else { "master" }
        ));
        if let Some((host, port)) = ctx.state.master_addr().await {
            out.push_str(&format!("master_host:{}\r\n", host));
            out.push_str(&format!("master_port:{}\r\n", port));
            out.push_str(&format!("master_link_status:{}\r\n", ms_state_label(ms_state)));
        }
        out.push_str(&format!("connected_slaves:{}\r\n", slaves.len()));
        for (i, slave) in slaves.iter().enumerate() {
            out.push_str(&format!(
                "slave{}:ip={},port={},offset={}\r\n",
                i,
                slave.addr.ip(),
                slave.addr.port(),
                slave.acked_offset
            ));
        }
        out.push_str(&format!("master_repl_offset:{}\r\n", producer_offset));
        out.push_str(&format!("binlog_filenum:{}\r\n", producer_filenum));
        let max = ctx.binlog.consumer_max().await;
        out.push_str(&format!(
            "safety_purge:{}\r\n",
            if max < 10 { "none".to_string() } else { format!("write2file{}", max - 10) }
        ));
        out.push_str("\r\n");
    }

    if want("clients") {
        out.push_str("# Clients\r\n");
        out.push_str(&format!("connected_clients:{}\r\n", ctx.state.client_list().await.len()));
        out.push_str("\r\n");
    }

    if want("keyspace") {
        out.push_str("# Keyspace\r\n");
        out.push_str(&format!("db0:keys={}\r\n", ctx.storage.len().await));
        out.push_str("\r\n");
    }

    out
}

fn ms_state_label(ms_state: crate::server_state::MsState) -> &'static str {
    use crate::server_state::MsState::*;
    match ms_state {
        Offline => "down",
        Connect | Connecting => "connecting",
        Connected => "up",
        Single => "up",
    }
}

/// `CLIENT LIST` reply body: one line per connected client, `redis-cli`-style `key=value` pairs.
pub async fn client_list(ctx: &ServerContext) -> String {
    let mut lines = Vec::new();
    for record in ctx.state.client_list().await {
        lines.push(format!(
            "id={} addr={} age={} role={}",
            record.id,
            record.addr,
            record.connected_at.elapsed().as_secs(),
            role_label(record.role)
        ));
    }
    lines.join("\n")
}

fn role_label(role: crate::client::ClientRole) -> &'static str {
    use crate::client::ClientRole::*;
    match role {
        Normal => "normal",
        Master => "master",
        Slave => "slave",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binlog::Binlog;
    use crate::config::{Cli, Config};
    use crate::server_state::ServerState;
    use crate::storage::Storage;

    async fn test_ctx() -> ServerContext {
        let cli = Cli {
            conf: None,
            port: Some(6379),
            thread_num: None,
            db_path: None,
            log_path: None,
            requirepass: None,
            daemonize: None,
            replicaof: None,
            timeout: None,
            log_level: None,
        };
        let dir = std::env::temp_dir().join(format!("pika-core-introspection-test-{}", std::process::id()));
        ServerContext {
            config: Config::from_cli(cli).unwrap(),
            state: ServerState::new(6379),
            storage: Storage::new(),
            binlog: Binlog::open(dir).await.unwrap(),
        }
    }

    #[tokio::test]
    async fn info_default_contains_every_section() {
        let ctx = test_ctx().await;
        let info = build_info(&ctx, None).await;
        assert!(info.contains("# Server"));
        assert!(info.contains("# Replication"));
        assert!(info.contains("# Clients"));
        assert!(info.contains("# Keyspace"));
    }

    #[tokio::test]
    async fn info_with_section_filters_to_just_that_one() {
        let ctx = test_ctx().await;
        let info = build_info(&ctx, Some("server")).await;
        assert!(info.contains("# Server"));
        assert!(!info.contains("# Replication"));
    }

    #[tokio::test]
    async fn safety_purge_is_none_below_ten_segments() {
        let ctx = test_ctx().await;
        let info = build_info(&ctx, Some("replication")).await;
        assert!(info.contains("safety_purge:none"));
    }
}
