mod binlog;
mod client;
mod command_table;
mod commands;
mod config;
mod context;
mod dispatcher;
mod errors;
mod event;
mod event_handler;
mod executor;
mod frontend;
mod introspection;
mod protocol_constants;
mod rdb;
mod replication;
mod resp;
mod server_state;
mod storage;
mod util;
mod value_entry;

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{Cli, Config};
use crate::context::ServerContext;
use crate::event::RedisEvent;
use crate::event_handler::EventHandler;
use crate::server_state::ServerState;
use crate::storage::Storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_cli(cli)?;

    let filter = match config.log_level().await {
        level if level > 0 => EnvFilter::new("debug"),
        _ => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let port = config.port;
    let db_path = std::path::PathBuf::from(&config.db_path);
    let binlog = crate::binlog::Binlog::open(db_path).await?;
    let replicaof = config.replicaof.clone();

    let ctx = Arc::new(ServerContext {
        config,
        state: ServerState::new(port),
        storage: Storage::new(),
        binlog,
    });

    let listener = TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!(port, "pika-core listening");

    let (tx, mut rx) = mpsc::channel::<RedisEvent>(256);
    let next_id = Arc::new(AtomicU64::new(1));

    let mut event_handler = EventHandler::new(ctx.clone());
    let event_handler_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            event_handler.handle_event(event).await;
        }
    });

    let accept_task = tokio::spawn(frontend::accept_loop(listener, port, next_id, tx));

    if let Some((host, master_port)) = replicaof {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            replication::connect_to_master(ctx, host, master_port).await;
        });
    }

    tokio::try_join!(event_handler_task, accept_task)?;
    Ok(())
}
