mod config;
mod console;
mod tcp;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use swarmshare_core::{DiskStorage, SwarmCore};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::{Cli, Mode, NodeConfig};
use crate::console::{Console, info_line};
use crate::tcp::TcpTransport;

/// Transport events waiting for the session loop.
const PEER_EVENT_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr; stdout belongs to the console.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "swarmshare=info,swarmshare_core=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = NodeConfig::from_env()?;

    let (peer_tx, peer_rx) = mpsc::channel(PEER_EVENT_CAPACITY);
    let transport = TcpTransport::new(peer_tx);
    let storage = DiskStorage::new(config.core.save_dir.clone());
    let (core, events) = SwarmCore::new(config.core.clone(), Arc::new(transport.clone()), Arc::new(storage))?;

    info!(
        id = %transport.local_id(),
        chunk_size = config.core.chunk_size.get(),
        save_dir = %config.core.save_dir.display(),
        "node starting"
    );

    tokio::spawn(core.session().run(peer_rx));
    tokio::spawn(console::print_events(events));
    let cleanup = core.spawn_cleanup();

    match cli.mode() {
        Mode::Create => {
            let listener = TcpListener::bind(config.listen)
                .await
                .with_context(|| format!("failed to bind {}", config.listen))?;
            let addr = listener.local_addr()?;
            tokio::spawn(transport.clone().listen(listener));
            info_line(format_args!("Created new file-sharing room on {addr}"));
        }
        Mode::Join(target) => {
            let addr = tokio::net::lookup_host(&target)
                .await
                .with_context(|| format!("cannot resolve {target}"))?
                .next()
                .with_context(|| format!("no address for {target}"))?;
            transport
                .connect(addr)
                .await
                .with_context(|| format!("failed to connect to {addr}"))?;
            info_line("Joined file-sharing room");
        }
    }
    info_line(format_args!("Your id is {}", transport.local_id().short()));

    let console = Console::new(core.orchestrator().clone(), core.directory().clone(), transport);
    tokio::select! {
        result = console.run() => result?,
        _ = tokio::signal::ctrl_c() => {}
    }

    info!("shutting down");
    cleanup.abort();
    Ok(())
}
