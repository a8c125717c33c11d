//! CLI entry point. Mirrors the teacher's `forest` binary's `#[tokio::main]` shape: init
//! tracing, parse flags, resolve config, construct the long-lived service value, run it.

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use nhz::chain::memory::TestChain;
use nhz::config::Cli;
use nhz::hallmark::Hallmark;
use nhz::node::Node;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "CRITICAL ERROR: failed to resolve configuration");
            std::process::exit(1);
        }
    };

    if let Some(blob) = &config.my_hallmark {
        if let Err(err) = Hallmark::parse(blob) {
            error!(%err, "CRITICAL ERROR: my_hallmark does not parse");
            std::process::exit(1);
        }
    }

    info!(
        testnet = config.is_testnet,
        port = config.effective_peer_server_port(),
        "starting nhz-node"
    );

    // The real ledger/account-balance backend is out of scope for this crate; wiring a concrete
    // ChainStore/AccountView implementation is left to the surrounding node binary that embeds
    // this crate. TestChain stands in so the process has something to drive its workers against.
    let chain = Arc::new(TestChain::new());
    let node = Node::new(config, chain.clone(), chain);
    let running = node.run(None);

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    running.shutdown().await;
    Ok(())
}
