//! The `ordernet` binary.
//!
//! Parses the CLI surface, starts a node, and runs until interrupted.
//! Exit code 0 on clean shutdown, 1 on fatal start error. The transport
//! backend here is the in-process hub; a networked engine attaches through
//! the same [`ordernet_transport::TransportHandle`] seam.

use ordernet_node::{Node, NodeConfig};
use ordernet_transport::memory::MemoryHub;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ordernet=info".parse()?),
        )
        .init();

    let config = NodeConfig::from_args(std::env::args().skip(1))?;
    if !config.bootstrap.is_empty() {
        info!(peers = config.bootstrap.len(), "bootstrap peers configured");
    }
    if config.mdns {
        info!("mDNS discovery requested");
    }

    let hub = MemoryHub::new();
    let (transport, incoming) = hub.attach("local").await;
    let node = Node::start(config, transport, incoming).await?;
    info!(fingerprint = %node.fingerprint().await, "node running, ctrl-c to stop");

    tokio::signal::ctrl_c().await?;
    node.stop().await;
    Ok(())
}
