//! cairnd — peer-to-peer directory mirror daemon.

use std::time::Duration;

use anyhow::{Context, Result};

use cairn_core::config::CairnConfig;
use cairn_engine::Node;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Optional config path as the only argument.
    if let Some(path) = std::env::args().nth(1) {
        std::env::set_var("CAIRN_CONFIG", path);
    }
    if let Err(e) = CairnConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = CairnConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        CairnConfig::default()
    });

    let node = Node::start(&config).await.context("node startup failed")?;

    // Periodic index snapshot for operators watching the log.
    let status = {
        let index = node.index().clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(10));
            loop {
                interval.tick().await;
                tracing::info!(files = index.len(), "index snapshot");
                for entry in index.iter() {
                    tracing::info!(
                        name = %entry.key(),
                        size = entry.value().size,
                        hash = %&entry.value().hash[..10],
                        "  file"
                    );
                }
            }
        })
    };

    tokio::signal::ctrl_c().await.ok();
    tracing::info!("shutdown signal received");
    status.abort();
    node.stop().await;
    Ok(())
}
