
use async_trait::async_trait;
use std::io::Write;
use tracing::debug;

use super::console::Console;
use crate::core::config::MemoryConfig;
use crate::core::status::MemoryStatus;
use crate::db::{HelixClient, HelixClientError};

/// Opens and releases a graph store connection.
#[async_trait]
pub trait GraphConnector: Send + Sync {
    async fn connect(&self, config: &MemoryConfig) -> Result<(), HelixClientError>;
}


pub struct HelixConnector;

#[async_trait]
impl GraphConnector for HelixConnector {
    async fn connect(&self, config: &MemoryConfig) -> Result<(), HelixClientError> {
        let mut client = HelixClient::from_config(config)?;
        let graph = client.connect(&config.database).await?;
        debug!("Probe selected graph {}", graph.name());
        client.disconnect();
        Ok(())
    }
}

/// Checks configuration, then the store. Every failure is reported and returns `false`.
pub async fn run_probe<C, W>(config: &MemoryConfig, connector: &C, console: &mut Console<W>) -> bool
where
    C: GraphConnector + ?Sized,
    W: Write,
{
    console.banner("MEMORY STORE CONNECTIVITY TEST");
    console.blank();

    console.line("Configuration:");
    console.line(format!("  - Enabled: {}", config.enabled));
    console.line(format!("  - HelixDB: {}:{}", config.host, config.port));
    console.line(format!("  - Database: {}", config.database));
    console.line(format!("  - LLM Provider: {}", config.llm_provider));
    console.line(format!("  - Embedder Provider: {}", config.embedder_provider));
    console.blank();

    let errors = config.validation_errors();
    if !errors.is_empty() {
        console.line("✗ Configuration invalid:");
        for error in &errors {
            console.line(format!("  - {}", error));
        }
        return false;
    }
    console.line("✓ Configuration valid");
    console.blank();

    console.line("Connecting to HelixDB...");
    if let Err(e) = connector.connect(config).await {
        console.line(format!("✗ HelixDB unreachable: {}", e));
        return false;
    }
    console.line(format!("✓ Connected to {} (graph: {})", config.base_url(), config.database));
    console.blank();

    console.line("Checking memory status...");
    let status = MemoryStatus::from_config(config);
    console.line(format!("  - Available: {}", status.available));
    console.line(format!("  - Reason: {}", status.reason));
    if !status.available {
        console.line("✗ Memory subsystem not available");
        return false;
    }
    console.blank();

    console.banner("ALL CHECKS PASSED ✓");
    true
}
