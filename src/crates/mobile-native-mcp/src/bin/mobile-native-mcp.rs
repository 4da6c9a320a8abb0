//! Mobile Native MCP server over stdio

use clap::Parser;
use mobile_native_mcp::{init_tracing, Cli, MobileNativeMcpServer, LOG_TARGETS};
use rmcp::{transport::io::stdio, ServiceExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(LOG_TARGETS)?;

    let config = cli.into_config()?;
    tracing::info!(
        environment = %config.environment,
        backend = %config.backend,
        "Starting mobile native MCP server"
    );

    let server = MobileNativeMcpServer::from_config(&config).await?;
    let service = server.serve(stdio()).await?;

    tracing::info!("Mobile native MCP server running");

    service.waiting().await?;

    tracing::info!("Mobile native MCP server stopped");

    Ok(())
}
