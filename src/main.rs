//! Expert SQL MCP Server - Main entry point.
//!
//! This server provides MCP (Model Context Protocol) tools that let AI agents
//! explore a SQL database (SQLite, PostgreSQL, MySQL), read curated table
//! descriptions and run read-only queries.

use expert_sql_mcp::catalog::MetadataCatalog;
use expert_sql_mcp::config::{Config, TransportMode};
use expert_sql_mcp::db::ConnectionProvider;
use expert_sql_mcp::mcp::AppContext;
use expert_sql_mcp::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs always go to stderr; stdout carries the MCP stream in stdio mode.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse_args();

    init_tracing(&config);

    info!(
        transport = %config.transport,
        output_mode = %config.output_mode,
        "Starting Expert SQL MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let db_config = config.parse_database()?;
    let provider = Arc::new(ConnectionProvider::new(
        db_config,
        config.connect_timeout_duration(),
    )?);

    info!(path = %config.config_path.display(), "Using table description catalog");
    let ctx = Arc::new(
        AppContext::new(provider, MetadataCatalog::new(&config.config_path))
            .with_query_timeout(config.query_timeout_duration())
            .with_output_mode(config.output_mode),
    );

    let result = match config.transport {
        TransportMode::Stdio => {
            let transport = StdioTransport::new(ctx);
            info!(transport = transport.name(), "Using stdio transport");
            transport.run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            let transport = HttpTransport::new(
                ctx,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            );
            transport.run().await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
