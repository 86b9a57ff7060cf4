use anyhow::{Context, Result};
use clap::Parser;
use drizzle_core::ConfigResolver;
use drizzle_server::McpServer;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "drizzle-mcp", version, about = "MCP server for drizzle schema management")]
struct Cli {
    /// Drizzle config file; validated at startup when given. Without it,
    /// configs are auto-discovered on first use.
    #[arg(short, long, env = "DRIZZLE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env.local wins over .env; both are optional. Loaded before config
    // evaluation so config files can interpolate credentials.
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();

    // stdout carries the JSON-RPC stream, so logs go to stderr.
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut resolver = ConfigResolver::from_current_dir().context("resolving working directory")?;

    if let Some(path) = &cli.config {
        let loaded = resolver
            .load(Some(path))
            .with_context(|| format!("validating config {}", path.display()))?;
        info!(
            path = %loaded.path.display(),
            dialect = %loaded.config.dialect,
            "config validated"
        );
    }

    let server = McpServer::new(resolver);

    tokio::select! {
        result = server.run_stdio() => {
            result.context("stdio transport failed")?;
            info!("stdin closed, shutting down");
        }
        _ = shutdown_signal() => {
            info!("termination signal received, shutting down");
        }
    }

    // Tear down the connection (if any) before exiting.
    server.context().teardown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            Ok(signal) => signal,
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                let _ = ctrl_c.await;
                return;
            }
        };

        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
