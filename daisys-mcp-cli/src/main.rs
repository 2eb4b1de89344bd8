use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use daisys_mcp_core::{serve_stdio, DaisysConfig};

#[derive(Parser, Debug)]
#[command(name = "daisys-mcp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server exposing Daisys text-to-speech tools over stdio")]
struct Args {
    /// Log filter for the trace file (e.g. info, debug, daisys_mcp_core=trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Load environment variables from this file instead of ./.env
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    match &args.env_file {
        Some(path) => {
            dotenv::from_path(path).map_err(|e| {
                anyhow::anyhow!("Failed to load env file {}: {e:?}", path.display())
            })?;
        }
        None => {
            // Optional; credentials may also come from the MCP client config.
            let _ = dotenv::dotenv();
        }
    }

    setup_tracing(&args.log_level)?;

    let config = DaisysConfig::from_env()?;
    info!(api_url = %config.api_url, "Configuration loaded");

    serve_stdio(config).await
}

fn setup_tracing(level: &str) -> Result<()> {
    use std::fs;
    use tracing_subscriber::fmt;

    // Logs go to a file; stdout carries the MCP protocol and must stay clean.
    let trace_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".daisys-mcp")
        .join("trace");
    fs::create_dir_all(&trace_dir)?;

    let log_file = trace_dir.join("daisys-mcp.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(EnvFilter::new(level))
        .init();

    info!("Tracing initialized to {:?}", log_file);
    Ok(())
}
