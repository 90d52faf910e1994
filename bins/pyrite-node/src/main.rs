//! Pyrite full node binary.
//!
//! Starts a node with RocksDB storage, the HTTP/JSON API, and WebSocket
//! gossip, then runs until Ctrl+C.

use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use pyrite_node_lib::{Node, NodeConfig};
use tracing::{error, info};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// HTTP/JSON API plus gossip (the only supported mode).
    Api,
    /// The retired HTML front end.
    Web,
}

/// Pyrite full node.
#[derive(Parser, Debug)]
#[command(name = "pyrite-node", version, about = "Pyrite full node with an HTTP/JSON API")]
struct Args {
    /// Serving mode
    #[arg(long, value_enum, default_value_t = Mode::Api)]
    mode: Mode,

    /// Port for the HTTP API and gossip endpoint
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Directory for the block database and wallet file
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, default_value = "text")]
    log_format: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(&args.log_level, &args.log_format);

    if args.mode == Mode::Web {
        error!("the web front end has been removed; run with --mode api");
        process::exit(1);
    }

    let config = NodeConfig {
        port: args.port,
        data_dir: args.data_dir,
        log_level: args.log_level,
    };

    info!("Pyrite Node v{}", env!("CARGO_PKG_VERSION"));
    info!(port = config.port, data_dir = %config.data_dir.display(), "starting");

    let node = match Node::new(config) {
        Ok(node) => node,
        Err(e) => {
            error!("failed to start node: {e}");
            process::exit(1);
        }
    };

    let shutdown = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
        info!("received Ctrl+C, shutting down");
    };

    tokio::select! {
        result = node.serve() => {
            if let Err(e) = result {
                error!("server exited: {e}");
                process::exit(1);
            }
        }
        _ = shutdown => {}
    }

    info!("Pyrite node shutdown complete");
}

/// Initialize the tracing subscriber.
///
/// Pass `format = "json"` for structured output suitable for log pipelines;
/// anything else gives human-readable text.
fn init_logging(level: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}
