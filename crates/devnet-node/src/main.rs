// devnet-node/src/main.rs
use clap::{Parser, Subcommand};
use devnet_node::{logging, Node, NodeConfig};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "devnet")]
#[command(about = "Local development node with a JSON-RPC endpoint", version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the node and serve JSON-RPC
    Start {
        /// Configuration file path
        #[arg(short, long, default_value = "./devnet.toml")]
        config: String,

        /// Override the listening port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Write a default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "./devnet.toml")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { config, port } => {
            start_node(&config, port, cli.debug).await?;
        }
        Commands::Init { output } => {
            let defaults = NodeConfig::default();
            logging::init_logging(&console_only(&defaults), cli.debug)?;
            init_config(&output, &defaults)?;
        }
    }

    Ok(())
}

async fn start_node(config_path: &str, port: Option<u16>, debug: bool) -> anyhow::Result<()> {
    let path_exists = std::path::Path::new(config_path).exists();
    let mut config = NodeConfig::load(config_path)?;
    if let Some(port) = port {
        config.port = port;
    }

    // The log destination comes from the config, so logging starts after loading it
    logging::init_logging(&config.log, debug)?;
    if path_exists {
        tracing::info!("Loaded configuration from {}", config_path);
    } else {
        tracing::warn!("Config file {} not found, using defaults", config_path);
    }

    let node = Arc::new(Node::new(config)?);
    node.clone().start().await?;

    tokio::select! {
        _ = node.wait() => {
            tracing::info!("RPC server exited");
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("Received shutdown signal");
        }
    }

    node.stop().await?;
    tracing::info!("Node stopped gracefully");

    Ok(())
}

fn init_config(output: &str, config: &NodeConfig) -> anyhow::Result<()> {
    if std::path::Path::new(output).exists() {
        anyhow::bail!("{} already exists", output);
    }

    config.to_file(output)?;
    tracing::info!("Default configuration written to {}", output);
    tracing::info!("Start the node with: devnet start -c {}", output);

    Ok(())
}

fn console_only(config: &NodeConfig) -> devnet_node::config::LogConfig {
    devnet_node::config::LogConfig {
        level: "info".into(),
        output_type: "console".into(),
        ..config.log.clone()
    }
}
