// devnet-node/src/logging.rs
use crate::config::LogConfig;
use anyhow::Context;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CRATES: [&str; 4] = ["devnet", "devnet_node", "devnet_rpc", "devnet_engine"];

/// Default filter directives for `level`; `RUST_LOG` takes precedence
pub fn filter_directives(level: &str) -> String {
    let mut directives: Vec<String> = CRATES.iter().map(|krate| format!("{}={}", krate, level)).collect();
    directives.push("hyper=warn".into());
    directives.join(",")
}

/// Install the global subscriber: console and/or file output per `log.outputType`
pub fn init_logging(log: &LogConfig, debug: bool) -> anyhow::Result<()> {
    let level = if debug { "debug" } else { log.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_directives(level).into());

    let console = log.to_console().then(tracing_subscriber::fmt::layer);

    let file = if log.to_file() {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log.file_path)
            .with_context(|| format!("cannot open log file {}", log.file_path))?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;

    Ok(())
}
