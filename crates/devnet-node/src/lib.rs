// devnet-node/src/lib.rs
pub mod config;
pub mod logging;
pub mod runtime;

pub use config::NodeConfig;
pub use runtime::Node;
