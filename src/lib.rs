pub mod arch;
pub mod capture;
pub mod cli;
pub mod config;
pub mod env;
pub mod errors;
pub mod host;
pub mod locator;
pub mod manager;
pub mod node;
pub mod plugin;
pub mod plugins;
pub mod process;
pub mod registry;
pub mod resolver;

pub use config::{Architecture, ToolchainSelector, ToolchainVersion, VcvarsConfig};
pub use env::EnvironmentTable;
pub use errors::{Result, VcvarsError};
pub use manager::NodeManager;
pub use node::Node;
pub use plugin::{LocalChannel, NodeChannel, NodeListener};
pub use resolver::EnvironmentResolver;
