use crate::config::{NodeConfig, ToolchainSelector};
use crate::env::EnvironmentTable;

/// A build node, its toolchain selection and the environment captured the
/// last time it came online.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    name: String,
    toolchain: Option<ToolchainSelector>,
    environment: Option<EnvironmentTable>,
    online: bool,
}

impl Node {
    pub fn new(name: impl Into<String>, toolchain: Option<ToolchainSelector>) -> Self {
        Self {
            name: name.into(),
            toolchain,
            environment: None,
            online: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn toolchain(&self) -> Option<ToolchainSelector> {
        self.toolchain
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub(crate) fn set_online(&mut self, online: bool) {
        self.online = online;
    }

    /// Environment captured for this session, if resolution succeeded.
    pub fn environment(&self) -> Option<&EnvironmentTable> {
        self.environment.as_ref()
    }

    pub fn set_environment(&mut self, table: EnvironmentTable) {
        self.environment = Some(table);
    }

    pub fn clear_environment(&mut self) -> Option<EnvironmentTable> {
        self.environment.take()
    }

    /// Replace the toolchain selection. The captured environment belongs to
    /// the old selection and is dropped.
    pub fn reconfigure(&mut self, toolchain: Option<ToolchainSelector>) {
        self.toolchain = toolchain;
        self.environment = None;
    }

    /// Overlay the captured variables onto a build's environment.
    pub fn build_env(&self, env: &mut EnvironmentTable) {
        if let Some(captured) = &self.environment {
            env.extend_from(captured);
        }
    }
}

impl From<&NodeConfig> for Node {
    fn from(config: &NodeConfig) -> Self {
        Node::new(config.name.clone(), config.toolchain)
    }
}
