use std::collections::BTreeMap;
use std::io::Write;

use crate::config::{ToolchainSelector, VcvarsConfig};
use crate::env::EnvironmentTable;
use crate::errors::{Result, VcvarsError};
use crate::node::Node;
use crate::plugin::{ListenerManager, NodeChannel, NodeListener};
use crate::plugins::VcvarsListener;

/// Tracks build nodes and drives their online/offline transitions through
/// the registered listeners.
pub struct NodeManager {
    nodes: BTreeMap<String, Node>,
    listeners: ListenerManager,
}

impl NodeManager {
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            listeners: ListenerManager::new(),
        }
    }

    /// Manager with the vcvarsall listener registered and every configured node added.
    pub fn from_config(config: &VcvarsConfig) -> Self {
        let mut manager = Self::new();
        manager.register_listener(Box::new(VcvarsListener::new()));
        for node in &config.nodes {
            manager.add_node(Node::from(node));
        }
        manager
    }

    pub fn register_listener(&mut self, listener: Box<dyn NodeListener>) {
        self.listeners.register(listener);
    }

    /// Add or replace a node by name.
    pub fn add_node(&mut self, node: Node) {
        self.nodes.insert(node.name().to_string(), node);
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    fn node_mut(&mut self, name: &str) -> Result<&mut Node> {
        self.nodes
            .get_mut(name)
            .ok_or_else(|| VcvarsError::NodeNotFound(name.to_string()))
    }

    /// Bring a node online. Listeners run once per transition; a node that is
    /// already online is left alone.
    pub fn bring_online(
        &mut self,
        name: &str,
        channel: &dyn NodeChannel,
        log: &mut dyn Write,
    ) -> Result<()> {
        let node = self
            .nodes
            .get_mut(name)
            .ok_or_else(|| VcvarsError::NodeNotFound(name.to_string()))?;
        if node.is_online() {
            tracing::debug!(node = name, "Node already online");
            return Ok(());
        }
        self.listeners.pre_online(node, channel, log);
        node.set_online(true);
        tracing::info!(
            node = name,
            captured = node.environment().map(|t| t.len()).unwrap_or(0),
            "Node online"
        );
        Ok(())
    }

    pub fn take_offline(&mut self, name: &str) -> Result<()> {
        let node = self
            .nodes
            .get_mut(name)
            .ok_or_else(|| VcvarsError::NodeNotFound(name.to_string()))?;
        if !node.is_online() {
            return Ok(());
        }
        self.listeners.offline(node);
        node.set_online(false);
        tracing::info!(node = name, "Node offline");
        Ok(())
    }

    /// Change a node's toolchain. Takes effect the next time it comes online.
    pub fn reconfigure(&mut self, name: &str, toolchain: Option<ToolchainSelector>) -> Result<()> {
        self.node_mut(name)?.reconfigure(toolchain);
        Ok(())
    }

    /// Environment for a build on `name`: `base` with the captured variables on top.
    pub fn build_environment(&self, name: &str, base: &EnvironmentTable) -> Result<EnvironmentTable> {
        let node = self
            .node(name)
            .ok_or_else(|| VcvarsError::NodeNotFound(name.to_string()))?;
        let mut env = base.clone();
        node.build_env(&mut env);
        Ok(env)
    }
}

impl Default for NodeManager {
    fn default() -> Self {
        Self::new()
    }
}
