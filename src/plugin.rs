use std::io::Write;

use crate::config::ToolchainSelector;
use crate::env::EnvironmentTable;
use crate::errors::Result;
use crate::node::Node;
use crate::resolver::EnvironmentResolver;

/// A way to run the resolver on a particular node.
pub trait NodeChannel {
    fn resolve(&self, selector: &ToolchainSelector) -> Result<EnvironmentTable>;
}

/// Runs the resolver in this process, for a node that is the local machine.
pub struct LocalChannel {
    resolver: EnvironmentResolver,
}

impl LocalChannel {
    pub fn new(resolver: EnvironmentResolver) -> Self {
        Self { resolver }
    }
}

impl NodeChannel for LocalChannel {
    fn resolve(&self, selector: &ToolchainSelector) -> Result<EnvironmentTable> {
        self.resolver.resolve(selector)
    }
}

/// Node lifecycle hooks. Each listener can tap into the phases it cares about.
pub trait NodeListener {
    fn name(&self) -> &'static str;

    /// Called once when a node is coming online, before it accepts builds.
    fn on_pre_online(
        &mut self,
        _node: &mut Node,
        _channel: &dyn NodeChannel,
        _log: &mut dyn Write,
    ) -> Result<()> {
        Ok(())
    }

    /// Called once when a node goes offline.
    fn on_offline(&mut self, _node: &mut Node) -> Result<()> {
        Ok(())
    }
}

/// Dispatches lifecycle events to registered listeners in registration order.
///
/// A failing listener is logged and skipped; it never stops the transition.
#[derive(Default)]
pub struct ListenerManager {
    listeners: Vec<Box<dyn NodeListener>>,
}

impl ListenerManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: Box<dyn NodeListener>) {
        tracing::debug!(listener = listener.name(), "Registering node listener");
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn pre_online(&mut self, node: &mut Node, channel: &dyn NodeChannel, log: &mut dyn Write) {
        for listener in &mut self.listeners {
            if let Err(e) = listener.on_pre_online(node, channel, log) {
                tracing::warn!(
                    listener = listener.name(),
                    node = node.name(),
                    category = ?e.category(),
                    error = %e,
                    "Listener failed while bringing node online"
                );
            }
        }
    }

    pub fn offline(&mut self, node: &mut Node) {
        for listener in &mut self.listeners {
            if let Err(e) = listener.on_offline(node) {
                tracing::warn!(
                    listener = listener.name(),
                    node = node.name(),
                    error = %e,
                    "Listener failed while taking node offline"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::VcvarsError;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Failing;

    impl NodeListener for Failing {
        fn name(&self) -> &'static str {
            "Failing"
        }

        fn on_pre_online(
            &mut self,
            _node: &mut Node,
            _channel: &dyn NodeChannel,
            _log: &mut dyn Write,
        ) -> Result<()> {
            Err(VcvarsError::ExecutionError("simulated failure".to_string()))
        }
    }

    struct Recording(Rc<RefCell<Vec<String>>>);

    impl NodeListener for Recording {
        fn name(&self) -> &'static str {
            "Recording"
        }

        fn on_pre_online(
            &mut self,
            node: &mut Node,
            _channel: &dyn NodeChannel,
            _log: &mut dyn Write,
        ) -> Result<()> {
            self.0.borrow_mut().push(format!("online:{}", node.name()));
            Ok(())
        }

        fn on_offline(&mut self, node: &mut Node) -> Result<()> {
            self.0.borrow_mut().push(format!("offline:{}", node.name()));
            Ok(())
        }
    }

    struct NoChannel;

    impl NodeChannel for NoChannel {
        fn resolve(&self, _selector: &ToolchainSelector) -> Result<EnvironmentTable> {
            Err(VcvarsError::PlatformError("no channel".to_string()))
        }
    }

    #[test]
    fn test_failing_listener_does_not_stop_others() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut manager = ListenerManager::new();
        manager.register(Box::new(Failing));
        manager.register(Box::new(Recording(events.clone())));
        assert_eq!(manager.len(), 2);

        let mut node = Node::new("n1", None);
        let mut log = Vec::new();
        manager.pre_online(&mut node, &NoChannel, &mut log);
        manager.offline(&mut node);

        assert_eq!(*events.borrow(), vec!["online:n1", "offline:n1"]);
    }
}
