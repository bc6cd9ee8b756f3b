use std::fmt;
use std::io::Write;

use crate::errors::Result;
use crate::node::Node;
use crate::plugin::{NodeChannel, NodeListener};

/// Runs vcvarsall.bat on nodes that carry a toolchain selection as they come
/// online, and stores the captured environment on the node.
///
/// Failures are reported to the node log and otherwise ignored: the node
/// still comes online, without the Visual C++ environment.
#[derive(Debug, Default)]
pub struct VcvarsListener;

impl VcvarsListener {
    pub fn new() -> Self {
        Self
    }
}

impl NodeListener for VcvarsListener {
    fn name(&self) -> &'static str {
        "VcvarsListener"
    }

    fn on_pre_online(
        &mut self,
        node: &mut Node,
        channel: &dyn NodeChannel,
        log: &mut dyn Write,
    ) -> Result<()> {
        let Some(selector) = node.toolchain() else {
            return Ok(());
        };

        log_line(
            log,
            node.name(),
            format_args!(
                "Preparing to run vcvarsall for VS {} ({})",
                selector.version, selector.architecture
            ),
        );

        match channel.resolve(&selector) {
            Ok(table) => {
                let count = table.len();
                node.set_environment(table);
                log_line(
                    log,
                    node.name(),
                    format_args!("Received {} env. variables from vcvarsall", count),
                );
            }
            Err(e) => {
                tracing::warn!(
                    node = node.name(),
                    version = %selector.version,
                    arch = %selector.architecture,
                    category = ?e.category(),
                    error = %e,
                    "vcvarsall resolution failed"
                );
                log_line(log, node.name(), format_args!("ERROR: {}", e));
            }
        }
        Ok(())
    }

    fn on_offline(&mut self, node: &mut Node) -> Result<()> {
        node.clear_environment();
        Ok(())
    }
}

/// Operator log output is best effort; a broken sink must not stop the node.
fn log_line(log: &mut dyn Write, node: &str, line: fmt::Arguments<'_>) {
    if let Err(e) = writeln!(log, "{}", line) {
        tracing::debug!(node, error = %e, "Failed to write to node log");
    }
}
