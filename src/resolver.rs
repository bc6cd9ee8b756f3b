use std::collections::BTreeMap;
use std::time::Duration;

use crate::arch::vcvarsall_arg;
use crate::capture::capture_environment;
use crate::config::{ToolchainLayout, ToolchainSelector, ToolchainVersion, VcvarsConfig, DEFAULT_TIMEOUT};
use crate::env::EnvironmentTable;
use crate::errors::{Result, VcvarsError};
use crate::host::HostProbe;
use crate::locator::ToolchainLocator;
use crate::process::ProcessRunner;
use crate::registry::RegistryReader;

/// Turns a toolchain selection into the environment vcvarsall.bat sets up.
pub struct EnvironmentResolver {
    host: Box<dyn HostProbe>,
    registry: Box<dyn RegistryReader>,
    runner: Box<dyn ProcessRunner>,
    layouts: BTreeMap<ToolchainVersion, ToolchainLayout>,
    timeout: Duration,
}

impl EnvironmentResolver {
    pub fn new(
        host: Box<dyn HostProbe>,
        registry: Box<dyn RegistryReader>,
        runner: Box<dyn ProcessRunner>,
    ) -> Self {
        Self {
            host,
            registry,
            runner,
            layouts: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Resolver backed by this machine's registry and process table.
    #[cfg(windows)]
    pub fn system() -> Self {
        Self::new(
            Box::new(crate::host::SystemHost),
            Box::new(crate::registry::SystemRegistry),
            Box::new(crate::process::SystemRunner),
        )
    }

    /// Off Windows there is no registry; resolution fails on the platform check.
    #[cfg(not(windows))]
    pub fn system() -> Self {
        Self::new(
            Box::new(crate::host::SystemHost),
            Box::new(crate::registry::MapRegistry::new()),
            Box::new(crate::process::SystemRunner),
        )
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_layout(mut self, version: ToolchainVersion, layout: ToolchainLayout) -> Self {
        self.layouts.insert(version, layout);
        self
    }

    /// Apply the timeout and layout overrides from a config file.
    pub fn configured(mut self, config: &VcvarsConfig) -> Result<Self> {
        self.timeout = config.timeout()?;
        self.layouts
            .extend(config.layouts.iter().map(|(v, l)| (*v, l.clone())));
        Ok(self)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn layout_for(&self, version: ToolchainVersion) -> ToolchainLayout {
        self.layouts
            .get(&version)
            .cloned()
            .unwrap_or_else(|| ToolchainLayout::default_for(version))
    }

    /// Locate vcvarsall.bat, run it and capture the result.
    ///
    /// The platform check comes first so nothing touches the registry or
    /// starts a process on a host vcvarsall cannot run on.
    pub fn resolve(&self, selector: &ToolchainSelector) -> Result<EnvironmentTable> {
        if !self.host.is_target_os() {
            return Err(VcvarsError::PlatformError(format!(
                "host is not running Windows (found {})",
                self.host.os()
            )));
        }

        let layout = self.layout_for(selector.version);
        let locator = ToolchainLocator::new(self.host.as_ref(), self.registry.as_ref());
        let script = locator.locate(selector.version, &layout)?;
        let arg = vcvarsall_arg(selector.architecture, self.host.bits(), &layout);

        let table = capture_environment(self.runner.as_ref(), &script, arg, self.timeout)?;
        tracing::info!(
            version = %selector.version,
            arch = %selector.architecture,
            vcvarsall_arg = arg,
            variables = table.len(),
            "Captured Visual C++ environment"
        );
        Ok(table)
    }
}
