use std::path::{Path, PathBuf};

use crate::config::{ToolchainLayout, ToolchainVersion};
use crate::errors::{Result, VcvarsError};
use crate::host::HostProbe;
use crate::registry::{Hive, RegistryReader};

/// Finds vcvarsall.bat for one Visual Studio version.
pub struct ToolchainLocator<'a> {
    host: &'a dyn HostProbe,
    registry: &'a dyn RegistryReader,
}

impl<'a> ToolchainLocator<'a> {
    pub fn new(host: &'a dyn HostProbe, registry: &'a dyn RegistryReader) -> Self {
        Self { host, registry }
    }

    /// Install root recorded in the registry for this version.
    pub fn install_root(
        &self,
        version: ToolchainVersion,
        layout: &ToolchainLayout,
    ) -> Result<PathBuf> {
        let key = layout.registry_key_for(self.host.bits().is_64bit());
        tracing::debug!(
            version = version.id(),
            key = %key,
            value = %layout.value_name,
            "Looking up Visual Studio install root"
        );
        let root = self
            .registry
            .read_string(Hive::LocalMachine, &key, &layout.value_name)?
            .filter(|root| !root.trim().is_empty())
            .ok_or_else(|| {
                VcvarsError::LookupError(format!(
                    "unable to find installation directory for Visual Studio {} (HKLM\\{}\\{})",
                    version, key, layout.value_name
                ))
            })?;
        Ok(PathBuf::from(root.trim()))
    }

    /// Absolute path to vcvarsall.bat; it must exist on disk.
    pub fn locate(&self, version: ToolchainVersion, layout: &ToolchainLayout) -> Result<PathBuf> {
        let root = self.install_root(version, layout)?;
        let script = layout.script_in(&root);
        self.ensure_exists(&script)?;
        tracing::debug!(script = %script.display(), "Found vcvarsall");
        Ok(script)
    }

    fn ensure_exists(&self, script: &Path) -> Result<()> {
        if self.host.exists(script) {
            Ok(())
        } else {
            Err(VcvarsError::NotFoundError(format!(
                "{} does not exist",
                script.display()
            )))
        }
    }
}
