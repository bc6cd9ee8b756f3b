use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Variable defined only by 64-bit Windows.
pub const HOST_64BIT_MARKER: &str = "ProgramFiles(x86)";

/// Word size of the host operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostBits {
    Bits32,
    Bits64,
}

impl HostBits {
    pub fn is_64bit(&self) -> bool {
        matches!(self, HostBits::Bits64)
    }
}

/// What the resolver needs to know about the machine it runs on.
pub trait HostProbe {
    /// Name of the operating system family, as in `std::env::consts::OS`.
    fn os(&self) -> &str;

    fn var(&self, name: &str) -> Option<String>;

    fn exists(&self, path: &Path) -> bool;

    /// vcvarsall.bat only runs on Windows.
    fn is_target_os(&self) -> bool {
        self.os() == "windows"
    }

    fn bits(&self) -> HostBits {
        if self.var(HOST_64BIT_MARKER).is_some() {
            HostBits::Bits64
        } else {
            HostBits::Bits32
        }
    }
}

/// The machine this process is running on.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHost;

impl HostProbe for SystemHost {
    fn os(&self) -> &str {
        std::env::consts::OS
    }

    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// A scripted host for exercising the resolver off Windows.
#[derive(Debug, Clone, Default)]
pub struct StaticHost {
    pub os: String,
    pub vars: HashMap<String, String>,
    pub files: Vec<PathBuf>,
}

impl StaticHost {
    pub fn windows(bits: HostBits) -> Self {
        let mut vars = HashMap::new();
        if bits.is_64bit() {
            vars.insert(
                HOST_64BIT_MARKER.to_string(),
                r"C:\Program Files (x86)".to_string(),
            );
        }
        Self {
            os: "windows".to_string(),
            vars,
            files: Vec::new(),
        }
    }

    pub fn with_os(os: &str) -> Self {
        Self {
            os: os.to_string(),
            ..Self::default()
        }
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }
}

impl HostProbe for StaticHost {
    fn os(&self) -> &str {
        &self.os
    }

    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.iter().any(|f| f == path)
    }
}
