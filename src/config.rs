use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{Result, VcvarsError};

/// Bounded wait applied to the capture process when the config names none.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Registry subtree listing Visual Studio install roots by version id.
pub const VS7_KEY: &str = r"SOFTWARE\Microsoft\VisualStudio\SxS\VS7";

/// Supported Visual Studio releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ToolchainVersion {
    Vs2013,
    Vs2015,
    Vs2017,
}

impl ToolchainVersion {
    pub const ALL: [ToolchainVersion; 3] = [
        ToolchainVersion::Vs2013,
        ToolchainVersion::Vs2015,
        ToolchainVersion::Vs2017,
    ];

    /// Internal version id, also the registry value name under `VS7`.
    pub fn id(&self) -> &'static str {
        match self {
            ToolchainVersion::Vs2013 => "12.0",
            ToolchainVersion::Vs2015 => "14.0",
            ToolchainVersion::Vs2017 => "15.0",
        }
    }

    pub fn year(&self) -> &'static str {
        match self {
            ToolchainVersion::Vs2013 => "2013",
            ToolchainVersion::Vs2015 => "2015",
            ToolchainVersion::Vs2017 => "2017",
        }
    }

    pub fn display_name(&self) -> String {
        format!("Visual Studio {}", self.year())
    }
}

impl fmt::Display for ToolchainVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.year())
    }
}

impl FromStr for ToolchainVersion {
    type Err = VcvarsError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        ToolchainVersion::ALL
            .into_iter()
            .find(|v| v.id() == trimmed || v.year() == trimmed)
            .ok_or_else(|| VcvarsError::UnsupportedVersionError(s.to_string()))
    }
}

impl TryFrom<String> for ToolchainVersion {
    type Error = VcvarsError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ToolchainVersion> for String {
    fn from(value: ToolchainVersion) -> Self {
        value.year().to_string()
    }
}

impl JsonSchema for ToolchainVersion {
    fn schema_name() -> String {
        "ToolchainVersion".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        String::json_schema(gen)
    }
}

/// Target architecture of the produced binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Architecture {
    X86,
    X86_64,
}

impl Architecture {
    pub const ALL: [Architecture; 2] = [Architecture::X86, Architecture::X86_64];

    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::X86 => "x86",
            Architecture::X86_64 => "x86_64",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Architecture {
    type Err = VcvarsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x86" => Ok(Architecture::X86),
            "x86_64" | "amd64" | "x64" => Ok(Architecture::X86_64),
            _ => Err(VcvarsError::UnsupportedArchitectureError(s.to_string())),
        }
    }
}

impl TryFrom<String> for Architecture {
    type Error = VcvarsError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Architecture> for String {
    fn from(value: Architecture) -> Self {
        value.as_str().to_string()
    }
}

impl JsonSchema for Architecture {
    fn schema_name() -> String {
        "Architecture".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        String::json_schema(gen)
    }
}

/// The (version, architecture) pair an operator selects for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ToolchainSelector {
    pub version: ToolchainVersion,
    #[serde(alias = "arch")]
    pub architecture: Architecture,
}

impl ToolchainSelector {
    pub fn new(version: ToolchainVersion, architecture: Architecture) -> Self {
        Self {
            version,
            architecture,
        }
    }
}

/// Where a given Visual Studio version records its install root and keeps
/// vcvarsall.bat relative to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ToolchainLayout {
    /// Native (non-WOW64) registry path under HKEY_LOCAL_MACHINE.
    pub registry_key: String,
    pub value_name: String,
    /// Path of vcvarsall.bat below the install root, one entry per component.
    pub script_path: Vec<String>,
    /// Only 32-bit-hosted compilers ship with this version.
    #[serde(default)]
    pub native_32bit_tooling: bool,
}

impl ToolchainLayout {
    pub fn default_for(version: ToolchainVersion) -> Self {
        let script_path: &[&str] = match version {
            ToolchainVersion::Vs2013 | ToolchainVersion::Vs2015 => &["VC", "vcvarsall.bat"],
            ToolchainVersion::Vs2017 => &["VC", "Auxiliary", "Build", "vcvarsall.bat"],
        };
        Self {
            registry_key: VS7_KEY.to_string(),
            value_name: version.id().to_string(),
            script_path: script_path.iter().map(|s| s.to_string()).collect(),
            native_32bit_tooling: version == ToolchainVersion::Vs2013,
        }
    }

    /// Registry path to read on a host, accounting for WOW64 redirection.
    pub fn registry_key_for(&self, host_64bit: bool) -> String {
        if !host_64bit {
            return self.registry_key.clone();
        }
        let prefix = r"SOFTWARE\";
        match self.registry_key.get(..prefix.len()) {
            Some(head) if head.eq_ignore_ascii_case(prefix) => {
                let rest = &self.registry_key[prefix.len()..];
                if rest.to_ascii_lowercase().starts_with(r"wow6432node\") {
                    self.registry_key.clone()
                } else {
                    format!(r"{}Wow6432Node\{}", head, rest)
                }
            }
            _ => self.registry_key.clone(),
        }
    }

    pub fn script_in(&self, install_root: &Path) -> PathBuf {
        let mut path = install_root.to_path_buf();
        for component in &self.script_path {
            path.push(component);
        }
        path
    }
}

/// A build node and its optional toolchain selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, JsonSchema)]
pub struct NodeConfig {
    #[validate(length(min = 1, message = "node name must not be empty"))]
    pub name: String,
    #[serde(default)]
    pub toolchain: Option<ToolchainSelector>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, JsonSchema)]
pub struct VcvarsConfig {
    /// Hard limit on the capture process, e.g. "90s" or "5m".
    #[serde(default)]
    pub timeout: Option<String>,
    #[validate(length(min = 1, message = "at least one node is required"))]
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
    /// Per-version overrides of the built-in layouts.
    #[serde(default)]
    pub layouts: BTreeMap<ToolchainVersion, ToolchainLayout>,
}

impl VcvarsConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: VcvarsConfig = serde_yaml::from_str(content)?;
        config.validate_all()?;
        Ok(config)
    }

    pub fn validate_all(&self) -> Result<()> {
        self.validate()?;
        let mut seen = HashSet::new();
        for node in &self.nodes {
            node.validate()?;
            if !seen.insert(node.name.as_str()) {
                return Err(VcvarsError::ValidationError(format!(
                    "duplicate node name '{}'",
                    node.name
                )));
            }
        }
        self.timeout()?;
        Ok(())
    }

    pub fn timeout(&self) -> Result<Duration> {
        match &self.timeout {
            Some(raw) => parse_timeout(raw),
            None => Ok(DEFAULT_TIMEOUT),
        }
    }

    pub fn layout_for(&self, version: ToolchainVersion) -> ToolchainLayout {
        self.layouts
            .get(&version)
            .cloned()
            .unwrap_or_else(|| ToolchainLayout::default_for(version))
    }

    pub fn json_schema() -> Result<String> {
        let schema = schemars::schema_for!(VcvarsConfig);
        Ok(serde_json::to_string_pretty(&schema)?)
    }
}

pub fn parse_timeout(s: &str) -> Result<Duration> {
    let duration = humantime::parse_duration(s.trim()).map_err(|e| {
        VcvarsError::ValidationError(format!("Invalid timeout duration '{}': {}", s, e))
    })?;
    if duration.is_zero() {
        return Err(VcvarsError::ValidationError(format!(
            "Invalid timeout duration '{}': must be greater than zero",
            s
        )));
    }
    Ok(duration)
}
