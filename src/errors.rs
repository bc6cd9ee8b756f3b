use thiserror::Error;

#[derive(Debug, Error)]
pub enum VcvarsError {
    #[error("Platform error: {0}")]
    PlatformError(String),

    #[error("Lookup error: {0}")]
    LookupError(String),

    #[error("Not found: {0}")]
    NotFoundError(String),

    #[error("Unsupported architecture: {0}")]
    UnsupportedArchitectureError(String),

    #[error("Unsupported Visual Studio version: {0}")]
    UnsupportedVersionError(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("{0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Coarse grouping of errors, used as a structured log field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Bad operator input: unknown version, architecture or node.
    Configuration,
    /// The host is not the platform vcvarsall targets.
    Platform,
    /// The toolchain is missing from the registry or the disk.
    Toolchain,
    /// The capture process failed, timed out or could not start.
    Execution,
    Io,
}

impl VcvarsError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            VcvarsError::UnsupportedArchitectureError(_)
            | VcvarsError::UnsupportedVersionError(_)
            | VcvarsError::NodeNotFound(_)
            | VcvarsError::ValidationError(_)
            | VcvarsError::SerdeError(_)
            | VcvarsError::YamlError(_) => ErrorCategory::Configuration,
            VcvarsError::PlatformError(_) => ErrorCategory::Platform,
            VcvarsError::LookupError(_) | VcvarsError::NotFoundError(_) => {
                ErrorCategory::Toolchain
            }
            VcvarsError::ExecutionError(_) => ErrorCategory::Execution,
            VcvarsError::IoError(_) => ErrorCategory::Io,
        }
    }
}

impl From<validator::ValidationErrors> for VcvarsError {
    fn from(err: validator::ValidationErrors) -> Self {
        VcvarsError::ValidationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VcvarsError>;
