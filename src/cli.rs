use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "vcvars")]
#[command(version)]
#[command(about = "Capture the Visual C++ environment set up by vcvarsall.bat", long_about = None)]
pub struct VcvarsCli {
    /// Log every resolution step to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run vcvarsall on this machine and print the resulting environment
    Resolve {
        /// Visual Studio version: 2013, 2015, 2017 (or 12.0, 14.0, 15.0)
        #[arg(long = "vs")]
        version: String,

        /// Target architecture: x86 or x86_64
        #[arg(long)]
        arch: String,

        /// Hard limit for vcvarsall, e.g. 90s or 5m
        #[arg(long)]
        timeout: Option<String>,

        /// Config file with layout overrides
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Set)]
        format: OutputFormat,
    },

    /// Bring the configured nodes online and report what was captured
    Online {
        /// Node configuration file (YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Only these nodes (default: all)
        #[arg(short, long = "node")]
        nodes: Vec<String>,
    },

    /// Print the JSON Schema of the configuration file
    Schema,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// NAME=VALUE lines
    Set,
    Json,
    Yaml,
}

impl VcvarsCli {
    pub fn new() -> Self {
        Self::parse()
    }
}

impl Default for VcvarsCli {
    fn default() -> Self {
        Self::new()
    }
}
