use std::io::{self, Write};

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;
use vcvars::{
    cli::{Command, OutputFormat, VcvarsCli},
    config::{parse_timeout, VcvarsConfig},
    Architecture, EnvironmentResolver, LocalChannel, NodeManager, ToolchainSelector,
    ToolchainVersion,
};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn resolve(
    version: &str,
    arch: &str,
    timeout: Option<&str>,
    config: Option<&std::path::Path>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let selector = ToolchainSelector::new(
        version.parse::<ToolchainVersion>()?,
        arch.parse::<Architecture>()?,
    );

    let mut resolver = EnvironmentResolver::system();
    if let Some(path) = config {
        let config = VcvarsConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?;
        resolver = resolver.configured(&config)?;
    }
    if let Some(raw) = timeout {
        resolver = resolver.with_timeout(parse_timeout(raw)?);
    }

    let table = resolver.resolve(&selector)?;
    let mut out = io::stdout().lock();
    match format {
        OutputFormat::Set => {
            for line in table.to_set_lines() {
                writeln!(out, "{}", line)?;
            }
        }
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&table)?)?,
        OutputFormat::Yaml => write!(out, "{}", serde_yaml::to_string(&table)?)?,
    }
    Ok(())
}

fn online(config_path: &std::path::Path, only: &[String]) -> anyhow::Result<()> {
    let config = VcvarsConfig::load(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let resolver = EnvironmentResolver::system().configured(&config)?;
    let channel = LocalChannel::new(resolver);
    let mut manager = NodeManager::from_config(&config);

    let names: Vec<String> = if only.is_empty() {
        config.nodes.iter().map(|n| n.name.clone()).collect()
    } else {
        only.to_vec()
    };

    let mut out = io::stdout().lock();
    for name in &names {
        writeln!(out, "{} {}", "==>".blue().bold(), name.bold())?;
        manager.bring_online(name, &channel, &mut out)?;
        let Some(node) = manager.node(name) else {
            continue;
        };
        let status = match (node.toolchain(), node.environment()) {
            (None, _) => "no toolchain configured".dimmed().to_string(),
            (Some(_), Some(env)) => format!("{} variables captured", env.len())
                .green()
                .to_string(),
            (Some(_), None) => "no environment captured".yellow().to_string(),
        };
        writeln!(out, "    {}", status)?;
    }
    Ok(())
}

fn main() {
    let cli = VcvarsCli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Command::Resolve {
            version,
            arch,
            timeout,
            config,
            format,
        } => resolve(version, arch, timeout.as_deref(), config.as_deref(), *format),
        Command::Online { config, nodes } => online(config, nodes),
        Command::Schema => VcvarsConfig::json_schema()
            .map(|schema| println!("{}", schema))
            .map_err(Into::into),
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}
