//! # Tracker Configuration Validator
//!
//! Command-line tool for validating execution tracker configuration across
//! environments before a service embedding the tracker starts.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use execution_tracker::config::{ConfigManager, TrackerConfig};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "config-validator")]
#[command(about = "Validate execution tracker configuration files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment to validate (development, test, production, ...)
    #[arg(short, long, default_value = "development")]
    environment: String,

    /// Configuration directory path (default: TRACKER_CONFIG_DIR or ./config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate the full configuration
    All,

    /// Validate a single section (locking, events, database, logging)
    Component { name: String },

    /// List environments that have an override file
    Environments,

    /// Print the effective configuration as JSON (credentials masked)
    Show,

    /// Compare effective configurations between two environments
    Compare {
        #[arg(short, long, default_value = "development")]
        base: String,

        #[arg(short, long)]
        target: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let _ = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    let result = match &cli.command {
        Some(Commands::All) | None => validate_all(&cli),
        Some(Commands::Component { name }) => validate_component(&cli, name),
        Some(Commands::Environments) => list_environments(&cli),
        Some(Commands::Show) => show_config(&cli),
        Some(Commands::Compare { base, target }) => compare_configs(&cli, base, target),
    };

    match result {
        Ok(()) => {
            info!("Configuration validation completed successfully");
        }
        Err(e) => {
            error!("Configuration validation failed: {e:#}");
            eprintln!("❌ {e:#}");
            process::exit(1);
        }
    }
}

fn load(cli: &Cli, environment: &str) -> Result<Arc<ConfigManager>> {
    ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), environment)
        .with_context(|| format!("failed to load configuration for environment '{environment}'"))
}

fn validate_all(cli: &Cli) -> Result<()> {
    println!("🔧 Validating tracker configuration");
    println!("Environment: {}", cli.environment);

    let manager = load(cli, &cli.environment)?;
    println!(
        "✅ Configuration loaded from {}",
        manager.config_directory().display()
    );

    let config = manager.config();
    for section in ["locking", "events", "database", "logging"] {
        validate_section(config, section)?;
    }

    println!("\n🎉 All configuration validation checks passed!");
    Ok(())
}

fn validate_component(cli: &Cli, name: &str) -> Result<()> {
    let manager = load(cli, &cli.environment)?;
    validate_section(manager.config(), &name.to_lowercase())?;
    println!("✅ Component '{name}' validation passed!");
    Ok(())
}

fn validate_section(config: &TrackerConfig, section: &str) -> Result<()> {
    match section {
        "locking" => {
            println!(
                "  locking: acquire timeout {}ms",
                config.locking.acquire_timeout_ms
            );
        }
        "events" => {
            println!("  events: channel capacity {}", config.events.channel_capacity);
        }
        "database" => {
            let url_source = if config.database.url.is_some() {
                "database.url"
            } else if config.database.database_url().is_some() {
                "DATABASE_URL"
            } else {
                "not configured (memory store only)"
            };
            println!(
                "  database: url from {url_source}, pool {}, acquire timeout {}s",
                config.database.max_connections, config.database.acquire_timeout_seconds
            );
        }
        "logging" => {
            println!(
                "  logging: level '{}', json {}",
                config.logging.level, config.logging.json
            );
        }
        other => bail!("Unknown component: {other}"),
    }
    Ok(())
}

fn list_environments(cli: &Cli) -> Result<()> {
    let manager = load(cli, &cli.environment)?;
    let directory = manager.config_directory();
    println!("📋 Environments in {}:", directory.display());

    for environment in environment_overrides(directory)? {
        println!("  • {environment}");
    }
    Ok(())
}

fn environment_overrides(directory: &Path) -> Result<Vec<String>> {
    if !directory.exists() {
        return Ok(Vec::new());
    }

    let mut environments = Vec::new();
    for entry in std::fs::read_dir(directory)
        .with_context(|| format!("cannot read {}", directory.display()))?
    {
        let name = entry?.file_name();
        let name = name.to_string_lossy();
        if let Some(environment) = name
            .strip_prefix("tracker.")
            .and_then(|rest| rest.strip_suffix(".toml"))
        {
            environments.push(environment.to_string());
        }
    }
    environments.sort();
    Ok(environments)
}

fn show_config(cli: &Cli) -> Result<()> {
    let manager = load(cli, &cli.environment)?;
    println!("{}", serde_json::to_string_pretty(&manager.debug_config())?);
    Ok(())
}

fn compare_configs(cli: &Cli, base: &str, target: &str) -> Result<()> {
    let base_config = load(cli, base)?.debug_config();
    let target_config = load(cli, target)?.debug_config();

    println!("🔍 Comparing '{base}' -> '{target}'");
    let mut differences = 0;
    diff_values("", &base_config, &target_config, &mut differences);
    if differences == 0 {
        println!("  (identical)");
    }
    Ok(())
}

fn diff_values(
    path: &str,
    base: &serde_json::Value,
    target: &serde_json::Value,
    differences: &mut usize,
) {
    match (base, target) {
        (serde_json::Value::Object(base), serde_json::Value::Object(target)) => {
            for (key, base_value) in base {
                let child = format!("{path}.{key}");
                let target_value = target.get(key).unwrap_or(&serde_json::Value::Null);
                diff_values(&child, base_value, target_value, differences);
            }
        }
        _ if base != target => {
            *differences += 1;
            println!("  {}: {base} -> {target}", path.trim_start_matches('.'));
        }
        _ => {}
    }
}
