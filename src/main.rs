use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dirbackup::config::{self, Config};
use dirbackup::managers::logging::{init_console_logging, init_logging, LoggingConfig};
use dirbackup::managers::runner::Runner;
use dirbackup::registry::Registry;
use dirbackup::utils::mask::mask_sensitive;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "dirbackup")]
#[command(about = "Back up local and SSH-reachable directories into storage", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "backup.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every enabled backup interface (default)
    Run,

    /// Validate the configuration file without connecting anywhere
    Validate,

    /// Print the configuration as JSON with sensitive values masked
    ShowConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run);

    match command {
        Commands::Validate => {
            init_console_logging();
            handle_validate(&cli.config)
        }
        Commands::ShowConfig => {
            init_console_logging();
            handle_show_config(&cli.config)
        }
        Commands::Run => handle_run(&cli.config),
    }
}

fn load(path: &Path) -> Result<Config> {
    config::load_config(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

fn handle_run(path: &Path) -> Result<()> {
    let config = load(path)?;

    // Setup logging with file rotation (must keep guard alive)
    let logging_config = LoggingConfig::from_settings(&config.logging);
    let _log_guard = init_logging(&logging_config)?;

    println!("Running backup '{}'...", config.name);

    let runner = Runner::new(config);
    let summary = runner.run()?;

    if summary.is_success() {
        println!(
            "✓ Backup completed: {} interfaces succeeded, {} skipped",
            summary.succeeded(),
            summary.skipped()
        );
        return Ok(());
    }

    eprintln!(
        "✗ Backup finished with failures: {} succeeded, {} failed, {} skipped",
        summary.succeeded(),
        summary.failed(),
        summary.skipped()
    );
    for message in summary.failure_messages() {
        eprintln!("  - {}", message);
    }
    std::process::exit(1);
}

fn handle_validate(path: &Path) -> Result<()> {
    let config = load(path)?;
    Registry::builtin().check(&config)?;

    println!("Configuration is valid!");
    println!("Name: {}", config.name);
    println!("Storage: {}", config.storage.interface);
    println!("Interfaces: {}", config.interfaces.len());

    for (index, interface) in config.interfaces.iter().enumerate() {
        let state = if interface.enabled { "enabled" } else { "disabled" };
        println!("  [{}] {} ({})", index, interface.interface, state);
        for directory in &interface.directories {
            let retention = directory
                .retention
                .map(|keep| format!("keep {}", keep))
                .unwrap_or_else(|| "keep all".to_string());
            println!(
                "      {} -> {} ({})",
                directory.src,
                directory.destination_dir(),
                retention
            );
        }
    }

    Ok(())
}

fn handle_show_config(path: &Path) -> Result<()> {
    let config = load(path)?;
    let value = serde_json::to_value(&config).context("Failed to serialize configuration")?;
    println!("{}", serde_json::to_string_pretty(&mask_sensitive(value))?);
    Ok(())
}
