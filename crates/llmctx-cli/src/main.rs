#![deny(unsafe_code)]

//! llmctx CLI: fetch project context and print it as Markdown.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use llmctx_config::AppConfig;
use llmctx_core::{ContextManager, Environment, ProviderRegistry, StatusReport};
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// llmctx: aggregate project-management context for LLM prompts.
#[derive(Parser)]
#[command(name = "llmctx", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "llmctx.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch providers and print the combined context.
    Fetch {
        /// Limit to these providers (repeatable). Defaults to all.
        #[arg(short, long = "provider", value_name = "NAME")]
        providers: Vec<String>,

        /// Use the blocking entry points instead of the async ones.
        #[arg(long)]
        blocking: bool,

        /// Also print the status map as JSON.
        #[arg(long)]
        status: bool,
    },

    /// Fetch providers and print only the status map as JSON.
    Status {
        /// Limit to these providers (repeatable). Defaults to all.
        #[arg(short, long = "provider", value_name = "NAME")]
        providers: Vec<String>,
    },

    /// List registered provider types and configured providers.
    Providers,

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Credentials may live in `.env`; a missing file is not an error.
    let dotenv = dotenvy::dotenv();

    let runtime = Runtime::new().context("failed to start the async runtime")?;
    let config = runtime.block_on(load_config(&cli.config))?;

    init_tracing(cli.verbose, &config.logging.level);
    match dotenv {
        Ok(path) => debug!(path = %path.display(), "Loaded .env"),
        Err(err) if err.not_found() => debug!("No .env file found"),
        Err(err) => warn!(error = %err, "Failed to load .env"),
    }

    match cli.command {
        Commands::Fetch {
            providers,
            blocking,
            status,
        } => cmd_fetch(&runtime, &config, &providers, blocking, status),
        Commands::Status { providers } => cmd_status(&runtime, &config, &providers),
        Commands::Providers => cmd_providers(&config),
        Commands::Config { show } => cmd_config(&cli.config, &config, show),
    }
}

/// Install the stderr subscriber: `RUST_LOG` wins, then `-v`, then the
/// configured level.
fn init_tracing(verbose: u8, configured: &str) {
    let filter = verbosity_filter(verbose, configured);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn verbosity_filter(verbose: u8, configured: &str) -> &str {
    match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    }
}

fn build_manager(config: &AppConfig) -> ContextManager {
    let registry = ProviderRegistry::with_builtin_providers();
    let env = Environment::from_process();
    ContextManager::new(config, &registry, &env)
}

fn selection(providers: &[String]) -> Vec<&str> {
    providers.iter().map(String::as_str).collect()
}

/// Run the batch fetch and fail only if every selected provider failed.
fn run_fetch(
    runtime: &Runtime,
    manager: &ContextManager,
    names: &[&str],
    blocking: bool,
) -> Result<()> {
    let selected = manager.get_status(Some(names)).len();
    if selected == 0 {
        warn!("No providers selected; check the configuration and --provider names");
        return Ok(());
    }

    let failures = if blocking {
        manager.fetch_contexts_blocking(Some(names))
    } else {
        runtime.block_on(manager.fetch_contexts(Some(names)))
    };
    info!(selected, failed = failures.len(), "Fetch complete");

    if failures.len() == selected {
        let details: Vec<String> = failures
            .iter()
            .map(|f| format!("{}: {}", f.provider, f.error))
            .collect();
        anyhow::bail!("every selected provider failed ({})", details.join("; "));
    }
    Ok(())
}

fn cmd_fetch(
    runtime: &Runtime,
    config: &AppConfig,
    providers: &[String],
    blocking: bool,
    status: bool,
) -> Result<()> {
    let manager = build_manager(config);
    let names = selection(providers);
    let outcome = run_fetch(runtime, &manager, &names, blocking);

    print!("{}", manager.get_combined_context(Some(names.as_slice())));
    if status {
        println!("{}", status_json(&manager.get_status(Some(names.as_slice())))?);
    }
    outcome
}

fn cmd_status(runtime: &Runtime, config: &AppConfig, providers: &[String]) -> Result<()> {
    let manager = build_manager(config);
    let names = selection(providers);
    let outcome = run_fetch(runtime, &manager, &names, false);

    println!("{}", status_json(&manager.get_status(Some(names.as_slice())))?);
    outcome
}

fn cmd_providers(config: &AppConfig) -> Result<()> {
    let registry = ProviderRegistry::with_builtin_providers();
    println!("Registered provider types:");
    for name in registry.names() {
        println!("  {name}");
    }

    println!("Configured providers:");
    if config.context_providers.is_empty() {
        println!("  (none)");
    }
    for (name, entry) in config.context_providers.iter() {
        let state = if entry.enabled { "enabled" } else { "disabled" };
        let known = if registry.contains(name) {
            ""
        } else {
            " (unregistered)"
        };
        println!("  {name}: {state}{known}");
    }
    Ok(())
}

fn cmd_config(config_path: &Path, config: &AppConfig, show: bool) -> Result<()> {
    if show {
        let toml_str =
            toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("TOML error: {e}"))?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", config_path.display());
    }
    Ok(())
}

fn status_json(status: &BTreeMap<String, StatusReport>) -> Result<String> {
    serde_json::to_string_pretty(status).context("failed to serialize status")
}

async fn load_config(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        AppConfig::load(path)
            .await
            .with_context(|| format!("failed to load {}", path.display()))
    } else {
        Ok(AppConfig::default())
    }
}
