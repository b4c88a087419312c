mod logging;

use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use salesflow::{LoadBackendKind, Pipeline, SalesflowConfig, SchemaValidator};

#[derive(Parser)]
#[command(
    name = "salesflow",
    version,
    about = "Validate, enrich and load sales records"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace). Overrides logging.level
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one batch and print its result as JSON
    Run {
        /// Path to the salesflow YAML file
        #[arg(short, long)]
        config: PathBuf,
        /// Input file; defaults to source.path from the config
        #[arg(short, long)]
        input: Option<String>,
    },
    /// Validate configuration without touching any data
    Check {
        /// Path to the salesflow YAML file
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, input } => {
            let cfg = load_config(&config)?;
            init_logging(cli.log_level.as_deref(), &cfg)?;
            run(&cfg, input)
        }
        Commands::Check { config } => {
            let cfg = load_config(&config)?;
            init_logging(cli.log_level.as_deref(), &cfg)?;
            check(&cfg)
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<SalesflowConfig> {
    SalesflowConfig::from_file(path)
        .and_then(|cfg| cfg.apply_env_overrides())
        .with_context(|| format!("loading config {}", path.display()))
}

fn init_logging(cli_level: Option<&str>, cfg: &SalesflowConfig) -> anyhow::Result<()> {
    let level = cli_level.unwrap_or(&cfg.logging.level);
    logging::init(level, cfg.logging.json).map_err(|e| anyhow!("failed to initialize logging: {e}"))
}

fn run(cfg: &SalesflowConfig, input: Option<String>) -> anyhow::Result<()> {
    let locator = input
        .or_else(|| cfg.source.path.clone())
        .context("no input given: pass --input or set source.path")?;

    if !cfg.load.is_durable() {
        tracing::warn!(
            table = %cfg.load.table,
            "load.backend is in_memory; loaded rows are discarded when the process exits"
        );
    }

    let pipeline = Pipeline::from_config(cfg)?;
    let result = pipeline.run(&locator)?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn check(cfg: &SalesflowConfig) -> anyhow::Result<()> {
    let validator = SchemaValidator::new(&cfg.validate)?;
    let backend = match cfg.load.backend {
        LoadBackendKind::InMemory => "in_memory",
        LoadBackendKind::Redb => "redb",
    };
    tracing::info!(
        rules = validator.rules().len(),
        backend,
        table = %cfg.load.table,
        reject_path = %cfg.reject.path,
        "config_ok"
    );
    println!("configuration OK");
    Ok(())
}
