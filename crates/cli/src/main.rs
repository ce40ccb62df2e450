//! Migrator CLI - run and scaffold supervised one-off data migrations

mod generate;
mod migration;
mod script;
mod telemetry;

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use migration::SqlScriptMigration;
use migrator_core::port::SideEffectBus;
use migrator_core::{AppError, Operator, OperatorConfig, OperatorOptions};
use migrator_infra_sqlite::{create_pool, SqliteTransactionProvider};
use migrator_infra_system::{IndicatifProgressFactory, ReaderConfirmation};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

const DEFAULT_LOG_DIR: &str = "~/.migrator/logs";
const DEFAULT_SCRIPT_DIR: &str = "db/data_migrations";

/// Exit code when the operator declined to commit
const EXIT_CANCELED: u8 = 2;

#[derive(Parser)]
#[command(name = "migrator")]
#[command(about = "Supervised one-off data migrations", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory for per-run log files
    #[arg(long, env = "MIGRATOR_LOG_DIR", default_value = DEFAULT_LOG_DIR)]
    log_dir: String,

    /// Log file format: pretty or json
    #[arg(long, env = "MIGRATOR_LOG_FORMAT", default_value = "pretty")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a SQL script inside a transaction and ask before committing
    Run {
        /// Script file (statements separated by semicolons)
        file: PathBuf,

        /// Database URL (e.g., sqlite://data/app.db)
        #[arg(long, env = "MIGRATOR_DATABASE_URL")]
        database_url: String,

        /// Run title (default: derived from the file name)
        #[arg(short, long)]
        title: Option<String>,

        /// Execute statements directly, without a transaction or confirmation
        #[arg(long)]
        without_transaction: bool,

        /// Skip the side-effect summary
        #[arg(long)]
        no_side_effects: bool,

        /// Write a JSON run report to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Create a timestamped script template
    Generate {
        /// Migration name (e.g., "backfill user slugs")
        name: String,

        /// Directory for scripts
        #[arg(long, env = "MIGRATOR_SCRIPT_DIR", default_value = DEFAULT_SCRIPT_DIR)]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let log_dir = telemetry::resolve_log_dir(&cli.log_dir);
    let (_guard, log_file) = telemetry::init_logging(&log_dir, &cli.log_format)?;
    info!(
        version = migrator_core::VERSION,
        log_file = %log_file.display(),
        "Migrator starting"
    );

    match cli.command {
        Commands::Run {
            file,
            database_url,
            title,
            without_transaction,
            no_side_effects,
            report,
        } => {
            let options = OperatorOptions::default().warning_side_effects(!no_side_effects);
            let options = if without_transaction {
                options.without_transaction()
            } else {
                options
            };
            run_script(&file, &database_url, title, options, report.as_deref()).await
        }

        Commands::Generate { name, dir } => {
            let path = generate::generate_script(&dir, &name, chrono::Local::now())?;
            println!(
                "{}",
                format!("✓ Created {}", path.display()).green().bold()
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_script(
    file: &Path,
    database_url: &str,
    title: Option<String>,
    options: OperatorOptions,
    report_path: Option<&Path>,
) -> Result<ExitCode> {
    let sql = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read script {}", file.display()))?;
    let statements = script::split_statements(&sql);
    if statements.is_empty() {
        bail!("Script {} contains no statements", file.display());
    }
    let title = title.unwrap_or_else(|| script::script_title(file));

    info!(database_url, script = %file.display(), statements = statements.len(), "Opening database");
    let pool = create_pool(database_url)
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;

    // DI wiring
    let side_effects = SideEffectBus::new();
    let provider = Arc::new(SqliteTransactionProvider::new(
        pool.clone(),
        side_effects.clone(),
    ));
    let config = OperatorConfig::new(
        provider,
        Arc::new(IndicatifProgressFactory::new()),
        Arc::new(ReaderConfirmation::stdin()),
        side_effects.clone(),
    );

    let migration = SqlScriptMigration::new(title.clone(), statements, pool.clone(), side_effects);
    let mut operator = Operator::new(title, options, config);
    let outcome = operator.execute(&migration).await;

    if let Some(path) = report_path {
        let json = operator.report().to_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
    }
    pool.close().await;

    match outcome {
        Ok(_) => {
            println!("{}", "✓ Committed".green().bold());
            Ok(ExitCode::SUCCESS)
        }
        Err(AppError::Canceled(_)) => {
            println!("{}", "○ Rolled back, nothing was committed".yellow());
            Ok(ExitCode::from(EXIT_CANCELED))
        }
        Err(e) => {
            println!("{} {}", "✗ Migration failed:".red().bold(), e);
            Ok(ExitCode::FAILURE)
        }
    }
}
