//! primer - workspace initialization pipeline
//!
//! `primer run-init --root <dir>` walks the folder, builds shared memory
//! structures, initializes modules in dependency order, verifies consistency
//! and prints a readiness report. `primer report` prints a stored report.
//!
//! Exit codes: 0 = ready, 2 = approval required (or incomplete run),
//! 1 = unrecoverable error. Logs go to stderr, the report to stdout.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use primer_common::config::{load_config, resolve_database_path, TomlConfig};
use primer_common::events::EventBus;
use primer_init::models::ReadinessReport;
use primer_init::services::{build_extractor, report_presenter, ModuleRegistry, PipelineOrchestrator};
use primer_init::{db, exit_code_for, CliOverrides, ExtractorKind, PipelineSettings, EXIT_FAILURE};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Command-line arguments for primer
#[derive(Parser, Debug)]
#[command(name = "primer")]
#[command(about = "Initialize shared memory and modules from a workspace folder")]
#[command(version)]
struct Cli {
    /// Config file (overrides PRIMER_CONFIG and the platform default)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// SQLite store (overrides PRIMER_DATABASE and the config file)
    #[arg(long, global = true, value_name = "FILE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full initialization pipeline over a folder
    RunInit(RunInitArgs),
    /// Print a stored readiness report
    Report(ReportArgs),
}

#[derive(Args, Debug)]
struct RunInitArgs {
    /// Folder to initialize from
    #[arg(long)]
    root: PathBuf,

    /// Directory names to prune from the walk (comma-separated)
    #[arg(long, value_delimiter = ',')]
    exclude: Option<Vec<String>>,

    /// Files larger than this many bytes are skipped
    #[arg(long)]
    max_file_size: Option<u64>,

    /// Concurrent extraction workers
    #[arg(long)]
    concurrency: Option<usize>,

    /// Minimum overall score for automatic approval (0..1)
    #[arg(long)]
    approval_threshold: Option<f64>,

    /// Consistency issues tolerated before approval is required
    #[arg(long)]
    max_issues: Option<usize>,

    /// Per-file extraction timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Root-relative path that must be present (repeatable)
    #[arg(long = "expect", value_name = "PATH")]
    expect: Vec<String>,

    /// Extractor implementation: noop, rule or http
    #[arg(long)]
    extractor: Option<ExtractorKind>,

    /// Endpoint for the http extractor
    #[arg(long)]
    extractor_endpoint: Option<String>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// Run to show; defaults to the most recent report
    #[arg(long)]
    run_id: Option<Uuid>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Print factors, module states and every consistency finding
    #[arg(long)]
    verbose: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

impl RunInitArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            exclude: self.exclude.clone(),
            max_file_size: self.max_file_size,
            concurrency: self.concurrency,
            approval_threshold: self.approval_threshold,
            max_issues: self.max_issues,
            extract_timeout_secs: self.timeout_secs,
            expected_files: if self.expect.is_empty() {
                None
            } else {
                Some(self.expect.clone())
            },
            extractor: self.extractor,
            extractor_endpoint: self.extractor_endpoint.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match load_config(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    init_tracing(&loaded.toml);
    match &loaded.source {
        Some(path) => debug!("Loaded configuration from {}", path.display()),
        None => warn!("No configuration file found, using compiled defaults"),
    }
    let toml = loaded.toml;

    match run(cli, toml).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "primer failed");
            eprintln!("error: {:#}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

/// `RUST_LOG` wins over `[logging].level`
fn init_tracing(toml: &TomlConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&toml.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli, toml: TomlConfig) -> Result<u8> {
    let db_path = resolve_database_path(cli.database.as_deref(), &toml);
    info!("Database: {}", db_path.display());
    let pool = db::init_database_pool(&db_path)
        .await
        .with_context(|| format!("Failed to open store at {}", db_path.display()))?;

    match cli.command {
        Command::RunInit(args) => run_init(pool, &toml, args).await,
        Command::Report(args) => {
            let report = match args.run_id {
                Some(run_id) => db::load_report(&pool, run_id)
                    .await?
                    .with_context(|| format!("No report stored for run {}", run_id))?,
                None => db::load_latest_report(&pool)
                    .await?
                    .context("No report stored yet")?,
            };
            print_report(&report, &args.output)?;
            Ok(exit_code_for(&report))
        }
    }
}

async fn run_init(pool: sqlx::SqlitePool, toml: &TomlConfig, args: RunInitArgs) -> Result<u8> {
    let settings = PipelineSettings::resolve(&args.overrides(), toml)?;
    let registry = Arc::new(ModuleRegistry::from_config(toml)?);
    let extractor = build_extractor(&settings.extractor, settings.extract_timeout)?;

    info!(
        root = %args.root.display(),
        concurrency = settings.concurrency,
        extractor = extractor.name(),
        registry = registry.version(),
        "Starting primer"
    );

    let event_bus = EventBus::new(100);
    let mut events = event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => debug!(?event, "Pipeline event"),
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "Event log lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received, finishing with a partial report");
                signal_token.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to install Ctrl+C handler"),
        }
    });

    let orchestrator = PipelineOrchestrator::new(pool, event_bus, settings, extractor, registry);
    let report = orchestrator
        .execute_run(&args.root, cancel_token)
        .await
        .context("Initialization run failed")?;

    print_report(&report, &args.output)?;
    Ok(exit_code_for(&report))
}

fn print_report(report: &ReadinessReport, output: &OutputArgs) -> Result<()> {
    let rendered = match output.format {
        OutputFormat::Json => report_presenter::render_json(report)?,
        OutputFormat::Text if output.verbose => report_presenter::render_verbose(report),
        OutputFormat::Text => report_presenter::render_summary(report),
    };
    println!("{}", rendered.trim_end());
    Ok(())
}
