//! CLI command definitions for webarena-fleet.
//!
//! `run` is the core operation: split a task range across the configured
//! workers and launch one driver per worker in a tmux window. The remaining
//! commands preview plans and report on what the drivers produced.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{
    parse_worker_list, render_exports, validate_session_name, EndpointConfig, FleetConfig,
    Provider, DEFAULT_CONFIG_FILE,
};
use crate::report::{
    collect_logs, pending_for_plan, purge_hits, run_monitor, scan_logs, RunSummary, TaskCatalog,
    DEFAULT_CATALOG_DIR, DEFAULT_LOG_DIR, DEFAULT_SCAN_PATTERN,
};
use crate::scheduler::{split_range, Dispatcher, Plan, RecordingBackend, TaskRange, TmuxBackend};

/// Exit status for argument errors (wrong arity, non-numeric bounds).
pub const USAGE_EXIT_CODE: i32 = 1;

/// Default directory holding `render_<id>.html` files for `scan --delete`.
const DEFAULT_RENDERS_DIR: &str = "results_full";

/// Run WebArena across a fleet of GBOX workers.
#[derive(Parser)]
#[command(name = "webarena-fleet")]
#[command(about = "Split WebArena task ranges across GBOX workers and track the results")]
#[command(version)]
#[command(
    long_about = "webarena-fleet splits a WebArena task range across a fixed list of GBOX boxes and launches one benchmark driver per box, each in its own tmux window.\n\nExample usage:\n  webarena-fleet run 0 812 results_full\n  tmux attach -t webarena\n  webarena-fleet analyze log_files"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// Fleet config file (YAML). Defaults to ./fleet.yaml when present.
    #[arg(long, env = "FLEET_CONFIG", global = true)]
    pub config: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Split [start, end) across the workers and launch one driver per worker.
    Run(RunArgs),

    /// Show how [start, end) would be split, without launching anything.
    Plan(PlanArgs),

    /// Print shell exports for the benchmark site endpoints.
    Env(EnvArgs),

    /// Write a fleet config file with the given workers.
    Init(InitArgs),

    /// Count passes, failures and incomplete runs in a log directory.
    Analyze(AnalyzeArgs),

    /// Live dashboard over a log directory.
    Monitor(MonitorArgs),

    /// Find logs containing a failure marker, optionally deleting them.
    Scan(ScanArgs),

    /// List tasks in [start, end) without a render file, per worker.
    Pending(PendingArgs),
}

/// Overrides applied on top of the fleet config.
#[derive(clap::Args, Debug, Default)]
pub struct FleetOverrides {
    /// Comma-separated worker IDs, replacing the configured list.
    #[arg(long)]
    pub workers: Option<String>,

    /// tmux session name.
    #[arg(long)]
    pub session: Option<String>,

    /// Model provider passed to the driver.
    #[arg(long, value_enum)]
    pub provider: Option<Provider>,
}

/// Arguments for `webarena-fleet run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// First task index (inclusive).
    pub start_index: u64,

    /// Last task index (exclusive).
    pub end_index: u64,

    /// Result directory shared by all workers.
    pub result_dir: PathBuf,

    #[command(flatten)]
    pub fleet: FleetOverrides,

    /// Seconds to wait between worker launches.
    #[arg(long)]
    pub launch_delay: Option<u64>,

    /// Kill an existing session with the same name first.
    #[arg(long)]
    pub replace: bool,

    /// Print tmux commands instead of running them.
    #[arg(long)]
    pub dry_run: bool,

    /// Output the dispatch report as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `webarena-fleet plan`.
#[derive(Parser, Debug)]
pub struct PlanArgs {
    /// First task index (inclusive).
    pub start_index: u64,

    /// Last task index (exclusive).
    pub end_index: u64,

    /// Comma-separated worker IDs, replacing the configured list.
    #[arg(long)]
    pub workers: Option<String>,

    /// Output the plan as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `webarena-fleet env`.
#[derive(Parser, Debug)]
pub struct EnvArgs {
    /// Deployment host, e.g. http://ec2-3-149-78-74.us-east-2.compute.amazonaws.com
    #[arg(long, env = "WEBARENA_HOST")]
    pub host: Option<String>,
}

/// Arguments for `webarena-fleet init`.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Comma-separated worker IDs (GBOX box IDs), in dispatch order.
    #[arg(long)]
    pub workers: String,

    /// Deployment host for the benchmark sites.
    #[arg(long, env = "WEBARENA_HOST")]
    pub host: Option<String>,

    /// Model provider passed to the driver.
    #[arg(long, value_enum, default_value_t = Provider::Bedrock)]
    pub provider: Provider,

    /// Where to write the config.
    #[arg(short = 'o', long, default_value = DEFAULT_CONFIG_FILE)]
    pub output: PathBuf,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for `webarena-fleet analyze`.
#[derive(Parser, Debug)]
pub struct AnalyzeArgs {
    /// Directory containing task_*.log files.
    #[arg(default_value = DEFAULT_LOG_DIR)]
    pub log_dir: PathBuf,

    /// Task catalog directory used to label sites.
    #[arg(long, default_value = DEFAULT_CATALOG_DIR)]
    pub catalog_dir: PathBuf,

    /// List every task per outcome.
    #[arg(long)]
    pub details: bool,

    /// Output the summary as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `webarena-fleet monitor`.
#[derive(Parser, Debug)]
pub struct MonitorArgs {
    /// Directory containing task_*.log files.
    #[arg(default_value = DEFAULT_LOG_DIR)]
    pub log_dir: PathBuf,

    /// Task catalog directory used to label sites.
    #[arg(long, default_value = DEFAULT_CATALOG_DIR)]
    pub catalog_dir: PathBuf,

    /// Seconds between refreshes.
    #[arg(long, default_value_t = 2.0)]
    pub interval: f64,
}

/// Arguments for `webarena-fleet scan`.
#[derive(Parser, Debug)]
pub struct ScanArgs {
    /// Directory searched recursively for *.log files.
    #[arg(long, default_value = DEFAULT_LOG_DIR)]
    pub root: PathBuf,

    /// Substring to search for.
    #[arg(long, default_value = DEFAULT_SCAN_PATTERN)]
    pub pattern: String,

    /// Delete matching logs and their render files.
    #[arg(long)]
    pub delete: bool,

    /// Directory containing render_<id>.html files.
    #[arg(long, default_value = DEFAULT_RENDERS_DIR)]
    pub renders_dir: PathBuf,

    /// Output matches as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `webarena-fleet pending`.
#[derive(Parser, Debug)]
pub struct PendingArgs {
    /// First task index (inclusive).
    pub start_index: u64,

    /// Last task index (exclusive).
    pub end_index: u64,

    /// Result directory shared by all workers.
    pub result_dir: PathBuf,

    /// Comma-separated worker IDs, replacing the configured list.
    #[arg(long)]
    pub workers: Option<String>,

    /// Task catalog directory; tasks without a config are never run.
    #[arg(long, default_value = DEFAULT_CATALOG_DIR)]
    pub catalog_dir: PathBuf,

    /// Output the backlog as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Parse CLI arguments and return the Cli struct.
///
/// Argument errors print usage and exit with [`USAGE_EXIT_CODE`]; `--help`
/// and `--version` exit 0.
pub fn parse_cli() -> Cli {
    Cli::try_parse().unwrap_or_else(|err| {
        let code = if err.use_stderr() { USAGE_EXIT_CODE } else { 0 };
        let _ = err.print();
        std::process::exit(code);
    })
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Run(args) => run_dispatch_command(config_path, args).await,
        Commands::Plan(args) => run_plan_command(config_path, args),
        Commands::Env(args) => run_env_command(config_path, args),
        Commands::Init(args) => run_init_command(args),
        Commands::Analyze(args) => run_analyze_command(args),
        Commands::Monitor(args) => run_monitor_command(args).await,
        Commands::Scan(args) => run_scan_command(args),
        Commands::Pending(args) => run_pending_command(config_path, args),
    }
}

// ============================================================================
// Config helpers
// ============================================================================

/// Loads the fleet config and applies CLI overrides, then validates.
fn load_fleet_config(
    path: Option<&Path>,
    overrides: &FleetOverrides,
) -> anyhow::Result<FleetConfig> {
    let mut config = FleetConfig::load(path).context("Failed to load fleet config")?;

    if let Some(raw) = &overrides.workers {
        config.workers = parse_worker_list(raw);
    }
    if let Some(session) = &overrides.session {
        validate_session_name(session)?;
        config.session = session.clone();
    }
    if let Some(provider) = overrides.provider {
        config.driver.provider = provider;
    }

    config.validate()?;
    Ok(config)
}

fn build_plan(config: &FleetConfig, start: u64, end: u64) -> anyhow::Result<Plan> {
    let range = TaskRange::new(start, end)?;
    Ok(split_range(range, &config.workers)?)
}

fn print_plan(plan: &Plan) {
    println!("Tasks {} across {} worker(s):", plan.range, plan.assignments.len());
    for assignment in &plan.assignments {
        println!("  {}", assignment);
    }
}

// ============================================================================
// Command implementations
// ============================================================================

async fn run_dispatch_command(config_path: Option<&Path>, args: RunArgs) -> anyhow::Result<()> {
    let mut config = load_fleet_config(config_path, &args.fleet)?;
    if let Some(delay) = args.launch_delay {
        config.launch_delay_secs = delay;
    }

    let plan = build_plan(&config, args.start_index, args.end_index)?;
    if !config.endpoints.is_configured() {
        warn!("No benchmark endpoints configured; drivers inherit the tmux server environment");
    }

    info!(
        range = %plan.range,
        workers = plan.assignments.len(),
        session = %config.session,
        result_dir = %args.result_dir.display(),
        "Dispatching workers"
    );

    let session = config.session.clone();
    let report = if args.dry_run {
        Dispatcher::new(config, RecordingBackend::echoing())
            .dispatch(&plan, &args.result_dir, args.replace)
            .await?
    } else {
        Dispatcher::new(config, TmuxBackend::default())
            .dispatch(&plan, &args.result_dir, args.replace)
            .await?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\n🚀 WebArena Fleet");
    println!("=================");
    println!("Session:    {}", report.session);
    println!("Result dir: {}", report.result_dir.display());
    println!("Tasks:      {}", plan.range);
    println!();
    for launched in &report.launched {
        println!(
            "  {} {} -> [{}, {})",
            launched.window, launched.worker, launched.start, launched.end
        );
    }
    for worker in &report.skipped {
        println!("  (idle) {} - no tasks assigned", worker);
    }
    if !args.dry_run {
        println!("\nAttach with: tmux attach -t {}", session);
    }
    Ok(())
}

fn run_plan_command(config_path: Option<&Path>, args: PlanArgs) -> anyhow::Result<()> {
    let overrides = FleetOverrides {
        workers: args.workers,
        ..FleetOverrides::default()
    };
    let config = load_fleet_config(config_path, &overrides)?;
    let plan = build_plan(&config, args.start_index, args.end_index)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
    }
    Ok(())
}

fn run_env_command(config_path: Option<&Path>, args: EnvArgs) -> anyhow::Result<()> {
    let endpoints = match args.host {
        Some(host) => EndpointConfig::from_host(host),
        None => FleetConfig::load(config_path)?.endpoints,
    };

    if !endpoints.is_configured() {
        anyhow::bail!("No deployment host configured (pass --host, set WEBARENA_HOST, or set endpoints.host in the fleet config)");
    }

    println!("{}", render_exports(&endpoints.resolve()));
    Ok(())
}

fn run_init_command(args: InitArgs) -> anyhow::Result<()> {
    if args.output.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (pass --force to overwrite)",
            args.output.display()
        );
    }

    let mut config = FleetConfig {
        workers: parse_worker_list(&args.workers),
        ..FleetConfig::default()
    };
    config.driver.provider = args.provider;
    if let Some(host) = args.host {
        config.endpoints = EndpointConfig::from_host(host);
    }
    config.validate()?;

    write_fleet_config(&args.output, &config)?;
    println!(
        "📁 Wrote {} with {} worker(s)",
        args.output.display(),
        config.workers.len()
    );
    Ok(())
}

fn run_analyze_command(args: AnalyzeArgs) -> anyhow::Result<()> {
    let records = collect_logs(&args.log_dir)?;
    if records.is_empty() {
        anyhow::bail!("No log files found in {}", args.log_dir.display());
    }

    let catalog = TaskCatalog::new(&args.catalog_dir);
    let count = records.len();
    let summary = RunSummary::from_records(&args.log_dir, records, &catalog);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("🔍 Analyzing {} log files in {}/\n", count, args.log_dir.display());
        print!("{}", summary.render_text(args.details));
    }
    Ok(())
}

/// Shortest refresh period accepted by `monitor --interval`.
const MIN_MONITOR_INTERVAL: Duration = Duration::from_millis(1);

/// Converts `--interval` seconds into a refresh period.
fn monitor_interval(secs: f64) -> anyhow::Result<Duration> {
    let Ok(interval) = Duration::try_from_secs_f64(secs) else {
        anyhow::bail!("--interval must be a positive number of seconds, got {}", secs);
    };
    if interval < MIN_MONITOR_INTERVAL {
        anyhow::bail!(
            "--interval must be at least {}s, got {}",
            MIN_MONITOR_INTERVAL.as_secs_f64(),
            secs
        );
    }
    Ok(interval)
}

async fn run_monitor_command(args: MonitorArgs) -> anyhow::Result<()> {
    let interval = monitor_interval(args.interval)?;
    let catalog = TaskCatalog::new(&args.catalog_dir);
    let last = run_monitor(&args.log_dir, &catalog, interval).await?;

    println!("\n👋 Monitoring stopped. Final stats:\n");
    match last {
        Some(summary) => print!("{}", summary.render_text(false)),
        None => println!("No log files seen in {}", args.log_dir.display()),
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ScanOutput {
    pattern: String,
    root: PathBuf,
    matches: Vec<crate::report::ScanHit>,
    purged: Option<crate::report::PurgeOutcome>,
}

fn run_scan_command(args: ScanArgs) -> anyhow::Result<()> {
    let hits = scan_logs(&args.root, &args.pattern)?;
    let purged = args.delete.then(|| purge_hits(&hits, &args.renders_dir));

    if let Some(outcome) = &purged {
        for failure in &outcome.failures {
            warn!("{}", failure);
        }
    }

    if args.json {
        let output = ScanOutput {
            pattern: args.pattern,
            root: args.root,
            matches: hits,
            purged,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No log files contain the pattern.");
        return Ok(());
    }

    println!("Found {} log file(s) containing the pattern:\n", hits.len());
    for hit in &hits {
        match hit.task_id {
            Some(id) => println!("task {} -> {}", id, hit.path.display()),
            None => println!("{}", hit.path.display()),
        }
    }
    if let Some(outcome) = purged {
        println!(
            "\n␡ removed {} log file(s) and {} render file(s)",
            outcome.removed_logs.len(),
            outcome.removed_renders.len()
        );
    }
    Ok(())
}

fn run_pending_command(config_path: Option<&Path>, args: PendingArgs) -> anyhow::Result<()> {
    let overrides = FleetOverrides {
        workers: args.workers,
        ..FleetOverrides::default()
    };
    let config = load_fleet_config(config_path, &overrides)?;
    let plan = build_plan(&config, args.start_index, args.end_index)?;
    let catalog = TaskCatalog::new(&args.catalog_dir);
    let report = pending_for_plan(&plan, &args.result_dir, &catalog)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Tasks {}: {} finished, {} pending ({})",
        report.range,
        report.total_finished,
        report.total_pending,
        report.result_dir.display()
    );
    for backlog in &report.workers {
        println!(
            "  worker {} ({}) [{}, {}): {} finished, {} pending{}",
            backlog.index + 1,
            backlog.worker,
            backlog.start,
            backlog.end,
            backlog.finished,
            backlog.pending.len(),
            if backlog.missing_config > 0 {
                format!(", {} without config", backlog.missing_config)
            } else {
                String::new()
            }
        );
        if !backlog.pending.is_empty() {
            let ids: Vec<String> = backlog.pending.iter().map(u64::to_string).collect();
            println!("    {}", ids.join(" "));
        }
    }
    Ok(())
}

/// Serializes `config` as YAML to `path`.
pub fn write_fleet_config(path: &Path, config: &FleetConfig) -> anyhow::Result<()> {
    let yaml = serde_yaml::to_string(config).context("Failed to serialize fleet config")?;
    fs::write(path, yaml).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
