use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::{LevelFilter, info};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use hetsched::domain::{Task, TaskFactory};
use hetsched::generator::TaskGenerator;
use hetsched::report;
use hetsched::scheduler::Scheduler;

mod cli;
mod config;

use cli::Cli;
use cli::commands::{Commands, RunArgs};
use config::Config;

fn setup_logging(level: LevelFilter) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hetsched")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("hetsched.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let rust_log = std::env::var("RUST_LOG").ok();
    log_builder(level, rust_log.as_deref())
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized at {}, writing to: {}", level, log_file.display());
    Ok(())
}

/// Logger filtered at `level`, with `RUST_LOG` directives layered on top when set.
fn log_builder(level: LevelFilter, rust_log: Option<&str>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if let Some(filters) = rust_log {
        builder.parse_filters(filters);
    }
    builder
}

/// `--verbose` raises the level to debug; otherwise the config's level, default info.
fn effective_level(verbose: bool, config: &Config) -> LevelFilter {
    let configured = config.level_filter().unwrap_or(LevelFilter::Info);
    if verbose { configured.max(LevelFilter::Debug) } else { configured }
}

fn run_application(cli: &Cli, config: Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled, logging at debug".yellow());
    }

    match &cli.command {
        None => handle_run_command(&RunArgs::default(), config),
        Some(Commands::Run(args)) => handle_run_command(args, config),
        Some(Commands::Config) => handle_config_command(&config),
    }
}

fn handle_run_command(args: &RunArgs, mut config: Config) -> Result<()> {
    config.apply_overrides(args);
    info!("Running simulation: {:?}", config);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    let tasks = runtime.block_on(simulate(&config))?;

    if args.json {
        println!("{}", report::to_json(&tasks)?);
        return Ok(());
    }

    print!("{}", report::render_table(&tasks));
    println!();
    for (destination, count) in report::summary(&tasks) {
        let label = format!("{:<16}", destination);
        let label = if destination.contains("full") { label.yellow() } else { label.green() };
        println!("  {} {}", label, count);
    }
    println!(
        "{} {} of {} tasks routed",
        "Done:".green(),
        tasks.len(),
        config.generator.tasks
    );
    Ok(())
}

async fn simulate(config: &Config) -> Result<Vec<Arc<Task>>> {
    let scheduler =
        Scheduler::new(config.scheduler.to_scheduler_config()).context("Invalid scheduler configuration")?;

    let factory = match config.generator.seed {
        Some(seed) => TaskFactory::seeded(seed),
        None => TaskFactory::from_entropy(),
    }
    .with_max_intensity(config.generator.max_intensity)
    .context("Invalid generator configuration")?;
    let mut generator = TaskGenerator::new(factory).with_max_interarrival_ms(config.generator.max_interarrival_ms);

    let cancel = CancellationToken::new();
    scheduler.start(cancel.clone()).context("Failed to start scheduler")?;

    let submitted = generator
        .submit_all(&scheduler, config.generator.tasks, &cancel)
        .await;
    info!("Submitted {} tasks", submitted);

    cancel.cancel();
    scheduler.wait().await;

    if scheduler.pending() > 0 {
        log::warn!("{} tasks were still pending at shutdown", scheduler.pending());
    }
    Ok(scheduler.tasks())
}

fn handle_config_command(config: &Config) -> Result<()> {
    info!("Printing effective config");
    let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
    print!("{}", yaml);
    Ok(())
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration; it decides the log level
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(effective_level(cli.is_verbose(), &config)).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, config).context("Application failed")?;

    Ok(())
}
