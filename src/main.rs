// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use negbatch::app_config::{Config, LogLevel, Precision};
use negbatch::app_controller::Controller;
use negbatch::corpus::PartitionOutcome;
use negbatch::errors::exit_code;
use negbatch::file_utils::FileManager;
use negbatch::pipeline::StageKind;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Partition the corpus and process every pending batch (default command)
    Run,

    /// Only generate batch artifacts and ledger rows
    Partition,

    /// Print the ledger summary
    Status,

    /// Generate shell completions for negbatch
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct PipelineArgs {
    /// Process batches concurrently
    #[arg(long, global = true)]
    parallel: bool,

    /// Upper bound on concurrent workers in parallel mode
    #[arg(long, global = true)]
    max_workers: Option<usize>,

    /// Sentences per batch
    #[arg(short, long, global = true)]
    batch_size: Option<usize>,

    /// Limit the number of batches generated and processed
    #[arg(long, global = true)]
    max_batches: Option<usize>,

    /// Delete every artifact and ledger row, then partition again
    #[arg(short, long, global = true)]
    force_rebuild: bool,

    /// Stop each batch after this stage
    #[arg(long, value_enum, global = true)]
    stop_after: Option<StageKind>,

    /// Sentences per translation request
    #[arg(long, global = true)]
    sub_batch_size: Option<usize>,

    /// Request half precision inference (needs an accelerator)
    #[arg(long, global = true)]
    half_precision: bool,

    /// Memory usage alert threshold, in percent
    #[arg(long, global = true)]
    alert_memory: Option<u8>,

    /// Accelerator memory alert threshold, in percent
    #[arg(long, global = true)]
    alert_accelerator: Option<u8>,

    /// Per-batch duration alert threshold, in seconds
    #[arg(long, global = true)]
    alert_time: Option<f64>,

    /// Check resources every N translation sub-batches
    #[arg(long, global = true)]
    monitoring_frequency: Option<usize>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    /// Echo sentences instead of calling the translation service
    #[arg(long, global = true)]
    dry_run: bool,
}

impl PipelineArgs {
    /// Apply command line overrides on top of the loaded configuration
    fn apply_to(&self, config: &mut Config) {
        if self.parallel {
            config.scheduler.parallel = true;
        }
        if let Some(max_workers) = self.max_workers {
            config.scheduler.max_workers = Some(max_workers);
        }
        if let Some(batch_size) = self.batch_size {
            config.partition.batch_size = batch_size;
        }
        if let Some(max_batches) = self.max_batches {
            config.partition.max_batches = Some(max_batches);
        }
        if let Some(stage) = self.stop_after {
            config.scheduler.stop_after = Some(stage);
        }
        if let Some(sub_batch_size) = self.sub_batch_size {
            config.translation.sub_batch_size = sub_batch_size;
        }
        if self.half_precision {
            config.translation.precision = Precision::Half;
        }
        if let Some(percent) = self.alert_memory {
            config.monitoring.alert_memory_percent = percent;
        }
        if let Some(percent) = self.alert_accelerator {
            config.monitoring.alert_accelerator_percent = percent;
        }
        if let Some(secs) = self.alert_time {
            config.monitoring.alert_unit_secs = secs;
        }
        if let Some(frequency) = self.monitoring_frequency {
            config.monitoring.frequency = frequency;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone().into();
        }
    }
}

/// NEGBATCH - negation-annotated corpus batches for translation
///
/// Splits a sentence corpus into fixed-size batches, annotates each sentence
/// with negation cues and scope, and drives every batch through a staged
/// translation pipeline tracked in a persistent ledger.
#[derive(Parser, Debug)]
#[command(name = "negbatch")]
#[command(version)]
#[command(about = "Negation-aware batch translation pipeline")]
#[command(long_about = "negbatch partitions a corpus into batches, annotates negation, and translates each batch.

EXAMPLES:
    negbatch                                  # Partition if needed, then process pending batches
    negbatch --parallel --max-workers 4       # Process batches concurrently
    negbatch -b 500 --force-rebuild           # Re-partition with 500 sentences per batch
    negbatch --stop-after normalize           # Only run the normalize stage
    negbatch --dry-run                        # Echo translations, no service needed
    negbatch status                           # Show the ledger summary
    negbatch completions bash > negbatch.bash # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the file does not
    exist, a default one is created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

// Log file shared by the logger; attached once the config names its directory
static LOG_FILE: Lazy<Mutex<Option<File>>> = Lazy::new(|| Mutex::new(None));

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    /// Start copying every record to `{logs_dir}/pipeline_{timestamp}.log`
    fn attach_file(logs_dir: &Path) -> Result<()> {
        FileManager::ensure_dir(logs_dir)?;
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = logs_dir.join(format!("pipeline_{}.log", stamp));
        let file = File::create(&path)
            .with_context(|| format!("Failed to create log file: {:?}", path))?;

        *LOG_FILE.lock() = Some(file);
        info!("Logging to {:?}", path);
        Ok(())
    }

    // @returns: ANSI colour for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let now = chrono::Local::now().format("%H:%M:%S.%3f");
        let color = Self::color_for_level(record.level());
        let _ = writeln!(
            std::io::stderr(),
            "{}{} {:<5} {}\x1B[0m",
            color,
            now,
            record.level(),
            record.args()
        );

        if let Some(file) = LOG_FILE.lock().as_mut() {
            let _ = writeln!(
                file,
                "{} {:<5} [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
        if let Some(file) = LOG_FILE.lock().as_mut() {
            let _ = file.flush();
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // The logger accepts everything; the effective level is set via max_level
    if CustomLogger::init(LevelFilter::Trace).is_err() {
        eprintln!("Failed to install logger");
        return ExitCode::FAILURE;
    }
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "negbatch", &mut std::io::stdout());
        return ExitCode::SUCCESS;
    }

    match run_command(cli.command.unwrap_or(Commands::Run), cli.pipeline).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = exit_code(&e);
            if code == 2 {
                error!("Fatal: {:#}", e);
            } else {
                error!("Run failed: {:#}", e);
            }
            log::logger().flush();
            ExitCode::from(code)
        }
    }
}

async fn run_command(command: Commands, options: PipelineArgs) -> Result<()> {
    if let Some(level) = &options.log_level {
        let level: LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(&options.config_path)?;
    options.apply_to(&mut config);
    config.validate().context("Configuration validation failed")?;
    log::set_max_level(config.log_level.to_level_filter());

    CustomLogger::attach_file(&config.paths.logs_dir)?;

    let controller = Controller::with_config(config, options.dry_run)?;

    match command {
        Commands::Partition => match controller.partition(options.force_rebuild).await? {
            PartitionOutcome::Generated(batches) => {
                info!("Generated {} batches", batches.len());
            }
            PartitionOutcome::AlreadyPresent { artifacts } => {
                info!(
                    "{} batch artifacts already present; use --force-rebuild to regenerate",
                    artifacts
                );
            }
        },
        Commands::Status => {
            let report = controller.status().await?;
            print!("{}", report);
        }
        Commands::Run => {
            let summary = controller.run(options.force_rebuild).await?;
            info!("{}", summary);
        }
        Commands::Completions { .. } => {}
    }

    log::logger().flush();
    Ok(())
}
