// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

use submine::app_config::{self, Config};
use submine::bridge::{HttpPoster, ReqwestPoster};
use submine::mining::PlaybackAdapter;
use submine::simulation::{
    HeadlessPresentation, HeadlessSurfaceFactory, JsonLinesExport, SimulatedCapture, SimulatedPlayback,
    SurfaceBehavior,
};
use submine::subtitle_processor::{format_timestamp, load_srt_file};
use submine::timing::{TimingEngine, TimingOptions};
use submine::{BulkExportMessage, Collaborators, MiningController, ViewerIntent};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Configuration file path
    #[arg(short, long, env = "SUBMINE_CONFIG")]
    config_path: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Subtitle offset in ms applied after loading
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    offset: i64,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print what is showing at a given instant
    Snapshot {
        /// Subtitle file (SRT)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Playback position in ms
        #[arg(long)]
        at: i64,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Export every non-empty line over simulated playback
    Bulk {
        /// Subtitle file (SRT)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Write mining events to this JSON lines file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Start from the line playing at this position, in ms
        #[arg(long, default_value_t = 0)]
        from: i64,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Generate shell completions for submine
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// submine - subtitle mining for language learners
///
/// Inspects subtitle timing and runs unattended card exports over a
/// simulated player.
#[derive(Parser, Debug)]
#[command(name = "submine")]
#[command(version)]
#[command(about = "Subtitle timing and card mining tool")]
#[command(long_about = "submine tracks which subtitle line is showing and mines lines into flashcard events.

EXAMPLES:
    submine snapshot movie.srt --at 61500       # What is showing at 1:01.500
    submine bulk movie.srt -o cards.jsonl       # Export every line
    submine bulk movie.srt --from 600000        # Export from the 10 minute mark
    submine completions bash > submine.bash     # Generate bash completions

CONFIGURATION:
    Configuration is read from conf.json in the working directory when present,
    otherwise from the user configuration directory. A default one is created
    when missing.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

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

    // @returns: Colour and emoji for log level
    fn decoration(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "❌ "),
            Level::Warn => ("\x1B[1;33m", "🚧 "),
            Level::Info => ("\x1B[1;32m", " "),
            Level::Debug => ("\x1B[1;36m", "🔍 "),
            Level::Trace => ("\x1B[1;35m", "📋 "),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (colour, emoji) = Self::decoration(record.level());
            let _ = writeln!(std::io::stderr(), "{}{} {} {}\x1B[0m", colour, now, emoji, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn main() -> Result<()> {
    // The logger starts at trace; the effective level is set once the
    // config is known
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "submine", &mut std::io::stdout());
            Ok(())
        }
        Commands::Snapshot { file, at, common } => {
            let config = load_config(&common)?;
            run_snapshot(&config, &file, at, common.offset)
        }
        Commands::Bulk {
            file,
            output,
            from,
            common,
        } => {
            let config = load_config(&common)?;
            // Simulated playback follows the tokio clock; pausing it lets the
            // run finish as fast as the pipeline allows
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .start_paused(true)
                .build()
                .context("Failed to start the runtime")?;
            runtime.block_on(run_bulk(config, file, output, from, common.offset))
        }
    }
}

fn default_config_path() -> PathBuf {
    let local = PathBuf::from("conf.json");
    if local.exists() {
        return local;
    }
    dirs::config_dir()
        .map(|dir| dir.join("submine").join("conf.json"))
        .unwrap_or(local)
}

fn load_config(options: &CommonArgs) -> Result<Config> {
    if let Some(level) = &options.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let path = options.config_path.clone().unwrap_or_else(default_config_path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    let mut config = Config::load_or_create(&path)?;
    if let Some(level) = &options.log_level {
        config.log_level = level.clone().into();
    }
    config.validate().context("Configuration validation failed")?;

    log::set_max_level(config.log_level.to_level_filter());
    debug!("Using config at {}", path.display());
    Ok(config)
}

fn run_snapshot(config: &Config, file: &Path, at: i64, offset: i64) -> Result<()> {
    let mut engine = TimingEngine::new(TimingOptions::from(&config.timing));
    engine.set_subtitles(load_srt_file(file, 0)?);
    engine.set_offset(offset);

    let tick = engine.at(at);
    let current = engine.current_subtitle(at).map(|(subtitle, surrounding)| {
        serde_json::json!({
            "subtitle": subtitle,
            "surroundingSubtitles": surrounding,
        })
    });
    let output = serde_json::json!({
        "timestamp": format_timestamp(at),
        "showing": tick.snapshot.showing,
        "lastShown": tick.snapshot.last_shown,
        "nextToShow": tick.snapshot.next_to_show,
        "current": current,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn progress_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} lines ({percent}%) {msg}")
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style.progress_chars("█▓▒░"));
    bar
}

async fn run_bulk(config: Config, file: PathBuf, output: Option<PathBuf>, from: i64, offset: i64) -> Result<()> {
    let subtitles = load_srt_file(&file, 0)?;

    let writer: Box<dyn Write + Send> = match &output {
        Some(path) => Box::new(
            std::fs::File::create(path).with_context(|| format!("Failed to create output file: {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout()),
    };

    let (ack_tx, ack_rx) = mpsc::unbounded_channel();
    let playback = Arc::new(SimulatedPlayback::new());
    let export = Arc::new(JsonLinesExport::new(ack_tx).with_writer(writer));
    let poster: Arc<dyn HttpPoster> = Arc::new(ReqwestPoster::new(
        std::time::Duration::from_secs(config.bridge.http_timeout_secs),
    )?);

    let collaborators = Collaborators {
        playback: playback.clone(),
        capture: Arc::new(SimulatedCapture::working()),
        export: export.clone(),
        presentation: Arc::new(HeadlessPresentation::new()),
        surfaces: Arc::new(HeadlessSurfaceFactory::new(SurfaceBehavior::Passive)),
        poster: Some(poster),
    };

    let (mut controller, handle, mut announcements) = MiningController::new(&config, collaborators, ack_rx)?;
    controller.load_subtitles(subtitles);
    if offset != 0 {
        controller.handle_intent(ViewerIntent::Offset(offset)).await;
    }
    playback.seek(from).await?;

    controller.handle_intent(ViewerIntent::StartBulk).await;
    if !controller.scheduler().is_running() {
        warn!("Nothing to export from {}", format_timestamp(from));
        return Ok(());
    }

    let progress_handle = handle.clone();
    let progress = tokio::spawn(async move {
        let mut bar: Option<ProgressBar> = None;
        while let Some(message) = announcements.recv().await {
            match message {
                BulkExportMessage::Started { total } => bar = Some(progress_bar(total)),
                BulkExportMessage::Progress { current, total } => {
                    if let Some(bar) = &bar {
                        bar.set_position(current as u64);
                        bar.set_message(format!("{} left", total.saturating_sub(current)));
                    }
                }
                BulkExportMessage::Cancelled | BulkExportMessage::Completed => {
                    if let Some(bar) = &bar {
                        let outcome = if message == BulkExportMessage::Completed { "done" } else { "cancelled" };
                        bar.finish_with_message(outcome);
                    }
                    let _ = progress_handle.send(ViewerIntent::Shutdown);
                    return message == BulkExportMessage::Completed;
                }
            }
        }
        false
    });

    let cancel_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Cancelling bulk export");
            let _ = cancel_handle.send(ViewerIntent::CancelBulk);
        }
    });

    controller.run().await?;

    let completed = progress.await.map_err(|e| anyhow!("Progress reporting failed: {}", e))?;
    let exported = export.forwarded().len();
    if completed {
        info!("Exported {} line(s)", exported);
    } else {
        warn!("Bulk export stopped after {} line(s)", exported);
    }
    Ok(())
}
