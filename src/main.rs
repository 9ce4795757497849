// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::time::Duration;

use subrelay::app_config::{self, Config};
use subrelay::app_controller::{Controller, SubtitleRequest};

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

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve a subtitle for a title, queueing a translation when needed
    Resolve(ResolveArgs),

    /// Show the stored record for a title and language
    Status(RequestArgs),

    /// Show record and file counts
    Stats,

    /// Generate shell completions for subrelay
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct RequestArgs {
    /// Title id: `tt0111161` for a movie, `tt0944947:1:1` for an episode
    #[arg(value_name = "MEDIA_ID")]
    media_id: String,

    /// Target language code (e.g. 'fr', 'fre', 'fra')
    #[arg(value_name = "LANGUAGE")]
    language: String,

    /// Translation provider, the configured one when omitted
    #[arg(short, long)]
    provider: Option<String>,

    /// API key for the provider
    #[arg(short = 'k', long, env = "SUBRELAY_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Provider base URL
    #[arg(short, long)]
    base_url: Option<String>,

    /// Model name for chat-based providers
    #[arg(short, long)]
    model: Option<String>,

    /// TMDB API key, used for episodic lookups
    #[arg(long, env = "SUBRELAY_TMDB_KEY", hide_env_values = true)]
    tmdb_key: Option<String>,
}

impl RequestArgs {
    fn to_request(&self) -> SubtitleRequest {
        SubtitleRequest {
            provider: self.provider.clone(),
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            tmdb_api_key: self.tmdb_key.clone(),
            ..SubtitleRequest::new(&self.media_id, &self.language)
        }
    }
}

#[derive(Args, Debug)]
struct ResolveArgs {
    #[command(flatten)]
    request: RequestArgs,

    /// Exit as soon as the outcome is printed. Workers stop with the
    /// process, so a queued translation is dropped and its placeholder is
    /// cleared by the next request.
    #[arg(long)]
    no_wait: bool,
}

/// SubRelay - subtitle resolution and translation relay
#[derive(Parser, Debug)]
#[command(name = "subrelay")]
#[command(version)]
#[command(about = "Finds subtitles for a title and translates them when none exist in your language")]
#[command(long_about = "SubRelay looks for a subtitle in the requested language across several \
upstream sources. When only another language is available it queues a translation, answers \
with a placeholder URL right away and stores the finished subtitle for later requests.

EXAMPLES:
    subrelay resolve tt0111161 fr                      # Movie, French
    subrelay resolve tt0944947:1:1 de                  # Episode, waits for the translation
    subrelay resolve tt0944947:1:1 de --no-wait        # Print the placeholder and exit
    subrelay resolve tt0111161 es -p openai -k sk-...  # Pick the provider per request
    subrelay status tt0111161 fr                       # Stored record
    subrelay stats                                     # Record and file counts
    subrelay completions bash > subrelay.bash          # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    google-translate - Google Translate web endpoint (default, no key)
    openai, gemini, openrouter, groq, together - OpenAI-style chat APIs (API key)
    anthropic        - Anthropic Claude API (API key)
    custom           - Any OpenAI-compatible server (--base-url)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
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

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
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
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Max level is tightened once the config is loaded
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "subrelay", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli)?;
    log::set_max_level(config.log_level.to_level_filter());

    let controller = Controller::with_config(config).context("Failed to start controller")?;

    match cli.command {
        Commands::Resolve(args) => run_resolve(&controller, args).await,
        Commands::Status(args) => run_status(&controller, &args).await,
        Commands::Stats => run_stats(&controller).await,
        Commands::Completions { .. } => Ok(()),
    }
}

fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let (mut config, created) = Config::load_or_create(&cli.config_path)?;
    if created {
        warn!("Config file not found at '{}', created a default one.", cli.config_path);
    }

    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

async fn run_resolve(controller: &Controller, args: ResolveArgs) -> Result<()> {
    let request = args.request.to_request();
    let outcome = controller.handle_request(&request).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if args.no_wait || controller.pipeline().in_flight().is_empty() {
        return Ok(());
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Waiting for translation");
    spinner.enable_steady_tick(Duration::from_millis(120));

    controller.drain().await;
    spinner.finish_and_clear();

    match controller.status(&request).await? {
        Some(record) => {
            info!("Translation settled as {}", record.state);
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        None => warn!("No record left for {} after waiting", request.media_id),
    }

    Ok(())
}

async fn run_status(controller: &Controller, args: &RequestArgs) -> Result<()> {
    match controller.status(&args.to_request()).await? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => println!("No record for {} ({})", args.media_id, args.language),
    }
    Ok(())
}

async fn run_stats(controller: &Controller) -> Result<()> {
    let records = controller.stats().await?;
    let files = controller.store().scan_files();
    println!("Records: {}", records);
    println!("Files under {}: {}", controller.store().root().display(), files);
    Ok(())
}
