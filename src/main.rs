// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{error, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use legenda::app_config::{self, Config, TargetLanguage};
use legenda::app_controller::{Controller, EventOutput, TranslateOptions};
use legenda::errors::AppError;

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

/// Options shared by every command that talks to the service
#[derive(Args, Debug)]
struct CommonArgs {
    /// Gemini API key
    #[arg(short = 'k', long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Configuration file path
    #[arg(short, long, default_value = "legenda.json")]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Target language, overriding the configuration file (pt-BR)
    #[arg(short, long)]
    target_language: Option<TargetLanguage>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a SubRip file into Brazilian Portuguese
    Translate {
        /// Subtitle file to translate
        #[arg(value_name = "FILE")]
        input_file: PathBuf,

        /// Output file (defaults to <stem>.pt-BR.srt next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Force overwrite of existing output files
        #[arg(short, long)]
        force_overwrite: bool,

        /// Print events as JSON lines on stdout instead of a progress bar
        #[arg(long)]
        json_events: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Check that an API key is accepted by the service
    ValidateKey {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Generate shell completions for legenda
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// legenda - batch subtitle translation with Gemini
///
/// Splits a SubRip file into token-bounded batches, translates them with
/// retries and quota handling, and writes a fully aligned translation.
#[derive(Parser, Debug)]
#[command(name = "legenda")]
#[command(version)]
#[command(about = "Batch subtitle translation with Gemini")]
#[command(long_about = "legenda translates SubRip subtitles into Brazilian Portuguese with the Gemini API.

EXAMPLES:
    legenda translate movie.srt                    # Writes movie.pt-BR.srt
    legenda translate -f movie.srt                 # Overwrite an existing translation
    legenda translate --json-events movie.srt      # Machine readable progress on stdout
    legenda validate-key                           # Check GEMINI_API_KEY
    legenda completions bash > legenda.bash        # Generate bash completions

CONFIGURATION:
    Configuration is stored in legenda.json by default. If the file doesn't exist,
    a default one is created. The API key is read from --api-key or GEMINI_API_KEY
    and is never written to disk.

EXIT STATUS:
    0 success, 2 API key rejected, 3 quota exhausted, 1 any other failure")]
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

    // @initializes: Global logger, the level is capped later with log::set_max_level
    fn init() -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger::new(LevelFilter::Trace)))?;
        log::set_max_level(LevelFilter::Info);
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
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:<5} {}\x1B[0m",
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
async fn main() -> ExitCode {
    if let Err(e) = CustomLogger::init() {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let cli = CommandLineOptions::parse();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

async fn run(command: Commands) -> Result<(), AppError> {
    match command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "legenda", &mut std::io::stdout());
            Ok(())
        }
        Commands::ValidateKey { common } => {
            let controller = Controller::with_config(load_config(&common)?)?;
            controller.validate_key(&common.api_key).await
        }
        Commands::Translate {
            input_file,
            output,
            force_overwrite,
            json_events,
            common,
        } => {
            let controller = Controller::with_config(load_config(&common)?)?;
            let options = TranslateOptions {
                output_file: output,
                force_overwrite,
                output: if json_events {
                    EventOutput::JsonLines
                } else {
                    EventOutput::ProgressBar
                },
                ..TranslateOptions::new(input_file)
            };
            controller.run(&options, &common.api_key).await.map(|_| ())
        }
    }
}

// Load the config file, apply the command line log level and validate
fn load_config(common: &CommonArgs) -> Result<Config, AppError> {
    if let Some(level) = &common.log_level {
        log::set_max_level(app_config::LogLevel::from(level.clone()).to_level_filter());
    }

    let mut config = Config::load_or_create(&common.config_path)
        .map_err(|e| AppError::Config(format!("{:#}", e)))?;

    match &common.log_level {
        Some(level) => config.log_level = level.clone().into(),
        None => log::set_max_level(config.log_level.to_level_filter()),
    }
    if let Some(language) = common.target_language {
        config.target_language = language;
    }

    config
        .validate()
        .map_err(|e| AppError::Config(format!("{:#}", e)))?;
    Ok(config)
}
