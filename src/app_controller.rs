use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::app_config::Config;
use crate::errors::AppError;
use crate::file_utils::FileManager;
use crate::translation::{CredentialCheck, ProgressKind, RunEvent, RunHandle, TranslationService};

// @module: Application controller for subtitle translation

/// How run events are shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutput {
    /// Progress bar on stderr
    ProgressBar,
    /// One JSON object per event on stdout
    JsonLines,
    /// Nothing but logs
    Silent,
}

/// Options for translating one file
#[derive(Debug, Clone)]
pub struct TranslateOptions {
    // @field: SubRip file to translate
    pub input_file: PathBuf,

    // @field: Explicit output path, derived from the input when absent
    pub output_file: Option<PathBuf>,

    // @field: Replace an existing output file
    pub force_overwrite: bool,

    // @field: Event rendering
    pub output: EventOutput,
}

impl TranslateOptions {
    pub fn new<P: AsRef<Path>>(input_file: P) -> Self {
        Self {
            input_file: input_file.as_ref().to_path_buf(),
            output_file: None,
            force_overwrite: false,
            output: EventOutput::ProgressBar,
        }
    }
}

/// Main application controller for subtitle translation
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Translation core
    service: TranslationService,
}

impl Controller {
    // @method: Create a controller talking to the configured service
    pub fn with_config(config: Config) -> anyhow::Result<Self> {
        let service = TranslationService::new(config.clone())?;
        Ok(Self { config, service })
    }

    // @method: Create a controller around an existing service
    pub fn with_service(service: TranslationService) -> Self {
        Self {
            config: service.config().clone(),
            service,
        }
    }

    pub fn service(&self) -> &TranslationService {
        &self.service
    }

    /// Where the translation of `options.input_file` is written
    pub fn output_path(&self, options: &TranslateOptions) -> PathBuf {
        options.output_file.clone().unwrap_or_else(|| {
            let dir = options.input_file.parent().unwrap_or_else(|| Path::new("."));
            FileManager::generate_output_path(&options.input_file, dir, self.config.target_language.code())
        })
    }

    /// Translate one file and write the result.
    ///
    /// Returns the path written. The output is only written when the run
    /// completes; an aborted run leaves the file system untouched.
    pub async fn run(&self, options: &TranslateOptions, api_key: &str) -> Result<PathBuf, AppError> {
        let output_path = self.output_path(options);
        if output_path.exists() && !options.force_overwrite {
            return Err(AppError::File(format!(
                "Output file already exists: {}. Use -f to force overwrite.",
                output_path.display()
            )));
        }

        let content = FileManager::read_subtitle(&options.input_file)?;
        info!("Translating {} into {}", options.input_file.display(), self.config.target_language.display_name());

        let RunHandle { task, mut events } =
            self.service
                .spawn_translation(&content, api_key, Some(options.input_file.as_path()))?;

        let progress_bar = match options.output {
            EventOutput::ProgressBar => Some(Self::progress_bar()),
            _ => None,
        };

        let mut document = None;
        while let Some(event) = events.recv().await {
            if options.output == EventOutput::JsonLines {
                Self::print_json_line(&event)?;
            }
            if let Some(pb) = &progress_bar {
                Self::render_event(pb, &event);
            }
            if let RunEvent::Result { document: rendered, .. } = event {
                document = Some(rendered);
            }
        }

        let output = task
            .await
            .map_err(|e| AppError::Unknown(format!("Translation task failed: {}", e)))?;
        if let Some(pb) = &progress_bar {
            if output.is_err() {
                pb.abandon();
            }
        }
        let output = output?;

        let document = document.unwrap_or(output.document);
        FileManager::write_to_file(&output_path, &document)?;
        info!("Success: {}", output_path.display());
        Ok(output_path)
    }

    /// Check a credential against the service
    pub async fn validate_key(&self, api_key: &str) -> Result<(), AppError> {
        match self.service.validate_credentials(api_key).await {
            CredentialCheck::Valid => {
                info!("API key is valid");
                Ok(())
            }
            CredentialCheck::Rejected { message } => {
                error!("API key rejected: {}", message);
                Err(crate::errors::TranslationError::Auth { message }.into())
            }
            CredentialCheck::Unavailable { message } => {
                warn!("Could not validate the API key: {}", message);
                Err(AppError::Unknown(message))
            }
        }
    }

    fn progress_bar() -> ProgressBar {
        let progress_bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} segments ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar
    }

    fn render_event(progress_bar: &ProgressBar, event: &RunEvent) {
        let Some(progress) = event.progress() else {
            return;
        };
        progress_bar.set_length(progress.total_count as u64);
        progress_bar.set_position(progress.translated_count as u64);

        match progress.kind {
            ProgressKind::Progress => {
                if let (Some(index), Some(total)) = (progress.chunk_index, progress.chunk_total) {
                    progress_bar.set_message(format!("chunk {}/{}", index, total));
                }
            }
            ProgressKind::QuotaWait | ProgressKind::QuotaResume => {
                progress_bar.set_message(progress.message.clone());
            }
            ProgressKind::Complete => progress_bar.finish_and_clear(),
            ProgressKind::Error => progress_bar.abandon_with_message(progress.message.clone()),
        }
    }

    fn print_json_line(event: &RunEvent) -> Result<(), AppError> {
        let line = event.to_json_line().context("Failed to serialize event")?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", line)?;
        stdout.flush()?;
        Ok(())
    }
}
