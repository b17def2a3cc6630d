//! Configuration management for the model linter.
//!
//! Handles:
//! - Command-line argument parsing
//! - Schema location and output settings

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::executor::DEFAULT_TIMEOUT;

/// Default quiet period before a watched file is re-validated
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// How results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Command-line arguments for the linter
#[derive(Debug, Parser)]
#[command(name = "kalix-lint")]
#[command(about = "Linter for Kalix model files")]
#[command(version)]
pub struct Args {
    /// Model file to validate
    pub file: PathBuf,

    /// Schema file overriding the user and built-in schemas
    #[arg(long, help = "Path to a schema TOML file")]
    pub schema: Option<PathBuf>,

    /// Directory input file paths are resolved against
    #[arg(long, help = "Base directory for input files (defaults to the model's directory)")]
    pub base_dir: Option<PathBuf>,

    /// Keep running and re-validate on every change
    #[arg(long)]
    pub watch: bool,

    #[arg(long, default_value_t = 300, help = "Debounce delay in watch mode (ms)")]
    pub debounce_ms: u64,

    #[arg(long, default_value_t = 5000, help = "Validation timeout (ms)")]
    pub timeout_ms: u64,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Log level for the linter
    #[arg(
        long,
        default_value = "info",
        help = "Log level (trace, debug, info, warn, error)"
    )]
    pub log_level: String,
}

/// Resolved run configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub model_path: PathBuf,
    /// Schema file set on the command line
    pub schema_path: Option<PathBuf>,
    pub base_dir: Option<PathBuf>,
    pub watch: bool,
    pub debounce: Duration,
    pub timeout: Duration,
    pub format: OutputFormat,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: PathBuf::new(),
            schema_path: None,
            base_dir: None,
            watch: false,
            debounce: DEFAULT_DEBOUNCE,
            timeout: DEFAULT_TIMEOUT,
            format: OutputFormat::Text,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Create configuration from command-line arguments
    pub fn from_args_and_env() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    /// Create configuration from explicit arguments (useful for testing)
    pub fn from_args(args: Args) -> Result<Self> {
        if args.timeout_ms == 0 {
            bail!("--timeout-ms must be greater than zero");
        }

        let base_dir = args
            .base_dir
            .or_else(|| model_dir(&args.file).map(Path::to_path_buf));

        Ok(Config {
            model_path: args.file,
            schema_path: args.schema,
            base_dir,
            watch: args.watch,
            debounce: Duration::from_millis(args.debounce_ms),
            timeout: Duration::from_millis(args.timeout_ms),
            format: args.format,
            log_level: args.log_level,
        })
    }
}

fn model_dir(file: &Path) -> Option<&Path> {
    match file.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Some(Path::new(".")),
        other => other,
    }
}
