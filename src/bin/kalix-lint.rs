use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use notify::{Config as WatchConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use kalix_lint::config::{Config, OutputFormat};
use kalix_lint::executor::{ExecutorConfig, ValidationCallback, ValidationExecutor};
use kalix_lint::report;
use kalix_lint::{Linter, Schema, ValidationResult};

/// Prints each delivered result
struct PrintResult {
    path: PathBuf,
    format: OutputFormat,
}

impl ValidationCallback for PrintResult {
    fn on_completed(&mut self, result: ValidationResult) {
        match report::render(&self.path, &result, self.format) {
            Ok(out) => print!("{}", out),
            Err(e) => error!("failed to render results: {:#}", e),
        }
    }

    fn on_cancelled(&mut self) {
        debug!("validation of {} superseded", self.path.display());
    }

    fn on_error(&mut self, error: anyhow::Error) {
        error!("validation of {} failed: {:#}", self.path.display(), error);
    }
}

fn read_model(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read model file: {}", path.display()))
}

fn run_once(config: &Config, linter: &Linter) -> Result<ExitCode> {
    let content = read_model(&config.model_path)?;
    let result = linter.validate(&content, config.base_dir.as_deref());
    print!("{}", report::render(&config.model_path, &result, config.format)?);

    Ok(if result.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn watch(config: &Config, linter: Arc<Linter>) -> Result<ExitCode> {
    let (executor, deliveries) =
        ValidationExecutor::new(ExecutorConfig::with_timeout(config.timeout))?;

    let submit = |delay: Duration| -> Result<()> {
        let content = read_model(&config.model_path)?;
        let linter = Arc::clone(&linter);
        let base_dir = config.base_dir.clone();
        executor.submit_validation_with_debounce(
            content,
            move |content: &str| -> Result<ValidationResult> {
                Ok(linter.validate(content, base_dir.as_deref()))
            },
            PrintResult {
                path: config.model_path.clone(),
                format: config.format,
            },
            delay,
        );
        Ok(())
    };

    let (tx, rx) = mpsc::channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| {
            let _ = tx.send(res);
        },
        WatchConfig::default().with_poll_interval(Duration::from_secs(1)),
    )?;

    // Editors often replace the file, so watch its directory
    let target = config
        .model_path
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", config.model_path.display()))?;
    let dir = target.parent().unwrap_or(Path::new("."));
    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    info!("watching {} for changes", target.display());

    submit(Duration::ZERO)?;

    loop {
        match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(Ok(event)) => {
                let relevant = matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
                    && event.paths.iter().any(|p| p == &target);
                if relevant && let Err(e) = submit(config.debounce) {
                    warn!("{:#}", e);
                }
            }
            Ok(Err(e)) => warn!("watch error: {}", e),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
        deliveries.dispatch_pending();
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    let config = Config::from_args_and_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    let schema = Schema::resolve(config.schema_path.as_deref()).context("Failed to load schema")?;
    let linter = Arc::new(Linter::new(Arc::new(schema)));

    if config.watch {
        watch(&config, linter)
    } else {
        run_once(&config, &linter)
    }
}
