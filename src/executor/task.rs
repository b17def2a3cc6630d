//! Work and result hooks plugged into the executor

use crate::validation::ValidationResult;

/// CPU-bound validation work run on the executor's blocking pool
pub trait ValidationTask: Send + 'static {
    fn validate(&self, content: &str) -> anyhow::Result<ValidationResult>;
}

impl<F> ValidationTask for F
where
    F: Fn(&str) -> anyhow::Result<ValidationResult> + Send + 'static,
{
    fn validate(&self, content: &str) -> anyhow::Result<ValidationResult> {
        self(content)
    }
}

/// Receives the outcome of one submission on the caller's thread
///
/// Exactly one method is called per dispatched delivery.
pub trait ValidationCallback: Send + 'static {
    fn on_completed(&mut self, result: ValidationResult);

    fn on_cancelled(&mut self) {}

    fn on_error(&mut self, error: anyhow::Error);
}

/// How a submission ended
#[derive(Debug)]
pub enum Outcome {
    Completed(ValidationResult),
    /// Superseded, cancelled or timed out
    Cancelled,
    /// The task returned an error or panicked
    Failed(anyhow::Error),
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }
}
