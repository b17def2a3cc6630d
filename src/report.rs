//! Rendering of validation results for the command line

use anyhow::Result;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

use crate::config::OutputFormat;
use crate::validation::ValidationResult;

#[derive(Serialize)]
struct JsonReport<'a> {
    file: String,
    errors: usize,
    warnings: usize,
    issues: &'a [crate::validation::ValidationIssue],
}

/// Render `result` for `path` in the requested format
pub fn render(path: &Path, result: &ValidationResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(path, result)),
        OutputFormat::Json => render_json(path, result),
    }
}

fn render_text(path: &Path, result: &ValidationResult) -> String {
    let mut out = String::new();
    for issue in result.issues() {
        let _ = writeln!(
            out,
            "{}:{}: {}: {} [{}]",
            path.display(),
            issue.line,
            issue.severity,
            issue.message,
            issue.rule
        );
    }
    let _ = writeln!(out, "{}: {}", path.display(), result);
    out
}

fn render_json(path: &Path, result: &ValidationResult) -> Result<String> {
    let report = JsonReport {
        file: path.display().to_string(),
        errors: result.errors().count(),
        warnings: result.warnings().count(),
        issues: result.issues(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}
