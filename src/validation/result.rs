//! Validation Results
//!
//! Append-only issue list shared by every validation pass.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a validation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single diagnostic tied to a 1-indexed line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub line: usize,
    pub message: String,
    pub severity: Severity,
    /// Rule code such as `duplicate_property`
    pub rule: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}: {}: {} [{}]",
            self.line, self.severity, self.message, self.rule
        )
    }
}

/// Ordered collection of issues from one validation run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationResult {
    issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_issue(
        &mut self,
        line: usize,
        message: impl Into<String>,
        severity: Severity,
        rule: impl Into<String>,
    ) {
        self.issues.push(ValidationIssue {
            line,
            message: message.into(),
            severity,
            rule: rule.into(),
        });
    }

    pub fn add_error(&mut self, line: usize, message: impl Into<String>, rule: impl Into<String>) {
        self.add_issue(line, message, Severity::Error, rule);
    }

    pub fn add_warning(&mut self, line: usize, message: impl Into<String>, rule: impl Into<String>) {
        self.add_issue(line, message, Severity::Warning, rule);
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} errors, {} warnings",
            self.errors().count(),
            self.warnings().count()
        )
    }
}
