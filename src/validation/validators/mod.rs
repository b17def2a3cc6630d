//! Semantic validation passes
//!
//! Each pass reads the parsed model and appends issues to a shared result.
//! Passes never remove or reorder issues added before them.

pub mod duplicates;
pub mod files;
pub mod nodes;
pub mod ordering;
pub mod references;
pub mod sections;
pub mod unique_names;

use std::path::Path;

use super::{Severity, ValidationResult};
use crate::expression::ExpressionValidator;
use crate::parser::ParsedModel;
use crate::schema::Schema;

pub use duplicates::DuplicatePropertyValidator;
pub use files::InputFileValidator;
pub use nodes::NodeValidator;
pub use ordering::NodeOrderingValidator;
pub use references::ReferenceValidator;
pub use sections::SectionValidator;
pub use unique_names::UniqueNodeNameValidator;

/// Prefix of property keys that link to a downstream node
pub const DOWNSTREAM_PREFIX: &str = "ds_";

/// Everything a pass may read
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub model: &'a ParsedModel,
    pub schema: &'a Schema,
    /// Directory relative input file paths are resolved against
    pub base_dir: Option<&'a Path>,
    pub expressions: &'a ExpressionValidator,
}

impl ValidationContext<'_> {
    /// Effective severity of a rule, `None` when the schema disables it
    pub fn severity(&self, rule: &str, default: Severity) -> Option<Severity> {
        self.schema.rule_severity(rule, default)
    }

    /// Add an issue under `rule` unless the rule is disabled
    pub fn report(
        &self,
        result: &mut ValidationResult,
        rule: &str,
        default: Severity,
        line: usize,
        message: impl Into<String>,
    ) {
        if let Some(severity) = self.severity(rule, default) {
            result.add_issue(line, message, severity, rule);
        }
    }
}

/// A single validation pass
pub trait Validator: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    fn validate(&self, ctx: &ValidationContext<'_>, result: &mut ValidationResult);
}
