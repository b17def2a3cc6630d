//! Kalix Model Linter
//!
//! Validates Kalix INI-style model files against a declarative schema.
//!
//! This library provides:
//! - A lenient, line-tracking model parser
//! - Schema loading with compiled value patterns
//! - Function expression checking with a result cache
//! - Semantic validation passes and the [`Linter`] that runs them, with a
//!   per-document result cache
//! - A single-flight background executor for edit-driven validation

pub mod config;
pub mod executor;
pub mod expression;
pub mod parser;
pub mod report;
pub mod schema;
pub mod validation;

// Re-exports for clean public API
pub use config::Config;
pub use executor::{
    Deliveries, ExecutorConfig, Outcome, ValidationCallback, ValidationExecutor, ValidationTask,
};
pub use expression::{ExpressionContext, ExpressionValidator};
pub use parser::{parse, ParsedModel};
pub use schema::{Schema, SchemaError};
pub use validation::{DocumentCache, Linter, Severity, ValidationIssue, ValidationResult};
