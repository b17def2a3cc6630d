//! Semantic validation of parsed models
//!
//! The [`Linter`] runs a fixed list of passes over a parsed model and
//! collects their issues into a single [`ValidationResult`].

pub mod cache;
pub mod engine;
pub mod references;
pub mod result;
pub mod validators;

pub use cache::{CacheStats, DocumentCache};
pub use engine::Linter;
pub use references::{resolve_node_reference, NodeReferenceError};
pub use result::{Severity, ValidationIssue, ValidationResult};
pub use validators::{ValidationContext, Validator};
