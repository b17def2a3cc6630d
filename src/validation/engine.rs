//! Validation Orchestrator
//!
//! Parses a document and runs every semantic pass over it in a fixed order.
//! Results for whole documents are cached, so re-validating unchanged text
//! is a lookup.

use std::path::Path;
use std::sync::Arc;

use log::debug;

use super::validators::{
    DuplicatePropertyValidator, InputFileValidator, NodeOrderingValidator, NodeValidator,
    ReferenceValidator, SectionValidator, UniqueNodeNameValidator, ValidationContext, Validator,
};
use super::cache::{CacheStats, DocumentCache};
use super::ValidationResult;
use crate::expression::ExpressionValidator;
use crate::parser::{self, ParsedModel};
use crate::schema::Schema;

/// Runs the full set of validation passes against a schema
pub struct Linter {
    schema: Arc<Schema>,
    expressions: ExpressionValidator,
    validators: Vec<Box<dyn Validator>>,
    documents: DocumentCache,
    enabled: bool,
}

impl Linter {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self::with_expressions(schema, ExpressionValidator::new())
    }

    /// Build a linter around an existing expression validator and its cache
    pub fn with_expressions(schema: Arc<Schema>, expressions: ExpressionValidator) -> Self {
        let validators: Vec<Box<dyn Validator>> = vec![
            Box::new(SectionValidator),
            Box::new(NodeValidator),
            Box::new(DuplicatePropertyValidator),
            Box::new(UniqueNodeNameValidator),
            Box::new(ReferenceValidator),
            Box::new(NodeOrderingValidator),
            Box::new(InputFileValidator::new()),
        ];

        Self {
            schema,
            expressions,
            validators,
            documents: DocumentCache::default(),
            enabled: true,
        }
    }

    /// Replace the document result cache
    pub fn with_document_cache(mut self, documents: DocumentCache) -> Self {
        self.documents = documents;
        self
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn expressions(&self) -> &ExpressionValidator {
        &self.expressions
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.documents.stats()
    }

    /// Drop cached document and expression results
    pub fn clear_cache(&self) {
        self.documents.clear();
        self.expressions.clear_cache();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Names of the passes in the order they run
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    /// Parse `content` and validate it
    pub fn validate(&self, content: &str, base_dir: Option<&Path>) -> ValidationResult {
        if !self.enabled {
            return ValidationResult::new();
        }

        if let Some(cached) = self.documents.get(content, base_dir) {
            debug!("document result served from cache");
            return cached;
        }

        let model = parser::parse(content);
        let result = self.validate_model(&model, base_dir);
        self.documents.insert(content, base_dir, &result);
        result
    }

    /// Validate an already parsed model
    pub fn validate_model(&self, model: &ParsedModel, base_dir: Option<&Path>) -> ValidationResult {
        let mut result = ValidationResult::new();
        if !self.enabled {
            return result;
        }

        let ctx = ValidationContext {
            model,
            schema: &self.schema,
            base_dir,
            expressions: &self.expressions,
        };

        for validator in &self.validators {
            let before = result.len();
            validator.validate(&ctx, &mut result);
            debug!(
                "{} pass added {} issues",
                validator.name(),
                result.len() - before
            );
        }

        result
    }
}
