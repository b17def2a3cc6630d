//! Function Expression Validator
//!
//! Checks the small expression language used in node parameters such as
//! `inflow = if(data.temp > 20, 10.0, 5.0) * 1.2`. Diagnostics are plain
//! strings; a string that starts with "warning" (any case) is a warning.
//!
//! Simple operands are accepted through precompiled fast paths. Everything
//! else goes through the tokenizer and the recursive descent checker.

pub mod cache;
pub mod functions;
pub mod lexer;
pub mod parser;

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use crate::parser::{ParsedModel, Section};
use crate::schema::Schema;
pub use cache::{ExpressionCache, DEFAULT_CACHE_CAPACITY};
pub use lexer::TokenKind;

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(\.\d+)?([eE][+-]?\d+)?$").unwrap());

static DATA_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data\.[a-zA-Z_][a-zA-Z0-9_]*(\.[a-zA-Z_][a-zA-Z0-9_]*)*(\[.*?\])?$").unwrap()
});

static CONST_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^c\.[a-zA-Z_][a-zA-Z0-9_]*(\.[a-zA-Z_][a-zA-Z0-9_]*)*$").unwrap()
});

static NODE_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^node\.[a-zA-Z_][a-zA-Z0-9_]*\.[a-zA-Z_][a-zA-Z0-9_]*(\[.*?\])?$").unwrap()
});

static THIS_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^this\.[a-zA-Z_][a-zA-Z0-9_]*(\[.*?\])?$").unwrap());

/// Unrecoverable expression syntax
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExpressionError {
    #[error("Unexpected character at position {position}: '{ch}'")]
    UnexpectedCharacter { position: usize, ch: char },

    #[error("Invalid number format: '{0}'")]
    InvalidNumber(String),

    #[error("Unclosed '[' at position {position}")]
    UnclosedBracket { position: usize },

    #[error(
        "Expected number, data reference, constant reference, node reference, this reference, sim reference, function, or '(' but got {found}"
    )]
    ExpectedPrimary { found: TokenKind },

    #[error("Expected {expected} but got {found} ('{text}')")]
    UnexpectedToken {
        expected: TokenKind,
        found: TokenKind,
        text: String,
    },

    #[error("Expression nests deeper than {limit} levels")]
    NestingTooDeep { limit: usize },
}

/// Optional model knowledge available while checking an expression
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionContext<'a> {
    model: Option<&'a ParsedModel>,
    schema: Option<&'a Schema>,
    current_node: Option<&'a Section>,
}

impl<'a> ExpressionContext<'a> {
    /// No model, no schema, no current node
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_model(model: &'a ParsedModel, schema: &'a Schema) -> Self {
        Self {
            model: Some(model),
            schema: Some(schema),
            current_node: None,
        }
    }

    /// Context for a parameter of `node`
    pub fn for_node(model: &'a ParsedModel, schema: &'a Schema, node: &'a Section) -> Self {
        Self {
            current_node: Some(node),
            ..Self::with_model(model, schema)
        }
    }

    pub fn model(&self) -> Option<&'a ParsedModel> {
        self.model
    }

    pub fn schema(&self) -> Option<&'a Schema> {
        self.schema
    }

    pub fn current_node(&self) -> Option<&'a Section> {
        self.current_node
    }

    /// Results depend on nothing but the text
    pub fn is_context_free(&self) -> bool {
        self.model.is_none() && self.schema.is_none() && self.current_node.is_none()
    }
}

/// Expression checker with a context-free result cache
#[derive(Debug, Default)]
pub struct ExpressionValidator {
    cache: ExpressionCache,
}

impl ExpressionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(cache: ExpressionCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &ExpressionCache {
        &self.cache
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Check an expression; an empty list means it is valid
    pub fn validate(&self, expression: &str, context: &ExpressionContext<'_>) -> Vec<String> {
        let trimmed = expression.trim();

        if !context.is_context_free() {
            return check_expression(trimmed, context);
        }

        if let Some(cached) = self.cache.get(trimmed) {
            return cached;
        }

        let diagnostics = check_expression(trimmed, context);
        self.cache.insert(trimmed, &diagnostics);
        diagnostics
    }
}

/// Whether a diagnostic string is a warning rather than an error
pub fn is_warning(diagnostic: &str) -> bool {
    diagnostic
        .get(..7)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("warning"))
}

fn check_expression(expression: &str, context: &ExpressionContext<'_>) -> Vec<String> {
    if expression.is_empty() {
        return vec!["Expression is empty".to_string()];
    }

    if NUMBER_RE.is_match(expression)
        || DATA_REF_RE.is_match(expression)
        || CONST_REF_RE.is_match(expression)
    {
        return Vec::new();
    }

    if NODE_REF_RE.is_match(expression) {
        return parser::check_node_reference(expression, context)
            .into_iter()
            .collect();
    }

    if THIS_REF_RE.is_match(expression) {
        return parser::check_this_reference(expression, context)
            .into_iter()
            .collect();
    }

    if parser::SIM_VARIABLES.contains(&expression) {
        return Vec::new();
    }

    log::trace!("full parse of expression '{}'", expression);
    parser::check(expression, context)
}
