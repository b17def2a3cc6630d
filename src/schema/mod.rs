//! Model Schema
//!
//! Node types, data types, section constraints and the validation rule
//! registry, loaded from TOML.

pub mod registry;
pub mod types;

use std::path::PathBuf;
use thiserror::Error;

pub use registry::{user_schema_path, DataType, PropertySpec, Rule, Schema, SectionSpec};
pub use types::{NodeTypeDef, ParameterDef, ParameterType, SchemaFile};

/// Errors raised while loading a schema
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema file could not be read.
    #[error("failed to read schema {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid schema TOML.
    #[error("failed to parse schema: {0}")]
    Parse(#[from] toml::de::Error),

    /// A pattern in the schema does not compile.
    #[error("invalid pattern for {owner}: {source}")]
    InvalidPattern {
        owner: String,
        #[source]
        source: regex::Error,
    },
}
