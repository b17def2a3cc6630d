//! Schema File Types
//!
//! Serde mirror of the TOML schema layout. Patterns are kept as strings here
//! and compiled when the file is turned into a [`Schema`](super::Schema).

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

use crate::validation::Severity;

/// Root schema file structure (matches TOML)
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SchemaFile {
    pub version: Option<String>,
    #[serde(default)]
    pub sections: BTreeMap<String, SectionDef>,
    #[serde(default)]
    pub node_types: HashMap<String, NodeTypeDef>,
    #[serde(default)]
    pub data_types: HashMap<String, DataTypeDef>,
    #[serde(default)]
    pub validation_rules: HashMap<String, RuleDef>,
}

/// Top-level section definition
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SectionDef {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyDef>,
}

/// Property inside a top-level section
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PropertyDef {
    #[serde(default)]
    pub required: bool,
    pub pattern: Option<String>,
    #[serde(rename = "type")]
    pub value_type: Option<String>,
}

/// Node type definition
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct NodeTypeDef {
    pub description: Option<String>,
    #[serde(default)]
    pub required_params: Vec<String>,
    #[serde(default)]
    pub optional_params: Vec<String>,
    /// Downstream link parameters such as `ds_1`
    #[serde(default)]
    pub dsnode_params: Vec<String>,
    #[serde(default)]
    pub allowed_outputs: Vec<String>,
    #[serde(default)]
    pub parameters: HashMap<String, ParameterDef>,
}

/// Declared type and constraints of one node parameter
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ParameterDef {
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    pub description: Option<String>,
    /// Exact value count for `number_sequence` parameters
    pub count: Option<usize>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Parameter value types understood by the node pass
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    Coordinates,
    Number,
    Integer,
    NumberSequence,
    FunctionExpression,
    NodeReference,
    String,
    /// Types this linter does not check
    #[serde(other)]
    Other,
}

impl ParameterType {
    /// Name of the data type whose pattern values must match
    pub fn data_type_name(self) -> Option<&'static str> {
        match self {
            ParameterType::Coordinates => Some("coordinates"),
            ParameterType::Number => Some("number"),
            ParameterType::Integer => Some("integer"),
            ParameterType::NumberSequence => Some("number_sequence"),
            _ => None,
        }
    }
}

/// Regex-backed data type
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct DataTypeDef {
    pub pattern: Option<String>,
    pub description: Option<String>,
}

/// Named validation rule
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RuleDef {
    pub description: Option<String>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub pattern: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl NodeTypeDef {
    /// Whether a property key is allowed on nodes of this type
    pub fn allows_param(&self, name: &str) -> bool {
        name == "type"
            || self.required_params.iter().any(|p| p == name)
            || self.optional_params.iter().any(|p| p == name)
            || self.dsnode_params.iter().any(|p| p == name)
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterDef> {
        self.parameters.get(name)
    }

    pub fn allows_output(&self, output: &str) -> bool {
        self.allowed_outputs.iter().any(|o| o == output)
    }
}
