//! Schema Registry
//!
//! Read-only lookup structure built from a [`SchemaFile`]. All patterns are
//! compiled once at load time and matched against whole values.

use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::types::{NodeTypeDef, SchemaFile};
use super::SchemaError;
use crate::validation::Severity;

/// Default schema shipped with the crate
pub const EMBEDDED_SCHEMA: &str = include_str!("../../resources/schema/kalix-model.schema.toml");

/// Regex-backed data type
#[derive(Debug, Clone)]
pub struct DataType {
    pub name: String,
    pattern: Option<Regex>,
}

impl DataType {
    /// A data type without a pattern accepts everything
    pub fn matches(&self, value: &str) -> bool {
        self.pattern
            .as_ref()
            .map(|re| re.is_match(value))
            .unwrap_or(true)
    }
}

/// Property constraint inside a top-level section
#[derive(Debug, Clone)]
pub struct PropertySpec {
    pub name: String,
    pub required: bool,
    pub pattern: Option<Regex>,
    pub value_type: Option<String>,
}

/// Top-level section constraint
#[derive(Debug, Clone)]
pub struct SectionSpec {
    pub name: String,
    pub required: bool,
    pub properties: Vec<PropertySpec>,
}

/// Severity, enablement and optional pattern of a named rule
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub description: Option<String>,
    pub severity: Severity,
    pub enabled: bool,
    pub pattern: Option<Regex>,
}

/// Node types, data types, section constraints and rule registry
#[derive(Debug, Clone)]
pub struct Schema {
    version: Option<String>,
    sections: Vec<SectionSpec>,
    node_types: HashMap<String, NodeTypeDef>,
    data_types: HashMap<String, DataType>,
    rules: HashMap<String, Rule>,
}

impl Schema {
    /// Parse the schema compiled into the binary
    pub fn embedded_default() -> Result<Self, SchemaError> {
        Self::from_toml_str(EMBEDDED_SCHEMA)
    }

    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let schema = Self::from_toml_str(&content)?;
        log::info!(
            "Loaded schema {} from {}",
            schema.version().unwrap_or("(unversioned)"),
            path.display()
        );
        Ok(schema)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SchemaError> {
        let file: SchemaFile = toml::from_str(content)?;
        Self::try_from(file)
    }

    /// Resolve the schema to use: an explicit path, then the user's config
    /// directory, then the embedded default
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, SchemaError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Some(path) = user_schema_path()
            && path.is_file()
        {
            return Self::from_file(&path);
        }

        log::debug!("Using embedded default schema");
        Self::embedded_default()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn node_type(&self, name: &str) -> Option<&NodeTypeDef> {
        self.node_types.get(name)
    }

    pub fn node_type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.node_types.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn data_type(&self, name: &str) -> Option<&DataType> {
        self.data_types.get(name)
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    /// Effective severity of a rule, or `None` when the rule is disabled
    ///
    /// Rules absent from the registry run with `default`.
    pub fn rule_severity(&self, name: &str, default: Severity) -> Option<Severity> {
        match self.rules.get(name) {
            Some(rule) if !rule.enabled => None,
            Some(rule) => Some(rule.severity),
            None => Some(default),
        }
    }

    pub fn sections(&self) -> &[SectionSpec] {
        &self.sections
    }
}

impl TryFrom<SchemaFile> for Schema {
    type Error = SchemaError;

    fn try_from(file: SchemaFile) -> Result<Self, Self::Error> {
        let mut sections = Vec::with_capacity(file.sections.len());
        for (name, def) in file.sections {
            let mut properties = Vec::with_capacity(def.properties.len());
            for (prop_name, prop) in def.properties {
                let owner = format!("[{}] {}", name, prop_name);
                properties.push(PropertySpec {
                    pattern: compile_optional(&owner, prop.pattern.as_deref())?,
                    name: prop_name,
                    required: prop.required,
                    value_type: prop.value_type,
                });
            }

            sections.push(SectionSpec {
                name,
                required: def.required,
                properties,
            });
        }

        let mut data_types = HashMap::with_capacity(file.data_types.len());
        for (name, def) in file.data_types {
            let owner = format!("data type '{}'", name);
            let pattern = compile_optional(&owner, def.pattern.as_deref())?;
            data_types.insert(name.clone(), DataType { name, pattern });
        }

        let mut rules = HashMap::with_capacity(file.validation_rules.len());
        for (name, def) in file.validation_rules {
            let owner = format!("rule '{}'", name);
            let pattern = compile_optional(&owner, def.pattern.as_deref())?;
            rules.insert(
                name.clone(),
                Rule {
                    name,
                    description: def.description,
                    severity: def.severity,
                    enabled: def.enabled,
                    pattern,
                },
            );
        }

        log::debug!(
            "Schema built: {} node types, {} data types, {} rules",
            file.node_types.len(),
            data_types.len(),
            rules.len()
        );

        Ok(Self {
            version: file.version,
            sections,
            node_types: file.node_types,
            data_types,
            rules,
        })
    }
}

/// `<config_dir>/kalix-lint/schema.toml`
pub fn user_schema_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("kalix-lint").join("schema.toml"))
}

fn compile_optional(owner: &str, pattern: Option<&str>) -> Result<Option<Regex>, SchemaError> {
    pattern
        .map(|p| {
            Regex::new(&format!("^(?:{})$", p)).map_err(|source| SchemaError::InvalidPattern {
                owner: owner.to_string(),
                source,
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_schema_loads() {
        let schema = Schema::embedded_default().unwrap();

        let gr4j = schema.node_type("gr4j").unwrap();
        assert!(gr4j.required_params.contains(&"params".to_string()));
        assert_eq!(gr4j.parameter("params").unwrap().count, Some(4));
        assert_eq!(
            schema.node_type("sacramento").unwrap().parameter("params").unwrap().count,
            Some(17)
        );

        let names: Vec<_> = schema.sections().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["attributes", "inputs", "outputs"]);
    }

    #[test]
    fn test_embedded_data_types() {
        let schema = Schema::embedded_default().unwrap();

        let coords = schema.data_type("coordinates").unwrap();
        assert!(coords.matches("100.5, -20"));
        assert!(!coords.matches("100.5"));

        let number = schema.data_type("number").unwrap();
        assert!(number.matches("1e-3"));
        assert!(!number.matches("12abc"));

        let sequence = schema.data_type("number_sequence").unwrap();
        assert!(sequence.matches("1.0, 2.0,3"));
        assert!(!sequence.matches("1.0, x"));
    }

    #[test]
    fn test_patterns_match_whole_value() {
        let schema = Schema::from_toml_str(
            r#"
            [data_types.digits]
            pattern = '\d+'
            "#,
        )
        .unwrap();

        let digits = schema.data_type("digits").unwrap();
        assert!(digits.matches("123"));
        assert!(!digits.matches("a123"));
    }

    #[test]
    fn test_rule_severity_lookup() {
        let schema = Schema::from_toml_str(
            r#"
            [validation_rules.node_ordering]
            severity = "warning"

            [validation_rules.file_paths]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(
            schema.rule_severity("node_ordering", Severity::Error),
            Some(Severity::Warning)
        );
        assert_eq!(schema.rule_severity("file_paths", Severity::Error), None);
        // Unregistered rules run with their built-in severity
        assert_eq!(
            schema.rule_severity("duplicate_property", Severity::Error),
            Some(Severity::Error)
        );
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let err = Schema::from_toml_str(
            r#"
            [data_types.broken]
            pattern = '(unclosed'
            "#,
        )
        .unwrap_err();

        assert!(matches!(err, SchemaError::InvalidPattern { .. }));
        assert!(err.to_string().contains("data type 'broken'"));
    }

    #[test]
    fn test_from_missing_file() {
        let err = Schema::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, SchemaError::Io { .. }));
    }
}
