//! Output references and downstream links must point at existing nodes

use regex::Regex;
use std::sync::LazyLock;

use super::{ValidationContext, Validator, DOWNSTREAM_PREFIX};
use crate::validation::references::{resolve_node_reference, NodeReferenceError};
use crate::validation::{Severity, ValidationResult};

static DEFAULT_OUTPUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^node\.[\w_]+\.(dsflow|usflow|storage)$").unwrap());

pub struct ReferenceValidator;

impl Validator for ReferenceValidator {
    fn name(&self) -> &'static str {
        "references"
    }

    fn validate(&self, ctx: &ValidationContext<'_>, result: &mut ValidationResult) {
        validate_output_references(ctx, result);
        validate_downstream_links(ctx, result);
    }
}

fn validate_output_references(ctx: &ValidationContext<'_>, result: &mut ValidationResult) {
    let Some(severity) = ctx.severity("output_references", Severity::Error) else {
        return;
    };

    let pattern = ctx
        .schema
        .rule("output_references")
        .and_then(|rule| rule.pattern.as_ref())
        .unwrap_or_else(|| &*DEFAULT_OUTPUT_RE);

    for reference in ctx.model.output_references() {
        if !pattern.is_match(&reference.text) {
            result.add_issue(
                reference.line,
                format!("Invalid output reference format: {}", reference.text),
                severity,
                "invalid_output_reference",
            );
            continue;
        }

        // Output names are governed by the pattern above
        if let Err(NodeReferenceError::UnknownNode(node)) =
            resolve_node_reference(&reference.text, ctx.model, ctx.schema)
        {
            result.add_issue(
                reference.line,
                format!("Output reference points to non-existent node: {}", node),
                severity,
                "invalid_node_reference",
            );
        }
    }
}

fn validate_downstream_links(ctx: &ValidationContext<'_>, result: &mut ValidationResult) {
    let Some(severity) = ctx.severity("dsnode_references", Severity::Error) else {
        return;
    };

    for node in ctx.model.nodes() {
        for property in node.properties() {
            if property.key.starts_with(DOWNSTREAM_PREFIX) && !ctx.model.has_node(&property.value) {
                result.add_issue(
                    property.line,
                    format!("Link points to non-existent node: {}", property.value),
                    severity,
                    "invalid_node_reference",
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{rules, run, run_with};
    use super::*;
    use crate::schema::Schema;

    #[test]
    fn test_output_reference_format() {
        let result = run(
            &ReferenceValidator,
            "[node.a]\ntype = gauge\n[outputs]\nnode.a.dsflow\nnode.a.volume\nrubbish\n",
        );

        assert_eq!(
            rules(&result),
            vec!["invalid_output_reference", "invalid_output_reference"]
        );
        assert_eq!(result.issues()[0].line, 5);
        assert_eq!(result.issues()[0].message, "Invalid output reference format: node.a.volume");
        assert_eq!(result.issues()[1].line, 6);
    }

    #[test]
    fn test_output_reference_to_missing_node() {
        let result = run(&ReferenceValidator, "[outputs]\nnode.ghost.usflow\n");

        assert_eq!(rules(&result), vec!["invalid_node_reference"]);
        assert_eq!(
            result.issues()[0].message,
            "Output reference points to non-existent node: ghost"
        );
        assert_eq!(result.issues()[0].line, 2);
    }

    #[test]
    fn test_duplicate_output_lines_each_reported() {
        let result = run(
            &ReferenceValidator,
            "[outputs]\nnode.ghost.usflow\nnode.ghost.usflow\n",
        );
        let lines: Vec<_> = result.issues().iter().map(|i| i.line).collect();
        assert_eq!(lines, vec![2, 3]);
    }

    #[test]
    fn test_downstream_link_to_missing_node() {
        let result = run(
            &ReferenceValidator,
            "[node.a]\ntype = gauge\nds_1 = b\n[node.c]\ntype = gauge\nds_1 = a\n",
        );

        assert_eq!(rules(&result), vec!["invalid_node_reference"]);
        assert_eq!(result.issues()[0].message, "Link points to non-existent node: b");
        assert_eq!(result.issues()[0].line, 3);
    }

    #[test]
    fn test_custom_output_pattern_and_severity() {
        let schema = Schema::from_toml_str(
            r#"
            [validation_rules.output_references]
            severity = "warning"
            pattern = 'node\.\w+\.\w+'
            "#,
        )
        .unwrap();

        let result = run_with(
            &ReferenceValidator,
            "[node.a]\n[outputs]\nnode.a.volume\nbad\n",
            &schema,
            None,
        );
        assert_eq!(rules(&result), vec!["invalid_output_reference"]);
        assert_eq!(result.issues()[0].severity, Severity::Warning);
    }

    #[test]
    fn test_disabled_link_rule() {
        let schema = Schema::from_toml_str(
            r#"
            [validation_rules.dsnode_references]
            enabled = false
            "#,
        )
        .unwrap();

        let result = run_with(&ReferenceValidator, "[node.a]\nds_1 = nowhere\n", &schema, None);
        assert!(result.is_empty());
    }
}
