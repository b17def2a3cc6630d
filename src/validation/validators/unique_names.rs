//! Node names must be unique across the file

use std::collections::HashMap;

use super::{ValidationContext, Validator};
use crate::validation::{Severity, ValidationResult};

pub struct UniqueNodeNameValidator;

impl Validator for UniqueNodeNameValidator {
    fn name(&self) -> &'static str {
        "unique_node_names"
    }

    fn validate(&self, ctx: &ValidationContext<'_>, result: &mut ValidationResult) {
        let mut occurrences: HashMap<&str, Vec<usize>> = HashMap::new();
        for section in ctx.model.all_node_sections() {
            if let Some(name) = section.node_name() {
                occurrences.entry(name).or_default().push(section.start_line);
            }
        }

        for section in ctx.model.all_node_sections() {
            let Some(name) = section.node_name() else {
                continue;
            };
            let lines = &occurrences[name];
            if lines.len() < 2 {
                continue;
            }

            let others: Vec<String> = lines
                .iter()
                .filter(|&&line| line != section.start_line)
                .map(|line| line.to_string())
                .collect();
            ctx.report(
                result,
                "duplicate_node_name",
                Severity::Error,
                section.start_line,
                format!(
                    "Duplicate node name '{}' (also defined on line {})",
                    name,
                    others.join(", ")
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{rules, run};
    use super::*;

    #[test]
    fn test_duplicate_names_flag_every_header() {
        let result = run(
            &UniqueNodeNameValidator,
            "[node.a]\ntype = gauge\n[node.b]\ntype = gauge\n[node.a]\ntype = gauge\n",
        );

        assert_eq!(rules(&result), vec!["duplicate_node_name", "duplicate_node_name"]);
        assert_eq!(result.issues()[0].line, 1);
        assert_eq!(
            result.issues()[0].message,
            "Duplicate node name 'a' (also defined on line 5)"
        );
        assert_eq!(result.issues()[1].line, 5);
    }

    #[test]
    fn test_unique_names() {
        let result = run(&UniqueNodeNameValidator, "[node.a]\n[node.b]\n[attributes]\n");
        assert!(result.is_empty());
    }
}
