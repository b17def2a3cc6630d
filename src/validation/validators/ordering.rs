//! Downstream links must point further down the file

use super::{ValidationContext, Validator, DOWNSTREAM_PREFIX};
use crate::validation::{Severity, ValidationResult};

pub struct NodeOrderingValidator;

impl Validator for NodeOrderingValidator {
    fn name(&self) -> &'static str {
        "node_ordering"
    }

    fn validate(&self, ctx: &ValidationContext<'_>, result: &mut ValidationResult) {
        for node in ctx.model.nodes() {
            for property in node.properties() {
                if !property.key.starts_with(DOWNSTREAM_PREFIX) {
                    continue;
                }

                // Dangling links belong to the reference pass
                let Some(target) = ctx.model.node(&property.value) else {
                    continue;
                };

                if target.start_line <= node.start_line {
                    ctx.report(
                        result,
                        "node_ordering",
                        Severity::Error,
                        property.line,
                        "Can only link to nodes that appear below this node in the model file",
                    );
                }
            }
        }
    }
}
