//! Duplicate property detection
//!
//! Works on the flat occurrence list of each section, so keys that the
//! last-write-wins view collapsed are still seen.

use std::collections::HashMap;

use super::{ValidationContext, Validator};
use crate::validation::{Severity, ValidationResult};

pub struct DuplicatePropertyValidator;

impl Validator for DuplicatePropertyValidator {
    fn name(&self) -> &'static str {
        "duplicate_properties"
    }

    fn validate(&self, ctx: &ValidationContext<'_>, result: &mut ValidationResult) {
        for section in ctx.model.all_sections() {
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for property in section.all_properties() {
                *counts.entry(property.key.as_str()).or_default() += 1;
            }

            for property in section.all_properties() {
                if counts[property.key.as_str()] > 1 {
                    ctx.report(
                        result,
                        "duplicate_property",
                        Severity::Error,
                        property.line,
                        format!(
                            "Duplicate property '{}' in section [{}]",
                            property.key, section.name
                        ),
                    );
                }
            }
        }
    }
}
