//! Required sections and section property checks

use regex::Regex;
use std::sync::LazyLock;

use super::{ValidationContext, Validator};
use crate::parser::Section;
use crate::schema::{PropertySpec, SectionSpec};
use crate::validation::{Severity, ValidationResult};

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\d+\.\d+$").unwrap());

pub struct SectionValidator;

impl Validator for SectionValidator {
    fn name(&self) -> &'static str {
        "sections"
    }

    fn validate(&self, ctx: &ValidationContext<'_>, result: &mut ValidationResult) {
        for spec in ctx.schema.sections() {
            match ctx.model.section(&spec.name) {
                Some(section) => {
                    for property in &spec.properties {
                        check_property(ctx, spec, property, section, result);
                    }
                }
                None if spec.required => ctx.report(
                    result,
                    "missing_section",
                    Severity::Error,
                    1,
                    format!("Missing required section: [{}]", spec.name),
                ),
                None => {}
            }
        }
    }
}

fn check_property(
    ctx: &ValidationContext<'_>,
    spec: &SectionSpec,
    property: &PropertySpec,
    section: &Section,
    result: &mut ValidationResult,
) {
    let Some(found) = section.property(&property.name) else {
        if property.required {
            log::trace!("[{}] lacks {}", spec.name, property.name);
            ctx.report(
                result,
                "missing_property",
                Severity::Error,
                section.start_line + 1,
                format!("Missing required property: {}", property.name),
            );
        }
        return;
    };

    if let Some(pattern) = &property.pattern
        && !pattern.is_match(&found.value)
    {
        ctx.report(
            result,
            &format!("invalid_{}", property.name),
            Severity::Error,
            found.line,
            format!("Invalid {} format", property.name),
        );
    }

    if property.value_type.as_deref() == Some("version") && !VERSION_RE.is_match(&found.value) {
        ctx.report(
            result,
            "invalid_version",
            Severity::Error,
            found.line,
            "Invalid version format. Expected: X.Y.Z",
        );
    }
}
