//! Node type and parameter checks
//!
//! Every node in the last-write-wins view must declare a known type, carry
//! the type's required parameters, and only use parameters the type allows.
//! Parameters with a declared type are checked against the matching data
//! type; expression parameters go through the expression validator with the
//! node as context. Downstream links are left to the reference pass.

use regex::Regex;
use std::sync::LazyLock;

use super::{ValidationContext, Validator};
use crate::expression::{is_warning, ExpressionContext};
use crate::parser::{Property, Section};
use crate::schema::{NodeTypeDef, ParameterDef, ParameterType};
use crate::validation::{Severity, ValidationResult};

static SEQUENCE_SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*,\s*").unwrap());

const EXPRESSION_RULE: &str = "function_expression_error";

pub struct NodeValidator;

impl Validator for NodeValidator {
    fn name(&self) -> &'static str {
        "nodes"
    }

    fn validate(&self, ctx: &ValidationContext<'_>, result: &mut ValidationResult) {
        for node in ctx.model.nodes() {
            validate_node(ctx, node, result);
        }
    }
}

fn validate_node(ctx: &ValidationContext<'_>, node: &Section, result: &mut ValidationResult) {
    let name = node.node_name().unwrap_or_default();

    let Some(node_type) = node.node_type() else {
        ctx.report(
            result,
            "missing_node_type",
            Severity::Error,
            node.start_line,
            format!("Node missing required 'type' parameter: {}", name),
        );
        return;
    };

    let Some(def) = ctx.schema.node_type(node_type) else {
        let line = node
            .property("type")
            .map(|p| p.line)
            .unwrap_or(node.start_line);
        ctx.report(
            result,
            "unknown_node_type",
            Severity::Error,
            line,
            format!("Unknown node type: {}", node_type),
        );
        return;
    };

    for required in &def.required_params {
        if !node.contains_property(required) {
            ctx.report(
                result,
                "missing_required_param",
                Severity::Error,
                node.start_line,
                format!("Node '{}' missing required parameter: {}", name, required),
            );
        }
    }

    for property in node.properties() {
        validate_property(ctx, node, node_type, def, property, result);
    }
}

fn validate_property(
    ctx: &ValidationContext<'_>,
    node: &Section,
    node_type: &str,
    def: &NodeTypeDef,
    property: &Property,
    result: &mut ValidationResult,
) {
    if property.key == "type" {
        return;
    }

    if !def.allows_param(&property.key) {
        ctx.report(
            result,
            "unknown_parameter",
            Severity::Warning,
            property.line,
            format!(
                "Unknown parameter '{}' for node type '{}'",
                property.key, node_type
            ),
        );
        return;
    }

    let Some(param) = def.parameter(&property.key) else {
        return;
    };

    match param.param_type {
        ParameterType::FunctionExpression => check_expression(ctx, node, property, result),
        ParameterType::Coordinates => {
            if !matches_data_type(ctx, param.param_type, &property.value) {
                ctx.report(
                    result,
                    "invalid_coordinates",
                    Severity::Error,
                    property.line,
                    "Invalid coordinate format. Expected: 'X, Y' (two comma-separated numbers)",
                );
            }
        }
        ParameterType::Number => check_number(ctx, param, property, result),
        ParameterType::Integer => check_integer(ctx, param, property, result),
        ParameterType::NumberSequence => check_sequence(ctx, param, property, result),
        ParameterType::NodeReference | ParameterType::String | ParameterType::Other => {}
    }
}

/// A schema without the data type accepts any value
fn matches_data_type(ctx: &ValidationContext<'_>, param_type: ParameterType, value: &str) -> bool {
    param_type
        .data_type_name()
        .and_then(|name| ctx.schema.data_type(name))
        .is_none_or(|data_type| data_type.matches(value))
}

fn check_expression(
    ctx: &ValidationContext<'_>,
    node: &Section,
    property: &Property,
    result: &mut ValidationResult,
) {
    if ctx.severity(EXPRESSION_RULE, Severity::Error).is_none() {
        return;
    }

    let context = ExpressionContext::for_node(ctx.model, ctx.schema, node);
    for diagnostic in ctx.expressions.validate(&property.value, &context) {
        let severity = if is_warning(&diagnostic) {
            Severity::Warning
        } else {
            Severity::Error
        };
        result.add_issue(property.line, diagnostic, severity, EXPRESSION_RULE);
    }
}

fn check_bounds(
    ctx: &ValidationContext<'_>,
    param: &ParameterDef,
    property: &Property,
    value: f64,
    result: &mut ValidationResult,
) {
    if let Some(min) = param.min
        && value < min
    {
        ctx.report(
            result,
            "value_out_of_range",
            Severity::Error,
            property.line,
            format!("Value must be >= {}: {}", min, property.value),
        );
    }

    if let Some(max) = param.max
        && value > max
    {
        ctx.report(
            result,
            "value_out_of_range",
            Severity::Error,
            property.line,
            format!("Value must be <= {}: {}", max, property.value),
        );
    }
}

fn check_number(
    ctx: &ValidationContext<'_>,
    param: &ParameterDef,
    property: &Property,
    result: &mut ValidationResult,
) {
    if !matches_data_type(ctx, ParameterType::Number, &property.value) {
        ctx.report(
            result,
            "invalid_number",
            Severity::Error,
            property.line,
            format!("Invalid number format: {}", property.value),
        );
        return;
    }

    if let Ok(value) = property.value.parse::<f64>() {
        check_bounds(ctx, param, property, value, result);
    }
}

fn check_integer(
    ctx: &ValidationContext<'_>,
    param: &ParameterDef,
    property: &Property,
    result: &mut ValidationResult,
) {
    if !matches_data_type(ctx, ParameterType::Integer, &property.value) {
        ctx.report(
            result,
            "invalid_integer",
            Severity::Error,
            property.line,
            format!("Invalid integer format: {}", property.value),
        );
        return;
    }

    match property.value.parse::<i64>() {
        Ok(value) => check_bounds(ctx, param, property, value as f64, result),
        Err(_) => ctx.report(
            result,
            "value_out_of_range",
            Severity::Error,
            property.line,
            format!("Integer value out of range: {}", property.value),
        ),
    }
}

fn check_sequence(
    ctx: &ValidationContext<'_>,
    param: &ParameterDef,
    property: &Property,
    result: &mut ValidationResult,
) {
    if !matches_data_type(ctx, ParameterType::NumberSequence, &property.value) {
        ctx.report(
            result,
            "invalid_number_sequence",
            Severity::Error,
            property.line,
            "Invalid number sequence format. Expected comma-separated numbers",
        );
    }

    let Some(expected) = param.count else {
        return;
    };

    let actual = sequence_len(&property.value);
    if actual != expected {
        ctx.report(
            result,
            "incorrect_parameter_count",
            Severity::Error,
            property.line,
            format!(
                "Parameter '{}' expects {} values but got {}",
                property.key, expected, actual
            ),
        );
    }
}

/// Number of comma-separated items, ignoring trailing empty items
fn sequence_len(value: &str) -> usize {
    let mut items: Vec<&str> = SEQUENCE_SEPARATOR_RE.split(value).collect();
    while items.len() > 1 && items.last().is_some_and(|s| s.is_empty()) {
        items.pop();
    }
    items.len()
}
