//! Node reference resolution shared by the expression checker and the
//! semantic passes

use thiserror::Error;

use crate::parser::{ParsedModel, Section};
use crate::schema::Schema;

/// Why a `node.<name>.<output>` reference does not resolve
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NodeReferenceError {
    #[error("Malformed node reference: '{0}'")]
    Malformed(String),

    #[error("Node reference points to non-existent node: {0}")]
    UnknownNode(String),

    #[error("Output property '{output}' is not allowed for node type '{node_type}'. Allowed outputs: {allowed}")]
    OutputNotAllowed {
        output: String,
        node_type: String,
        allowed: String,
    },
}

/// Split `node.<name>.<output>` into its name and output parts
pub fn split_node_reference(reference: &str) -> Option<(&str, &str)> {
    let rest = reference.strip_prefix("node.")?;
    let (name, output) = rest.split_once('.')?;
    if name.is_empty() || output.is_empty() || output.contains('.') {
        return None;
    }
    Some((name, output))
}

/// Drop a trailing `[...]` clause from a reference
pub fn strip_bracket_suffix(reference: &str) -> &str {
    match reference.find('[') {
        Some(idx) if reference.ends_with(']') => &reference[..idx],
        _ => reference,
    }
}

/// Resolve a node reference against the model
///
/// The node must exist. When the schema knows the node's type and that type
/// declares outputs, the referenced output must be one of them.
pub fn resolve_node_reference<'m>(
    reference: &str,
    model: &'m ParsedModel,
    schema: &Schema,
) -> Result<&'m Section, NodeReferenceError> {
    let reference = strip_bracket_suffix(reference);
    let (name, output) = split_node_reference(reference)
        .ok_or_else(|| NodeReferenceError::Malformed(reference.to_string()))?;

    let node = model
        .node(name)
        .ok_or_else(|| NodeReferenceError::UnknownNode(name.to_string()))?;

    let Some(node_type) = node.node_type() else {
        return Ok(node);
    };

    if let Some(def) = schema.node_type(node_type)
        && !def.allowed_outputs.is_empty()
        && !def.allows_output(output)
    {
        return Err(NodeReferenceError::OutputNotAllowed {
            output: output.to_string(),
            node_type: node_type.to_string(),
            allowed: def.allowed_outputs.join(", "),
        });
    }

    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn schema() -> Schema {
        Schema::from_toml_str(
            r#"
            [node_types.gauge]
            allowed_outputs = ["usflow", "dsflow"]

            [node_types.free]
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_split_node_reference() {
        assert_eq!(split_node_reference("node.dam.dsflow"), Some(("dam", "dsflow")));
        assert_eq!(split_node_reference("node.dam"), None);
        assert_eq!(split_node_reference("node..dsflow"), None);
        assert_eq!(split_node_reference("node.a.b.c"), None);
    }

    #[test]
    fn test_strip_bracket_suffix() {
        assert_eq!(strip_bracket_suffix("node.a.dsflow[1]"), "node.a.dsflow");
        assert_eq!(strip_bracket_suffix("data.rain"), "data.rain");
    }

    #[test]
    fn test_resolve_existing_node() {
        let model = parse("[node.g]\ntype = gauge\n");
        let node = resolve_node_reference("node.g.dsflow[0]", &model, &schema()).unwrap();
        assert_eq!(node.node_name(), Some("g"));
    }

    #[test]
    fn test_resolve_unknown_node() {
        let model = parse("[node.g]\ntype = gauge\n");
        let err = resolve_node_reference("node.missing.dsflow", &model, &schema()).unwrap_err();
        assert_eq!(err, NodeReferenceError::UnknownNode("missing".to_string()));
    }

    #[test]
    fn test_resolve_disallowed_output() {
        let model = parse("[node.g]\ntype = gauge\n");
        let err = resolve_node_reference("node.g.volume", &model, &schema()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Output property 'volume' is not allowed for node type 'gauge'. Allowed outputs: usflow, dsflow"
        );
    }

    #[test]
    fn test_resolve_type_without_outputs_accepts_anything() {
        let model = parse("[node.f]\ntype = free\n[node.u]\n");
        assert!(resolve_node_reference("node.f.whatever", &model, &schema()).is_ok());
        assert!(resolve_node_reference("node.u.whatever", &model, &schema()).is_ok());
    }
}
