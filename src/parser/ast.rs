//! Parsed Model Types
//!
//! Plain data produced by the parser. Every collection keeps two views: a
//! last-write-wins lookup and a flat list of every occurrence, so duplicate
//! checks can see what the lookup hides.

use std::collections::HashMap;

/// Section holding bare input file lines
pub const INPUTS_SECTION: &str = "inputs";
/// Section holding bare output reference lines
pub const OUTPUTS_SECTION: &str = "outputs";
/// Prefix of section names that declare a node
pub const NODE_SECTION_PREFIX: &str = "node.";

/// A `key = value` property
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: String,
    /// Comment-stripped value with continuation lines merged
    pub value: String,
    /// 1-indexed line of the key
    pub line: usize,
}

/// A bare line from `[inputs]` or `[outputs]`
#[derive(Debug, Clone, PartialEq)]
pub struct BareLine {
    pub text: String,
    pub line: usize,
}

/// What kind of section a header opened
#[derive(Debug, Clone, PartialEq)]
pub enum SectionKind {
    Plain,
    Node {
        /// Name after the `node.` prefix
        name: String,
        /// Value of the most recent `type` property
        node_type: Option<String>,
    },
}

/// A bracket-delimited block of properties
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
    pub kind: SectionKind,
    latest: HashMap<String, usize>,
    occurrences: Vec<Property>,
}

impl Section {
    pub fn new(name: impl Into<String>, start_line: usize) -> Self {
        let name = name.into();
        let kind = match name.strip_prefix(NODE_SECTION_PREFIX) {
            Some(node_name) if !node_name.is_empty() => SectionKind::Node {
                name: node_name.to_string(),
                node_type: None,
            },
            _ => SectionKind::Plain,
        };

        Self {
            name,
            start_line,
            end_line: start_line,
            kind,
            latest: HashMap::new(),
            occurrences: Vec::new(),
        }
    }

    /// Record a property, overwriting the lookup view and extending the flat view
    pub fn add_property(&mut self, key: impl Into<String>, value: impl Into<String>, line: usize) {
        let property = Property {
            key: key.into(),
            value: value.into(),
            line,
        };

        if let SectionKind::Node { node_type, .. } = &mut self.kind
            && property.key == "type"
        {
            *node_type = Some(property.value.clone());
        }

        self.latest
            .insert(property.key.clone(), self.occurrences.len());
        self.occurrences.push(property);
        self.end_line = self.end_line.max(line);
    }

    /// Extend the section's end line without adding a property
    pub fn touch(&mut self, line: usize) {
        self.end_line = self.end_line.max(line);
    }

    /// Latest value for a key
    pub fn property(&self, key: &str) -> Option<&Property> {
        self.latest.get(key).map(|&idx| &self.occurrences[idx])
    }

    pub fn contains_property(&self, key: &str) -> bool {
        self.latest.contains_key(key)
    }

    /// Last-write-wins view, in order of each key's final occurrence
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.occurrences
            .iter()
            .enumerate()
            .filter(|(idx, prop)| self.latest.get(&prop.key) == Some(idx))
            .map(|(_, prop)| prop)
    }

    /// Every property occurrence in document order, duplicates included
    pub fn all_properties(&self) -> &[Property] {
        &self.occurrences
    }

    pub fn is_node(&self) -> bool {
        matches!(self.kind, SectionKind::Node { .. })
    }

    pub fn node_name(&self) -> Option<&str> {
        match &self.kind {
            SectionKind::Node { name, .. } => Some(name),
            SectionKind::Plain => None,
        }
    }

    pub fn node_type(&self) -> Option<&str> {
        match &self.kind {
            SectionKind::Node { node_type, .. } => node_type.as_deref(),
            SectionKind::Plain => None,
        }
    }
}

/// Structured view of a whole model document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedModel {
    sections: Vec<Section>,
    section_index: HashMap<String, usize>,
    node_index: HashMap<String, usize>,
    node_sections: Vec<usize>,
    input_files: Vec<BareLine>,
    output_references: Vec<BareLine>,
    input_file_lines: HashMap<String, usize>,
    output_reference_lines: HashMap<String, usize>,
}

impl ParsedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new section and return its slot for subsequent additions
    pub(crate) fn open_section(&mut self, name: &str, start_line: usize) -> usize {
        let section = Section::new(name, start_line);
        let idx = self.sections.len();

        if let Some(node_name) = section.node_name() {
            self.node_index.insert(node_name.to_string(), idx);
            self.node_sections.push(idx);
        }

        self.section_index.insert(section.name.clone(), idx);
        self.sections.push(section);
        idx
    }

    pub(crate) fn section_mut(&mut self, idx: usize) -> &mut Section {
        &mut self.sections[idx]
    }

    pub(crate) fn add_input_file(&mut self, text: String, line: usize) {
        self.input_file_lines.insert(text.clone(), line);
        self.input_files.push(BareLine { text, line });
    }

    pub(crate) fn add_output_reference(&mut self, text: String, line: usize) {
        self.output_reference_lines.insert(text.clone(), line);
        self.output_references.push(BareLine { text, line });
    }

    /// Latest section with this name
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.section_index.get(name).map(|&idx| &self.sections[idx])
    }

    /// Last-write-wins sections, in document order of their final header
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections
            .iter()
            .enumerate()
            .filter(|(idx, sec)| self.section_index.get(&sec.name) == Some(idx))
            .map(|(_, sec)| sec)
    }

    /// Every section header encountered, duplicates included
    pub fn all_sections(&self) -> &[Section] {
        &self.sections
    }

    /// Latest node section with this node name
    pub fn node(&self, name: &str) -> Option<&Section> {
        self.node_index.get(name).map(|&idx| &self.sections[idx])
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.node_index.contains_key(name)
    }

    /// Last-write-wins node sections, in document order
    pub fn nodes(&self) -> impl Iterator<Item = &Section> {
        self.node_sections
            .iter()
            .copied()
            .filter(|idx| {
                self.sections[*idx]
                    .node_name()
                    .and_then(|name| self.node_index.get(name))
                    == Some(idx)
            })
            .map(|idx| &self.sections[idx])
    }

    /// Every node section encountered, duplicates included
    pub fn all_node_sections(&self) -> impl Iterator<Item = &Section> {
        self.node_sections.iter().map(|&idx| &self.sections[idx])
    }

    pub fn node_count(&self) -> usize {
        self.node_index.len()
    }

    pub fn input_files(&self) -> &[BareLine] {
        &self.input_files
    }

    pub fn output_references(&self) -> &[BareLine] {
        &self.output_references
    }

    /// Line of an input file entry by text; the last occurrence wins
    pub fn input_file_line(&self, text: &str) -> Option<usize> {
        self.input_file_lines.get(text).copied()
    }

    /// Line of an output reference by text; the last occurrence wins
    pub fn output_reference_line(&self, text: &str) -> Option<usize> {
        self.output_reference_lines.get(text).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_kind_from_name() {
        let node = Section::new("node.dam", 3);
        assert_eq!(node.node_name(), Some("dam"));
        assert!(node.is_node());

        let plain = Section::new("attributes", 1);
        assert!(!plain.is_node());
        assert_eq!(plain.node_name(), None);

        // A bare prefix names no node
        assert!(!Section::new("node.", 1).is_node());
    }

    #[test]
    fn test_property_views() {
        let mut section = Section::new("node.a", 1);
        section.add_property("area", "1", 2);
        section.add_property("type", "gr4j", 3);
        section.add_property("area", "2", 4);

        assert_eq!(section.property("area").unwrap().value, "2");
        assert_eq!(section.all_properties().len(), 3);

        let keys: Vec<_> = section.properties().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["type", "area"]);
        assert_eq!(section.node_type(), Some("gr4j"));
        assert_eq!(section.end_line, 4);
    }

    #[test]
    fn test_node_views_keep_duplicates() {
        let mut model = ParsedModel::new();
        model.open_section("node.a", 1);
        model.open_section("node.b", 5);
        let last = model.open_section("node.a", 9);

        assert_eq!(model.node_count(), 2);
        assert_eq!(model.node("a").unwrap().start_line, 9);
        assert_eq!(model.all_node_sections().count(), 3);

        let order: Vec<_> = model.nodes().map(|n| n.start_line).collect();
        assert_eq!(order, vec![5, 9]);
        assert_eq!(model.section_mut(last).start_line, 9);
    }

    #[test]
    fn test_bare_line_lookup_is_last_write_wins() {
        let mut model = ParsedModel::new();
        model.add_output_reference("node.a.dsflow".to_string(), 4);
        model.add_output_reference("node.a.dsflow".to_string(), 7);

        assert_eq!(model.output_references().len(), 2);
        assert_eq!(model.output_reference_line("node.a.dsflow"), Some(7));
        assert_eq!(model.output_references()[0].line, 4);
    }
}
