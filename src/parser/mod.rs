//! Model File Parser
//!
//! Turns model text into a [`ParsedModel`]. Parsing never fails: lines that
//! do not form a statement are skipped so validation can still report on the
//! rest of the document.

pub mod ast;
pub mod lexer;

pub use ast::{
    BareLine, ParsedModel, Property, Section, SectionKind, INPUTS_SECTION, NODE_SECTION_PREFIX,
    OUTPUTS_SECTION,
};
pub use lexer::{classify_line, is_continuation, strip_comment, LineKind};

/// Parse a whole model document
pub fn parse(content: &str) -> ParsedModel {
    let lines: Vec<&str> = content.lines().collect();
    let mut model = ParsedModel::new();
    let mut current: Option<usize> = None;
    let mut skipped = 0usize;
    let mut idx = 0;

    while idx < lines.len() {
        let line_number = idx + 1;
        let stripped = strip_comment(lines[idx]);
        idx += 1;

        match classify_line(stripped) {
            LineKind::Blank => {}
            LineKind::Header(name) => {
                current = Some(model.open_section(name, line_number));
            }
            LineKind::KeyValue { key, value } => {
                let Some(section_idx) = current else {
                    log::trace!("line {}: property outside of any section", line_number);
                    skipped += 1;
                    continue;
                };

                let (value, next) = merge_continuations(&lines, idx, value);
                let section = model.section_mut(section_idx);
                section.add_property(key, value, line_number);
                section.touch(next);
                idx = next;
            }
            LineKind::Bare(text) => {
                let Some(section_idx) = current else {
                    log::trace!("line {}: statement outside of any section", line_number);
                    skipped += 1;
                    continue;
                };

                let section_name = model.section_mut(section_idx).name.clone();
                if section_name != INPUTS_SECTION && section_name != OUTPUTS_SECTION {
                    log::trace!(
                        "line {}: bare line in section [{}] ignored",
                        line_number,
                        section_name
                    );
                    skipped += 1;
                    continue;
                }

                let (text, next) = merge_continuations(&lines, idx, text);
                model.section_mut(section_idx).touch(next);
                if section_name == INPUTS_SECTION {
                    model.add_input_file(text, line_number);
                } else {
                    model.add_output_reference(text, line_number);
                }
                idx = next;
            }
        }
    }

    log::debug!(
        "parsed {} lines: {} sections, {} nodes, {} skipped",
        lines.len(),
        model.all_sections().len(),
        model.node_count(),
        skipped
    );

    model
}

/// Join continuation lines onto `first`
///
/// Returns the merged text and the index of the first line that is not a
/// continuation. Continuations that are empty after comment stripping add
/// nothing.
fn merge_continuations(lines: &[&str], mut idx: usize, first: &str) -> (String, usize) {
    let mut merged = first.to_string();

    while idx < lines.len() && is_continuation(lines[idx]) {
        let part = strip_comment(lines[idx]).trim();
        if !part.is_empty() {
            if !merged.is_empty() {
                merged.push(' ');
            }
            merged.push_str(part);
        }
        idx += 1;
    }

    (merged, idx)
}
