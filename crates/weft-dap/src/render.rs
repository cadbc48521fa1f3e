//! Display rendering for engine values.
//!
//! Pure functions from [`EngineValue`] to the short strings the
//! client sees. Child enumeration is also here because it follows the
//! same shape analysis; it is computed per request, never eagerly, so
//! deep or self-referential trees cost only what the client actually
//! expands.

use smol_str::SmolStr;
use weft_engine::{EngineValue, NodeKind, NodeValue};

const SHORT_LIMIT: usize = 20;

/// Truncate long strings to a `prefix...suffix` summary.
pub fn short_string(text: &str) -> String {
    if text.chars().count() < SHORT_LIMIT {
        return text.to_string();
    }
    let prefix: String = text.chars().take(8).collect();
    let mut tail: Vec<char> = text.chars().rev().take(8).collect();
    tail.reverse();
    let suffix: String = tail.into_iter().collect();
    format!("{prefix}...{suffix}")
}

fn node_descriptor(node: &NodeValue) -> String {
    match node.kind {
        NodeKind::Document => "document-node()".to_string(),
        NodeKind::Element => format!("<{}>", node.name),
        NodeKind::ProcessingInstruction => format!("<?{}?>", node.name),
        NodeKind::Comment => "comment()".to_string(),
        NodeKind::Namespace => format!("namespace::{}", node.name),
        NodeKind::Attribute | NodeKind::Text => unreachable!("textual kinds render by content"),
    }
}

fn quoted_text(text: &str) -> String {
    let flat = text.trim().replace('\n', "");
    format!("\"{}\"", short_string(&flat))
}

/// Short display form of a value.
pub fn display_string(value: &EngineValue) -> String {
    match value {
        EngineValue::Empty => "null".to_string(),
        EngineValue::Text(text) => quoted_text(text),
        EngineValue::Node(node) => match node.kind {
            NodeKind::Text => quoted_text(&node.text),
            NodeKind::Attribute => format!("{}=\"{}\"", node.name, short_string(&node.text)),
            _ => match &node.location {
                Some(loc) => {
                    format!("{} @{}:{}", node_descriptor(node), loc.line, loc.column)
                }
                None => node_descriptor(node),
            },
        },
        EngineValue::Sequence(items) => match items.len() {
            0 => "[]".to_string(),
            1 => display_string(&items[0]),
            n => format!("['{}' ... {}]", display_string(&items[0]), n),
        },
    }
}

/// Protocol type label of a value.
pub fn type_label(value: &EngineValue) -> &'static str {
    match value {
        EngineValue::Empty => "null",
        EngineValue::Text(_) => "String",
        EngineValue::Node(node) => node.kind.label(),
        EngineValue::Sequence(_) => "Sequence",
    }
}

fn is_whitespace_text(node: &NodeValue) -> bool {
    node.kind == NodeKind::Text && node.text.trim().is_empty()
}

/// Whether expanding the value would yield any children.
pub fn has_children(value: &EngineValue) -> bool {
    match value {
        EngineValue::Empty | EngineValue::Text(_) => false,
        EngineValue::Node(node) => node
            .children
            .iter()
            .any(|child| !is_whitespace_text(child)),
        EngineValue::Sequence(items) => !items.is_empty(),
    }
}

/// Enumerate the value's children: tree children in document order
/// (whitespace-only text skipped), sequence items in order. Names are
/// sequential indexes, matching how clients label expanded entries.
pub fn child_entries(value: &EngineValue) -> Vec<(SmolStr, EngineValue)> {
    match value {
        EngineValue::Empty | EngineValue::Text(_) => Vec::new(),
        EngineValue::Node(node) => node
            .children
            .iter()
            .filter(|child| !is_whitespace_text(child))
            .enumerate()
            .map(|(i, child)| {
                (
                    SmolStr::new(i.to_string()),
                    EngineValue::Node(child.clone()),
                )
            })
            .collect(),
        EngineValue::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| (SmolStr::new(i.to_string()), item.clone()))
            .collect(),
    }
}
