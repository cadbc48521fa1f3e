//! Engine-native values as the trace hook sees them.
//!
//! Values handed to the adapter are snapshots: the engine keeps
//! mutating its own state after a callback returns, so anything lazy
//! must be forced before it crosses this boundary. Tree and sequence
//! values are `Arc`-shared, which keeps frames cheap to clone while a
//! session is paused.

use std::sync::Arc;

use smol_str::SmolStr;

/// A position in an engine source file. Engine convention: lines and
/// columns are 1-based. The client boundary translates lines exactly
/// once, in the adapter's protocol layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub path: SmolStr,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(path: impl Into<SmolStr>, line: u32, column: u32) -> Self {
        Self {
            path: path.into(),
            line,
            column,
        }
    }
}

/// Node kinds an engine can report for tree-shaped values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
    Namespace,
}

impl NodeKind {
    /// Protocol-facing type label.
    pub fn label(self) -> &'static str {
        match self {
            NodeKind::Document => "DOCUMENT",
            NodeKind::Element => "ELEMENT",
            NodeKind::Attribute => "ATTRIBUTE",
            NodeKind::Text => "TEXT",
            NodeKind::Comment => "COMMENT",
            NodeKind::ProcessingInstruction => "PROCESSING_INSTRUCTION",
            NodeKind::Namespace => "NAMESPACE",
        }
    }
}

/// One node of a tree-shaped value, with its children in document
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeValue {
    pub kind: NodeKind,
    pub name: SmolStr,
    /// String value of the node (concatenated text for containers).
    pub text: SmolStr,
    pub location: Option<SourceLocation>,
    pub children: Vec<Arc<NodeValue>>,
}

impl NodeValue {
    pub fn new(kind: NodeKind, name: impl Into<SmolStr>) -> Self {
        Self {
            kind,
            name: name.into(),
            text: SmolStr::default(),
            location: None,
            children: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<SmolStr>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_children(mut self, children: Vec<NodeValue>) -> Self {
        self.children = children.into_iter().map(Arc::new).collect();
        self
    }
}

/// The closed set of engine-native value shapes.
///
/// Rendering code matches exhaustively on this enum, so an engine
/// value category the adapter cannot display is a compile error
/// rather than something silently stringified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineValue {
    /// Absent value.
    Empty,
    /// Atomic textual item.
    Text(SmolStr),
    /// Tree-shaped value.
    Node(Arc<NodeValue>),
    /// Materialized ordered sequence.
    Sequence(Arc<[EngineValue]>),
}

impl EngineValue {
    pub fn text(value: impl Into<SmolStr>) -> Self {
        EngineValue::Text(value.into())
    }

    pub fn node(node: NodeValue) -> Self {
        EngineValue::Node(Arc::new(node))
    }

    pub fn sequence(items: impl Into<Vec<EngineValue>>) -> Self {
        EngineValue::Sequence(items.into().into())
    }
}
