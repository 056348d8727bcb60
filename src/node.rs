//! Story node tree: paths, nodes, choices, and the node database.
//!
//! Nodes are addressed by an ordered sequence of string segments
//! (a [`NodePath`]) walked key-by-key through the database. A node
//! carries optional display text, actions that run on entry, and a
//! set of labeled choices. A choice moves the cursor only when it
//! declares an explicit `next_path`, which replaces the cursor
//! wholesale.

use crate::script::Action;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Paths
// ============================================================================

/// An ordered sequence of segments identifying a node's location in
/// the story tree.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodePath(Vec<String>);

impl NodePath {
    /// The empty path. It never resolves to a node.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl From<Vec<String>> for NodePath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl From<&[&str]> for NodePath {
    fn from(segments: &[&str]) -> Self {
        Self::from_segments(segments.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for NodePath {
    fn from(segments: [&str; N]) -> Self {
        Self::from_segments(segments)
    }
}

// ============================================================================
// Nodes and Choices
// ============================================================================

/// A single unit of story content.
///
/// The `on_enter` actions run on *every* resolution of the node, not
/// just the first arrival. One-time events should guard themselves
/// with a flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Node {
    /// Display text describing the situation at this node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    /// Actions executed each time the node is resolved.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_enter: Vec<Action>,

    /// Outgoing choices, keyed by the label shown to the player.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub answers: BTreeMap<String, Choice>,

    /// Child nodes addressed by further path segments.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, Node>,
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_on_enter(mut self, action: Action) -> Self {
        self.on_enter.push(action);
        self
    }

    pub fn with_answer(mut self, label: impl Into<String>, choice: Choice) -> Self {
        self.answers.insert(label.into(), choice);
        self
    }

    pub fn with_child(mut self, segment: impl Into<String>, node: Node) -> Self {
        self.children.insert(segment.into(), node);
        self
    }

    /// Whether this node is a dead end (no outgoing choices).
    pub fn is_terminal(&self) -> bool {
        self.answers.is_empty()
    }
}

/// One selectable answer on a node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Choice {
    /// Actions executed when the choice is selected.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_select: Vec<Action>,

    /// Replacement for the path cursor. `None` leaves the cursor
    /// where it is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_path: Option<NodePath>,
}

impl Choice {
    pub fn new() -> Self {
        Self::default()
    }

    /// A choice that jumps the cursor to `path`.
    pub fn goto(path: impl Into<NodePath>) -> Self {
        Self {
            on_select: Vec::new(),
            next_path: Some(path.into()),
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.on_select.push(action);
        self
    }
}

// ============================================================================
// Database
// ============================================================================

/// The segment at which a path walk failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingSegment {
    /// The segment that was absent.
    pub segment: String,
    /// Zero-based index of the segment within the path.
    pub depth: usize,
}

/// The full story tree, supplied at engine construction and never
/// rewritten afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeDatabase {
    nodes: BTreeMap<String, Node>,
}

impl NodeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, segment: impl Into<String>, node: Node) -> Self {
        self.nodes.insert(segment.into(), node);
        self
    }

    pub fn insert(&mut self, segment: impl Into<String>, node: Node) {
        self.nodes.insert(segment.into(), node);
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Walk the database segment-by-segment.
    ///
    /// The first segment indexes the top level; each further segment
    /// indexes the previous node's children. The empty path never
    /// resolves.
    pub fn resolve(&self, path: &NodePath) -> Result<&Node, MissingSegment> {
        let mut segments = path.segments().iter().enumerate();

        let (_, first) = segments.next().ok_or_else(|| MissingSegment {
            segment: String::new(),
            depth: 0,
        })?;
        let mut node = self.nodes.get(first).ok_or_else(|| MissingSegment {
            segment: first.clone(),
            depth: 0,
        })?;

        for (depth, segment) in segments {
            node = node.children.get(segment).ok_or_else(|| MissingSegment {
                segment: segment.clone(),
                depth,
            })?;
        }
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_database() -> NodeDatabase {
        NodeDatabase::new()
            .with_node(
                "start",
                Node::new()
                    .with_condition("Forest")
                    .with_answer("go north", Choice::goto(["cave"]))
                    .with_child("clearing", Node::new().with_condition("A sunny clearing")),
            )
            .with_node("cave", Node::new().with_condition("Dark cave"))
    }

    #[test]
    fn test_resolve_top_level() {
        let db = small_database();
        let node = db.resolve(&["start"].into()).unwrap();
        assert_eq!(node.condition.as_deref(), Some("Forest"));
    }

    #[test]
    fn test_resolve_nested() {
        let db = small_database();
        let node = db.resolve(&["start", "clearing"].into()).unwrap();
        assert_eq!(node.condition.as_deref(), Some("A sunny clearing"));
    }

    #[test]
    fn test_resolve_missing_segment() {
        let db = small_database();
        let err = db.resolve(&["start", "swamp"].into()).unwrap_err();
        assert_eq!(err.segment, "swamp");
        assert_eq!(err.depth, 1);
    }

    #[test]
    fn test_empty_path_never_resolves() {
        let db = small_database();
        assert!(db.resolve(&NodePath::new()).is_err());
    }

    #[test]
    fn test_path_display() {
        let path = NodePath::from(["start", "clearing"]);
        assert_eq!(path.to_string(), "start/clearing");
    }

    #[test]
    fn test_database_from_json() {
        let json = r#"{
            "start": {
                "condition": "Forest",
                "answers": {
                    "go north": { "next_path": ["cave"] }
                }
            },
            "cave": { "condition": "Dark cave" }
        }"#;

        let db: NodeDatabase = serde_json::from_str(json).unwrap();
        assert_eq!(db.len(), 2);

        let start = db.resolve(&["start"].into()).unwrap();
        let choice = start.answers.get("go north").unwrap();
        assert_eq!(choice.next_path, Some(NodePath::from(["cave"])));
    }
}
