//! NPC dialogue trees.
//!
//! Each NPC owns a private dialogue tree and cursor, walked the same
//! way as the main story tree but entirely independent of it.
//! Failures here are [`DialogueError`]s, a type distinct from the
//! engine's [`StepError`](crate::StepError), so a broken conversation
//! never looks like a broken story.

use crate::node::NodePath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from walking an NPC's dialogue tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DialogueError {
    #[error("no dialogue node at '{path}'")]
    InvalidPath { path: NodePath },

    #[error("no such response: '{choice}'")]
    InvalidChoice { choice: String },
}

/// One node of an NPC's dialogue tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DialogueNode {
    /// What the NPC says at this point in the conversation.
    #[serde(default)]
    pub text: String,

    /// Player responses, keyed by the label shown to the player.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub responses: BTreeMap<String, DialogueResponse>,

    /// Deeper dialogue nodes addressed by path segments.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, DialogueNode>,
}

impl DialogueNode {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            responses: BTreeMap::new(),
            children: BTreeMap::new(),
        }
    }

    pub fn with_response(
        mut self,
        label: impl Into<String>,
        next: impl Into<NodePath>,
    ) -> Self {
        self.responses.insert(
            label.into(),
            DialogueResponse { next: next.into() },
        );
        self
    }

    pub fn with_child(mut self, segment: impl Into<String>, node: DialogueNode) -> Self {
        self.children.insert(segment.into(), node);
        self
    }
}

/// Where a response moves the NPC's cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueResponse {
    pub next: NodePath,
}

/// A character the player can talk to.
///
/// The cursor starts at the tree root (the empty path resolves to the
/// root dialogue node, unlike the main story tree).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Npc {
    pub name: String,
    dialogue: DialogueNode,
    cursor: NodePath,
}

impl Npc {
    pub fn new(name: impl Into<String>, dialogue: DialogueNode) -> Self {
        Self {
            name: name.into(),
            dialogue,
            cursor: NodePath::new(),
        }
    }

    /// The node the cursor currently points at.
    pub fn current(&self) -> Result<&DialogueNode, DialogueError> {
        self.node_at(&self.cursor)
    }

    pub fn cursor(&self) -> &NodePath {
        &self.cursor
    }

    /// Restart the conversation from the tree root.
    pub fn reset(&mut self) {
        self.cursor = NodePath::new();
    }

    /// Advance the conversation.
    ///
    /// Without a choice, returns the current node. With a choice,
    /// looks it up among the current node's responses: unknown labels
    /// return [`DialogueError::InvalidChoice`]; a known label moves
    /// the cursor to the response's `next` path and returns the node
    /// there. The cursor only moves once the destination resolves.
    pub fn talk(&mut self, choice: Option<&str>) -> Result<DialogueNode, DialogueError> {
        let node = self.node_at(&self.cursor)?;

        let Some(choice) = choice else {
            return Ok(node.clone());
        };

        let response =
            node.responses
                .get(choice)
                .ok_or_else(|| DialogueError::InvalidChoice {
                    choice: choice.to_string(),
                })?;

        let next = response.next.clone();
        let destination = self.node_at(&next)?.clone();
        self.cursor = next;
        Ok(destination)
    }

    fn node_at(&self, path: &NodePath) -> Result<&DialogueNode, DialogueError> {
        let mut node = &self.dialogue;
        for segment in path.segments() {
            node = node
                .children
                .get(segment)
                .ok_or_else(|| DialogueError::InvalidPath { path: path.clone() })?;
        }
        Ok(node)
    }
}
