//! Testing utilities for the story engine.
//!
//! This module provides:
//! - `sample_database` / `sample_story`, a small adventure touching
//!   every engine feature
//! - `TestStory`, a thin harness over [`Story`] for scripted
//!   scenarios
//! - Assertion helpers for verifying engine state

use crate::effect::Effect;
use crate::node::{Choice, Node, NodeDatabase, NodePath};
use crate::npc::{DialogueNode, Npc};
use crate::script::Action;
use crate::story::{StepError, Story, StoryConfig};
use crate::world::{EquipSlot, MessageStyle};
use std::collections::BTreeMap;

/// A compact adventure used by the test suites and demos.
///
/// Layout: `start` (forest road) → `cave` → `cave/depths`, with an
/// item pickup, a flag set on cave entry, a timed torch effect, and
/// an achievement at the bottom.
pub fn sample_database() -> NodeDatabase {
    NodeDatabase::new()
        .with_node(
            "start",
            Node::new()
                .with_condition("The Gloamwood crowds the road on both sides.")
                .with_answer(
                    "search the bushes",
                    Choice::new()
                        .with_action(Action::AddItem {
                            slot: EquipSlot::RightHand,
                            name: "Torch".to_string(),
                            description: "Pitch-soaked and ready".to_string(),
                            on_equip: None,
                        })
                        .with_action(Action::Log {
                            message: "You find a torch in the undergrowth.".to_string(),
                            style: Some(MessageStyle::Info),
                        }),
                )
                .with_answer("go north", Choice::goto(["cave"])),
        )
        .with_node(
            "cave",
            Node::new()
                .with_condition("A cave mouth yawns in the hillside.")
                .with_on_enter(Action::SetFlag {
                    name: "found_cave".to_string(),
                    value: true,
                })
                .with_answer(
                    "light the torch",
                    Choice::new().with_action(Action::ApplyEffect {
                        effect: Effect::new("torch-light", 3)
                            .with_apply(Action::Log {
                                message: "The torch sputters to life.".to_string(),
                                style: Some(MessageStyle::Sound),
                            })
                            .with_expire(Action::Log {
                                message: "The torch gutters out.".to_string(),
                                style: Some(MessageStyle::Important),
                            }),
                    }),
                )
                .with_answer("descend", Choice::goto(["cave", "depths"]))
                .with_child(
                    "depths",
                    Node::new()
                        .with_condition("The dark swallows your footsteps.")
                        .with_on_enter(Action::AddAchievement {
                            name: "Spelunker".to_string(),
                            description: "Reached the depths".to_string(),
                        })
                        .with_answer("climb back", Choice::goto(["cave"])),
                ),
        )
}

/// An NPC to go with [`sample_database`].
pub fn sample_npc() -> Npc {
    let dialogue = DialogueNode::new("Turn back, traveler.")
        .with_response("why?", ["warning"])
        .with_child(
            "warning",
            DialogueNode::new("The cave takes more than it gives.")
                .with_response("leave", NodePath::new()),
        );
    Npc::new("Hermit", dialogue)
}

/// A story over [`sample_database`], cursor at `start`, no ticker.
pub fn sample_story() -> Story {
    Story::new(
        sample_database(),
        StoryConfig::new().with_start_path(["start"]),
    )
}

/// Harness for running scripted story scenarios.
pub struct TestStory {
    /// The story under test.
    pub story: Story,
}

impl TestStory {
    /// Create a harness over the sample adventure.
    pub fn new() -> Self {
        Self {
            story: sample_story(),
        }
    }

    /// Create a harness over a custom database, starting at `start`.
    pub fn with_database(database: NodeDatabase) -> Self {
        Self {
            story: Story::new(database, StoryConfig::new().with_start_path(["start"])),
        }
    }

    /// Step with an answer.
    pub async fn choose(&self, answer: &str) -> Result<Node, StepError> {
        self.story.step(Some(answer)).await
    }

    /// Step without an answer, asserting the path resolves.
    pub async fn enter(&self) -> Node {
        self.story
            .step(None)
            .await
            .expect("current path should resolve")
    }

    /// The current node's condition text.
    pub async fn condition(&self) -> Option<String> {
        self.story.current_node().await.and_then(|n| n.condition)
    }

    pub async fn hp(&self) -> i32 {
        self.story.hp().await
    }

    pub async fn has_achievement(&self, name: &str) -> bool {
        self.story.achievements().await.contains_key(name)
    }

    pub async fn flag(&self, name: &str) -> bool {
        self.story.flag(name).await
    }

    /// Drained frame buffer texts, discarding styles.
    pub async fn message_texts(&self) -> Vec<String> {
        self.story
            .drain_messages()
            .await
            .into_iter()
            .map(|m| m.text)
            .collect()
    }
}

impl Default for TestStory {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert a node displays the expected condition text.
#[track_caller]
pub fn assert_condition(node: &Node, expected: &str) {
    assert_eq!(
        node.condition.as_deref(),
        Some(expected),
        "Expected condition '{expected}', got {:?}",
        node.condition
    );
}

/// Assert a node offers exactly the given choice labels.
#[track_caller]
pub fn assert_answers(node: &Node, expected: &[&str]) {
    let labels: Vec<&str> = node.answers.keys().map(String::as_str).collect();
    assert_eq!(
        labels, expected,
        "Expected choices {expected:?}, got {labels:?}"
    );
}

/// Assert an achievements map contains a name with the expected
/// description.
#[track_caller]
pub fn assert_achievement(achievements: &BTreeMap<String, String>, name: &str, description: &str) {
    assert_eq!(
        achievements.get(name).map(String::as_str),
        Some(description),
        "Expected achievement '{name}': '{description}'"
    );
}
