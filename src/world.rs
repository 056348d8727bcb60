//! Role-playing state types: health, inventory, achievements, the
//! event log, and the visited-node map.
//!
//! These are the leaf subsystems owned by [`Story`](crate::Story).
//! None of them knows about node traversal; they are plain state with
//! small, total APIs.

use crate::node::{Node, NodePath};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Health
// ============================================================================

/// Bounded hit-point counter: clamped at zero on decrease, unbounded
/// above.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSystem {
    hp: i32,
}

impl HealthSystem {
    /// Starting hit points for a fresh story.
    pub const DEFAULT_HP: i32 = 10;

    pub fn new(initial_hp: i32) -> Self {
        Self {
            hp: initial_hp.max(0),
        }
    }

    /// Apply a delta and return the new value. Never goes below zero.
    pub fn modify(&mut self, amount: i32) -> i32 {
        self.hp = (self.hp + amount).max(0);
        self.hp
    }

    pub fn hp(&self) -> i32 {
        self.hp
    }

    pub fn is_dead(&self) -> bool {
        self.hp == 0
    }
}

impl Default for HealthSystem {
    fn default() -> Self {
        Self::new(Self::DEFAULT_HP)
    }
}

// ============================================================================
// Inventory
// ============================================================================

/// The eleven fixed equipment slots.
///
/// The slot set never changes after construction; only slot contents
/// are replaced or cleared.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum EquipSlot {
    Head,
    Neck,
    Ears,
    Mouth,
    #[serde(rename = "Right hand")]
    RightHand,
    #[serde(rename = "Left hand")]
    LeftHand,
    Back,
    #[serde(rename = "Right leg")]
    RightLeg,
    #[serde(rename = "Left leg")]
    LeftLeg,
    #[serde(rename = "Right leg bottom")]
    RightLegBottom,
    #[serde(rename = "Left leg bottom")]
    LeftLegBottom,
}

impl EquipSlot {
    pub fn name(&self) -> &'static str {
        match self {
            EquipSlot::Head => "Head",
            EquipSlot::Neck => "Neck",
            EquipSlot::Ears => "Ears",
            EquipSlot::Mouth => "Mouth",
            EquipSlot::RightHand => "Right hand",
            EquipSlot::LeftHand => "Left hand",
            EquipSlot::Back => "Back",
            EquipSlot::RightLeg => "Right leg",
            EquipSlot::LeftLeg => "Left leg",
            EquipSlot::RightLegBottom => "Right leg bottom",
            EquipSlot::LeftLegBottom => "Left leg bottom",
        }
    }

    /// Look a slot up by its display name, as used in save files.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|slot| slot.name() == name)
    }

    pub fn all() -> [EquipSlot; 11] {
        [
            EquipSlot::Head,
            EquipSlot::Neck,
            EquipSlot::Ears,
            EquipSlot::Mouth,
            EquipSlot::RightHand,
            EquipSlot::LeftHand,
            EquipSlot::Back,
            EquipSlot::RightLeg,
            EquipSlot::LeftLeg,
            EquipSlot::RightLegBottom,
            EquipSlot::LeftLegBottom,
        ]
    }
}

impl fmt::Display for EquipSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An item held in an equipment slot.
///
/// `on_equip` names a behavior in the engine's registry rather than
/// holding a closure, so the reference survives a save/load
/// round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_equip: Option<String>,
}

impl ItemRecord {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            on_equip: None,
        }
    }

    pub fn with_behavior(mut self, behavior: impl Into<String>) -> Self {
        self.on_equip = Some(behavior.into());
        self
    }
}

/// Fixed-slot inventory. Each slot holds at most one item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    items: BTreeMap<EquipSlot, ItemRecord>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place an item in a slot, returning whatever it replaced.
    pub fn insert(&mut self, slot: EquipSlot, item: ItemRecord) -> Option<ItemRecord> {
        self.items.insert(slot, item)
    }

    pub fn remove(&mut self, slot: EquipSlot) -> Option<ItemRecord> {
        self.items.remove(&slot)
    }

    pub fn get(&self, slot: EquipSlot) -> Option<&ItemRecord> {
        self.items.get(&slot)
    }

    /// Occupied slots only.
    pub fn items(&self) -> &BTreeMap<EquipSlot, ItemRecord> {
        &self.items
    }

    pub fn occupied(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ============================================================================
// Achievements
// ============================================================================

/// Append-only achievement record. Names are unique; re-adding a name
/// overwrites its description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Achievements {
    entries: BTreeMap<String, String>,
}

impl Achievements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, description: impl Into<String>) {
        self.entries.insert(name.into(), description.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Messages and the Event Log
// ============================================================================

/// Rendering hint attached to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStyle {
    Info,
    Important,
    Sound,
    Animation,
}

impl fmt::Display for MessageStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageStyle::Info => "info",
            MessageStyle::Important => "important",
            MessageStyle::Sound => "sound",
            MessageStyle::Animation => "animation",
        };
        write!(f, "{name}")
    }
}

/// One line destined for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub style: Option<MessageStyle>,
}

impl Message {
    pub fn new(text: impl Into<String>, style: Option<MessageStyle>) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// Ordered, append-only record of everything the engine announced.
///
/// The log keeps the full history; the per-frame message buffer the
/// renderer drains lives on the engine state and is merely a mirror
/// of recent entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    entries: Vec<Message>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.entries.push(message);
    }

    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    pub fn last(&self) -> Option<&Message> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Story Map
// ============================================================================

/// What the map remembers about a visited node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeSummary {
    pub condition: Option<String>,
    pub answers: Vec<String>,
}

/// Every node path the cursor has resolved, for introspection and
/// debug rendering. Purely additive; never pruned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoryMap {
    visited: BTreeMap<NodePath, NodeSummary>,
}

impl StoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, path: &NodePath, node: &Node) {
        self.visited.insert(
            path.clone(),
            NodeSummary {
                condition: node.condition.clone(),
                answers: node.answers.keys().cloned().collect(),
            },
        );
    }

    pub fn contains(&self, path: &NodePath) -> bool {
        self.visited.contains_key(path)
    }

    pub fn visited(&self) -> &BTreeMap<NodePath, NodeSummary> {
        &self.visited
    }

    pub fn len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }

    /// Collapse the visited paths into a nested tree of segments.
    pub fn tree(&self) -> MapTree {
        let mut root = MapTree::default();
        for path in self.visited.keys() {
            let mut current = &mut root;
            for segment in path.segments() {
                current = current.children.entry(segment.clone()).or_default();
            }
        }
        root
    }
}

/// Nested rendering of the visited paths.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MapTree {
    pub children: BTreeMap<String, MapTree>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Choice;

    #[test]
    fn test_hp_never_negative() {
        let mut health = HealthSystem::new(5);
        health.modify(-3);
        assert_eq!(health.hp(), 2);
        health.modify(-10);
        assert_eq!(health.hp(), 0);
        assert!(health.is_dead());
    }

    #[test]
    fn test_hp_unbounded_above() {
        let mut health = HealthSystem::default();
        health.modify(1000);
        assert_eq!(health.hp(), HealthSystem::DEFAULT_HP + 1000);
    }

    #[test]
    fn test_hp_sum_of_deltas() {
        let mut health = HealthSystem::new(10);
        for delta in [-4, 2, -1, 5] {
            health.modify(delta);
        }
        assert_eq!(health.hp(), 12);
    }

    #[test]
    fn test_inventory_add_remove() {
        let mut inventory = Inventory::new();
        inventory.insert(EquipSlot::RightHand, ItemRecord::new("Sword", "Sharp"));
        inventory.insert(EquipSlot::Head, ItemRecord::new("Helmet", "Dented"));
        assert_eq!(inventory.occupied(), 2);

        let removed = inventory.remove(EquipSlot::RightHand).unwrap();
        assert_eq!(removed.name, "Sword");
        assert_eq!(inventory.occupied(), 1);
        assert!(inventory.get(EquipSlot::RightHand).is_none());
    }

    #[test]
    fn test_inventory_slot_replaced() {
        let mut inventory = Inventory::new();
        inventory.insert(EquipSlot::Back, ItemRecord::new("Satchel", "Worn"));
        let old = inventory
            .insert(EquipSlot::Back, ItemRecord::new("Pack", "Roomy"))
            .unwrap();
        assert_eq!(old.name, "Satchel");
        assert_eq!(inventory.get(EquipSlot::Back).unwrap().name, "Pack");
        assert_eq!(inventory.occupied(), 1);
    }

    #[test]
    fn test_slot_names_round_trip() {
        for slot in EquipSlot::all() {
            assert_eq!(EquipSlot::from_name(slot.name()), Some(slot));
        }
        assert_eq!(EquipSlot::from_name("Tail"), None);
    }

    #[test]
    fn test_slot_serde_uses_display_names() {
        let json = serde_json::to_string(&EquipSlot::RightLegBottom).unwrap();
        assert_eq!(json, "\"Right leg bottom\"");
    }

    #[test]
    fn test_achievements_overwrite() {
        let mut achievements = Achievements::new();
        achievements.add("First Steps", "Left the village");
        achievements.add("First Steps", "Left the village at dawn");
        assert_eq!(achievements.len(), 1);
        assert_eq!(
            achievements.get("First Steps"),
            Some("Left the village at dawn")
        );
    }

    #[test]
    fn test_event_log_keeps_order() {
        let mut log = EventLog::new();
        log.push(Message::new("first", None));
        log.push(Message::new("second", Some(MessageStyle::Important)));
        let entries = log.entries();
        assert_eq!(entries[0].text, "first");
        assert_eq!(entries[1].style, Some(MessageStyle::Important));
    }

    #[test]
    fn test_story_map_tree() {
        let mut map = StoryMap::new();
        let node = Node::new()
            .with_condition("Forest")
            .with_answer("go north", Choice::goto(["cave"]));
        map.register(&["start"].into(), &node);
        map.register(&["start", "clearing"].into(), &Node::new());
        map.register(&["cave"].into(), &Node::new());

        assert_eq!(map.len(), 3);
        assert_eq!(
            map.visited()[&NodePath::from(["start"])].answers,
            vec!["go north".to_string()]
        );

        let tree = map.tree();
        assert!(tree.children["start"].children.contains_key("clearing"));
        assert!(tree.children.contains_key("cave"));
    }
}
