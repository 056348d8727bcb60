//! Data-driven dispatch for node, choice, effect, and puzzle hooks.
//!
//! Story content carries [`Action`]s — a closed, serializable set of
//! state mutations — instead of opaque callbacks, so adventures can
//! be authored as plain data. Anything the closed set cannot express
//! goes through [`Action::Invoke`] and the [`Behaviors`] registry of
//! named native hooks.
//!
//! Actions always run synchronously, inside the same mutual-exclusion
//! scope as the call that triggered them.

use crate::effect::Effect;
use crate::node::NodePath;
use crate::story::StoryState;
use crate::world::{EquipSlot, ItemRecord, MessageStyle};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// One scripted mutation of story state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    /// Apply a hit-point delta (clamped at zero).
    ModifyHp { amount: i32 },

    /// Place an item in an equipment slot, firing its equip behavior.
    AddItem {
        slot: EquipSlot,
        name: String,
        description: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on_equip: Option<String>,
    },

    /// Clear an equipment slot.
    RemoveItem { slot: EquipSlot },

    /// Record an achievement (overwrites an existing name).
    AddAchievement { name: String, description: String },

    /// Set a boolean progress flag.
    SetFlag { name: String, value: bool },

    /// Append a message to the event log and the frame buffer.
    Log {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        style: Option<MessageStyle>,
    },

    /// Register a timed effect, running its apply hooks immediately.
    ApplyEffect { effect: Effect },

    /// Replace the main path cursor.
    JumpTo { path: NodePath },

    /// Run a named behavior from the registry.
    Invoke { behavior: String },
}

/// A native hook invocable by name.
pub type Hook = Arc<dyn Fn(&mut StoryState) + Send + Sync>;

/// Registry of named native hooks.
///
/// Behaviors cover what the closed [`Action`] set cannot: branching
/// on current state, computed mutations, host-side effects. Item
/// records and tick hooks reference behaviors by name so the
/// reference survives serialization.
#[derive(Clone, Default)]
pub struct Behaviors {
    hooks: HashMap<String, Hook>,
}

impl Behaviors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook under a name, replacing any previous holder.
    pub fn register<F>(&mut self, name: impl Into<String>, hook: F)
    where
        F: Fn(&mut StoryState) + Send + Sync + 'static,
    {
        self.hooks.insert(name.into(), Arc::new(hook));
    }

    pub fn get(&self, name: &str) -> Option<Hook> {
        self.hooks.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.hooks.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl fmt::Debug for Behaviors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Behaviors")
            .field("names", &self.hooks.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Run a sequence of actions against the engine state.
pub(crate) fn run(actions: &[Action], state: &mut StoryState) {
    for action in actions {
        apply(action, state);
    }
}

fn apply(action: &Action, state: &mut StoryState) {
    match action {
        Action::ModifyHp { amount } => {
            state.health.modify(*amount);
        }
        Action::AddItem {
            slot,
            name,
            description,
            on_equip,
        } => {
            let mut item = ItemRecord::new(name.clone(), description.clone());
            item.on_equip = on_equip.clone();
            state.equip_item(*slot, item);
        }
        Action::RemoveItem { slot } => {
            state.inventory.remove(*slot);
        }
        Action::AddAchievement { name, description } => {
            state.achievements.add(name.clone(), description.clone());
        }
        Action::SetFlag { name, value } => {
            state.set_flag(name.clone(), *value);
        }
        Action::Log { message, style } => {
            state.log_event(message.clone(), *style);
        }
        Action::ApplyEffect { effect } => {
            state.apply_effect(effect.clone());
        }
        Action::JumpTo { path } => {
            state.path = path.clone();
        }
        Action::Invoke { behavior } => {
            state.invoke(behavior);
        }
    }
}
