//! Timed story effects.
//!
//! An effect is a named modifier with a remaining-tick counter. Its
//! `on_apply` actions run once, synchronously, when the effect is
//! registered; its `on_expire` actions run when the counter reaches
//! zero during a tick. Registering a second effect under the same
//! name silently replaces the first without firing its expiry.

use crate::script::Action;
use serde::{Deserialize, Serialize};

/// A timed modifier owned by the engine's active-effect set.
///
/// Durations of zero or less expire on the first tick after
/// registration without re-running `on_apply`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Effect {
    pub name: String,

    /// Ticks left before expiry. Decremented once per tick.
    pub remaining: i32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_apply: Vec<Action>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_expire: Vec<Action>,
}

impl Effect {
    pub fn new(name: impl Into<String>, duration: i32) -> Self {
        Self {
            name: name.into(),
            remaining: duration,
            on_apply: Vec::new(),
            on_expire: Vec::new(),
        }
    }

    pub fn with_apply(mut self, action: Action) -> Self {
        self.on_apply.push(action);
        self
    }

    pub fn with_expire(mut self, action: Action) -> Self {
        self.on_expire.push(action);
        self
    }
}
