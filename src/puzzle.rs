//! Single-question multiple-choice puzzles.

use crate::script::{self, Action};
use crate::story::StoryState;
use crate::world::MessageStyle;
use serde::{Deserialize, Serialize};

/// A multiple-choice check with success and failure hooks.
///
/// Puzzles are stateless across attempts: there is no lockout, and a
/// puzzle can be attempted repeatedly with different outcomes each
/// time. Only the log entries and hooks distinguish one attempt from
/// the next.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Puzzle {
    pub question: String,
    pub options: Vec<String>,
    pub answer_index: usize,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_success: Vec<Action>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_fail: Vec<Action>,
}

impl Puzzle {
    pub fn new(
        question: impl Into<String>,
        options: Vec<String>,
        answer_index: usize,
    ) -> Self {
        Self {
            question: question.into(),
            options,
            answer_index,
            on_success: Vec::new(),
            on_fail: Vec::new(),
        }
    }

    pub fn with_success(mut self, action: Action) -> Self {
        self.on_success.push(action);
        self
    }

    pub fn with_fail(mut self, action: Action) -> Self {
        self.on_fail.push(action);
        self
    }

    /// Evaluate one attempt.
    ///
    /// Fires exactly one of the success/failure hook sets, logs the
    /// outcome, and returns whether the choice matched.
    pub fn attempt(&self, state: &mut StoryState, choice_index: usize) -> bool {
        if choice_index == self.answer_index {
            script::run(&self.on_success, state);
            state.log_event(
                format!("Puzzle solved: {}", self.question),
                Some(MessageStyle::Info),
            );
            true
        } else {
            script::run(&self.on_fail, state);
            state.log_event(
                format!("Puzzle failed: {}", self.question),
                Some(MessageStyle::Info),
            );
            false
        }
    }
}
