//! Branching story engine with role-playing state.
//!
//! This crate provides:
//! - A node tree walked by path segments, with data-driven choice
//!   actions
//! - Role-playing state: hit points, equipment slots, achievements,
//!   progress flags
//! - Timed effects aged by a background tick loop
//! - NPC dialogue trees and one-question puzzles
//! - JSON save/load snapshots
//!
//! All mutable state sits behind a single lock shared by the API and
//! the tick task, so the two drivers never race.
//!
//! # Quick Start
//!
//! ```ignore
//! use story_engine::{Choice, Node, NodeDatabase, Story, StoryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let database = NodeDatabase::new()
//!         .with_node(
//!             "start",
//!             Node::new()
//!                 .with_condition("Forest")
//!                 .with_answer("go north", Choice::goto(["cave"])),
//!         )
//!         .with_node("cave", Node::new().with_condition("Dark cave"));
//!
//!     let mut story = Story::new(
//!         database,
//!         StoryConfig::new().with_start_path(["start"]),
//!     );
//!
//!     let node = story.step(Some("go north")).await?;
//!     println!("{}", node.condition.unwrap_or_default());
//!
//!     story.save_state("adventure.json").await?;
//!     story.stop().await;
//!     Ok(())
//! }
//! ```

pub mod effect;
pub mod node;
pub mod npc;
pub mod persist;
pub mod puzzle;
pub mod script;
pub mod story;
pub mod testing;
pub mod world;

// Primary public API
pub use effect::Effect;
pub use node::{Choice, MissingSegment, Node, NodeDatabase, NodePath};
pub use npc::{DialogueError, DialogueNode, DialogueResponse, Npc};
pub use persist::{auto_save_path, list_saves, PersistError, SaveInfo, SaveMetadata, SavedStory};
pub use puzzle::Puzzle;
pub use script::{Action, Behaviors, Hook};
pub use story::{StepError, Story, StoryConfig, StoryState};
pub use world::{
    Achievements, EquipSlot, EventLog, HealthSystem, Inventory, ItemRecord, MapTree, Message,
    MessageStyle, NodeSummary, StoryMap,
};
