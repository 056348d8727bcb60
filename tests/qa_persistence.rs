//! QA tests for save/load behavior through the engine API.
//!
//! Covers the round-trip guarantees, lenient loading of partial and
//! legacy files, failure reporting through the log channel, and
//! autosave from the background loop.

use std::time::Duration;

use story_engine::testing::{sample_database, TestStory};
use story_engine::{
    auto_save_path, EquipSlot, MessageStyle, NodeDatabase, NodePath, Story, StoryConfig,
};
use tempfile::TempDir;

// =============================================================================
// ROUND TRIP
// =============================================================================

#[tokio::test]
async fn test_save_load_round_trip() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let save_path = temp_dir.path().join("journey.json");

    let harness = TestStory::new();
    harness.choose("search the bushes").await.unwrap();
    harness.choose("go north").await.unwrap();
    harness.enter().await; // the cave's entry actions set its flag
    harness.story.modify_hp(-4).await;
    harness
        .story
        .add_achievement("Wanderer", "Walked the Gloamwood")
        .await;
    harness.story.save_state(&save_path).await.unwrap();

    // A fresh story over the same database, restored from disk.
    let restored = Story::new(sample_database(), StoryConfig::new());
    restored.load_state(&save_path).await.unwrap();

    assert_eq!(restored.hp().await, 6);
    assert_eq!(restored.path().await, NodePath::from(["cave"]));
    assert!(restored.flag("found_cave").await);

    let achievements = restored.achievements().await;
    assert_eq!(achievements["Wanderer"], "Walked the Gloamwood");

    let items = restored.items().await;
    assert_eq!(items[&EquipSlot::RightHand].name, "Torch");
    assert_eq!(items[&EquipSlot::RightHand].description, "Pitch-soaked and ready");

    // The restored cursor resolves in the same database.
    let node = restored.step(None).await.unwrap();
    assert_eq!(node.condition.as_deref(), Some("A cave mouth yawns in the hillside."));
}

#[tokio::test]
async fn test_equip_behavior_name_round_trips() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let save_path = temp_dir.path().join("behavior.json");

    let story = Story::new(NodeDatabase::new(), StoryConfig::new());
    story
        .add_item(
            EquipSlot::Neck,
            "Warding Charm",
            "Hums faintly",
            Some("ward-hum".to_string()),
        )
        .await;
    story.save_state(&save_path).await.unwrap();

    let restored = Story::new(NodeDatabase::new(), StoryConfig::new());
    restored.load_state(&save_path).await.unwrap();

    let items = restored.items().await;
    assert_eq!(items[&EquipSlot::Neck].on_equip.as_deref(), Some("ward-hum"));
}

#[tokio::test]
async fn test_legacy_two_element_items_load_inert() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let save_path = temp_dir.path().join("legacy.json");

    tokio::fs::write(
        &save_path,
        r#"{
            "hp": 5,
            "inventory": { "Left hand": ["Lantern", "Dented brass"] },
            "achievements": {},
            "flags": {},
            "path": ["start"]
        }"#,
    )
    .await
    .unwrap();

    let story = Story::new(NodeDatabase::new(), StoryConfig::new());
    // Even a behavior that would match by name must not fire on load.
    story
        .register_behavior("lantern-light", |state| {
            state.set_flag("lit", true);
        })
        .await;
    story.load_state(&save_path).await.unwrap();

    let items = story.items().await;
    assert_eq!(items[&EquipSlot::LeftHand].name, "Lantern");
    assert_eq!(items[&EquipSlot::LeftHand].on_equip, None);
    assert!(!story.flag("lit").await);
    assert_eq!(story.hp().await, 5);
}

#[tokio::test]
async fn test_missing_keys_load_as_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let save_path = temp_dir.path().join("sparse.json");
    tokio::fs::write(&save_path, r#"{ "achievements": { "Lone": "Entry" } }"#)
        .await
        .unwrap();

    let story = Story::new(NodeDatabase::new(), StoryConfig::new());
    story.load_state(&save_path).await.unwrap();

    assert_eq!(story.hp().await, 0);
    assert!(story.items().await.is_empty());
    assert!(story.flags().await.is_empty());
    assert!(story.path().await.is_empty());
    assert_eq!(story.achievements().await.len(), 1);
}

// =============================================================================
// FAILURE REPORTING
// =============================================================================

#[tokio::test]
async fn test_load_missing_file_leaves_state_and_logs() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let harness = TestStory::new();
    harness.story.modify_hp(-3).await;

    let result = harness
        .story
        .load_state(temp_dir.path().join("no_such_save.json"))
        .await;
    assert!(result.is_err());

    // State untouched, failure reported through the log channel.
    assert_eq!(harness.story.hp().await, 7);
    assert_eq!(harness.story.path().await, NodePath::from(["start"]));

    let history = harness.story.log_entries().await;
    let warning = history.last().unwrap();
    assert!(warning.text.starts_with("Failed to load state"));
    assert_eq!(warning.style, Some(MessageStyle::Important));
}

#[tokio::test]
async fn test_load_malformed_file_leaves_state() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let save_path = temp_dir.path().join("corrupt.json");
    tokio::fs::write(&save_path, "{ this is not json").await.unwrap();

    let harness = TestStory::new();
    assert!(harness.story.load_state(&save_path).await.is_err());
    assert_eq!(harness.story.hp().await, 10);
    assert_eq!(harness.story.path().await, NodePath::from(["start"]));
}

#[tokio::test]
async fn test_save_to_unwritable_target_logs_warning() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    // A directory component that is actually a file.
    let blocker = temp_dir.path().join("blocker");
    tokio::fs::write(&blocker, "file, not dir").await.unwrap();

    let story = Story::new(NodeDatabase::new(), StoryConfig::new());
    let result = story.save_state(blocker.join("save.json")).await;
    assert!(result.is_err());

    let history = story.log_entries().await;
    assert!(history.last().unwrap().text.starts_with("Failed to save state"));
}

// =============================================================================
// AUTOSAVE
// =============================================================================

#[tokio::test]
async fn test_autosave_writes_loadable_snapshot() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let save_path = auto_save_path(temp_dir.path(), "Gloamwood Run");

    let mut story = Story::new(
        sample_database(),
        StoryConfig::new()
            .with_start_path(["start"])
            .with_tick_interval(Duration::from_millis(20))
            .with_autosave(&save_path),
    );
    assert!(story.is_ticking());

    story.modify_hp(-2).await;
    story.step(Some("go north")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    story.stop().await;

    assert!(save_path.exists());

    let restored = Story::new(sample_database(), StoryConfig::new());
    restored.load_state(&save_path).await.unwrap();
    assert_eq!(restored.hp().await, 8);
    assert_eq!(restored.path().await, NodePath::from(["cave"]));
}
