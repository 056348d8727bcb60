//! QA tests for effect lifecycle and the background tick loop.
//!
//! Effect aging is exercised deterministically through the manual
//! `tick()`; the background task tests use short real intervals with
//! generous margins.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use story_engine::{Action, Effect, NodeDatabase, Story, StoryConfig};

// =============================================================================
// EFFECT LIFECYCLE
// =============================================================================

#[tokio::test]
async fn test_apply_hooks_run_at_registration() {
    let story = Story::new(NodeDatabase::new(), StoryConfig::new());

    story
        .apply_effect(Effect::new("blessing", 3).with_apply(Action::ModifyHp { amount: 5 }))
        .await;

    // Applied synchronously, not deferred to the next tick.
    assert_eq!(story.hp().await, 15);
    assert_eq!(story.active_effects().await.len(), 1);
}

#[tokio::test]
async fn test_duration_one_expires_after_one_tick() {
    let story = Story::new(NodeDatabase::new(), StoryConfig::new());

    story
        .apply_effect(Effect::new("adrenaline", 1).with_expire(Action::SetFlag {
            name: "crashed".to_string(),
            value: true,
        }))
        .await;

    assert!(!story.flag("crashed").await);
    story.tick().await;
    assert!(story.flag("crashed").await);
    assert!(story.active_effects().await.is_empty());
}

#[tokio::test]
async fn test_zero_and_negative_durations_expire_immediately() {
    let story = Story::new(NodeDatabase::new(), StoryConfig::new());
    let applies = Arc::new(AtomicUsize::new(0));

    for (name, duration) in [("stumble", 0), ("echo", -4)] {
        let applies = applies.clone();
        story
            .register_behavior(format!("count-{name}"), move |_| {
                applies.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        story
            .apply_effect(
                Effect::new(name, duration)
                    .with_apply(Action::Invoke {
                        behavior: format!("count-{name}"),
                    })
                    .with_expire(Action::ModifyHp { amount: -1 }),
            )
            .await;
    }
    assert_eq!(applies.load(Ordering::SeqCst), 2);

    story.tick().await;
    assert!(story.active_effects().await.is_empty());
    assert_eq!(story.hp().await, 8);

    // No re-application on later ticks.
    story.tick().await;
    assert_eq!(applies.load(Ordering::SeqCst), 2);
    assert_eq!(story.hp().await, 8);
}

#[tokio::test]
async fn test_same_name_replaces_without_expiry() {
    let story = Story::new(NodeDatabase::new(), StoryConfig::new());

    story
        .apply_effect(Effect::new("torch-light", 1).with_expire(Action::SetFlag {
            name: "first_expired".to_string(),
            value: true,
        }))
        .await;

    // Re-registering under the same name swallows the first silently.
    story.apply_effect(Effect::new("torch-light", 3)).await;
    assert!(!story.flag("first_expired").await);
    assert_eq!(story.active_effects().await.len(), 1);

    story.tick().await;
    let effects = story.active_effects().await;
    assert_eq!(effects[0].remaining, 2);
    assert!(!story.flag("first_expired").await);
}

#[tokio::test]
async fn test_expiry_can_chain_effects() {
    let story = Story::new(NodeDatabase::new(), StoryConfig::new());

    story
        .apply_effect(Effect::new("fever", 1).with_expire(Action::ApplyEffect {
            effect: Effect::new("chills", 2).with_expire(Action::SetFlag {
                name: "recovered".to_string(),
                value: true,
            }),
        }))
        .await;

    story.tick().await;
    let effects = story.active_effects().await;
    assert_eq!(effects.len(), 1);
    assert_eq!(effects[0].name, "chills");

    story.tick().await;
    story.tick().await;
    assert!(story.active_effects().await.is_empty());
    assert!(story.flag("recovered").await);
}

// =============================================================================
// BACKGROUND TICK LOOP
// =============================================================================

#[tokio::test]
async fn test_ticker_invokes_hook_and_ages_effects() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let hook_ticks = ticks.clone();

    let mut story = Story::new(
        NodeDatabase::new(),
        StoryConfig::new()
            .with_tick_interval(Duration::from_millis(20))
            .with_tick_hook(move |_| {
                hook_ticks.fetch_add(1, Ordering::SeqCst);
            }),
    );
    assert!(story.is_ticking());

    story
        .apply_effect(Effect::new("echo", 2).with_expire(Action::SetFlag {
            name: "faded".to_string(),
            value: true,
        }))
        .await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    story.stop().await;

    assert!(ticks.load(Ordering::SeqCst) >= 2);
    assert!(story.flag("faded").await);
    assert!(story.active_effects().await.is_empty());
}

#[tokio::test]
async fn test_stop_halts_the_loop() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let hook_ticks = ticks.clone();

    let mut story = Story::new(
        NodeDatabase::new(),
        StoryConfig::new()
            .with_tick_interval(Duration::from_millis(10))
            .with_tick_hook(move |_| {
                hook_ticks.fetch_add(1, Ordering::SeqCst);
            }),
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    story.stop().await;
    assert!(!story.is_ticking());

    let after_stop = ticks.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), after_stop);

    // Idempotent.
    story.stop().await;
}

#[tokio::test]
async fn test_tick_hook_sees_engine_state() {
    let mut story = Story::new(
        NodeDatabase::new(),
        StoryConfig::new()
            .with_tick_interval(Duration::from_millis(10))
            .with_tick_hook(|state| {
                // Starvation: lose a hit point per tick.
                state.health.modify(-1);
            }),
    );

    tokio::time::sleep(Duration::from_millis(200)).await;
    story.stop().await;

    assert!(story.hp().await < 10);
}
