//! A scripted walkthrough of the sample adventure.
//!
//! Run with: `cargo run --example forest_adventure`

use std::time::Duration;

use story_engine::testing::{sample_database, sample_npc};
use story_engine::{Story, StoryConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut story = Story::new(
        sample_database(),
        StoryConfig::new()
            .with_start_path(["start"])
            .with_tick_interval(Duration::from_millis(500))
            .with_tick_hook(|state| {
                // The woods sap your strength while you linger.
                state.health.modify(-1);
            }),
    );
    story.register_npc(sample_npc()).await;

    let node = story.step(None).await?;
    println!("== {}", node.condition.unwrap_or_default());
    for label in node.answers.keys() {
        println!("   > {label}");
    }

    story.step(Some("search the bushes")).await?;
    let node = story.step(Some("go north")).await?;
    println!("== {}", node.condition.unwrap_or_default());

    if let Some(Ok(reply)) = story.talk_to("Hermit", Some("why?")).await {
        println!("Hermit says: {}", reply.text);
    }

    story.step(Some("light the torch")).await?;
    let node = story.step(Some("descend")).await?;
    println!("== {}", node.condition.unwrap_or_default());
    story.step(None).await?; // the depths award their achievement on arrival

    // Let the background loop run a few ticks.
    tokio::time::sleep(Duration::from_secs(2)).await;

    for message in story.drain_messages().await {
        match message.style {
            Some(style) => println!("[{style}] {}", message.text),
            None => println!("{}", message.text),
        }
    }

    println!("HP: {}", story.hp().await);
    println!("Achievements:");
    for (name, description) in story.achievements().await {
        println!("   {name} — {description}");
    }
    println!("Visited:");
    for path in story.map().await.visited().keys() {
        println!("   {path}");
    }

    story.save_state("forest_adventure_save.json").await?;
    story.stop().await;
    Ok(())
}
