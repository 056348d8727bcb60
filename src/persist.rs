//! Snapshot persistence for save/load functionality.
//!
//! Snapshots are human-readable JSON with a version field. Loading is
//! deliberately lenient: missing keys fall back to defaults (0 hp,
//! empty maps, empty path) and unknown keys are ignored, so old and
//! slightly-newer files both load.

use crate::node::NodePath;
use crate::story::StoryState;
use crate::world::{Achievements, EquipSlot, HealthSystem, Inventory, ItemRecord};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Current save file version.
const SAVE_VERSION: u32 = 1;

fn default_version() -> u32 {
    SAVE_VERSION
}

/// One occupied inventory slot in a save file.
///
/// Serializes as `[name, description]` or, when the item carries an
/// equip behavior, `[name, description, behavior]`. Both arities
/// load; a two-element entry comes back inert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedItem {
    pub name: String,
    pub description: String,
    pub on_equip: Option<String>,
}

impl From<&ItemRecord> for SavedItem {
    fn from(item: &ItemRecord) -> Self {
        Self {
            name: item.name.clone(),
            description: item.description.clone(),
            on_equip: item.on_equip.clone(),
        }
    }
}

impl Serialize for SavedItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.on_equip.is_some() { 3 } else { 2 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.name)?;
        seq.serialize_element(&self.description)?;
        if let Some(behavior) = &self.on_equip {
            seq.serialize_element(behavior)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for SavedItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parts = Vec::<String>::deserialize(deserializer)?;
        match parts.as_slice() {
            [name, description] => Ok(Self {
                name: name.clone(),
                description: description.clone(),
                on_equip: None,
            }),
            [name, description, behavior] => Ok(Self {
                name: name.clone(),
                description: description.clone(),
                on_equip: Some(behavior.clone()),
            }),
            other => Err(serde::de::Error::invalid_length(
                other.len(),
                &"an item entry of [name, description] or [name, description, behavior]",
            )),
        }
    }
}

/// A saved story snapshot with all state needed to resume play.
///
/// Equip behaviors are carried by name only; the behaviors themselves
/// must be re-registered by the host before they fire again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedStory {
    /// Save format version for compatibility checking.
    #[serde(default = "default_version")]
    pub version: u32,

    /// When the save was created (unix seconds).
    #[serde(default)]
    pub saved_at: String,

    #[serde(default)]
    pub hp: i32,

    /// Occupied slots only, keyed by slot display name.
    #[serde(default)]
    pub inventory: BTreeMap<String, SavedItem>,

    #[serde(default)]
    pub achievements: BTreeMap<String, String>,

    #[serde(default)]
    pub flags: HashMap<String, bool>,

    #[serde(default)]
    pub path: NodePath,
}

impl SavedStory {
    /// Snapshot the persistable parts of the engine state.
    pub fn from_state(state: &StoryState) -> Self {
        Self {
            version: SAVE_VERSION,
            saved_at: timestamp_now(),
            hp: state.health.hp(),
            inventory: state
                .inventory
                .items()
                .iter()
                .map(|(slot, item)| (slot.name().to_string(), SavedItem::from(item)))
                .collect(),
            achievements: state.achievements.entries().clone(),
            flags: state.flags.clone(),
            path: state.path.clone(),
        }
    }

    /// Rebuild the engine state's persistable subsystems from this
    /// snapshot. Items re-enter their slots without firing equip
    /// behaviors; slot names that no longer exist are skipped.
    pub fn restore(&self, state: &mut StoryState) {
        state.health = HealthSystem::new(self.hp);

        let mut achievements = Achievements::new();
        for (name, description) in &self.achievements {
            achievements.add(name.clone(), description.clone());
        }
        state.achievements = achievements;

        let mut inventory = Inventory::new();
        for (slot_name, item) in &self.inventory {
            match EquipSlot::from_name(slot_name) {
                Some(slot) => {
                    let mut record = ItemRecord::new(item.name.clone(), item.description.clone());
                    record.on_equip = item.on_equip.clone();
                    inventory.insert(slot, record);
                }
                None => {
                    tracing::warn!(slot = slot_name.as_str(), "unknown slot in save, skipped")
                }
            }
        }
        state.inventory = inventory;

        state.flags = self.flags.clone();
        state.path = self.path.clone();
    }

    /// Save to a JSON file.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Load from a JSON file.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let content = fs::read_to_string(path).await?;
        let saved: Self = serde_json::from_str(&content)?;

        if saved.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: saved.version,
            });
        }

        Ok(saved)
    }

    /// Check a save file and read its metadata without loading the
    /// full snapshot.
    pub async fn peek_metadata(path: impl AsRef<Path>) -> Result<SaveMetadata, PersistError> {
        let content = fs::read_to_string(path).await?;
        let metadata: SaveMetadata = serde_json::from_str(&content)?;

        if metadata.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: metadata.version,
            });
        }

        Ok(metadata)
    }
}

/// The quick-access subset of a save file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveMetadata {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub saved_at: String,

    #[serde(default)]
    pub hp: i32,

    #[serde(default)]
    pub path: NodePath,
}

/// Information about a save file on disk.
#[derive(Debug, Clone)]
pub struct SaveInfo {
    /// Path to the save file.
    pub path: String,

    /// Save metadata.
    pub metadata: SaveMetadata,
}

/// List all readable save files in a directory, most recent name
/// first. A missing directory is created and reported empty.
pub async fn list_saves(dir: impl AsRef<Path>) -> Result<Vec<SaveInfo>, PersistError> {
    let mut saves = Vec::new();

    let dir_path = dir.as_ref();
    if !dir_path.exists() {
        fs::create_dir_all(dir_path).await?;
        return Ok(saves);
    }

    let mut entries = fs::read_dir(dir_path).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            if let Ok(metadata) = SavedStory::peek_metadata(&path).await {
                saves.push(SaveInfo {
                    path: path.to_string_lossy().to_string(),
                    metadata,
                });
            }
        }
    }

    saves.sort_by(|a, b| b.path.cmp(&a.path));
    Ok(saves)
}

/// Create an auto-save file name for a story.
pub fn auto_save_path(base_dir: impl AsRef<Path>, story_name: &str) -> std::path::PathBuf {
    let sanitized = story_name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>();
    base_dir.as_ref().join(format!("{sanitized}_autosave.json"))
}

/// Current timestamp as unix seconds.
fn timestamp_now() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    format!("{}", now.as_secs())
}
