//! The story orchestrator.
//!
//! [`Story`] owns every subsystem plus the path cursor into the node
//! database, and exposes the step/query API the presentation layer
//! drives. All mutable state lives in a [`StoryState`] behind a
//! single `tokio::sync::Mutex`; foreground API calls and the
//! background tick task both funnel through it, so no mutation ever
//! races another. Actions and behaviors triggered by a call run
//! inside the same lock scope as the call itself.

use crate::effect::Effect;
use crate::node::{MissingSegment, Node, NodeDatabase, NodePath};
use crate::npc::{DialogueError, DialogueNode, Npc};
use crate::persist::{PersistError, SavedStory};
use crate::puzzle::Puzzle;
use crate::script::{self, Behaviors, Hook};
use crate::world::{
    Achievements, EquipSlot, EventLog, HealthSystem, Inventory, ItemRecord, Message,
    MessageStyle, StoryMap,
};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

/// Errors from advancing the story.
///
/// Both variants are ordinary values the renderer can display inline;
/// neither corrupts the path cursor already held.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error("no story node at segment '{segment}'")]
    InvalidPath { segment: String },

    #[error("no such choice: '{answer}'")]
    InvalidChoice { answer: String },
}

impl From<MissingSegment> for StepError {
    fn from(missing: MissingSegment) -> Self {
        StepError::InvalidPath {
            segment: missing.segment,
        }
    }
}

// ============================================================================
// State
// ============================================================================

/// The complete mutable state graph of one story.
///
/// Lives behind the engine's mutex; behaviors receive `&mut
/// StoryState` and may mutate anything here.
#[derive(Debug)]
pub struct StoryState {
    pub session_id: Uuid,

    /// Cursor into the main node database.
    pub path: NodePath,

    pub health: HealthSystem,
    pub inventory: Inventory,
    pub achievements: Achievements,
    pub flags: HashMap<String, bool>,

    /// Full append-only history of announced messages.
    pub log: EventLog,
    /// Per-frame buffer the renderer drains; mirrors recent log
    /// entries plus anything `print`ed directly.
    pub messages: Vec<Message>,

    pub effects: BTreeMap<String, Effect>,
    pub npcs: BTreeMap<String, Npc>,
    pub current_puzzle: Option<Puzzle>,
    pub map: StoryMap,
    pub behaviors: Behaviors,
}

impl StoryState {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            path: NodePath::new(),
            health: HealthSystem::default(),
            inventory: Inventory::new(),
            achievements: Achievements::new(),
            flags: HashMap::new(),
            log: EventLog::new(),
            messages: Vec::new(),
            effects: BTreeMap::new(),
            npcs: BTreeMap::new(),
            current_puzzle: None,
            map: StoryMap::new(),
            behaviors: Behaviors::new(),
        }
    }

    /// Read a flag; absent flags read as false.
    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    pub fn set_flag(&mut self, name: impl Into<String>, value: bool) {
        self.flags.insert(name.into(), value);
    }

    /// Append to the frame buffer only.
    pub fn print(&mut self, text: impl Into<String>, style: Option<MessageStyle>) {
        self.messages.push(Message::new(text, style));
    }

    /// Append to the event log and mirror into the frame buffer.
    pub fn log_event(&mut self, text: impl Into<String>, style: Option<MessageStyle>) {
        let message = Message::new(text, style);
        self.log.push(message.clone());
        self.messages.push(message);
    }

    /// Place an item in a slot and fire its equip behavior, if any.
    pub fn equip_item(&mut self, slot: EquipSlot, item: ItemRecord) {
        let behavior = item.on_equip.clone();
        self.inventory.insert(slot, item);
        if let Some(name) = behavior {
            self.invoke(&name);
        }
    }

    /// Run a named behavior. Unknown names are ignored with a
    /// diagnostic warning.
    pub fn invoke(&mut self, name: &str) {
        match self.behaviors.get(name) {
            Some(hook) => hook(self),
            None => tracing::warn!(behavior = name, "unknown behavior invoked"),
        }
    }

    /// Register an effect and run its apply hooks immediately.
    ///
    /// A second effect under the same name silently replaces the
    /// first without firing the first's expiry.
    pub fn apply_effect(&mut self, effect: Effect) {
        let on_apply = effect.on_apply.clone();
        self.effects.insert(effect.name.clone(), effect);
        script::run(&on_apply, self);
    }

    /// Age every active effect by one tick, expiring those that reach
    /// zero. Expiry hooks run after the effect is removed, so they
    /// may safely re-register effects.
    pub fn age_effects(&mut self) {
        let mut expired = Vec::new();
        for (name, effect) in self.effects.iter_mut() {
            effect.remaining -= 1;
            if effect.remaining <= 0 {
                expired.push(name.clone());
            }
        }
        for name in expired {
            if let Some(effect) = self.effects.remove(&name) {
                script::run(&effect.on_expire, self);
            }
        }
    }

    /// Evaluate the current puzzle, if one is set.
    pub fn attempt_puzzle(&mut self, choice_index: usize) -> Option<bool> {
        let puzzle = self.current_puzzle.clone()?;
        Some(puzzle.attempt(self, choice_index))
    }

    /// Talk to a registered NPC. `None` if the NPC is unknown.
    pub fn talk_to(
        &mut self,
        npc_name: &str,
        choice: Option<&str>,
    ) -> Option<Result<DialogueNode, DialogueError>> {
        let mut npc = self.npcs.remove(npc_name)?;
        let result = npc.talk(choice);
        if let Ok(node) = &result {
            self.log_event(
                format!("Talking to {}: {}", npc.name, node.text),
                Some(MessageStyle::Info),
            );
        }
        self.npcs.insert(npc.name.clone(), npc);
        Some(result)
    }
}

impl Default for StoryState {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for creating a [`Story`].
#[derive(Clone)]
pub struct StoryConfig {
    /// Initial path cursor. The default (empty) cursor resolves to
    /// nothing; most stories start at e.g. `["start"]`.
    pub start_path: NodePath,

    /// Initial progress flags.
    pub initial_flags: HashMap<String, bool>,

    /// Period of the background tick loop.
    pub tick_interval: Duration,

    /// Snapshot target written every tick.
    pub autosave: Option<PathBuf>,

    tick_hook: Option<Hook>,
}

impl StoryConfig {
    pub fn new() -> Self {
        Self {
            start_path: NodePath::new(),
            initial_flags: HashMap::new(),
            tick_interval: Duration::from_secs(5),
            autosave: None,
            tick_hook: None,
        }
    }

    pub fn with_start_path(mut self, path: impl Into<NodePath>) -> Self {
        self.start_path = path.into();
        self
    }

    pub fn with_flag(mut self, name: impl Into<String>, value: bool) -> Self {
        self.initial_flags.insert(name.into(), value);
        self
    }

    pub fn with_flags(mut self, flags: HashMap<String, bool>) -> Self {
        self.initial_flags = flags;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_autosave(mut self, path: impl Into<PathBuf>) -> Self {
        self.autosave = Some(path.into());
        self
    }

    /// Install a hook invoked once per background tick, before effect
    /// aging.
    pub fn with_tick_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut StoryState) + Send + Sync + 'static,
    {
        self.tick_hook = Some(Arc::new(hook));
        self
    }
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoryConfig")
            .field("start_path", &self.start_path)
            .field("initial_flags", &self.initial_flags)
            .field("tick_interval", &self.tick_interval)
            .field("autosave", &self.autosave)
            .field("tick_hook", &self.tick_hook.is_some())
            .finish()
    }
}

// ============================================================================
// Story
// ============================================================================

struct Ticker {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// A running story: node database, state, and optional background
/// tick task.
///
/// The tick task starts when the configuration carries a tick hook or
/// an autosave target, and runs until [`Story::stop`] — so `new` must
/// be called inside a tokio runtime in that case. Each tick invokes
/// the hook, ages effects, and autosaves.
pub struct Story {
    database: Arc<NodeDatabase>,
    state: Arc<Mutex<StoryState>>,
    tick_hook: Option<Hook>,
    autosave: Option<PathBuf>,
    ticker: Option<Ticker>,
}

impl Story {
    pub fn new(database: NodeDatabase, config: StoryConfig) -> Self {
        let mut state = StoryState::new();
        state.path = config.start_path.clone();
        state.flags = config.initial_flags.clone();

        let state = Arc::new(Mutex::new(state));
        let tick_hook = config.tick_hook.clone();
        let autosave = config.autosave.clone();

        let ticker = if tick_hook.is_some() || autosave.is_some() {
            let (shutdown, rx) = watch::channel(false);
            let handle = tokio::spawn(run_ticker(
                state.clone(),
                tick_hook.clone(),
                autosave.clone(),
                config.tick_interval,
                rx,
            ));
            Some(Ticker { shutdown, handle })
        } else {
            None
        };

        Self {
            database: Arc::new(database),
            state,
            tick_hook,
            autosave,
            ticker,
        }
    }

    /// Signal the tick task and wait for it to finish. Idempotent; a
    /// no-op when no task is running.
    pub async fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            let _ = ticker.shutdown.send(true);
            let _ = ticker.handle.await;
        }
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// The node the cursor currently resolves to, or `None` when the
    /// path is broken. Successful resolutions are recorded in the
    /// story map.
    pub async fn current_node(&self) -> Option<Node> {
        let mut state = self.state.lock().await;
        self.resolve_current(&mut state).ok()
    }

    /// Advance the story.
    ///
    /// Resolves the cursor (failure: [`StepError::InvalidPath`], the
    /// cursor is untouched), runs the node's entry actions, then
    /// applies the answer if one was given: unknown answers return
    /// [`StepError::InvalidChoice`] without moving the cursor; known
    /// answers run their selection actions and, if the choice carries
    /// a `next_path`, replace the cursor with a copy of it. Returns
    /// the node the cursor points at afterwards.
    ///
    /// Entry actions belong to the node that is current when `step`
    /// begins, and run on *every* such resolution, including repeats
    /// after a failed choice — one-time events belong behind a flag.
    /// A destination reached this call runs its own entry actions on
    /// the next step.
    pub async fn step(&self, answer: Option<&str>) -> Result<Node, StepError> {
        let mut state = self.state.lock().await;

        let node = self.resolve_current(&mut state)?;
        script::run(&node.on_enter, &mut state);

        if let Some(answer) = answer {
            let choice = node
                .answers
                .get(answer)
                .ok_or_else(|| StepError::InvalidChoice {
                    answer: answer.to_string(),
                })?
                .clone();

            script::run(&choice.on_select, &mut state);

            // The cursor takes a copy of the declared path, never an alias.
            if let Some(next) = &choice.next_path {
                state.path = next.clone();
            }
        }

        self.resolve_current(&mut state)
    }

    /// Replace the path cursor outright.
    pub async fn jump_to(&self, path: impl Into<NodePath>) {
        self.state.lock().await.path = path.into();
    }

    pub async fn path(&self) -> NodePath {
        self.state.lock().await.path.clone()
    }

    fn resolve_current(&self, state: &mut StoryState) -> Result<Node, StepError> {
        let node = self.database.resolve(&state.path)?;
        state.map.register(&state.path, node);
        Ok(node.clone())
    }

    // ========================================================================
    // State queries and mutations
    // ========================================================================

    pub async fn session_id(&self) -> Uuid {
        self.state.lock().await.session_id
    }

    pub async fn hp(&self) -> i32 {
        self.state.lock().await.health.hp()
    }

    pub async fn modify_hp(&self, amount: i32) -> i32 {
        self.state.lock().await.health.modify(amount)
    }

    /// Place an item in a slot, firing the named equip behavior if it
    /// is registered.
    pub async fn add_item(
        &self,
        slot: EquipSlot,
        name: impl Into<String>,
        description: impl Into<String>,
        on_equip: Option<String>,
    ) {
        let mut item = ItemRecord::new(name, description);
        item.on_equip = on_equip;
        self.state.lock().await.equip_item(slot, item);
    }

    pub async fn remove_item(&self, slot: EquipSlot) -> Option<ItemRecord> {
        self.state.lock().await.inventory.remove(slot)
    }

    /// Occupied slots and their contents.
    pub async fn items(&self) -> BTreeMap<EquipSlot, ItemRecord> {
        self.state.lock().await.inventory.items().clone()
    }

    pub async fn add_achievement(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) {
        self.state.lock().await.achievements.add(name, description);
    }

    pub async fn achievements(&self) -> BTreeMap<String, String> {
        self.state.lock().await.achievements.entries().clone()
    }

    pub async fn flag(&self, name: &str) -> bool {
        self.state.lock().await.flag(name)
    }

    pub async fn set_flag(&self, name: impl Into<String>, value: bool) {
        self.state.lock().await.set_flag(name, value);
    }

    pub async fn flags(&self) -> HashMap<String, bool> {
        self.state.lock().await.flags.clone()
    }

    /// Append a message to the frame buffer without logging it.
    pub async fn print(&self, text: impl Into<String>, style: Option<MessageStyle>) {
        self.state.lock().await.print(text, style);
    }

    /// Append a message to the event log and the frame buffer.
    pub async fn log(&self, text: impl Into<String>, style: Option<MessageStyle>) {
        self.state.lock().await.log_event(text, style);
    }

    /// The pending frame buffer, unchanged. Renderers normally call
    /// [`Story::drain_messages`] instead.
    pub async fn messages(&self) -> Vec<Message> {
        self.state.lock().await.messages.clone()
    }

    pub async fn clear_messages(&self) {
        self.state.lock().await.messages.clear();
    }

    /// Take the frame buffer, leaving it empty — read-and-clear in
    /// one lock acquisition, so a tick in between cannot be missed.
    pub async fn drain_messages(&self) -> Vec<Message> {
        std::mem::take(&mut self.state.lock().await.messages)
    }

    /// The full append-only event history.
    pub async fn log_entries(&self) -> Vec<Message> {
        self.state.lock().await.log.entries().to_vec()
    }

    pub async fn apply_effect(&self, effect: Effect) {
        self.state.lock().await.apply_effect(effect);
    }

    pub async fn active_effects(&self) -> Vec<Effect> {
        self.state.lock().await.effects.values().cloned().collect()
    }

    pub async fn register_npc(&self, npc: Npc) {
        let mut state = self.state.lock().await;
        state.npcs.insert(npc.name.clone(), npc);
    }

    /// Talk to a registered NPC; `None` if no NPC has that name.
    pub async fn talk_to(
        &self,
        npc_name: &str,
        choice: Option<&str>,
    ) -> Option<Result<DialogueNode, DialogueError>> {
        self.state.lock().await.talk_to(npc_name, choice)
    }

    /// Register a named behavior for `Action::Invoke`, item equip
    /// hooks, and anything else that dispatches by name.
    pub async fn register_behavior<F>(&self, name: impl Into<String>, hook: F)
    where
        F: Fn(&mut StoryState) + Send + Sync + 'static,
    {
        self.state.lock().await.behaviors.register(name, hook);
    }

    pub async fn set_puzzle(&self, puzzle: Puzzle) {
        self.state.lock().await.current_puzzle = Some(puzzle);
    }

    pub async fn current_puzzle(&self) -> Option<Puzzle> {
        self.state.lock().await.current_puzzle.clone()
    }

    pub async fn clear_puzzle(&self) {
        self.state.lock().await.current_puzzle = None;
    }

    /// Evaluate the current puzzle; `None` if no puzzle is set.
    pub async fn attempt_puzzle(&self, choice_index: usize) -> Option<bool> {
        self.state.lock().await.attempt_puzzle(choice_index)
    }

    /// Snapshot of the visited-node map.
    pub async fn map(&self) -> StoryMap {
        self.state.lock().await.map.clone()
    }

    /// Run a closure against the locked state — the escape hatch for
    /// anything the method surface does not cover.
    pub async fn with_state<R>(&self, f: impl FnOnce(&mut StoryState) -> R) -> R {
        let mut state = self.state.lock().await;
        f(&mut state)
    }

    // ========================================================================
    // Tick and persistence
    // ========================================================================

    /// Run one maintenance iteration by hand: tick hook, effect
    /// aging, autosave. Deterministic counterpart of the background
    /// loop, for tests and turn-based frontends.
    pub async fn tick(&self) {
        tick_once(&self.state, &self.tick_hook, &self.autosave).await;
    }

    /// Serialize the current state to a snapshot file.
    ///
    /// Failures are logged as warnings and returned; they never
    /// abort anything.
    pub async fn save_state(&self, path: impl Into<PathBuf>) -> Result<(), PersistError> {
        let path = path.into();
        let snapshot = {
            let state = self.state.lock().await;
            SavedStory::from_state(&state)
        };

        match snapshot.save_json(&path).await {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "save failed");
                self.state.lock().await.log_event(
                    format!("Failed to save state: {err}"),
                    Some(MessageStyle::Important),
                );
                Err(err)
            }
        }
    }

    /// Restore health, inventory, achievements, flags, and the path
    /// cursor from a snapshot file.
    ///
    /// On failure the live state is left untouched, a warning is
    /// logged, and the error is returned — callers treat it as
    /// "resume with defaults". Restored items re-enter their slots
    /// without firing equip behaviors.
    pub async fn load_state(&self, path: impl Into<PathBuf>) -> Result<(), PersistError> {
        let path = path.into();
        match SavedStory::load_json(&path).await {
            Ok(saved) => {
                let mut state = self.state.lock().await;
                saved.restore(&mut state);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "load failed");
                self.state.lock().await.log_event(
                    format!("Failed to load state: {err}"),
                    Some(MessageStyle::Important),
                );
                Err(err)
            }
        }
    }
}

// ============================================================================
// Tick loop
// ============================================================================

/// One maintenance iteration, shared by [`Story::tick`] and the
/// background task.
async fn tick_once(
    state: &Mutex<StoryState>,
    hook: &Option<Hook>,
    autosave: &Option<PathBuf>,
) {
    let snapshot = {
        let mut state = state.lock().await;
        if let Some(hook) = hook {
            hook(&mut state);
        }
        state.age_effects();
        autosave.as_ref().map(|path| {
            (path.clone(), SavedStory::from_state(&state))
        })
    };

    if let Some((path, snapshot)) = snapshot {
        if let Err(err) = snapshot.save_json(&path).await {
            tracing::warn!(path = %path.display(), error = %err, "autosave failed");
            state.lock().await.log_event(
                format!("Autosave failed: {err}"),
                Some(MessageStyle::Important),
            );
        }
    }
}

async fn run_ticker(
    state: Arc<Mutex<StoryState>>,
    hook: Option<Hook>,
    autosave: Option<PathBuf>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::debug!(?period, "tick loop started");
    loop {
        tokio::select! {
            _ = interval.tick() => {
                tick_once(&state, &hook, &autosave).await;
            }
            // Completes on stop() and when the Story is dropped.
            _ = shutdown.changed() => break,
        }
    }
    tracing::debug!("tick loop stopped");
}
