//! Task card orchestrator
//!
//! Owns every facet slot of one task card. Facet loads run concurrently and
//! each touches only its own slot; locks are held for short synchronous
//! sections and never across an await.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Local, Utc};
use tracing::{debug, info, warn};

use super::facet::{CachedFacet, FacetPhase, FacetState};
use super::sync::SubTaskSync;
use super::{CardServices, CardSettings};
use crate::cache::{FacetCache, FacetValue};
use crate::challenge::{ChallengeError, ChallengeTimer, MicroChallenge};
use crate::chat::{ChatSession, SendRejected};
use crate::domain::{
    CheckIn, DurationEstimate, Emotion, FacetKind, Priority, Recurrence, ResourceSuggestion, ScheduleSuggestion,
    Strategy, SubTask, Task,
};
use crate::events::CardEmitter;
use crate::reasoning::{ReasoningClient, ReasoningError};
use crate::schedule;
use crate::store::TaskStore;

pub(super) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum InitialLoad {
    #[default]
    NotStarted,
    Running,
    Complete,
}

/// Sub-task list plus the phase of its facet
#[derive(Debug, Default)]
pub(super) struct SubTaskSlot {
    pub(super) phase: FacetPhase,
    pub(super) items: Vec<SubTask>,
}

/// Locally edited copy of the task and whether it differs from the saved one
#[derive(Debug)]
struct EditBuffer {
    task: Task,
    dirty: bool,
}

pub(super) struct Inner {
    pub(super) task_id: String,
    task: RwLock<Task>,
    edits: Mutex<EditBuffer>,

    strategy: Mutex<FacetState<Strategy>>,
    duration: Mutex<FacetState<DurationEstimate>>,
    resources: Mutex<FacetState<Vec<ResourceSuggestion>>>,
    schedule: Mutex<FacetState<Vec<ScheduleSuggestion>>>,
    pub(super) subtasks: Mutex<SubTaskSlot>,

    chat: Mutex<ChatSession>,
    check_in: Mutex<Option<CheckIn>>,
    challenge: ChallengeTimer,
    initial_load: Mutex<InitialLoad>,

    torn_down: AtomicBool,
    /// Ordered background writes of sub-task changes
    pub(super) sync: SubTaskSync,

    cache: Arc<FacetCache>,
    pub(super) reasoning: Arc<dyn ReasoningClient>,
    pub(super) store: Arc<dyn TaskStore>,
    pub(super) emitter: CardEmitter,
    settings: CardSettings,
}

impl Inner {
    pub(super) fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    pub(super) fn task(&self) -> Task {
        match self.task.read() {
            Ok(task) => task.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Links facet types to their slot on the card
pub(super) trait Slotted: CachedFacet {
    fn slot(inner: &Inner) -> &Mutex<FacetState<Self>>;
}

impl Slotted for Strategy {
    fn slot(inner: &Inner) -> &Mutex<FacetState<Self>> {
        &inner.strategy
    }
}

impl Slotted for DurationEstimate {
    fn slot(inner: &Inner) -> &Mutex<FacetState<Self>> {
        &inner.duration
    }
}

impl Slotted for Vec<ResourceSuggestion> {
    fn slot(inner: &Inner) -> &Mutex<FacetState<Self>> {
        &inner.resources
    }
}

/// Returns a facet to Unloaded if its load is abandoned while in flight
///
/// Dropping the future of a load (timeout, select, closed view) would
/// otherwise leave the slot Loading and turn every later load into a no-op.
struct LoadingGuard<'a, T: Slotted> {
    inner: &'a Inner,
    armed: bool,
    facet: PhantomData<T>,
}

impl<'a, T: Slotted> LoadingGuard<'a, T> {
    fn new(inner: &'a Inner) -> Self {
        Self {
            inner,
            armed: true,
            facet: PhantomData,
        }
    }

    fn settled(mut self) {
        self.armed = false;
    }
}

impl<T: Slotted> Drop for LoadingGuard<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut slot = lock(T::slot(self.inner));
        if !slot.is_loading() {
            return;
        }
        debug!(facet = %T::KIND, "LoadingGuard: load abandoned, resetting");
        *slot = FacetState::Unloaded;
        drop(slot);
        self.inner.emitter.facet_changed(T::KIND, FacetPhase::Unloaded);
    }
}

/// Settles an abandoned chat send as a failure so the thinking flag clears
struct ThinkingGuard<'a> {
    inner: &'a Inner,
    armed: bool,
}

impl ThinkingGuard<'_> {
    fn settled(mut self) {
        self.armed = false;
    }
}

impl Drop for ThinkingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!(task_id = %self.inner.task_id, "ThinkingGuard: send abandoned");
            lock(&self.inner.chat).finish(None);
            self.inner.emitter.chat_settled(false);
        }
    }
}

/// Coordinates cache, reasoning service and fallbacks for one task card
///
/// Cheap to clone; clones share the same card. Every entry point absorbs
/// failures into facet state or logs, so nothing here returns a service
/// error to the caller.
#[derive(Clone)]
pub struct TaskEnrichmentOrchestrator {
    pub(super) inner: Arc<Inner>,
}

impl TaskEnrichmentOrchestrator {
    pub fn new(task: Task, services: CardServices, settings: CardSettings) -> Self {
        debug!(task_id = %task.id, ?settings, "TaskEnrichmentOrchestrator::new: called");
        let emitter = services.bus.emitter_for(task.id.clone());
        let challenge = ChallengeTimer::new(settings.challenge_seconds, emitter.clone());
        let sync = SubTaskSync::new(&task.id, Arc::clone(&services.store), emitter.clone());
        Self {
            inner: Arc::new(Inner {
                task_id: task.id.clone(),
                edits: Mutex::new(EditBuffer {
                    task: task.clone(),
                    dirty: false,
                }),
                task: RwLock::new(task),
                strategy: Mutex::default(),
                duration: Mutex::default(),
                resources: Mutex::default(),
                schedule: Mutex::default(),
                subtasks: Mutex::default(),
                chat: Mutex::default(),
                check_in: Mutex::default(),
                challenge,
                initial_load: Mutex::default(),
                torn_down: AtomicBool::new(false),
                sync,
                cache: services.cache,
                reasoning: services.reasoning,
                store: services.store,
                emitter,
                settings,
            }),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.inner.task_id
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// The canonical (last saved) task
    pub fn task(&self) -> Task {
        self.inner.task()
    }

    pub fn strategy(&self) -> FacetState<Strategy> {
        lock(&self.inner.strategy).clone()
    }

    pub fn duration(&self) -> FacetState<DurationEstimate> {
        lock(&self.inner.duration).clone()
    }

    pub fn resources(&self) -> FacetState<Vec<ResourceSuggestion>> {
        lock(&self.inner.resources).clone()
    }

    pub fn schedule(&self) -> FacetState<Vec<ScheduleSuggestion>> {
        lock(&self.inner.schedule).clone()
    }

    /// Current sub-tasks, ordered by order index
    pub fn subtasks(&self) -> Vec<SubTask> {
        lock(&self.inner.subtasks).items.clone()
    }

    pub fn phase(&self, kind: FacetKind) -> FacetPhase {
        match kind {
            FacetKind::Strategy => lock(&self.inner.strategy).phase(),
            FacetKind::Duration => lock(&self.inner.duration).phase(),
            FacetKind::Resources => lock(&self.inner.resources).phase(),
            FacetKind::Schedule => lock(&self.inner.schedule).phase(),
            FacetKind::SubTasks => lock(&self.inner.subtasks).phase,
        }
    }

    pub fn chat(&self) -> ChatSession {
        lock(&self.inner.chat).clone()
    }

    pub fn check_in(&self) -> Option<CheckIn> {
        lock(&self.inner.check_in).clone()
    }

    pub fn challenge(&self) -> MicroChallenge {
        self.inner.challenge.snapshot()
    }

    pub fn is_initial_load_complete(&self) -> bool {
        *lock(&self.inner.initial_load) == InitialLoad::Complete
    }

    /// True while some sub-task's latest change failed to persist and has
    /// not since been written or reloaded from the store
    pub fn needs_resync(&self) -> bool {
        self.inner.sync.needs_resync()
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.is_torn_down()
    }

    // ------------------------------------------------------------------
    // Facet loads
    // ------------------------------------------------------------------

    /// Launch every facet load together; a no-op once started
    pub async fn load_all(&self) {
        debug!(task_id = %self.inner.task_id, "load_all: called");
        {
            let mut state = lock(&self.inner.initial_load);
            if *state != InitialLoad::NotStarted {
                debug!(state = ?*state, "load_all: already started");
                return;
            }
            *state = InitialLoad::Running;
        }

        futures::join!(
            self.load_subtasks(),
            self.load_resources(),
            self.load_schedule(),
            self.load_strategy(),
            self.load_duration(),
        );

        *lock(&self.inner.initial_load) = InitialLoad::Complete;
        info!(task_id = %self.inner.task_id, "Initial load complete");
        self.inner.emitter.initial_load_completed();
    }

    pub async fn load_strategy(&self) {
        debug!(task_id = %self.inner.task_id, "load_strategy: called");
        if let Some(strategy) = self.load_cached::<Strategy>().await {
            self.adopt_embedded_duration(&strategy);
        }
    }

    pub async fn load_duration(&self) {
        debug!(task_id = %self.inner.task_id, "load_duration: called");
        self.load_cached::<DurationEstimate>().await;
    }

    pub async fn load_resources(&self) {
        debug!(task_id = %self.inner.task_id, "load_resources: called");
        self.load_cached::<Vec<ResourceSuggestion>>().await;
    }

    /// Compute schedule suggestions against the local clock
    pub async fn load_schedule(&self) {
        self.load_schedule_at(&Local::now());
    }

    /// Compute schedule suggestions against a given clock reading
    pub fn load_schedule_at<Tz: chrono::TimeZone>(&self, now: &DateTime<Tz>) {
        debug!(task_id = %self.inner.task_id, "load_schedule_at: called");
        {
            let mut slot = lock(&self.inner.schedule);
            if slot.is_loading() {
                return;
            }
            *slot = FacetState::Loading;
        }
        self.inner.emitter.facet_changed(FacetKind::Schedule, FacetPhase::Loading);

        let suggestions = schedule::suggest(&self.inner.task(), now);
        *lock(&self.inner.schedule) = FacetState::Loaded(suggestions);
        self.inner.emitter.facet_changed(FacetKind::Schedule, FacetPhase::Loaded);
    }

    /// Drop the cached strategy and load it again; a no-op while loading
    pub async fn refresh_strategy(&self) {
        debug!(task_id = %self.inner.task_id, "refresh_strategy: called");
        if !self.reset_facet::<Strategy>() {
            return;
        }
        self.load_strategy().await;
    }

    pub async fn refresh_duration(&self) {
        debug!(task_id = %self.inner.task_id, "refresh_duration: called");
        if self.reset_facet::<DurationEstimate>() {
            self.load_duration().await;
        }
    }

    pub async fn refresh_resources(&self) {
        debug!(task_id = %self.inner.task_id, "refresh_resources: called");
        if self.reset_facet::<Vec<ResourceSuggestion>>() {
            self.load_resources().await;
        }
    }

    /// Invalidate and clear a facet; false if it is mid-load
    fn reset_facet<T: Slotted>(&self) -> bool {
        let mut slot = lock(T::slot(&self.inner));
        if slot.is_loading() {
            debug!(facet = %T::KIND, "reset_facet: load in flight, ignoring");
            return false;
        }
        self.inner.cache.invalidate(&self.inner.task_id, Some(T::KIND));
        *slot = FacetState::Unloaded;
        true
    }

    /// Run the cache / remote / fallback cycle for one facet
    ///
    /// Returns the value only when it came fresh from the reasoning service.
    async fn load_cached<T: Slotted>(&self) -> Option<T> {
        let inner = &self.inner;
        let task = inner.task();
        {
            let mut slot = lock(T::slot(inner));
            if slot.is_loading() {
                debug!(facet = %T::KIND, "load_cached: already loading");
                return None;
            }
            if let Some(value) = T::cached(&inner.cache, &task.id) {
                debug!(facet = %T::KIND, "load_cached: cache hit");
                *slot = FacetState::Loaded(value);
                drop(slot);
                inner.emitter.facet_changed(T::KIND, FacetPhase::Loaded);
                return None;
            }
            *slot = FacetState::Loading;
        }
        inner.emitter.facet_changed(T::KIND, FacetPhase::Loading);
        let guard = LoadingGuard::<T>::new(inner);

        let outcome = if inner.reasoning.is_ready() {
            T::fetch(inner.reasoning.as_ref(), &task, inner.settings.max_resources).await
        } else {
            Err(ReasoningError::Unavailable("not ready".to_string()))
        };

        // a closed card keeps whatever it showed last
        guard.settled();
        if inner.is_torn_down() {
            debug!(facet = %T::KIND, "load_cached: card torn down, dropping result");
            return None;
        }

        match outcome {
            Ok(value) => {
                // cache first so a Loaded slot always has a cache entry behind it
                inner.cache.set(&task.id, value.clone().into_value());
                *lock(T::slot(inner)) = FacetState::Loaded(value.clone());
                info!(task_id = %task.id, facet = %T::KIND, "Facet loaded");
                inner.emitter.facet_changed(T::KIND, FacetPhase::Loaded);
                Some(value)
            }
            Err(e) => {
                info!(task_id = %task.id, facet = %T::KIND, error = %e, "Facet using fallback");
                *lock(T::slot(inner)) = FacetState::Fallback(T::fallback(&task));
                inner.emitter.facet_changed(T::KIND, FacetPhase::Fallback);
                None
            }
        }
    }

    /// A strategy that carries its own estimate fills an untouched Duration facet
    fn adopt_embedded_duration(&self, strategy: &Strategy) {
        let Some(estimate) = strategy.embedded_duration() else {
            return;
        };
        let mut slot = lock(&self.inner.duration);
        if *slot != FacetState::Unloaded {
            return;
        }
        debug!(minutes = estimate.minutes, "adopt_embedded_duration: using strategy estimate");
        self.inner
            .cache
            .set(&self.inner.task_id, FacetValue::Duration(estimate.clone()));
        *slot = FacetState::Loaded(estimate);
        drop(slot);
        self.inner.emitter.facet_changed(FacetKind::Duration, FacetPhase::Loaded);
    }

    // ------------------------------------------------------------------
    // Check-in, challenge, chat
    // ------------------------------------------------------------------

    /// Record how the user feels and return the matching response
    pub fn select_emotion(&self, emotion: Emotion) -> CheckIn {
        debug!(task_id = %self.inner.task_id, %emotion, "select_emotion: called");
        let check_in = CheckIn::from(emotion);
        *lock(&self.inner.check_in) = Some(check_in.clone());
        self.inner.emitter.emotion_selected(emotion);
        check_in
    }

    /// Must be called from within a tokio runtime
    pub fn start_challenge(&self) -> Result<(), ChallengeError> {
        self.inner.challenge.start()
    }

    /// Finish the running challenge early; false if none is running
    pub fn complete_challenge(&self) -> bool {
        self.inner.challenge.complete()
    }

    pub fn reset_challenge(&self) -> Result<(), ChallengeError> {
        self.inner.challenge.reset()
    }

    /// Send a chat message and wait for the reply
    ///
    /// Blank text and a send already in flight are rejected before anything
    /// changes. Otherwise returns whether the assistant replied.
    pub async fn send_chat(&self, text: &str) -> Result<bool, SendRejected> {
        debug!(task_id = %self.inner.task_id, "send_chat: called");
        let (history, message) = lock(&self.inner.chat).begin(text)?;
        self.inner.emitter.message_sent();
        let guard = ThinkingGuard {
            inner: &self.inner,
            armed: true,
        };

        let reply = if self.inner.reasoning.is_ready() {
            match self.inner.reasoning.converse(&history, &message).await {
                Ok(reply) => Some(reply),
                Err(e) => {
                    warn!(task_id = %self.inner.task_id, error = %e, "Chat turn failed");
                    None
                }
            }
        } else {
            debug!("send_chat: reasoning not ready");
            None
        };

        if self.inner.is_torn_down() {
            // the guard clears the thinking flag
            debug!("send_chat: card torn down, dropping reply");
            return Ok(false);
        }

        guard.settled();
        let replied = reply.is_some();
        lock(&self.inner.chat).finish(reply);
        self.inner.emitter.chat_settled(replied);
        Ok(replied)
    }

    // ------------------------------------------------------------------
    // Editing and save
    // ------------------------------------------------------------------

    /// The edited shadow copy of the task
    pub fn edited(&self) -> Task {
        lock(&self.inner.edits).task.clone()
    }

    pub fn is_dirty(&self) -> bool {
        lock(&self.inner.edits).dirty
    }

    fn edit(&self, apply: impl FnOnce(&mut Task)) {
        let mut edits = lock(&self.inner.edits);
        let before = edits.task.clone();
        apply(&mut edits.task);
        if edits.task != before {
            edits.dirty = true;
        }
    }

    pub fn set_title(&self, title: impl Into<String>) {
        let title = title.into();
        self.edit(|task| task.title = title);
    }

    pub fn set_notes(&self, notes: impl Into<String>) {
        let notes = notes.into();
        self.edit(|task| task.notes = notes);
    }

    pub fn set_duration(&self, minutes: Option<u32>) {
        self.edit(|task| task.duration_minutes = minutes);
    }

    pub fn set_scheduled_at(&self, at: Option<DateTime<Utc>>) {
        self.edit(|task| task.scheduled_at = at);
    }

    pub fn set_priority(&self, priority: Priority) {
        self.edit(|task| task.priority = priority);
    }

    pub fn set_recurrence(&self, recurrence: Recurrence) {
        self.edit(|task| task.recurrence = recurrence);
    }

    /// Commit edited fields to the task and persist it
    ///
    /// Facet state is left alone. Returns whether the store accepted the write.
    pub async fn save(&self) -> bool {
        debug!(task_id = %self.inner.task_id, "save: called");
        let saved = {
            let mut edits = lock(&self.inner.edits);
            let mut task = self.inner.task.write().unwrap_or_else(PoisonError::into_inner);
            task.title = edits.task.title.clone();
            task.notes = edits.task.notes.clone();
            task.duration_minutes = edits.task.duration_minutes;
            task.scheduled_at = edits.task.scheduled_at;
            task.priority = edits.task.priority;
            task.recurrence = edits.task.recurrence;
            task.updated_at = Some(Utc::now());
            edits.task.updated_at = task.updated_at;
            edits.dirty = false;
            task.clone()
        };
        self.inner.emitter.saved();

        match self.inner.store.save_task(&saved).await {
            Ok(()) => {
                info!(task_id = %saved.id, "Task saved");
                true
            }
            Err(e) => {
                warn!(task_id = %saved.id, error = %e, "Failed to persist task");
                false
            }
        }
    }

    /// Close the card: stop the challenge tick and ignore late results
    pub fn teardown(&self) {
        debug!(task_id = %self.inner.task_id, "teardown: called");
        self.inner.torn_down.store(true, Ordering::SeqCst);
        self.inner.challenge.cancel();
    }
}
