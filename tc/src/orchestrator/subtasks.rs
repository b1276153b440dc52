//! Sub-task facet: load, optimistic edits, background persistence

use chrono::Utc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::card::{Inner, TaskEnrichmentOrchestrator, lock};
use super::facet::FacetPhase;
use super::sync::Persist;
use crate::domain::{FacetKind, SubTask, SubTaskDraft, Task, renumber};
use crate::fallback;

/// Puts the sub-task facet back to its earlier phase if a load is abandoned
struct SubTaskLoadGuard<'a> {
    inner: &'a Inner,
    previous: FacetPhase,
    armed: bool,
}

impl SubTaskLoadGuard<'_> {
    fn settled(mut self) {
        self.armed = false;
    }
}

impl Drop for SubTaskLoadGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut slot = lock(&self.inner.subtasks);
        if slot.phase != FacetPhase::Loading {
            return;
        }
        debug!(previous = %self.previous, "SubTaskLoadGuard: load abandoned");
        slot.phase = self.previous;
        drop(slot);
        self.inner.emitter.facet_changed(FacetKind::SubTasks, self.previous);
    }
}

impl TaskEnrichmentOrchestrator {
    /// Load sub-tasks from the store, or generate a checklist when it has none
    ///
    /// A successful store read also clears any pending resync.
    pub async fn load_subtasks(&self) {
        let inner = &self.inner;
        debug!(task_id = %inner.task_id, "load_subtasks: called");
        let previous = {
            let mut slot = lock(&inner.subtasks);
            if slot.phase == FacetPhase::Loading {
                debug!("load_subtasks: already loading");
                return;
            }
            std::mem::replace(&mut slot.phase, FacetPhase::Loading)
        };
        inner.emitter.facet_changed(FacetKind::SubTasks, FacetPhase::Loading);
        let guard = SubTaskLoadGuard {
            inner,
            previous,
            armed: true,
        };

        // earlier local changes must reach the store before it is read back
        inner.sync.wait_idle().await;
        match inner.store.list_subtasks(&inner.task_id).await {
            Ok(mut stored) if !stored.is_empty() => {
                guard.settled();
                if inner.is_torn_down() {
                    return;
                }
                stored.sort_by_key(|s| s.order_index);
                inner.sync.reloaded();
                self.settle_subtasks(stored, FacetPhase::Loaded);
                return;
            }
            Ok(_) => {
                inner.sync.reloaded();
                debug!("load_subtasks: store has none, generating");
            }
            Err(e) => warn!(task_id = %inner.task_id, error = %e, "Could not read sub-tasks, generating"),
        }

        let task = inner.task();
        let (drafts, phase) = self.generate_drafts(&task).await;
        guard.settled();
        if inner.is_torn_down() {
            debug!("load_subtasks: card torn down, dropping result");
            return;
        }

        let subtasks: Vec<SubTask> = drafts
            .into_iter()
            .enumerate()
            .map(|(i, draft)| SubTask::from_draft(draft, i as u32 + 1))
            .collect();
        info!(task_id = %task.id, count = subtasks.len(), %phase, "Generated sub-tasks");
        let count = subtasks.len();
        {
            let mut slot = lock(&inner.subtasks);
            // queued under the slot lock, so no edit to these can overtake it
            self.persist(Persist::Upsert(subtasks.clone()));
            slot.items = subtasks;
            slot.phase = phase;
        }
        inner.emitter.facet_changed(FacetKind::SubTasks, phase);
        inner.emitter.subtasks_changed(count);
    }

    async fn generate_drafts(&self, task: &Task) -> (Vec<SubTaskDraft>, FacetPhase) {
        if !self.inner.reasoning.is_ready() {
            return (fallback::decompose(task), FacetPhase::Fallback);
        }
        match self.inner.reasoning.decompose(task).await {
            Ok(drafts) if !drafts.is_empty() => (drafts, FacetPhase::Loaded),
            Ok(_) => {
                info!(task_id = %task.id, "Decompose returned nothing, using template");
                (fallback::decompose(task), FacetPhase::Fallback)
            }
            Err(e) => {
                info!(task_id = %task.id, error = %e, "Decompose failed, using template");
                (fallback::decompose(task), FacetPhase::Fallback)
            }
        }
    }

    fn settle_subtasks(&self, items: Vec<SubTask>, phase: FacetPhase) {
        let count = items.len();
        {
            let mut slot = lock(&self.inner.subtasks);
            slot.items = items;
            slot.phase = phase;
        }
        self.inner.emitter.facet_changed(FacetKind::SubTasks, phase);
        self.inner.emitter.subtasks_changed(count);
    }

    /// Flip a sub-task between pending and completed
    ///
    /// Local state changes immediately; the returned receiver resolves once
    /// the store write finishes. `None` means no such sub-task.
    pub fn toggle(&self, subtask_id: &str) -> Option<oneshot::Receiver<()>> {
        debug!(%subtask_id, "toggle: called");
        let mut slot = lock(&self.inner.subtasks);
        let subtask = slot.items.iter_mut().find(|s| s.id == subtask_id)?;
        subtask.toggle(Utc::now());
        let changed = subtask.clone();
        let receipt = self.persist(Persist::Upsert(vec![changed]));
        let count = slot.items.len();
        drop(slot);
        self.inner.emitter.subtasks_changed(count);
        Some(receipt)
    }

    /// Append a sub-task after the last one; blank titles are rejected
    pub fn add(&self, title: &str) -> Option<oneshot::Receiver<()>> {
        debug!(%title, "add: called");
        let title = title.trim();
        if title.is_empty() {
            debug!("add: rejected blank title");
            return None;
        }
        let mut slot = lock(&self.inner.subtasks);
        let next = slot.items.iter().map(|s| s.order_index).max().unwrap_or(0) + 1;
        let subtask = SubTask::new(title, next);
        slot.items.push(subtask.clone());
        let receipt = self.persist(Persist::Upsert(vec![subtask]));
        let count = slot.items.len();
        drop(slot);
        self.inner.emitter.subtasks_changed(count);
        Some(receipt)
    }

    /// Remove a sub-task and close the gap in order indices
    pub fn delete(&self, subtask_id: &str) -> Option<oneshot::Receiver<()>> {
        debug!(%subtask_id, "delete: called");
        let mut slot = lock(&self.inner.subtasks);
        let position = slot.items.iter().position(|s| s.id == subtask_id)?;
        slot.items.remove(position);
        let before: Vec<(String, u32)> = slot.items.iter().map(|s| (s.id.clone(), s.order_index)).collect();
        renumber(&mut slot.items);
        let moved: Vec<SubTask> = slot
            .items
            .iter()
            .filter(|s| !before.contains(&(s.id.clone(), s.order_index)))
            .cloned()
            .collect();
        let receipt = self.persist(Persist::Delete {
            id: subtask_id.to_string(),
            moved,
        });
        let count = slot.items.len();
        drop(slot);
        self.inner.emitter.subtasks_changed(count);
        Some(receipt)
    }

    /// Change a sub-task's title only; blank titles are rejected
    pub fn rename(&self, subtask_id: &str, title: &str) -> Option<oneshot::Receiver<()>> {
        debug!(%subtask_id, %title, "rename: called");
        let title = title.trim();
        if title.is_empty() {
            debug!("rename: rejected blank title");
            return None;
        }
        let mut slot = lock(&self.inner.subtasks);
        let subtask = slot.items.iter_mut().find(|s| s.id == subtask_id)?;
        subtask.title = title.to_string();
        let renamed = subtask.clone();
        let receipt = self.persist(Persist::Upsert(vec![renamed]));
        let count = slot.items.len();
        drop(slot);
        self.inner.emitter.subtasks_changed(count);
        Some(receipt)
    }

    /// Queue a change for the store behind every earlier one
    ///
    /// Called with the sub-task slot locked, so queue order matches the
    /// order local changes were applied. Failures are logged and flag the
    /// sub-task for resync; local state is kept.
    fn persist(&self, change: Persist) -> oneshot::Receiver<()> {
        self.inner.sync.submit(change)
    }

    /// Wait until every queued sub-task write has finished
    pub async fn wait_for_sync(&self) {
        debug!(task_id = %self.inner.task_id, "wait_for_sync: called");
        self.inner.sync.wait_idle().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::cache::FacetCache;
    use crate::domain::SubTaskStatus;
    use crate::events::CardEventBus;
    use crate::orchestrator::{CardServices, CardSettings};
    use crate::reasoning::mock::{self, MockReasoning};
    use crate::store::{MemoryStore, StoreError, StoreResult, TaskStore};
    use async_trait::async_trait;
    use proptest::prelude::*;

    /// Store whose writes always fail
    struct BrokenStore;

    #[async_trait]
    impl TaskStore for BrokenStore {
        async fn list_subtasks(&self, _task_id: &str) -> StoreResult<Vec<SubTask>> {
            Err(StoreError::Unavailable("offline".to_string()))
        }

        async fn upsert_subtask(&self, _task_id: &str, _subtask: &SubTask) -> StoreResult<()> {
            Err(StoreError::Unavailable("offline".to_string()))
        }

        async fn delete_subtask(&self, _task_id: &str, _subtask_id: &str) -> StoreResult<()> {
            Err(StoreError::Unavailable("offline".to_string()))
        }

        async fn save_task(&self, _task: &Task) -> StoreResult<()> {
            Err(StoreError::Unavailable("offline".to_string()))
        }

        async fn load_task(&self, _task_id: &str) -> StoreResult<Option<Task>> {
            Err(StoreError::Unavailable("offline".to_string()))
        }
    }

    /// Memory store with slow upserts and writes that fail for chosen ids
    #[derive(Default)]
    struct LaggyStore {
        data: MemoryStore,
        upsert_delay: Duration,
        failing: Mutex<HashSet<String>>,
    }

    impl LaggyStore {
        fn with_delay(upsert_delay: Duration) -> Self {
            Self {
                upsert_delay,
                ..Self::default()
            }
        }

        fn fail_writes_for(&self, id: &str) {
            self.failing.lock().unwrap().insert(id.to_string());
        }

        fn heal(&self) {
            self.failing.lock().unwrap().clear();
        }

        fn check(&self, id: &str) -> StoreResult<()> {
            if self.failing.lock().unwrap().contains(id) {
                return Err(StoreError::Unavailable(format!("write to {id} refused")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl TaskStore for LaggyStore {
        async fn list_subtasks(&self, task_id: &str) -> StoreResult<Vec<SubTask>> {
            self.data.list_subtasks(task_id).await
        }

        async fn upsert_subtask(&self, task_id: &str, subtask: &SubTask) -> StoreResult<()> {
            tokio::time::sleep(self.upsert_delay).await;
            self.check(&subtask.id)?;
            self.data.upsert_subtask(task_id, subtask).await
        }

        async fn delete_subtask(&self, task_id: &str, subtask_id: &str) -> StoreResult<()> {
            self.check(subtask_id)?;
            self.data.delete_subtask(task_id, subtask_id).await
        }

        async fn save_task(&self, task: &Task) -> StoreResult<()> {
            self.data.save_task(task).await
        }

        async fn load_task(&self, task_id: &str) -> StoreResult<Option<Task>> {
            self.data.load_task(task_id).await
        }
    }

    fn card(reasoning: MockReasoning, store: Arc<dyn TaskStore>) -> TaskEnrichmentOrchestrator {
        let services = CardServices {
            cache: Arc::new(FacetCache::new()),
            reasoning: Arc::new(reasoning),
            store,
            bus: CardEventBus::with_default_capacity(),
        };
        TaskEnrichmentOrchestrator::new(Task::new("t1", "Prepare quarterly report"), services, CardSettings::default())
    }

    fn titles(card: &TaskEnrichmentOrchestrator) -> Vec<String> {
        card.subtasks().into_iter().map(|s| s.title).collect()
    }

    #[tokio::test]
    async fn test_stored_subtasks_win() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_subtask("t1", &SubTask::new("Second", 2)).await.unwrap();
        store.upsert_subtask("t1", &SubTask::new("First", 1)).await.unwrap();
        let reasoning = MockReasoning::ready();
        let card = card(reasoning, store);

        card.load_subtasks().await;
        assert_eq!(titles(&card), vec!["First", "Second"]);
        assert_eq!(card.phase(FacetKind::SubTasks), FacetPhase::Loaded);
    }

    #[tokio::test]
    async fn test_empty_store_uses_remote_decompose_and_persists() {
        let store = Arc::new(MemoryStore::new());
        let card = card(MockReasoning::ready(), Arc::clone(&store) as Arc<dyn TaskStore>);

        card.load_subtasks().await;
        assert_eq!(titles(&card), vec!["Remote step A", "Remote step B"]);
        assert_eq!(card.phase(FacetKind::SubTasks), FacetPhase::Loaded);

        card.wait_for_sync().await;
        assert_eq!(store.list_subtasks("t1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_decompose_failure_uses_template() {
        let reasoning = MockReasoning::failing();
        let card = card(reasoning, Arc::new(MemoryStore::new()));

        card.load_subtasks().await;
        assert_eq!(card.phase(FacetKind::SubTasks), FacetPhase::Fallback);
        assert_eq!(card.subtasks().len(), 5);
    }

    #[tokio::test]
    async fn test_concurrent_subtask_loads_decompose_once() {
        let reasoning = Arc::new(MockReasoning::ready());
        let services = CardServices {
            cache: Arc::new(FacetCache::new()),
            reasoning: Arc::clone(&reasoning) as Arc<dyn crate::reasoning::ReasoningClient>,
            store: Arc::new(MemoryStore::new()),
            bus: CardEventBus::with_default_capacity(),
        };
        let card = TaskEnrichmentOrchestrator::new(Task::new("t1", "Write memo"), services, CardSettings::default());

        tokio::join!(card.load_subtasks(), card.load_subtasks());
        assert_eq!(reasoning.calls(mock::DECOMPOSE), 1);
    }

    #[tokio::test]
    async fn test_toggle_add_rename() {
        let card = card(MockReasoning::not_ready(), Arc::new(MemoryStore::new()));
        card.load_subtasks().await;
        let first = card.subtasks()[0].id.clone();

        card.toggle(&first).unwrap().await.unwrap();
        let toggled = &card.subtasks()[0];
        assert_eq!(toggled.status, SubTaskStatus::Completed);
        assert!(toggled.completed_at.is_some());

        card.toggle(&first).unwrap().await.unwrap();
        assert_eq!(card.subtasks()[0].status, SubTaskStatus::Pending);
        assert!(card.subtasks()[0].completed_at.is_none());

        card.add("Send it to finance").unwrap().await.unwrap();
        let last = card.subtasks().last().cloned().unwrap();
        assert_eq!(last.title, "Send it to finance");
        assert_eq!(last.order_index, 6);

        card.rename(&last.id, "Email finance").unwrap().await.unwrap();
        assert_eq!(card.subtasks().last().unwrap().title, "Email finance");
        assert_eq!(card.subtasks().last().unwrap().order_index, 6);
        assert!(!card.needs_resync());
    }

    #[tokio::test]
    async fn test_blank_and_unknown_rejected() {
        let card = card(MockReasoning::not_ready(), Arc::new(MemoryStore::new()));
        card.load_subtasks().await;
        let before = card.subtasks();

        assert!(card.add("   ").is_none());
        assert!(card.rename(&before[0].id, "").is_none());
        assert!(card.toggle("missing").is_none());
        assert!(card.delete("missing").is_none());
        assert_eq!(card.subtasks(), before);
    }

    #[tokio::test]
    async fn test_delete_renumbers_and_persists() {
        let store = Arc::new(MemoryStore::new());
        let card = card(MockReasoning::not_ready(), Arc::clone(&store) as Arc<dyn TaskStore>);
        card.load_subtasks().await;
        card.wait_for_sync().await;

        let second = card.subtasks()[1].id.clone();
        card.delete(&second).unwrap().await.unwrap();

        let indices: Vec<u32> = card.subtasks().iter().map(|s| s.order_index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
        let stored: Vec<u32> = store
            .list_subtasks("t1")
            .await
            .unwrap()
            .iter()
            .map(|s| s.order_index)
            .collect();
        assert_eq!(stored, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_local_state_and_flags_resync() {
        let card = card(MockReasoning::not_ready(), Arc::new(BrokenStore));
        card.load_subtasks().await;
        assert_eq!(card.phase(FacetKind::SubTasks), FacetPhase::Fallback);

        let first = card.subtasks()[0].id.clone();
        card.toggle(&first).unwrap().await.unwrap();

        assert_eq!(card.subtasks()[0].status, SubTaskStatus::Completed);
        assert!(card.needs_resync());
    }

    #[tokio::test]
    async fn test_reload_clears_resync() {
        let store = Arc::new(MemoryStore::new());
        let card = card(MockReasoning::not_ready(), Arc::clone(&store) as Arc<dyn TaskStore>);
        card.inner.sync.mark_unsynced("stale");

        card.load_subtasks().await;
        assert!(!card.needs_resync());
    }

    async fn assert_store_matches(card: &TaskEnrichmentOrchestrator, store: &dyn TaskStore) {
        let stored = store.list_subtasks("t1").await.unwrap();
        assert_eq!(stored, card.subtasks());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_edits_right_after_generation_reach_store_in_order() {
        for _ in 0..10 {
            let store = Arc::new(LaggyStore::with_delay(Duration::from_millis(2)));
            let card = card(MockReasoning::not_ready(), Arc::clone(&store) as Arc<dyn TaskStore>);
            card.load_subtasks().await;

            let items = card.subtasks();
            card.toggle(&items[4].id).unwrap();
            card.toggle(&items[3].id).unwrap();
            card.toggle(&items[3].id).unwrap();
            card.delete(&items[0].id).unwrap();
            card.rename(&items[1].id, "Collect the numbers").unwrap();
            card.wait_for_sync().await;

            assert_eq!(card.subtasks()[3].status, SubTaskStatus::Completed);
            assert_store_matches(&card, store.as_ref()).await;
            assert!(!card.needs_resync());
        }
    }

    #[tokio::test]
    async fn test_unrelated_success_keeps_resync_flag() {
        let store = Arc::new(LaggyStore::default());
        let card = card(MockReasoning::not_ready(), Arc::clone(&store) as Arc<dyn TaskStore>);
        card.load_subtasks().await;
        card.wait_for_sync().await;
        let items = card.subtasks();

        store.fail_writes_for(&items[0].id);
        card.toggle(&items[0].id).unwrap().await.unwrap();
        assert!(card.needs_resync());

        card.rename(&items[1].id, "Draft the summary").unwrap().await.unwrap();
        assert!(card.needs_resync(), "a write to another sub-task must not hide the failure");

        store.heal();
        card.rename(&items[0].id, "Gather last quarter's data").unwrap().await.unwrap();
        assert!(!card.needs_resync());
        assert_store_matches(&card, store.as_ref()).await;
    }

    #[tokio::test]
    async fn test_reload_after_failed_write_restores_store_view() {
        let store = Arc::new(LaggyStore::default());
        let card = card(MockReasoning::not_ready(), Arc::clone(&store) as Arc<dyn TaskStore>);
        card.load_subtasks().await;
        card.wait_for_sync().await;
        let first = card.subtasks()[0].id.clone();

        store.fail_writes_for(&first);
        card.toggle(&first).unwrap().await.unwrap();
        assert!(card.needs_resync());

        card.load_subtasks().await;
        assert!(!card.needs_resync());
        assert_eq!(card.subtasks()[0].status, SubTaskStatus::Pending);
        assert_store_matches(&card, store.as_ref()).await;
    }

    #[tokio::test]
    async fn test_abandoned_subtask_load_can_run_again() {
        let reasoning = MockReasoning::ready().with_delay(Duration::from_millis(50));
        let card = card(reasoning, Arc::new(MemoryStore::new()));

        let abandoned = tokio::time::timeout(Duration::from_millis(5), card.load_subtasks()).await;
        assert!(abandoned.is_err());
        assert_eq!(card.phase(FacetKind::SubTasks), FacetPhase::Unloaded);

        card.load_subtasks().await;
        assert_eq!(card.phase(FacetKind::SubTasks), FacetPhase::Loaded);
        assert_eq!(titles(&card), vec!["Remote step A", "Remote step B"]);
    }

    fn numbered(n: usize) -> Vec<SubTask> {
        (1..=n).map(|i| SubTask::new(format!("step {i}"), i as u32)).collect()
    }

    proptest! {
        #[test]
        fn prop_delete_keeps_indices_dense(n in 1usize..12, pick in 0usize..12) {
            let k = pick % n;
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            rt.block_on(async {
                let card = card(MockReasoning::not_ready(), Arc::new(MemoryStore::new()));
                let items = numbered(n);
                let expected: Vec<String> = items
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != k)
                    .map(|(_, s)| s.id.clone())
                    .collect();
                card.inner.subtasks.lock().unwrap().items = items.clone();

                card.delete(&items[k].id).unwrap().await.unwrap();

                let after = card.subtasks();
                let indices: Vec<u32> = after.iter().map(|s| s.order_index).collect();
                let ids: Vec<String> = after.iter().map(|s| s.id.clone()).collect();
                assert_eq!(indices, (1..n as u32).collect::<Vec<_>>());
                assert_eq!(ids, expected);
            });
        }
    }
}
