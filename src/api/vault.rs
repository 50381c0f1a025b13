//! The main entry point for interacting with a prompt vault.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use super::error::{CategoryError, StoreError};
use super::runner::TestRunner;
use crate::core::bus::{EventSink, SyncBus, SyncEvent};
use crate::core::config::SyncSettings;
use crate::core::filter::{PromptView, ViewQuery};
use crate::core::prompt::{Prompt, PromptPatch, RunRating, SavedRun};
use crate::core::repository::{ImportReport, PromptRepository};
use crate::core::store::{JsonStore, StorageAdapter, VaultPaths};
use crate::core::sync::{DualStoreReplicator, SyncCoordinator};
use crate::core::utils::now_millis;

/// Theme reported before the user ever sets one.
pub const DEFAULT_THEME: &str = "light";

/// An owned page of visible prompts, evaluated from the current view.
#[derive(Debug)]
pub struct VisiblePage {
    pub items: Vec<Prompt>,
    /// Matches before pagination.
    pub total: usize,
    pub has_more: bool,
}

/// The main entry point for interacting with a prompt vault.
///
/// This structure is designed to be created once and shared throughout your
/// application. All reads and writes go against the in-memory repository;
/// persistence happens behind the scenes through the sync machinery. Call
/// [`start`](Self::start) before the first mutation and
/// [`close`](Self::close) before the process exits, otherwise debounced
/// writes may still be in flight.
pub struct PromptVault {
    repo: RwLock<PromptRepository>,
    view: RwLock<PromptView>,
    theme: RwLock<String>,
    sink: EventSink,
    bus: SyncBus,
    coordinator: SyncCoordinator,
    run_cancel: Mutex<Option<CancellationToken>>,
}

impl PromptVault {
    /// Open a vault over an explicit primary store and secondary replica.
    /// State is loaded from the primary; the replica is only ever written.
    pub async fn open(
        primary: Arc<dyn StorageAdapter>,
        secondary: Arc<dyn StorageAdapter>,
        settings: SyncSettings,
    ) -> Result<Self, StoreError> {
        let bus = SyncBus::new();
        let sink = bus.sink();

        let prompts = primary.get_prompts().await?;
        let custom_categories = primary.get_categories().await?;
        let theme = primary
            .get_theme()
            .await?
            .unwrap_or_else(|| DEFAULT_THEME.to_string());
        let view = primary.get_filter_state().await?.unwrap_or_default();

        let replicator = Arc::new(DualStoreReplicator::new(primary, secondary));
        let coordinator = SyncCoordinator::new(
            replicator,
            Duration::from_millis(settings.debounce_ms),
        );

        Ok(Self {
            repo: RwLock::new(PromptRepository::with_state(
                prompts,
                custom_categories,
                sink.clone(),
            )),
            view: RwLock::new(view),
            theme: RwLock::new(theme),
            sink,
            bus,
            coordinator,
            run_cancel: Mutex::new(None),
        })
    }

    /// Open a vault on the standard on-disk layout.
    pub async fn open_at(paths: &VaultPaths, settings: SyncSettings) -> Result<Self, StoreError> {
        let primary = Arc::new(JsonStore::open(&paths.primary_dir)?);
        let secondary = Arc::new(JsonStore::open(&paths.replica_dir)?);
        Self::open(primary, secondary, settings).await
    }

    /// Start the sync machinery: subscribe the coordinator, run the startup
    /// reconciliation, and begin flushing events.
    pub async fn start(&mut self) {
        let events = self.bus.subscribe();
        self.bus.start();
        self.coordinator.start(events).await;
    }

    /// Flush pending writes and shut the sync machinery down. The vault is
    /// consumed; all state is on disk when this returns.
    pub async fn close(mut self) {
        self.cancel_run();
        self.bus.stop().await;
        self.coordinator.stop().await;
    }

    /// Force every pending write to disk right now and report the sync
    /// state: `None` when clean, otherwise the failure message.
    pub async fn sync_now(&self) -> Option<String> {
        self.coordinator.flush_now().await;
        self.coordinator.sync_error()
    }

    /// Most recent persistence failure, if any.
    pub fn sync_error(&self) -> Option<String> {
        self.coordinator.sync_error()
    }

    // --- Prompt operations ---

    pub async fn create(&self, patch: PromptPatch) -> Prompt {
        self.repo.write().await.create(patch)
    }

    pub async fn get(&self, id: &str) -> Option<Prompt> {
        self.repo.read().await.get(id).cloned()
    }

    /// Find a prompt by ID first, then by exact title (case-insensitive).
    /// A title shared by several prompts is an error rather than a guess.
    pub async fn find(&self, id_or_title: &str) -> Result<Prompt, StoreError> {
        let repo = self.repo.read().await;
        if let Some(prompt) = repo.get(id_or_title) {
            return Ok(prompt.clone());
        }
        let mut matches = repo
            .prompts()
            .iter()
            .filter(|p| p.title.eq_ignore_ascii_case(id_or_title));
        match (matches.next(), matches.next()) {
            (Some(prompt), None) => Ok(prompt.clone()),
            (Some(_), Some(_)) => Err(StoreError::AmbiguousTitle(id_or_title.to_string())),
            _ => Err(StoreError::NotFound(id_or_title.to_string())),
        }
    }

    /// Every stored record, trash included, in stored order.
    pub async fn prompts(&self) -> Vec<Prompt> {
        self.repo.read().await.prompts().to_vec()
    }

    pub async fn update(&self, id: &str, patch: PromptPatch) -> Result<Prompt, StoreError> {
        self.repo
            .write()
            .await
            .update(id, patch)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub async fn duplicate(&self, id: &str) -> Result<Prompt, StoreError> {
        let mut repo = self.repo.write().await;
        let source = repo
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(repo.duplicate(&source))
    }

    pub async fn soft_delete(&self, id: &str) -> Result<(), StoreError> {
        if self.repo.write().await.soft_delete(id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(id.to_string()))
        }
    }

    pub async fn restore(&self, id: &str) -> Result<(), StoreError> {
        if self.repo.write().await.restore(id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(id.to_string()))
        }
    }

    pub async fn permanent_delete(&self, id: &str) -> Result<(), StoreError> {
        if self.repo.write().await.permanent_delete(id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(id.to_string()))
        }
    }

    pub async fn toggle_favorite(&self, id: &str) -> Result<bool, StoreError> {
        self.repo
            .write()
            .await
            .toggle_favorite(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    // --- Saved runs ---

    pub async fn record_run(&self, id: &str, run: SavedRun) -> Result<(), StoreError> {
        if self.repo.write().await.record_run(id, run) {
            Ok(())
        } else {
            Err(StoreError::NotFound(id.to_string()))
        }
    }

    pub async fn rate_run(
        &self,
        id: &str,
        run_id: &str,
        rating: RunRating,
    ) -> Result<(), StoreError> {
        if self.repo.write().await.rate_run(id, run_id, rating) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("{}/{}", id, run_id)))
        }
    }

    pub async fn delete_run(&self, id: &str, run_id: &str) -> Result<(), StoreError> {
        if self.repo.write().await.delete_run(id, run_id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("{}/{}", id, run_id)))
        }
    }

    // --- Categories ---

    /// Built-in categories followed by user-created ones.
    pub async fn categories(&self) -> Vec<String> {
        self.repo.read().await.categories()
    }

    pub async fn custom_categories(&self) -> Vec<String> {
        self.repo.read().await.custom_categories().to_vec()
    }

    pub async fn add_category(&self, name: &str) -> Result<(), CategoryError> {
        self.repo.write().await.add_category(name)
    }

    /// Returns how many prompts were reassigned to the fallback category.
    pub async fn delete_category(&self, name: &str) -> usize {
        self.repo.write().await.delete_category(name)
    }

    // --- Import / export ---

    pub async fn import(&self, incoming: Vec<Prompt>) -> ImportReport {
        self.repo.write().await.import(incoming)
    }

    /// Records for export: the given ids verbatim, or the whole live
    /// (non-trashed) library when `ids` is `None`.
    pub async fn export(&self, ids: Option<&[String]>) -> Result<Vec<Prompt>, StoreError> {
        let repo = self.repo.read().await;
        match ids {
            Some(ids) => ids
                .iter()
                .map(|id| {
                    repo.get(id)
                        .cloned()
                        .ok_or_else(|| StoreError::NotFound(id.clone()))
                })
                .collect(),
            None => Ok(repo
                .prompts()
                .iter()
                .filter(|p| !p.is_trashed())
                .cloned()
                .collect()),
        }
    }

    // --- View state ---

    pub async fn view(&self) -> PromptView {
        self.view.read().await.clone()
    }

    /// Mutate the persistent view through its setters and announce the new
    /// state. Returns the state after the change.
    pub async fn update_view<F>(&self, apply: F) -> PromptView
    where
        F: FnOnce(&mut PromptView),
    {
        let mut view = self.view.write().await;
        apply(&mut view);
        let snapshot = view.clone();
        self.sink.emit(SyncEvent::FiltersUpdated {
            view: Box::new(snapshot.clone()),
        });
        snapshot
    }

    /// Evaluate the persistent view against the current prompts.
    pub async fn visible(&self) -> VisiblePage {
        let view = self.view.read().await.clone();
        let repo = self.repo.read().await;
        let page = view.select(repo.prompts(), now_millis());
        VisiblePage {
            total: page.total,
            has_more: page.has_more,
            items: page.items.into_iter().cloned().collect(),
        }
    }

    /// Evaluate an ad-hoc query without touching the persistent view.
    pub async fn query(&self, query: &ViewQuery, pages: usize) -> VisiblePage {
        let repo = self.repo.read().await;
        let page = crate::core::filter::select(query, pages, repo.prompts(), now_millis());
        VisiblePage {
            total: page.total,
            has_more: page.has_more,
            items: page.items.into_iter().cloned().collect(),
        }
    }

    // --- Theme ---

    pub async fn theme(&self) -> String {
        self.theme.read().await.clone()
    }

    pub async fn set_theme(&self, theme: impl Into<String>) {
        let theme = theme.into();
        *self.theme.write().await = theme.clone();
        self.sink.emit(SyncEvent::ThemeUpdated { theme });
    }

    // --- Test runs ---

    /// Creates a runner for a single test execution of a prompt.
    ///
    /// # Arguments
    ///
    /// * `id_or_title` - The ID or exact title of the prompt to run.
    pub fn test<'a>(&'a self, id_or_title: &'a str) -> TestRunner<'a> {
        TestRunner::new(self, id_or_title)
    }

    /// Register a new run-in-flight, cancelling whichever run was active
    /// before. Supersession, not failure: the old run sees
    /// `RunError::Cancelled`.
    pub(crate) fn begin_run(&self) -> CancellationToken {
        let mut guard = self.run_cancel.lock().unwrap();
        if let Some(previous) = guard.take() {
            previous.cancel();
        }
        let token = CancellationToken::new();
        *guard = Some(token.clone());
        token
    }

    /// Cancel the active run, if any.
    pub fn cancel_run(&self) {
        if let Some(token) = self.run_cancel.lock().unwrap().take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filter::CategoryFilter;
    use crate::core::store::MemoryStore;
    use std::collections::BTreeMap;

    fn settings() -> SyncSettings {
        SyncSettings { debounce_ms: 100 }
    }

    struct Stores {
        primary: Arc<MemoryStore>,
        secondary: Arc<MemoryStore>,
    }

    impl Stores {
        fn new() -> Self {
            Self {
                primary: Arc::new(MemoryStore::new()),
                secondary: Arc::new(MemoryStore::new()),
            }
        }

        async fn vault(&self) -> PromptVault {
            let mut vault = PromptVault::open(
                Arc::clone(&self.primary) as Arc<dyn StorageAdapter>,
                Arc::clone(&self.secondary) as Arc<dyn StorageAdapter>,
                settings(),
            )
            .await
            .unwrap();
            vault.start().await;
            vault
        }
    }

    fn patch(title: &str, content: &str) -> PromptPatch {
        PromptPatch {
            title: Some(title.to_string()),
            content: Some(content.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn create_and_two_quick_edits_persist_once_settled() {
        let stores = Stores::new();
        let vault = stores.vault().await;

        let p = vault.create(patch("Draft", "v1")).await;
        vault
            .update(
                &p.id,
                PromptPatch {
                    content: Some("v2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        vault
            .update(
                &p.id,
                PromptPatch {
                    content: Some("v3".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        // Both stores converged on the final state.
        let stored = stores.primary.get_prompts().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].content, "v3");
        assert_eq!(stored[0].history.len(), 2);
        assert_eq!(stored[0].history[0].content, "v2");
        assert_eq!(stores.secondary.get_prompts().await.unwrap(), stored);

        // One coalesced flush: a create apply plus an update apply.
        assert!(stores.primary.prompt_save_count() <= 2);
        vault.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn close_persists_without_waiting_for_debounce() {
        let stores = Stores::new();
        let vault = stores.vault().await;
        let p = vault.create(patch("Hasty", "bye")).await;
        // No sleep: close itself must flush.
        vault.close().await;

        let stored = stores.primary.get_prompts().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, p.id);
        assert_eq!(stores.secondary.get_prompts().await.unwrap(), stored);
    }

    #[tokio::test(start_paused = true)]
    async fn reopen_rehydrates_everything() {
        let stores = Stores::new();
        let vault = stores.vault().await;
        let p = vault.create(patch("Persistent", "v1")).await;
        vault
            .update(
                &p.id,
                PromptPatch {
                    content: Some("v2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        vault.add_category("Legal").await.unwrap();
        vault.set_theme("dark").await;
        vault
            .update_view(|v| v.set_category(CategoryFilter::Named("Legal".to_string())))
            .await;
        vault.close().await;

        let vault = stores.vault().await;
        let p = vault.get(&p.id).await.unwrap();
        assert_eq!(p.content, "v2");
        assert_eq!(p.history.len(), 1);
        assert_eq!(vault.theme().await, "dark");
        assert_eq!(
            vault.custom_categories().await,
            vec!["Legal".to_string()]
        );
        assert_eq!(
            vault.view().await.query().category,
            CategoryFilter::Named("Legal".to_string())
        );
        vault.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn find_resolves_title_and_reports_ambiguity() {
        let stores = Stores::new();
        let vault = stores.vault().await;
        let p = vault.create(patch("Unique Name", "x")).await;

        assert_eq!(vault.find(&p.id).await.unwrap().id, p.id);
        assert_eq!(vault.find("unique name").await.unwrap().id, p.id);
        assert!(matches!(
            vault.find("nothing").await,
            Err(StoreError::NotFound(_))
        ));

        vault.create(patch("Unique Name", "y")).await;
        assert!(matches!(
            vault.find("Unique Name").await,
            Err(StoreError::AmbiguousTitle(_))
        ));
        vault.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn visible_respects_persisted_view() {
        let stores = Stores::new();
        let vault = stores.vault().await;
        let a = vault.create(patch("Alpha", "x")).await;
        let b = vault.create(patch("Beta", "y")).await;
        vault.soft_delete(&b.id).await.unwrap();

        let page = vault.visible().await;
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, a.id);

        vault
            .update_view(|v| v.set_category(CategoryFilter::Trash))
            .await;
        let page = vault.visible().await;
        assert_eq!(page.items[0].id, b.id);
        vault.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn replica_outage_surfaces_as_sync_error_and_heals() {
        let stores = Stores::new();
        let vault = stores.vault().await;

        stores.secondary.set_offline(true);
        vault.create(patch("Unlucky", "x")).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        let error = vault.sync_now().await;
        assert!(error.is_some());
        // Memory still serves the record.
        assert_eq!(vault.prompts().await.len(), 1);

        stores.secondary.set_offline(false);
        vault.set_theme("dark").await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(vault.sync_now().await, None);
        assert_eq!(stores.secondary.get_prompts().await.unwrap().len(), 1);
        vault.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn export_skips_trash_unless_asked_by_id() {
        let stores = Stores::new();
        let vault = stores.vault().await;
        let a = vault.create(patch("Live", "x")).await;
        let b = vault.create(patch("Trashed", "y")).await;
        vault.soft_delete(&b.id).await.unwrap();

        let all = vault.export(None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, a.id);

        let picked = vault.export(Some(&[b.id.clone()])).await.unwrap();
        assert_eq!(picked[0].id, b.id);
        assert!(vault
            .export(Some(&["missing0".to_string()]))
            .await
            .is_err());
        vault.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn record_run_lands_in_store_after_flush() {
        let stores = Stores::new();
        let vault = stores.vault().await;
        let p = vault.create(patch("Benchmark", "run {{x}}")).await;
        vault
            .record_run(
                &p.id,
                SavedRun {
                    id: "run00001".to_string(),
                    timestamp: 1,
                    model: "gpt-4o-mini".to_string(),
                    vars: BTreeMap::new(),
                    output: "out".to_string(),
                    rating: None,
                },
            )
            .await
            .unwrap();
        vault.rate_run(&p.id, "run00001", RunRating::Good).await.unwrap();
        vault.close().await;

        let stored = stores.primary.get_prompts().await.unwrap();
        assert_eq!(stored[0].saved_runs.len(), 1);
        assert_eq!(stored[0].saved_runs[0].rating, Some(RunRating::Good));
    }
}
