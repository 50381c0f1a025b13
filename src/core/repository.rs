use std::collections::HashSet;
use std::fmt;

use crate::api::CategoryError;
use crate::core::bus::{EventSink, SyncEvent};
use crate::core::prompt::{
    Prompt, PromptPatch, RunRating, SavedRun, FALLBACK_CATEGORY, STANDARD_CATEGORIES,
};
use crate::core::utils::{new_id, now_millis};

/// Why an imported record was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingId,
    MissingTitle,
    MissingContent,
    DuplicateId,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingId => write!(f, "missing id"),
            SkipReason::MissingTitle => write!(f, "missing title"),
            SkipReason::MissingContent => write!(f, "missing content"),
            SkipReason::DuplicateId => write!(f, "id already exists"),
        }
    }
}

/// One rejected record from an import batch.
#[derive(Debug, Clone)]
pub struct ImportSkip {
    /// Position in the incoming batch.
    pub index: usize,
    /// Whatever identifies the record best, id or title.
    pub label: String,
    pub reason: SkipReason,
}

/// Outcome of an import: how many records landed, and which were skipped.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: Vec<ImportSkip>,
}

/// The authoritative in-memory prompt collection.
///
/// Every mutation lands here first and is answered from here; persistence
/// observes mutations through the emitted [`SyncEvent`]s and never writes
/// back into the repository. Stored order is newest-first by construction:
/// creations insert at the head.
pub struct PromptRepository {
    prompts: Vec<Prompt>,
    custom_categories: Vec<String>,
    sink: EventSink,
}

impl PromptRepository {
    pub fn new(sink: EventSink) -> Self {
        Self::with_state(Vec::new(), Vec::new(), sink)
    }

    /// Rehydrate from persisted state.
    pub fn with_state(
        prompts: Vec<Prompt>,
        custom_categories: Vec<String>,
        sink: EventSink,
    ) -> Self {
        Self {
            prompts,
            custom_categories,
            sink,
        }
    }

    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    pub fn get(&self, id: &str) -> Option<&Prompt> {
        self.prompts.iter().find(|p| p.id == id)
    }

    /// Built-in categories followed by user-created ones.
    pub fn categories(&self) -> Vec<String> {
        STANDARD_CATEGORIES
            .iter()
            .map(|c| c.to_string())
            .chain(self.custom_categories.iter().cloned())
            .collect()
    }

    pub fn custom_categories(&self) -> &[String] {
        &self.custom_categories
    }

    fn unique_id(&self) -> String {
        loop {
            let id = new_id();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    fn emit_updated(&self, prompt: &Prompt) {
        self.sink.emit(SyncEvent::PromptUpdated {
            prompt: Box::new(prompt.clone()),
        });
    }

    /// Create a record from `patch` and insert it at the head of the list.
    pub fn create(&mut self, patch: PromptPatch) -> Prompt {
        let prompt = Prompt::from_patch(self.unique_id(), patch, now_millis());
        self.prompts.insert(0, prompt.clone());
        self.sink.emit(SyncEvent::PromptCreated {
            prompt: Box::new(prompt.clone()),
        });
        prompt
    }

    /// Merge `patch` into the record, snapshotting the pre-edit state first
    /// when a substantive field actually changes. Unknown ids are a silent
    /// no-op.
    pub fn update(&mut self, id: &str, patch: PromptPatch) -> Option<Prompt> {
        let now = now_millis();
        let prompt = self.prompts.iter_mut().find(|p| p.id == id)?;
        if prompt.would_snapshot(&patch) {
            let snapshot = prompt.version_snapshot(now);
            prompt.push_version(snapshot);
        }
        prompt.merge(patch);
        prompt.updated_at = now;
        let updated = prompt.clone();
        self.emit_updated(&updated);
        Some(updated)
    }

    /// Insert a copy of `source` as a brand-new record at the head.
    pub fn duplicate(&mut self, source: &Prompt) -> Prompt {
        let copy = source.duplicate_as(self.unique_id(), now_millis());
        self.prompts.insert(0, copy.clone());
        self.sink.emit(SyncEvent::PromptCreated {
            prompt: Box::new(copy.clone()),
        });
        copy
    }

    /// Move a record to the trash. The record stays in the list; only the
    /// deletion marker is set.
    pub fn soft_delete(&mut self, id: &str) -> bool {
        let now = now_millis();
        let Some(prompt) = self.prompts.iter_mut().find(|p| p.id == id) else {
            return false;
        };
        prompt.deleted_at = Some(now);
        prompt.updated_at = now;
        let updated = prompt.clone();
        self.emit_updated(&updated);
        true
    }

    /// Clear the deletion marker, bringing the record back into view.
    pub fn restore(&mut self, id: &str) -> bool {
        let now = now_millis();
        let Some(prompt) = self.prompts.iter_mut().find(|p| p.id == id) else {
            return false;
        };
        prompt.deleted_at = None;
        prompt.updated_at = now;
        let updated = prompt.clone();
        self.emit_updated(&updated);
        true
    }

    /// Remove the record outright. Works on trashed and live records alike;
    /// callers wanting a trash-only guard enforce it themselves.
    pub fn permanent_delete(&mut self, id: &str) -> bool {
        let before = self.prompts.len();
        self.prompts.retain(|p| p.id != id);
        if self.prompts.len() == before {
            return false;
        }
        self.sink.emit(SyncEvent::PromptDeleted { id: id.to_string() });
        true
    }

    /// Flip the favorite flag, returning the new state.
    pub fn toggle_favorite(&mut self, id: &str) -> Option<bool> {
        let now = now_millis();
        let prompt = self.prompts.iter_mut().find(|p| p.id == id)?;
        prompt.is_favorite = !prompt.is_favorite;
        prompt.updated_at = now;
        let state = prompt.is_favorite;
        let updated = prompt.clone();
        self.emit_updated(&updated);
        Some(state)
    }

    /// Attach a test run to the record, newest first, capped.
    pub fn record_run(&mut self, id: &str, run: SavedRun) -> bool {
        let now = now_millis();
        let Some(prompt) = self.prompts.iter_mut().find(|p| p.id == id) else {
            return false;
        };
        prompt.push_run(run);
        prompt.updated_at = now;
        let updated = prompt.clone();
        self.emit_updated(&updated);
        true
    }

    pub fn rate_run(&mut self, id: &str, run_id: &str, rating: RunRating) -> bool {
        let now = now_millis();
        let Some(prompt) = self.prompts.iter_mut().find(|p| p.id == id) else {
            return false;
        };
        let Some(run) = prompt.saved_runs.iter_mut().find(|r| r.id == run_id) else {
            return false;
        };
        run.rating = Some(rating);
        prompt.updated_at = now;
        let updated = prompt.clone();
        self.emit_updated(&updated);
        true
    }

    pub fn delete_run(&mut self, id: &str, run_id: &str) -> bool {
        let now = now_millis();
        let Some(prompt) = self.prompts.iter_mut().find(|p| p.id == id) else {
            return false;
        };
        let before = prompt.saved_runs.len();
        prompt.saved_runs.retain(|r| r.id != run_id);
        if prompt.saved_runs.len() == before {
            return false;
        }
        prompt.updated_at = now;
        let updated = prompt.clone();
        self.emit_updated(&updated);
        true
    }

    /// Register a custom category. Names collide against both the built-in
    /// and the custom set.
    pub fn add_category(&mut self, name: &str) -> Result<(), CategoryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CategoryError::Empty);
        }
        if STANDARD_CATEGORIES.contains(&name)
            || self.custom_categories.iter().any(|c| c == name)
        {
            return Err(CategoryError::AlreadyExists(name.to_string()));
        }
        self.custom_categories.push(name.to_string());
        self.sink.emit(SyncEvent::CategoriesUpdated {
            categories: self.custom_categories.clone(),
        });
        Ok(())
    }

    /// Drop a custom category, reassigning its members (trashed ones
    /// included) to the fallback. Built-in categories cannot be dropped.
    /// Returns how many prompts were reassigned.
    pub fn delete_category(&mut self, name: &str) -> usize {
        if !self.custom_categories.iter().any(|c| c == name) {
            return 0;
        }
        let now = now_millis();
        self.custom_categories.retain(|c| c != name);

        let mut reassigned = Vec::new();
        for prompt in self.prompts.iter_mut().filter(|p| p.category == name) {
            prompt.category = FALLBACK_CATEGORY.to_string();
            prompt.updated_at = now;
            reassigned.push(prompt.clone());
        }
        for prompt in &reassigned {
            self.emit_updated(prompt);
        }
        self.sink.emit(SyncEvent::CategoriesUpdated {
            categories: self.custom_categories.clone(),
        });
        reassigned.len()
    }

    /// Merge a batch of foreign records in at the head, batch order kept.
    /// Records without id, title, or content are skipped, as is any id
    /// already present or repeated within the batch.
    pub fn import(&mut self, incoming: Vec<Prompt>) -> ImportReport {
        let mut report = ImportReport::default();
        let mut seen: HashSet<String> = self.prompts.iter().map(|p| p.id.clone()).collect();
        let mut accepted = Vec::new();

        for (index, prompt) in incoming.into_iter().enumerate() {
            let reason = if prompt.id.is_empty() {
                Some(SkipReason::MissingId)
            } else if prompt.title.is_empty() {
                Some(SkipReason::MissingTitle)
            } else if prompt.content.is_empty() {
                Some(SkipReason::MissingContent)
            } else if seen.contains(&prompt.id) {
                Some(SkipReason::DuplicateId)
            } else {
                None
            };

            match reason {
                Some(reason) => report.skipped.push(ImportSkip {
                    index,
                    label: if prompt.id.is_empty() {
                        prompt.title.clone()
                    } else {
                        prompt.id.clone()
                    },
                    reason,
                }),
                None => {
                    seen.insert(prompt.id.clone());
                    accepted.push(prompt);
                }
            }
        }

        report.imported = accepted.len();
        for prompt in &accepted {
            self.sink.emit(SyncEvent::PromptCreated {
                prompt: Box::new(prompt.clone()),
            });
        }
        self.prompts.splice(0..0, accepted);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bus::EventKey;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn repo() -> (PromptRepository, UnboundedReceiver<SyncEvent>) {
        let (sink, rx) = EventSink::test_pair();
        (PromptRepository::new(sink), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<SyncEvent>) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn patch(title: &str, content: &str) -> PromptPatch {
        PromptPatch {
            title: Some(title.to_string()),
            content: Some(content.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn create_inserts_at_head_with_unique_ids() {
        let (mut repo, mut rx) = repo();
        let first = repo.create(patch("First", "one"));
        let second = repo.create(patch("Second", "two"));

        assert_ne!(first.id, second.id);
        assert_eq!(repo.prompts()[0].id, second.id);
        assert_eq!(repo.prompts()[1].id, first.id);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], SyncEvent::PromptCreated { prompt } if prompt.id == first.id));
    }

    #[test]
    fn update_snapshots_before_substantive_change() {
        let (mut repo, mut rx) = repo();
        let p = repo.create(patch("Greeter", "Hello {{name}}"));
        drain(&mut rx);

        let updated = repo
            .update(
                &p.id,
                PromptPatch {
                    content: Some("Hi {{name}}".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.history.len(), 1);
        assert_eq!(updated.history[0].content, "Hello {{name}}");
        assert_eq!(updated.history[0].title, "Greeter");
        assert_eq!(updated.content, "Hi {{name}}");

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].key(), EventKey::PromptUpdated(p.id.clone()));
    }

    #[test]
    fn metadata_update_takes_no_snapshot() {
        let (mut repo, _rx) = repo();
        let p = repo.create(patch("Name", "body"));
        let updated = repo.update(&p.id, PromptPatch::titled("Renamed")).unwrap();
        assert!(updated.history.is_empty());
        assert_eq!(updated.title, "Renamed");
    }

    #[test]
    fn update_of_unknown_id_is_silent() {
        let (mut repo, mut rx) = repo();
        assert!(repo.update("missing1", PromptPatch::titled("x")).is_none());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn eleven_edits_keep_ten_newest_snapshots() {
        let (mut repo, _rx) = repo();
        let p = repo.create(patch("Counter", "v0"));
        for i in 1..=11 {
            repo.update(
                &p.id,
                PromptPatch {
                    content: Some(format!("v{}", i)),
                    ..Default::default()
                },
            );
        }
        let stored = repo.get(&p.id).unwrap();
        assert_eq!(stored.history.len(), 10);
        // Newest snapshot holds the state before the last edit; v0 fell off.
        assert_eq!(stored.history[0].content, "v10");
        assert_eq!(stored.history[9].content, "v1");
    }

    #[test]
    fn soft_delete_round_trip_preserves_substance() {
        let (mut repo, mut rx) = repo();
        let p = repo.create(patch("Keeper", "text"));
        drain(&mut rx);

        assert!(repo.soft_delete(&p.id));
        let trashed = repo.get(&p.id).unwrap();
        assert!(trashed.is_trashed());

        assert!(repo.restore(&p.id));
        let back = repo.get(&p.id).unwrap();
        assert!(!back.is_trashed());
        assert_eq!(back.title, p.title);
        assert_eq!(back.content, p.content);
        assert_eq!(back.history, p.history);
        assert_eq!(back.created_at, p.created_at);

        let kinds: Vec<EventKey> = drain(&mut rx).iter().map(|e| e.key()).collect();
        assert_eq!(
            kinds,
            vec![
                EventKey::PromptUpdated(p.id.clone()),
                EventKey::PromptUpdated(p.id.clone())
            ]
        );
    }

    #[test]
    fn permanent_delete_removes_and_announces() {
        let (mut repo, mut rx) = repo();
        let p = repo.create(patch("Doomed", "x"));
        drain(&mut rx);

        assert!(repo.permanent_delete(&p.id));
        assert!(repo.get(&p.id).is_none());
        assert!(!repo.permanent_delete(&p.id));

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0], SyncEvent::PromptDeleted { id: p.id.clone() });
    }

    #[test]
    fn duplicate_is_a_new_record_with_copy_title() {
        let (mut repo, mut rx) = repo();
        let p = repo.create(patch("Original", "body"));
        repo.update(
            &p.id,
            PromptPatch {
                content: Some("body 2".to_string()),
                ..Default::default()
            },
        );
        let source = repo.get(&p.id).unwrap().clone();
        drain(&mut rx);

        let copy = repo.duplicate(&source);
        assert_ne!(copy.id, source.id);
        assert_eq!(copy.title, "Original (Copy)");
        assert!(copy.history.is_empty());
        assert_eq!(copy.content, "body 2");
        assert_eq!(repo.prompts()[0].id, copy.id);

        let events = drain(&mut rx);
        assert!(matches!(&events[0], SyncEvent::PromptCreated { prompt } if prompt.id == copy.id));
    }

    #[test]
    fn toggle_favorite_flips_state() {
        let (mut repo, _rx) = repo();
        let p = repo.create(patch("Fav", "x"));
        assert_eq!(repo.toggle_favorite(&p.id), Some(true));
        assert_eq!(repo.toggle_favorite(&p.id), Some(false));
        assert_eq!(repo.toggle_favorite("missing1"), None);
    }

    #[test]
    fn run_lifecycle_record_rate_delete() {
        let (mut repo, _rx) = repo();
        let p = repo.create(patch("Runner", "run me"));
        let run = SavedRun {
            id: "run00001".to_string(),
            timestamp: 5,
            model: "gpt-4o".to_string(),
            vars: Default::default(),
            output: "result".to_string(),
            rating: None,
        };
        assert!(repo.record_run(&p.id, run));
        assert!(repo.rate_run(&p.id, "run00001", RunRating::Good));
        assert_eq!(
            repo.get(&p.id).unwrap().saved_runs[0].rating,
            Some(RunRating::Good)
        );
        assert!(!repo.rate_run(&p.id, "nope", RunRating::Bad));
        assert!(repo.delete_run(&p.id, "run00001"));
        assert!(repo.get(&p.id).unwrap().saved_runs.is_empty());
        assert!(!repo.delete_run(&p.id, "run00001"));
    }

    #[test]
    fn twenty_one_runs_drop_the_oldest() {
        let (mut repo, _rx) = repo();
        let p = repo.create(patch("Busy", "x"));
        for i in 0..21 {
            repo.record_run(
                &p.id,
                SavedRun {
                    id: format!("run{:05}", i),
                    timestamp: i,
                    model: "m".to_string(),
                    vars: Default::default(),
                    output: String::new(),
                    rating: None,
                },
            );
        }
        let runs = &repo.get(&p.id).unwrap().saved_runs;
        assert_eq!(runs.len(), 20);
        assert_eq!(runs[0].id, "run00020");
        assert_eq!(runs[19].id, "run00001");
    }

    #[test]
    fn add_category_rejects_collisions_and_blank() {
        let (mut repo, mut rx) = repo();
        repo.add_category("Legal").unwrap();
        assert!(matches!(
            repo.add_category("Legal"),
            Err(CategoryError::AlreadyExists(_))
        ));
        assert!(matches!(
            repo.add_category("Coding"),
            Err(CategoryError::AlreadyExists(_))
        ));
        assert!(matches!(repo.add_category("  "), Err(CategoryError::Empty)));

        assert_eq!(repo.custom_categories(), &["Legal".to_string()]);
        assert!(repo.categories().contains(&"Legal".to_string()));
        // Only the successful add announced.
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[test]
    fn delete_category_reassigns_members_to_fallback() {
        let (mut repo, mut rx) = repo();
        repo.add_category("Foo").unwrap();
        let a = repo.create(PromptPatch {
            category: Some("Foo".to_string()),
            ..patch("A", "x")
        });
        let b = repo.create(PromptPatch {
            category: Some("Foo".to_string()),
            ..patch("B", "y")
        });
        let other = repo.create(patch("C", "z"));
        repo.soft_delete(&b.id);
        drain(&mut rx);

        assert_eq!(repo.delete_category("Foo"), 2);
        assert_eq!(repo.get(&a.id).unwrap().category, FALLBACK_CATEGORY);
        assert_eq!(repo.get(&b.id).unwrap().category, FALLBACK_CATEGORY);
        assert_eq!(repo.get(&other.id).unwrap().category, "General");
        assert!(repo.custom_categories().is_empty());

        let kinds: Vec<EventKey> = drain(&mut rx).iter().map(|e| e.key()).collect();
        assert!(kinds.contains(&EventKey::PromptUpdated(a.id.clone())));
        assert!(kinds.contains(&EventKey::PromptUpdated(b.id.clone())));
        assert_eq!(*kinds.last().unwrap(), EventKey::Categories);
    }

    #[test]
    fn delete_category_ignores_builtins_and_unknowns() {
        let (mut repo, mut rx) = repo();
        let p = repo.create(patch("A", "x"));
        drain(&mut rx);
        assert_eq!(repo.delete_category("General"), 0);
        assert_eq!(repo.delete_category("Nope"), 0);
        assert_eq!(repo.get(&p.id).unwrap().category, "General");
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn import_skips_invalid_and_colliding_records() {
        let (mut repo, mut rx) = repo();
        let existing = repo.create(patch("Existing", "x"));
        drain(&mut rx);

        let make = |id: &str, title: &str, content: &str| {
            let mut p = Prompt::from_patch(id.to_string(), patch(title, content), 7);
            if title.is_empty() {
                p.title = String::new();
            }
            p
        };

        let batch = vec![
            make("imp00001", "Good one", "body"),
            make("", "No id", "body"),
            make("imp00002", "", "body"),
            make(&existing.id, "Collides", "body"),
            make("imp00003", "Also good", "body"),
            make("imp00003", "Batch dupe", "body"),
        ];

        let report = repo.import(batch);
        assert_eq!(report.imported, 2);
        assert_eq!(report.skipped.len(), 4);
        assert_eq!(report.skipped[0].reason, SkipReason::MissingId);
        assert_eq!(report.skipped[1].reason, SkipReason::MissingTitle);
        assert_eq!(report.skipped[2].reason, SkipReason::DuplicateId);
        assert_eq!(report.skipped[3].reason, SkipReason::DuplicateId);

        // Batch order at the head, existing record after.
        assert_eq!(repo.prompts()[0].id, "imp00001");
        assert_eq!(repo.prompts()[1].id, "imp00003");
        assert_eq!(repo.prompts()[2].id, existing.id);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
    }
}
