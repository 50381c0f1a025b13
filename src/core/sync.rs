use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::api::StoreError;
use crate::core::bus::{EventKey, SyncEvent};
use crate::core::prompt::Prompt;
use crate::core::store::StorageAdapter;

/// Quiet period a write waits for further changes before hitting disk, in
/// milliseconds. Purely a write coalescer; readers always see memory.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Persistence strategy behind the coordinator. `reconcile` runs once per
/// session before any event; `apply` persists one coalesced event.
#[async_trait]
pub trait Replicator: Send + Sync {
    async fn reconcile(&self) -> Result<(), StoreError>;
    async fn apply(&self, event: &SyncEvent) -> Result<(), StoreError>;
}

/// Replicator over a primary store and a secondary replica. Prompt-level
/// events are read-modify-write against the primary list and mirrored to
/// the secondary wholesale; categories, theme, and filter state live in the
/// primary only.
pub struct DualStoreReplicator {
    primary: Arc<dyn StorageAdapter>,
    secondary: Arc<dyn StorageAdapter>,
}

impl DualStoreReplicator {
    pub fn new(primary: Arc<dyn StorageAdapter>, secondary: Arc<dyn StorageAdapter>) -> Self {
        Self { primary, secondary }
    }

    async fn save_both(&self, prompts: &[Prompt]) -> Result<(), StoreError> {
        self.primary.save_prompts(prompts).await?;
        self.secondary.save_prompts(prompts).await
    }

    /// Replace the stored record in place, or insert at the head when it is
    /// not there yet. Creations and updates both funnel through here; an
    /// update whose record vanished from disk degrades into an insert.
    async fn upsert(&self, prompt: &Prompt) -> Result<(), StoreError> {
        let mut prompts = self.primary.get_prompts().await?;
        match prompts.iter_mut().find(|p| p.id == prompt.id) {
            Some(slot) => *slot = prompt.clone(),
            None => prompts.insert(0, prompt.clone()),
        }
        self.save_both(&prompts).await
    }

    async fn remove(&self, id: &str) -> Result<(), StoreError> {
        let mut prompts = self.primary.get_prompts().await?;
        prompts.retain(|p| p.id != id);
        self.save_both(&prompts).await
    }
}

#[async_trait]
impl Replicator for DualStoreReplicator {
    async fn reconcile(&self) -> Result<(), StoreError> {
        let prompts = self.primary.get_prompts().await?;
        self.secondary.save_prompts(&prompts).await
    }

    async fn apply(&self, event: &SyncEvent) -> Result<(), StoreError> {
        match event {
            SyncEvent::PromptCreated { prompt } | SyncEvent::PromptUpdated { prompt } => {
                self.upsert(prompt).await
            }
            SyncEvent::PromptDeleted { id } => self.remove(id).await,
            SyncEvent::CategoriesUpdated { categories } => {
                self.primary.save_categories(categories).await
            }
            SyncEvent::ThemeUpdated { theme } => self.primary.save_theme(theme).await,
            SyncEvent::FiltersUpdated { view } => self.primary.save_filter_state(view).await,
        }
    }
}

enum Control {
    Flush(oneshot::Sender<()>),
}

/// Drives a [`Replicator`] from a bus subscription.
///
/// Incoming events land in a pending set keyed by [`EventKey`], newer
/// payloads replacing older ones, and a trailing debounce timer restarts on
/// every arrival. When the timer fires (or a manual flush is requested) the
/// whole pending set is applied in arrival order. A failed apply keeps its
/// event pending for the next flush and parks a message in the sync-error
/// slot; the slot clears on the next flush that applies cleanly. Failures
/// never touch in-memory state.
pub struct SyncCoordinator {
    replicator: Arc<dyn Replicator>,
    debounce: Duration,
    control_tx: mpsc::UnboundedSender<Control>,
    control_rx: Option<mpsc::UnboundedReceiver<Control>>,
    error_tx: Option<watch::Sender<Option<String>>>,
    error_rx: watch::Receiver<Option<String>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SyncCoordinator {
    pub fn new(replicator: Arc<dyn Replicator>, debounce: Duration) -> Self {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (error_tx, error_rx) = watch::channel(None);
        Self {
            replicator,
            debounce,
            control_tx,
            control_rx: Some(control_rx),
            error_tx: Some(error_tx),
            error_rx,
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    /// Reconcile the replica once, then consume `events` in the background
    /// until `stop`. A failed reconciliation is recorded in the sync-error
    /// slot rather than aborting the session. Second call is a no-op.
    pub async fn start(&mut self, events: broadcast::Receiver<SyncEvent>) {
        let (Some(error_tx), Some(control_rx)) = (self.error_tx.take(), self.control_rx.take())
        else {
            return;
        };
        if let Err(e) = self.replicator.reconcile().await {
            warn!(error = %e, "startup reconciliation failed");
            error_tx.send_replace(Some(e.to_string()));
        }
        self.task = Some(tokio::spawn(run_loop(
            events,
            control_rx,
            Arc::clone(&self.replicator),
            self.debounce,
            error_tx,
            self.cancel.clone(),
        )));
    }

    /// Apply everything pending right now, skipping the debounce delay.
    /// Returns once the flush completed.
    pub async fn flush_now(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.control_tx.send(Control::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Most recent persistence failure, or `None` when the last flush was
    /// clean.
    pub fn sync_error(&self) -> Option<String> {
        self.error_rx.borrow().clone()
    }

    /// Watch handle on the sync-error slot for callers that want to react
    /// to failures as they happen.
    pub fn error_watch(&self) -> watch::Receiver<Option<String>> {
        self.error_rx.clone()
    }

    /// Stop the background task. Pending events are flushed on the way out.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

async fn run_loop(
    mut events: broadcast::Receiver<SyncEvent>,
    mut control: mpsc::UnboundedReceiver<Control>,
    replicator: Arc<dyn Replicator>,
    debounce: Duration,
    error_tx: watch::Sender<Option<String>>,
    cancel: CancellationToken,
) {
    let mut pending: Vec<(EventKey, SyncEvent)> = Vec::new();
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            ctrl = control.recv() => match ctrl {
                Some(Control::Flush(ack)) => {
                    drain_ready(&mut events, &mut pending);
                    flush(replicator.as_ref(), &mut pending, &error_tx).await;
                    deadline = None;
                    let _ = ack.send(());
                }
                None => break,
            },
            received = events.recv() => match received {
                Ok(event) => {
                    stash(&mut pending, event);
                    deadline = Some(Instant::now() + debounce);
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "sync fell behind the event stream");
                    deadline = Some(Instant::now());
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = sleep_until_deadline(deadline), if deadline.is_some() => {
                flush(replicator.as_ref(), &mut pending, &error_tx).await;
                deadline = None;
            }
        }
    }

    // Exit path still owes whatever is queued or pending.
    drain_ready(&mut events, &mut pending);
    flush(replicator.as_ref(), &mut pending, &error_tx).await;
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Pull every already-delivered event into the pending set without waiting.
fn drain_ready(
    events: &mut broadcast::Receiver<SyncEvent>,
    pending: &mut Vec<(EventKey, SyncEvent)>,
) {
    loop {
        match events.try_recv() {
            Ok(event) => stash(pending, event),
            Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                warn!(missed, "sync fell behind the event stream");
            }
            Err(_) => break,
        }
    }
}

/// Last write wins per key; a replaced event keeps its original slot so
/// flush order stays first-seen.
fn stash(pending: &mut Vec<(EventKey, SyncEvent)>, event: SyncEvent) {
    let key = event.key();
    match pending.iter_mut().find(|(k, _)| *k == key) {
        Some(slot) => slot.1 = event,
        None => pending.push((key, event)),
    }
}

async fn flush(
    replicator: &dyn Replicator,
    pending: &mut Vec<(EventKey, SyncEvent)>,
    error_tx: &watch::Sender<Option<String>>,
) {
    if pending.is_empty() {
        return;
    }
    let work = std::mem::take(pending);
    let mut first_error: Option<String> = None;
    for (key, event) in work {
        match replicator.apply(&event).await {
            Ok(()) => {}
            Err(e) => {
                warn!(error = %e, "sync write failed, event kept for retry");
                if first_error.is_none() {
                    first_error = Some(e.to_string());
                }
                pending.push((key, event));
            }
        }
    }
    error_tx.send_replace(first_error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bus::SyncBus;
    use crate::core::prompt::PromptPatch;
    use crate::core::store::MemoryStore;

    fn prompt(id: &str, title: &str) -> Prompt {
        Prompt::from_patch(id.to_string(), PromptPatch::titled(title), 1)
    }

    fn updated(id: &str, title: &str) -> SyncEvent {
        SyncEvent::PromptUpdated {
            prompt: Box::new(prompt(id, title)),
        }
    }

    struct Rig {
        bus: SyncBus,
        coordinator: SyncCoordinator,
        primary: Arc<MemoryStore>,
        secondary: Arc<MemoryStore>,
    }

    async fn rig() -> Rig {
        let primary = Arc::new(MemoryStore::new());
        let secondary = Arc::new(MemoryStore::new());
        let replicator = Arc::new(DualStoreReplicator::new(
            Arc::clone(&primary) as Arc<dyn StorageAdapter>,
            Arc::clone(&secondary) as Arc<dyn StorageAdapter>,
        ));
        let mut coordinator =
            SyncCoordinator::new(replicator, Duration::from_millis(DEFAULT_DEBOUNCE_MS));
        let mut bus = SyncBus::new();
        coordinator.start(bus.subscribe()).await;
        bus.start();
        Rig {
            bus,
            coordinator,
            primary,
            secondary,
        }
    }

    async fn shutdown(mut r: Rig) {
        r.bus.stop().await;
        r.coordinator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn reconcile_overwrites_replica_from_primary() {
        let primary = Arc::new(MemoryStore::new());
        let secondary = Arc::new(MemoryStore::new());
        primary
            .save_prompts(&[prompt("a1", "kept"), prompt("b2", "also kept")])
            .await
            .unwrap();
        secondary
            .save_prompts(&[prompt("zz", "stale leftover")])
            .await
            .unwrap();

        let replicator = Arc::new(DualStoreReplicator::new(
            Arc::clone(&primary) as Arc<dyn StorageAdapter>,
            Arc::clone(&secondary) as Arc<dyn StorageAdapter>,
        ));
        let mut coordinator = SyncCoordinator::new(replicator, Duration::from_millis(100));
        let bus = SyncBus::new();
        coordinator.start(bus.subscribe()).await;

        let mirrored = secondary.get_prompts().await.unwrap();
        assert_eq!(mirrored.len(), 2);
        assert_eq!(mirrored[0].id, "a1");
        assert!(coordinator.sync_error().is_none());
        coordinator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn debounced_burst_writes_once_with_last_payload() {
        let r = rig().await;
        let sink = r.bus.sink();
        for i in 1..=5 {
            sink.emit(updated("a1", &format!("rev {}", i)));
        }

        // Inside the quiet window nothing has been written yet.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(r.primary.prompt_save_count(), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(r.primary.prompt_save_count(), 1);
        assert_eq!(r.secondary.prompt_save_count(), 1);

        let stored = r.primary.get_prompts().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].title, "rev 5");
        assert_eq!(r.secondary.get_prompts().await.unwrap(), stored);
        shutdown(r).await;
    }

    #[tokio::test(start_paused = true)]
    async fn timer_restarts_on_each_event_and_coalesces_across_windows() {
        let r = rig().await;
        let sink = r.bus.sink();

        sink.emit(updated("a1", "first"));
        tokio::time::sleep(Duration::from_millis(60)).await;
        // Second event lands before the first deadline, pushing it out.
        sink.emit(updated("a1", "second"));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(r.primary.prompt_save_count(), 0);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(r.primary.prompt_save_count(), 1);
        assert_eq!(r.primary.get_prompts().await.unwrap()[0].title, "second");
        shutdown(r).await;
    }

    #[tokio::test(start_paused = true)]
    async fn create_then_delete_applies_in_arrival_order() {
        let r = rig().await;
        let sink = r.bus.sink();
        sink.emit(SyncEvent::PromptCreated {
            prompt: Box::new(prompt("a1", "short lived")),
        });
        sink.emit(SyncEvent::PromptDeleted {
            id: "a1".to_string(),
        });

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(r.primary.get_prompts().await.unwrap().is_empty());
        assert!(r.secondary.get_prompts().await.unwrap().is_empty());
        shutdown(r).await;
    }

    #[tokio::test(start_paused = true)]
    async fn flush_now_skips_the_debounce() {
        let r = rig().await;
        r.bus.sink().emit(updated("a1", "eager"));
        // Paused clock only advances once every task is parked, so after
        // this sleep the bus flusher has handed the event over.
        tokio::time::sleep(Duration::from_millis(1)).await;

        r.coordinator.flush_now().await;
        assert_eq!(r.primary.prompt_save_count(), 1);
        assert_eq!(r.primary.get_prompts().await.unwrap()[0].title, "eager");
        shutdown(r).await;
    }

    #[tokio::test(start_paused = true)]
    async fn replica_failure_records_error_and_later_write_clears_it() {
        let r = rig().await;
        r.secondary.set_offline(true);

        r.bus.sink().emit(updated("a1", "v1"));
        tokio::time::sleep(Duration::from_millis(150)).await;
        // Primary took the write, replica refused it.
        assert_eq!(r.primary.get_prompts().await.unwrap()[0].title, "v1");
        assert!(r.secondary.get_prompts().await.unwrap().is_empty());
        assert!(r.coordinator.sync_error().is_some());

        r.secondary.set_offline(false);
        r.bus.sink().emit(updated("a1", "v2"));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(r.secondary.get_prompts().await.unwrap()[0].title, "v2");
        assert!(r.coordinator.sync_error().is_none());
        shutdown(r).await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_event_is_retried_on_next_flush() {
        let r = rig().await;
        r.primary.set_offline(true);

        r.bus.sink().emit(SyncEvent::ThemeUpdated {
            theme: "dark".to_string(),
        });
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(r.coordinator.sync_error().is_some());
        assert_eq!(r.primary.get_theme().await.unwrap(), None);

        // A different mutation arrives once the store is back; the stale
        // theme write rides along.
        r.primary.set_offline(false);
        r.bus.sink().emit(updated("a1", "other"));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(r.primary.get_theme().await.unwrap(), Some("dark".to_string()));
        assert!(r.coordinator.sync_error().is_none());
        shutdown(r).await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_flushes_pending_writes() {
        let r = rig().await;
        r.bus.sink().emit(updated("a1", "last words"));
        tokio::time::sleep(Duration::from_millis(1)).await;

        // No debounce wait: shutdown itself must not lose the write.
        let primary = Arc::clone(&r.primary);
        shutdown(r).await;
        assert_eq!(primary.get_prompts().await.unwrap()[0].title, "last words");
    }

    #[tokio::test(start_paused = true)]
    async fn categories_theme_filters_stay_out_of_the_replica() {
        let r = rig().await;
        let sink = r.bus.sink();
        sink.emit(SyncEvent::CategoriesUpdated {
            categories: vec!["Legal".to_string()],
        });
        sink.emit(SyncEvent::ThemeUpdated {
            theme: "dark".to_string(),
        });
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(
            r.primary.get_categories().await.unwrap(),
            vec!["Legal".to_string()]
        );
        assert_eq!(r.primary.get_theme().await.unwrap(), Some("dark".to_string()));
        assert_eq!(r.secondary.get_categories().await.unwrap(), Vec::<String>::new());
        assert_eq!(r.secondary.get_theme().await.unwrap(), None);
        shutdown(r).await;
    }
}
