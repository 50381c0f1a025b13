use std::collections::HashMap;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::core::filter::PromptView;
use crate::core::prompt::Prompt;

/// Broadcast buffer per subscriber. A lagging subscriber loses oldest
/// events first and is warned through `RecvError::Lagged`.
const DELIVERY_BUFFER: usize = 1024;

/// A change notification flowing from the repository to sync subscribers.
/// Prompt-level events carry the full record so subscribers never have to
/// read the mutated state back.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    PromptCreated { prompt: Box<Prompt> },
    PromptUpdated { prompt: Box<Prompt> },
    PromptDeleted { id: String },
    CategoriesUpdated { categories: Vec<String> },
    ThemeUpdated { theme: String },
    FiltersUpdated { view: Box<PromptView> },
}

/// Coalescing identity of an event. Two events with equal keys collapse to
/// the later one within a single flush.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKey {
    PromptCreated(String),
    PromptUpdated(String),
    PromptDeleted(String),
    Categories,
    Theme,
    Filters,
}

impl SyncEvent {
    pub fn key(&self) -> EventKey {
        match self {
            SyncEvent::PromptCreated { prompt } => EventKey::PromptCreated(prompt.id.clone()),
            SyncEvent::PromptUpdated { prompt } => EventKey::PromptUpdated(prompt.id.clone()),
            SyncEvent::PromptDeleted { id } => EventKey::PromptDeleted(id.clone()),
            SyncEvent::CategoriesUpdated { .. } => EventKey::Categories,
            SyncEvent::ThemeUpdated { .. } => EventKey::Theme,
            SyncEvent::FiltersUpdated { .. } => EventKey::Filters,
        }
    }
}

/// Cheap cloneable handle for emitting events into the bus queue. Emission
/// never blocks and never fails; events sent after the bus is gone are
/// dropped with a debug note.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<SyncEvent>,
}

impl EventSink {
    pub fn emit(&self, event: SyncEvent) {
        if self.tx.send(event).is_err() {
            debug!("sync bus closed, event dropped");
        }
    }

    /// A sink wired to nothing. Emitted events vanish; useful for driving
    /// a repository without a bus.
    pub fn disconnected() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self { tx }
    }

    /// Sink plus the raw queue end it feeds, bypassing the flusher.
    #[cfg(test)]
    pub(crate) fn test_pair() -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

/// In-process event bus between the repository and sync subscribers.
///
/// Emission appends to an unbounded queue. A background flusher drains the
/// queue to empty in one batch, collapses events that share an [`EventKey`]
/// down to the latest occurrence (first-seen order preserved), and fans the
/// survivors out over a broadcast channel. Bursts from a single logical
/// mutation therefore reach subscribers as single events per key.
pub struct SyncBus {
    queue_tx: mpsc::UnboundedSender<SyncEvent>,
    queue_rx: Option<mpsc::UnboundedReceiver<SyncEvent>>,
    delivery: broadcast::Sender<SyncEvent>,
    cancel: CancellationToken,
    flusher: Option<JoinHandle<()>>,
}

impl SyncBus {
    pub fn new() -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (delivery, _) = broadcast::channel(DELIVERY_BUFFER);
        Self {
            queue_tx,
            queue_rx: Some(queue_rx),
            delivery,
            cancel: CancellationToken::new(),
            flusher: None,
        }
    }

    /// Handle for producers. Valid before `start`; queued events are
    /// delivered once the flusher runs.
    pub fn sink(&self) -> EventSink {
        EventSink {
            tx: self.queue_tx.clone(),
        }
    }

    /// Subscribe to flushed events. Subscribe before the first emission
    /// reaches the flusher or miss it.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.delivery.subscribe()
    }

    /// Spawn the background flusher. Idempotent; the second call is a no-op.
    pub fn start(&mut self) {
        let Some(rx) = self.queue_rx.take() else {
            return;
        };
        let delivery = self.delivery.clone();
        let cancel = self.cancel.clone();
        self.flusher = Some(tokio::spawn(flush_loop(rx, delivery, cancel)));
    }

    /// Stop the flusher. Whatever is queued at this point is still flushed
    /// and broadcast before the task exits.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.flusher.take() {
            let _ = handle.await;
        }
    }
}

impl Default for SyncBus {
    fn default() -> Self {
        Self::new()
    }
}

async fn flush_loop(
    mut rx: mpsc::UnboundedReceiver<SyncEvent>,
    delivery: broadcast::Sender<SyncEvent>,
    cancel: CancellationToken,
) {
    loop {
        let first = tokio::select! {
            _ = cancel.cancelled() => break,
            received = rx.recv() => match received {
                Some(event) => event,
                None => return,
            },
        };
        // Let same-burst emitters finish queueing before the batch is cut.
        tokio::task::yield_now().await;
        let mut batch = vec![first];
        while let Ok(event) = rx.try_recv() {
            batch.push(event);
        }
        broadcast_batch(&delivery, batch);
    }
    // Final drain so a stop right after an emission loses nothing.
    let mut batch = Vec::new();
    while let Ok(event) = rx.try_recv() {
        batch.push(event);
    }
    broadcast_batch(&delivery, batch);
}

fn broadcast_batch(delivery: &broadcast::Sender<SyncEvent>, batch: Vec<SyncEvent>) {
    for event in coalesce(batch) {
        if delivery.send(event).is_err() {
            trace!("no sync subscribers, event discarded");
        }
    }
}

/// Collapse a batch to one event per key, keeping the latest payload and
/// the order keys were first seen in.
fn coalesce(batch: Vec<SyncEvent>) -> Vec<SyncEvent> {
    let mut order: Vec<EventKey> = Vec::new();
    let mut latest: HashMap<EventKey, SyncEvent> = HashMap::new();
    for event in batch {
        let key = event.key();
        if !latest.contains_key(&key) {
            order.push(key.clone());
        }
        latest.insert(key, event);
    }
    order
        .into_iter()
        .filter_map(|key| latest.remove(&key))
        .collect()
}
