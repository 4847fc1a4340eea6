use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;

use crate::selection::SelectionKey;

/// Session-wide selection event bus
///
/// Views subscribe once at initialization; `publish` calls every subscriber of
/// the event's kind synchronously, in subscription order. A failing subscriber
/// is reported and skipped, it never stops delivery to the others.
pub struct EventMediator {
    handlers: Mutex<AHashMap<EventKind, Vec<Subscription>>>,
    next_id: AtomicU64,
}

/// The two event names views can listen for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SelectionChanged,
    SelectionCleared,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::SelectionChanged => "selectionChanged",
            EventKind::SelectionCleared => "selectionCleared",
        }
    }
}

/// Event payload
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEvent {
    /// A new key became active
    Changed(SelectionKey),
    /// The selection returned to idle
    Cleared,
}

impl SelectionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SelectionEvent::Changed(_) => EventKind::SelectionChanged,
            SelectionEvent::Cleared => EventKind::SelectionCleared,
        }
    }

    /// The key views should render against
    pub fn key(&self) -> SelectionKey {
        match self {
            SelectionEvent::Changed(key) => *key,
            SelectionEvent::Cleared => SelectionKey::None,
        }
    }
}

/// Handler trait for event handlers
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &SelectionEvent) -> anyhow::Result<()>;
}

/// A view that re-renders its own highlight state from the active key
pub trait SelectionSubscriber: Send + Sync {
    /// Label used when reporting delivery failures
    fn name(&self) -> &str;

    /// Bring every element of this view in line with `key`
    fn apply_selection(&self, key: &SelectionKey) -> anyhow::Result<()>;
}

/// Identifier returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    label: String,
    handler: Arc<dyn EventHandler>,
}

/// One subscriber that returned an error or panicked during `publish`
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryFailure {
    pub subscriber: String,
    pub message: String,
}

/// Outcome of a single `publish`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failures: Vec<DeliveryFailure>,
}

impl DeliveryReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl EventMediator {
    /// Create a new event mediator
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(AHashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribe a handler to one event kind
    pub fn subscribe(
        &self,
        kind: EventKind,
        label: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut handlers = self.handlers.lock();
        handlers.entry(kind).or_default().push(Subscription {
            id,
            label: label.into(),
            handler,
        });
        id
    }

    /// Subscribe a view to both selection events
    pub fn subscribe_view(&self, view: Arc<dyn SelectionSubscriber>) -> [SubscriptionId; 2] {
        let label = view.name().to_string();
        let handler: Arc<dyn EventHandler> = Arc::new(ViewHandler { view });
        [
            self.subscribe(EventKind::SelectionChanged, label.clone(), handler.clone()),
            self.subscribe(EventKind::SelectionCleared, label, handler),
        ]
    }

    /// Remove a subscription; returns whether it existed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock();
        let mut removed = false;
        for subscriptions in handlers.values_mut() {
            let before = subscriptions.len();
            subscriptions.retain(|s| s.id != id);
            removed |= subscriptions.len() != before;
        }
        removed
    }

    /// Number of subscribers listening for `kind`
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.handlers.lock().get(&kind).map_or(0, Vec::len)
    }

    /// Publish an event to every subscriber of its kind
    pub fn publish(&self, event: &SelectionEvent) -> DeliveryReport {
        let kind = event.kind();

        // Snapshot under the lock, deliver without it: handlers may subscribe
        // or publish from inside their callback.
        let targets: Vec<(String, Arc<dyn EventHandler>)> = self
            .handlers
            .lock()
            .get(&kind)
            .map(|subs| {
                subs.iter()
                    .map(|s| (s.label.clone(), s.handler.clone()))
                    .collect()
            })
            .unwrap_or_default();

        let mut report = DeliveryReport::default();
        for (label, handler) in targets {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(event)));
            let message = match outcome {
                Ok(Ok(())) => {
                    report.delivered += 1;
                    continue;
                }
                Ok(Err(err)) => format!("{:#}", err),
                Err(payload) => panic_message(payload.as_ref()),
            };
            tracing::warn!("Subscriber '{}' failed on {}: {}", label, kind.name(), message);
            report.failures.push(DeliveryFailure {
                subscriber: label,
                message,
            });
        }
        report
    }
}

impl Default for EventMediator {
    fn default() -> Self {
        Self::new()
    }
}

struct ViewHandler {
    view: Arc<dyn SelectionSubscriber>,
}

impl EventHandler for ViewHandler {
    fn handle(&self, event: &SelectionEvent) -> anyhow::Result<()> {
        self.view.apply_selection(&event.key())
    }
}

/// Helper struct for creating event handlers from closures
pub struct ClosureEventHandler<F> {
    handler: Mutex<F>,
}

impl<F> EventHandler for ClosureEventHandler<F>
where
    F: FnMut(&SelectionEvent) -> anyhow::Result<()> + Send,
{
    fn handle(&self, event: &SelectionEvent) -> anyhow::Result<()> {
        let mut handler = self.handler.lock();
        (*handler)(event)
    }
}

/// Create an event handler from a closure
pub fn handler_from_fn<F>(f: F) -> Arc<dyn EventHandler>
where
    F: FnMut(&SelectionEvent) -> anyhow::Result<()> + Send + 'static,
{
    Arc::new(ClosureEventHandler {
        handler: Mutex::new(f),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
