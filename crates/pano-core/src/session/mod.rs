use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::events::EventMediator;
use crate::selection::SelectionStateMachine;

/// State owned by one page session
///
/// Replaces module-level globals: the mediator, the selection and the load
/// generation counter all live here and are handed to views by reference.
pub struct Session {
    /// The event mediator
    mediator: Arc<EventMediator>,

    /// The selection state machine
    selection: Arc<SelectionStateMachine>,

    /// Generation of the most recently started load
    generation: Arc<AtomicU64>,
}

/// Proof that a load was started; stale once a newer load begins
#[derive(Debug, Clone)]
pub struct LoadTicket {
    generation: u64,
    latest: Arc<AtomicU64>,
    resource: String,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Whether no newer load has started since this ticket was issued
    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::Acquire) == self.generation
    }
}

impl Session {
    /// Create a new session
    pub fn new() -> Self {
        let mediator = Arc::new(EventMediator::new());
        Self {
            selection: Arc::new(SelectionStateMachine::new(mediator.clone())),
            mediator,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn mediator(&self) -> &Arc<EventMediator> {
        &self.mediator
    }

    pub fn selection(&self) -> &Arc<SelectionStateMachine> {
        &self.selection
    }

    /// Start a new load, invalidating any ticket issued before
    ///
    /// The selection is cleared so views never highlight against a key that
    /// belonged to the previous dataset.
    pub fn begin_load(&self, resource: impl Into<String>) -> LoadTicket {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let resource = resource.into();
        tracing::info!("Starting load #{} of {}", generation, resource);

        if !self.selection.current().is_none() {
            self.selection.clear();
        }

        LoadTicket {
            generation,
            latest: self.generation.clone(),
            resource,
        }
    }

    /// Generation of the most recent load (0 before any load)
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
