//! Selection state machine
//!
//! Exactly one [`SelectionKey`] is active at a time. Selecting the active key
//! again clears it; selecting any other key replaces it in one step. Every
//! transition is announced through the [`EventMediator`].

use std::fmt;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::events::{EventMediator, SelectionEvent};

/// What is currently highlighted across all views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SelectionKey {
    /// Nothing selected (idle)
    #[default]
    None,
    /// Every element captured in the given year
    Year(i32),
    /// Every element captured on the given day
    Date(NaiveDate),
}

impl SelectionKey {
    pub fn is_none(&self) -> bool {
        matches!(self, SelectionKey::None)
    }

    /// Whether an element captured on `date` belongs to this selection
    pub fn matches_date(&self, date: NaiveDate) -> bool {
        match self {
            SelectionKey::None => false,
            SelectionKey::Year(year) => date.year() == *year,
            SelectionKey::Date(selected) => *selected == date,
        }
    }

    /// Whether a whole year belongs to this selection; only a year key does
    pub fn matches_year(&self, year: i32) -> bool {
        matches!(self, SelectionKey::Year(selected) if *selected == year)
    }
}

impl fmt::Display for SelectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionKey::None => write!(f, "none"),
            SelectionKey::Year(year) => write!(f, "year {}", year),
            SelectionKey::Date(date) => write!(f, "date {}", date.format("%Y-%m-%d")),
        }
    }
}

/// Holds the single active selection and publishes every transition
pub struct SelectionStateMachine {
    state: RwLock<SelectionKey>,
    mediator: Arc<EventMediator>,
}

impl SelectionStateMachine {
    /// Create a new state machine in the idle state
    pub fn new(mediator: Arc<EventMediator>) -> Self {
        Self {
            state: RwLock::new(SelectionKey::None),
            mediator,
        }
    }

    /// The currently active key
    pub fn current(&self) -> SelectionKey {
        *self.state.read()
    }

    /// Select a year, or return to idle if that year is already selected
    pub fn select_year(&self, year: i32) -> SelectionKey {
        self.toggle(SelectionKey::Year(year))
    }

    /// Select a capture date, or return to idle if it is already selected
    pub fn select_date(&self, date: NaiveDate) -> SelectionKey {
        self.toggle(SelectionKey::Date(date))
    }

    /// Apply an arbitrary key with toggle semantics; `None` clears
    pub fn select(&self, key: SelectionKey) -> SelectionKey {
        match key {
            SelectionKey::None => self.clear(),
            other => self.toggle(other),
        }
    }

    /// Return to idle from any state
    pub fn clear(&self) -> SelectionKey {
        *self.state.write() = SelectionKey::None;
        self.announce(SelectionKey::None);
        SelectionKey::None
    }

    fn toggle(&self, requested: SelectionKey) -> SelectionKey {
        // The write guard is released before subscribers run so they can read
        // the new state (or trigger another transition) without deadlocking.
        let next = {
            let mut state = self.state.write();
            let next = if *state == requested {
                SelectionKey::None
            } else {
                requested
            };
            *state = next;
            next
        };

        self.announce(next);
        next
    }

    fn announce(&self, key: SelectionKey) {
        tracing::debug!("Selection is now {}", key);
        let event = match key {
            SelectionKey::None => SelectionEvent::Cleared,
            other => SelectionEvent::Changed(other),
        };
        self.mediator.publish(&event);
    }
}
