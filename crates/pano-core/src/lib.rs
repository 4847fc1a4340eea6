//! Core functionality for the panorama coverage explorer
//!
//! This crate provides the shared handle types, the selection state machine
//! and the event mediator that keeps the map, chart and legend views in a
//! single consistent highlight state.

pub mod events;
pub mod handles;
pub mod selection;
pub mod session;
pub mod sync;

// Re-export commonly used types
pub use events::{
    handler_from_fn, DeliveryFailure, DeliveryReport, EventHandler, EventKind, EventMediator,
    SelectionEvent, SelectionSubscriber, SubscriptionId,
};
pub use handles::{ChartHandle, Coordinate, MarkerHandle};
pub use selection::{SelectionKey, SelectionStateMachine};
pub use session::{LoadTicket, Session};
pub use sync::MembershipIndex;
