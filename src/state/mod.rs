//! Application state management.
//!
//! This module contains the shared state handed to every HTTP handler and
//! the registry of consent-flow `state` values awaiting their callback.

mod manager;
mod pending;

pub use manager::AppStateManager;
pub use pending::PendingAuthorizations;
