//! Application-level modules for the hushfall window.
//!
//! This module contains the session wiring and the coordinator translating UI
//! interactions into state updates.

mod app_context;
mod application_coordinator;

pub use app_context::AppContext;
pub use application_coordinator::ApplicationCoordinator;
