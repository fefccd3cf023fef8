//! Lives: a capacity-bounded regenerating resource pool with offline
//! catch-up and a time-boxed unlimited mode.
//!
//! The engine never reads a clock, never touches the disk directly and
//! never talks to a UI: time, persistence, subscribers and the optional
//! cheat console are all injected. See `engine` for the update rules.

pub mod cheat;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod reconcile;
pub mod state;
pub mod store;
pub mod types;
