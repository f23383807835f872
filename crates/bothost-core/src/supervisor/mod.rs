//! The multi-tenant process supervisor.
//!
//! - [`admission`]: quota checks, computed fresh from persisted and live state.
//! - [`registry`]: the authoritative map of live processes with per-identity locks.
//! - [`lifecycle`]: start / stop / restart as serialized transitions.
//! - [`monitor`]: background reconciliation of processes that exited on their own.
//! - [`effects`]: detached audit and notification side effects.

pub mod admission;
pub mod effects;
pub mod lifecycle;
pub mod monitor;
pub mod registry;
