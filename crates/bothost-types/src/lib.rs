//! Shared domain types for the bothost supervisor.
//!
//! Bot identities, lifecycle status, quotas, audit entries, configuration and
//! the error taxonomy shared by every other crate.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod activity;
pub mod bot;
pub mod config;
pub mod error;
pub mod identity;
pub mod quota;
