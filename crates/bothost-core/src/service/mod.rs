//! Caller-facing services (use cases).
//!
//! Services orchestrate the supervisor, repositories and source storage.
//! They depend on traits (ports) -- never on concrete infrastructure.

pub mod bot;
pub mod store;
