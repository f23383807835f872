//! Repository trait definitions (ports).
//!
//! These traits define the persistence contract that the infrastructure layer
//! (bothost-infra) implements. The core crate never depends on any specific
//! storage technology.

pub mod activity;
pub mod quota;
pub mod upload;
