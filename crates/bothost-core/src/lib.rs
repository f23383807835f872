//! Supervisor logic and port trait definitions for bothost.
//!
//! This crate defines the "ports" (repository, process, notifier and storage
//! traits) that the infrastructure layer implements, plus the supervisor that
//! drives them. It depends only on `bothost-types` -- never on
//! `bothost-infra` or any database/IO crate.

pub mod notify;
pub mod ports;
pub mod process;
pub mod repository;
pub mod service;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod testing;
