//! Infrastructure layer for bothost.
//!
//! Implementations of the ports defined in `bothost-core`: SQLite storage,
//! on-disk bot sources, child processes and the Telegram notifier, plus the
//! config loader and the production wiring that ties them together.

pub mod config;
pub mod filesystem;
pub mod notify;
pub mod ports;
pub mod process;
pub mod sqlite;
