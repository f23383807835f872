//! BotStore trait for abstracting bot source storage.
//!
//! Defined in bothost-core so services can save and read bot sources without
//! depending on any specific filesystem implementation. The local adapter
//! lives in bothost-infra.

use std::path::PathBuf;

use bothost_types::error::StoreError;
use bothost_types::identity::BotIdentity;

pub trait BotStore: Send + Sync + 'static {
    /// Path of the executable source for a bot. Pure; does not touch disk.
    fn source_path(&self, identity: &BotIdentity) -> PathBuf;

    /// Write the source, replacing any previous content.
    fn save(
        &self,
        identity: &BotIdentity,
        content: &[u8],
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Read the source.
    fn read(
        &self,
        identity: &BotIdentity,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, StoreError>> + Send;

    /// Remove the source. A missing file is not an error.
    fn remove(
        &self,
        identity: &BotIdentity,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}
