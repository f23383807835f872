//! Filesystem adapters for bothost.
//!
//! Implements the `BotStore` trait from `bothost-core` on the local disk and
//! owns the data directory layout:
//!
//! ```text
//! {data_dir}/
//!   config.toml
//!   bothost.db
//!   bots/{owner}_{name}
//!   logs/{owner}_{name}.log
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bothost_core::service::store::BotStore;
use bothost_types::error::StoreError;
use bothost_types::identity::BotIdentity;

/// Paths inside the data directory.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bots_dir(&self) -> PathBuf {
        self.root.join("bots")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Create the directory tree if it does not exist yet.
    pub async fn ensure(&self) -> Result<(), std::io::Error> {
        tokio::fs::create_dir_all(self.bots_dir()).await?;
        tokio::fs::create_dir_all(self.logs_dir()).await
    }
}

/// Bot sources stored as plain files under `bots/`.
#[derive(Debug, Clone)]
pub struct LocalBotStore {
    bots_dir: PathBuf,
}

impl LocalBotStore {
    pub fn new(bots_dir: impl Into<PathBuf>) -> Self {
        Self {
            bots_dir: bots_dir.into(),
        }
    }
}

impl BotStore for LocalBotStore {
    fn source_path(&self, identity: &BotIdentity) -> PathBuf {
        self.bots_dir.join(identity.file_stem())
    }

    async fn save(&self, identity: &BotIdentity, content: &[u8]) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.bots_dir).await?;

        // Write then rename so a running bot never sees a half-written file.
        let path = self.source_path(identity);
        let tmp = self.bots_dir.join(format!(".{}.tmp", identity.file_stem()));
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn read(&self, identity: &BotIdentity) -> Result<Vec<u8>, StoreError> {
        match tokio::fs::read(self.source_path(identity)).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn remove(&self, identity: &BotIdentity) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.source_path(identity)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `BOTHOST_DATA_DIR` environment variable
/// 2. `~/.bothost`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("BOTHOST_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".bothost");
    }

    // Last resort: current directory
    PathBuf::from(".bothost")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bothost_types::identity::UserId;
    use tempfile::tempdir;

    fn ident(name: &str) -> BotIdentity {
        BotIdentity::new(UserId(7), name)
    }

    #[tokio::test]
    async fn test_save_and_read() {
        let dir = tempdir().unwrap();
        let store = LocalBotStore::new(dir.path().join("bots"));

        store.save(&ident("a.py"), b"print(1)").await.unwrap();
        assert_eq!(store.read(&ident("a.py")).await.unwrap(), b"print(1)");
        assert!(dir.path().join("bots/7_a.py").is_file());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = tempdir().unwrap();
        let store = LocalBotStore::new(dir.path());

        store.save(&ident("a.py"), b"old").await.unwrap();
        store.save(&ident("a.py"), b"new").await.unwrap();
        assert_eq!(store.read(&ident("a.py")).await.unwrap(), b"new");
        assert!(!dir.path().join(".7_a.py.tmp").exists());
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let store = LocalBotStore::new(dir.path());
        assert!(matches!(
            store.read(&ident("x.py")).await.unwrap_err(),
            StoreError::NotFound
        ));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = LocalBotStore::new(dir.path());
        store.save(&ident("a.py"), b"x").await.unwrap();

        store.remove(&ident("a.py")).await.unwrap();
        store.remove(&ident("a.py")).await.unwrap();
        assert!(!store.source_path(&ident("a.py")).exists());
    }

    #[tokio::test]
    async fn test_layout_ensure_creates_dirs() {
        let dir = tempdir().unwrap();
        let layout = DataLayout::new(dir.path().join("data"));
        layout.ensure().await.unwrap();

        assert!(layout.bots_dir().is_dir());
        assert!(layout.logs_dir().is_dir());
    }

    #[test]
    fn test_resolve_data_dir_from_env() {
        // SAFETY: This test is single-threaded and restores the env var immediately.
        unsafe {
            std::env::set_var("BOTHOST_DATA_DIR", "/tmp/test-bothost");
        }
        let dir = resolve_data_dir();
        assert_eq!(dir, PathBuf::from("/tmp/test-bothost"));
        unsafe {
            std::env::remove_var("BOTHOST_DATA_DIR");
        }
    }
}
