//! ============================================================================
//! Data Purge - Destruction of a user's identity entry and owned data
//! ============================================================================
//! The ledger triggers this after 30 continuous days with access off. The
//! deletions are a collaborator concern behind a trait so hosts can swap in
//! their own identity/storage backends; callers treat failures as
//! best-effort (logged, never fatal).
//! ============================================================================

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::db::LedgerDb;

/// Removes everything a handle owns outside the account record itself.
#[async_trait]
pub trait DataPurge: Send + Sync {
    async fn purge_user_data(&self, handle: &str) -> Result<()>;
}

/// Default purger: drops the profile entry from the ledger database and
/// recursively removes the user's data directory.
pub struct FsDataPurge {
    db: Arc<LedgerDb>,
    data_root: PathBuf,
}

impl FsDataPurge {
    pub fn new(db: Arc<LedgerDb>, data_root: impl Into<PathBuf>) -> Self {
        Self {
            db,
            data_root: data_root.into(),
        }
    }

    /// Default user data root: ~/.pointgate/users
    pub fn default_root() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))?;
        Ok(home.join(".pointgate").join("users"))
    }

    fn user_dir(&self, handle: &str) -> PathBuf {
        self.data_root.join(handle)
    }
}

#[async_trait]
impl DataPurge for FsDataPurge {
    async fn purge_user_data(&self, handle: &str) -> Result<()> {
        self.db.delete_profile(handle)?;

        let dir = self.user_dir(handle);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(anyhow!(
                    "Failed to remove user data dir {}: {}",
                    dir.display(),
                    e
                ))
            }
        }

        info!("Purged profile and data directory for {}", handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::UserProfile;

    #[tokio::test]
    async fn test_fs_purge_removes_profile_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.redb");
        let db = Arc::new(LedgerDb::open(Some(db_path.to_str().unwrap())).unwrap());

        db.store_profile(&UserProfile {
            handle: "alice".to_string(),
            name: "Alice".to_string(),
            created_at: 0,
        })
        .unwrap();

        let users_root = dir.path().join("users");
        let alice_dir = users_root.join("alice");
        std::fs::create_dir_all(alice_dir.join("chats")).unwrap();
        std::fs::write(alice_dir.join("chats").join("log.txt"), "hello").unwrap();

        let purger = FsDataPurge::new(db.clone(), &users_root);
        purger.purge_user_data("alice").await.unwrap();

        assert!(db.get_profile("alice").unwrap().is_none());
        assert!(!alice_dir.exists());
    }

    #[tokio::test]
    async fn test_fs_purge_is_idempotent_for_missing_data() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.redb");
        let db = Arc::new(LedgerDb::open(Some(db_path.to_str().unwrap())).unwrap());

        let purger = FsDataPurge::new(db, dir.path().join("users"));
        // No profile, no directory: still succeeds
        purger.purge_user_data("ghost").await.unwrap();
    }
}
