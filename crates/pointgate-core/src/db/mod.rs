// ============================================================================
// LedgerDb — Embedded Database (redb)
// ============================================================================
// Persistent storage for account records, redeem codes and identity profiles.
// Default path: ~/.pointgate/ledger.redb (override via POINTGATE_DB_PATH)
// ============================================================================

pub mod types;

pub use types::{AccountRecord, DbStats, RedeemCode, UserProfile};

use anyhow::{anyhow, Result};
use redb::{Database, ReadableTable, TableDefinition};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// Table definitions
const ACCOUNTS: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");
const REDEEM_CODES: TableDefinition<&str, &[u8]> = TableDefinition::new("redeem_codes");
const PROFILES: TableDefinition<&str, &[u8]> = TableDefinition::new("profiles");

/// Outcome of the atomic consume attempt on a redeem code.
#[derive(Debug, Clone)]
pub enum CodeConsume {
    /// The code existed, was unused, and is now marked used by this caller.
    Consumed(RedeemCode),
    NotFound,
    AlreadyUsed,
}

fn account_key(handle: &str) -> String {
    format!("account:{}", handle)
}

fn code_key(code: &str) -> String {
    format!("redeem:{}", code.trim().to_uppercase())
}

fn profile_key(handle: &str) -> String {
    format!("profile:{}", handle)
}

/// Embedded database for the points ledger
pub struct LedgerDb {
    db: Database,
    path: PathBuf,
}

impl LedgerDb {
    /// Open (or create) the database at the given path.
    /// If `path` is None, uses POINTGATE_DB_PATH env var or
    /// ~/.pointgate/ledger.redb
    pub fn open(path: Option<&str>) -> Result<Self> {
        let db_path = if let Some(p) = path {
            PathBuf::from(p)
        } else if let Ok(env_path) = std::env::var("POINTGATE_DB_PATH") {
            PathBuf::from(env_path)
        } else {
            let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))?;
            let pointgate_dir = home.join(".pointgate");
            std::fs::create_dir_all(&pointgate_dir)
                .map_err(|e| anyhow!("Failed to create .pointgate directory: {}", e))?;
            pointgate_dir.join("ledger.redb")
        };

        info!("Opening database at: {}", db_path.display());

        let db = Database::create(&db_path)
            .map_err(|e| anyhow!("Failed to open database: {}", e))?;

        // Ensure tables exist by doing a write transaction
        let write_txn = db
            .begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let _ = write_txn
                .open_table(ACCOUNTS)
                .map_err(|e| anyhow!("Failed to create accounts table: {}", e))?;
            let _ = write_txn
                .open_table(REDEEM_CODES)
                .map_err(|e| anyhow!("Failed to create redeem_codes table: {}", e))?;
            let _ = write_txn
                .open_table(PROFILES)
                .map_err(|e| anyhow!("Failed to create profiles table: {}", e))?;
        }
        write_txn
            .commit()
            .map_err(|e| anyhow!("Failed to commit init: {}", e))?;

        info!("Database ready");

        Ok(Self { db, path: db_path })
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ========================================================================
    // Account Operations
    // ========================================================================

    pub fn store_account(&self, account: &AccountRecord) -> Result<()> {
        let key = account_key(&account.handle);
        let value = bincode::serialize(account)
            .map_err(|e| anyhow!("Failed to serialize account: {}", e))?;

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let mut table = write_txn
                .open_table(ACCOUNTS)
                .map_err(|e| anyhow!("Failed to open accounts table: {}", e))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(|e| anyhow!("Failed to insert account: {}", e))?;
        }
        write_txn
            .commit()
            .map_err(|e| anyhow!("Failed to commit: {}", e))?;

        debug!("Stored account: {}", account.handle);
        Ok(())
    }

    pub fn get_account(&self, handle: &str) -> Result<Option<AccountRecord>> {
        let key = account_key(handle);

        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let table = read_txn
            .open_table(ACCOUNTS)
            .map_err(|e| anyhow!("Failed to open accounts table: {}", e))?;

        match table
            .get(key.as_str())
            .map_err(|e| anyhow!("Failed to get account: {}", e))?
        {
            Some(value) => {
                let account: AccountRecord = bincode::deserialize(value.value())
                    .map_err(|e| anyhow!("Failed to deserialize account: {}", e))?;
                Ok(Some(account))
            }
            None => Ok(None),
        }
    }

    pub fn list_accounts(&self) -> Result<Vec<AccountRecord>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let table = read_txn
            .open_table(ACCOUNTS)
            .map_err(|e| anyhow!("Failed to open accounts table: {}", e))?;

        let mut results = Vec::new();
        let iter = table
            .range::<&str>(..)
            .map_err(|e| anyhow!("Failed to iterate accounts: {}", e))?;
        for entry in iter {
            let (_key, value) = entry.map_err(|e| anyhow!("Failed to read entry: {}", e))?;
            let account: AccountRecord = bincode::deserialize(value.value())
                .map_err(|e| anyhow!("Failed to deserialize account: {}", e))?;
            results.push(account);
        }
        Ok(results)
    }

    // ========================================================================
    // Redeem Code Operations
    // ========================================================================

    pub fn store_code(&self, code: &RedeemCode) -> Result<()> {
        let key = code_key(&code.code);
        let value =
            bincode::serialize(code).map_err(|e| anyhow!("Failed to serialize code: {}", e))?;

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let mut table = write_txn
                .open_table(REDEEM_CODES)
                .map_err(|e| anyhow!("Failed to open redeem_codes table: {}", e))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(|e| anyhow!("Failed to insert code: {}", e))?;
        }
        write_txn
            .commit()
            .map_err(|e| anyhow!("Failed to commit: {}", e))?;

        debug!("Stored redeem code: {}", code.code);
        Ok(())
    }

    pub fn get_code(&self, code: &str) -> Result<Option<RedeemCode>> {
        let key = code_key(code);

        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let table = read_txn
            .open_table(REDEEM_CODES)
            .map_err(|e| anyhow!("Failed to open redeem_codes table: {}", e))?;

        match table
            .get(key.as_str())
            .map_err(|e| anyhow!("Failed to get code: {}", e))?
        {
            Some(value) => {
                let code: RedeemCode = bincode::deserialize(value.value())
                    .map_err(|e| anyhow!("Failed to deserialize code: {}", e))?;
                Ok(Some(code))
            }
            None => Ok(None),
        }
    }

    pub fn list_codes(&self) -> Result<Vec<RedeemCode>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let table = read_txn
            .open_table(REDEEM_CODES)
            .map_err(|e| anyhow!("Failed to open redeem_codes table: {}", e))?;

        let mut results = Vec::new();
        let iter = table
            .range::<&str>(..)
            .map_err(|e| anyhow!("Failed to iterate codes: {}", e))?;
        for entry in iter {
            let (_key, value) = entry.map_err(|e| anyhow!("Failed to read entry: {}", e))?;
            let code: RedeemCode = bincode::deserialize(value.value())
                .map_err(|e| anyhow!("Failed to deserialize code: {}", e))?;
            results.push(code);
        }
        Ok(results)
    }

    /// Atomically consume a code: the false -> true flip of the `used` flag
    /// happens inside a single write transaction, so at most one caller ever
    /// sees `Consumed` for a given code.
    pub fn consume_code(&self, code: &str, handle: &str, now_ms: i64) -> Result<CodeConsume> {
        let key = code_key(code);

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        let outcome;
        {
            let mut table = write_txn
                .open_table(REDEEM_CODES)
                .map_err(|e| anyhow!("Failed to open redeem_codes table: {}", e))?;

            let existing: Option<RedeemCode> = match table
                .get(key.as_str())
                .map_err(|e| anyhow!("Failed to get code: {}", e))?
            {
                Some(value) => Some(
                    bincode::deserialize(value.value())
                        .map_err(|e| anyhow!("Failed to deserialize code: {}", e))?,
                ),
                None => None,
            };

            match existing {
                None => outcome = CodeConsume::NotFound,
                Some(rec) if rec.used => outcome = CodeConsume::AlreadyUsed,
                Some(mut rec) => {
                    rec.used = true;
                    rec.used_by = Some(handle.to_string());
                    rec.used_at = Some(now_ms);
                    let value = bincode::serialize(&rec)
                        .map_err(|e| anyhow!("Failed to serialize code: {}", e))?;
                    table
                        .insert(key.as_str(), value.as_slice())
                        .map_err(|e| anyhow!("Failed to update code: {}", e))?;
                    outcome = CodeConsume::Consumed(rec);
                }
            }
        }

        match &outcome {
            CodeConsume::Consumed(rec) => {
                write_txn
                    .commit()
                    .map_err(|e| anyhow!("Failed to commit code consume: {}", e))?;
                debug!("Consumed redeem code {} for {}", rec.code, handle);
            }
            // Dropping the transaction aborts it; nothing was changed.
            _ => {}
        }

        Ok(outcome)
    }

    // ========================================================================
    // Profile Operations
    // ========================================================================

    pub fn store_profile(&self, profile: &UserProfile) -> Result<()> {
        let key = profile_key(&profile.handle);
        let value = bincode::serialize(profile)
            .map_err(|e| anyhow!("Failed to serialize profile: {}", e))?;

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let mut table = write_txn
                .open_table(PROFILES)
                .map_err(|e| anyhow!("Failed to open profiles table: {}", e))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(|e| anyhow!("Failed to insert profile: {}", e))?;
        }
        write_txn
            .commit()
            .map_err(|e| anyhow!("Failed to commit: {}", e))?;

        debug!("Stored profile: {}", profile.handle);
        Ok(())
    }

    pub fn get_profile(&self, handle: &str) -> Result<Option<UserProfile>> {
        let key = profile_key(handle);

        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let table = read_txn
            .open_table(PROFILES)
            .map_err(|e| anyhow!("Failed to open profiles table: {}", e))?;

        match table
            .get(key.as_str())
            .map_err(|e| anyhow!("Failed to get profile: {}", e))?
        {
            Some(value) => {
                let profile: UserProfile = bincode::deserialize(value.value())
                    .map_err(|e| anyhow!("Failed to deserialize profile: {}", e))?;
                Ok(Some(profile))
            }
            None => Ok(None),
        }
    }

    pub fn delete_profile(&self, handle: &str) -> Result<bool> {
        let key = profile_key(handle);

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        let removed;
        {
            let mut table = write_txn
                .open_table(PROFILES)
                .map_err(|e| anyhow!("Failed to open profiles table: {}", e))?;
            removed = table
                .remove(key.as_str())
                .map_err(|e| anyhow!("Failed to remove profile: {}", e))?
                .is_some();
        }
        write_txn
            .commit()
            .map_err(|e| anyhow!("Failed to commit delete: {}", e))?;

        if removed {
            debug!("Deleted profile: {}", handle);
        }
        Ok(removed)
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    pub fn stats(&self) -> Result<DbStats> {
        let accounts = self.list_accounts()?;
        let codes = self.list_codes()?;

        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let table = read_txn
            .open_table(PROFILES)
            .map_err(|e| anyhow!("Failed to open profiles table: {}", e))?;
        let profile_count = table
            .range::<&str>(..)
            .map_err(|e| anyhow!("Failed to iterate profiles: {}", e))?
            .count();

        Ok(DbStats {
            total_accounts: accounts.len(),
            accounts_with_access_on: accounts.iter().filter(|a| a.access_on).count(),
            total_codes: codes.len(),
            unused_codes: codes.iter().filter(|c| !c.used).count(),
            total_profiles: profile_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points::Points;

    fn temp_db() -> (LedgerDb, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.redb");
        let db = LedgerDb::open(Some(path.to_str().unwrap())).unwrap();
        (db, dir)
    }

    fn sample_account(handle: &str) -> AccountRecord {
        AccountRecord {
            handle: handle.to_string(),
            points: Points::from_whole(20),
            access_on: true,
            last_cost_applied_at: 1_700_000_000_000,
            last_checkin_date: String::new(),
            access_off_since: None,
            created_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_account_roundtrip() {
        let (db, _dir) = temp_db();
        assert!(db.get_account("alice").unwrap().is_none());

        db.store_account(&sample_account("alice")).unwrap();
        let loaded = db.get_account("alice").unwrap().unwrap();
        assert_eq!(loaded.handle, "alice");
        assert_eq!(loaded.points, Points::from_whole(20));
        assert!(loaded.access_on);
        assert!(loaded.access_off_since.is_none());
    }

    #[test]
    fn test_code_lookup_is_case_insensitive() {
        let (db, _dir) = temp_db();
        db.store_code(&RedeemCode {
            code: "ABC123".to_string(),
            points: Points::from_whole(10),
            used: false,
            used_by: None,
            used_at: None,
            created_at: 0,
        })
        .unwrap();

        assert!(db.get_code("abc123").unwrap().is_some());
        assert!(db.get_code(" Abc123 ").unwrap().is_some());
        assert!(db.get_code("other").unwrap().is_none());
    }

    #[test]
    fn test_consume_code_transitions_once() {
        let (db, _dir) = temp_db();
        db.store_code(&RedeemCode {
            code: "WELCOME".to_string(),
            points: Points::from_whole(10),
            used: false,
            used_by: None,
            used_at: None,
            created_at: 0,
        })
        .unwrap();

        match db.consume_code("welcome", "alice", 42).unwrap() {
            CodeConsume::Consumed(rec) => {
                assert!(rec.used);
                assert_eq!(rec.used_by.as_deref(), Some("alice"));
                assert_eq!(rec.used_at, Some(42));
            }
            other => panic!("expected Consumed, got {:?}", other),
        }

        assert!(matches!(
            db.consume_code("WELCOME", "bob", 43).unwrap(),
            CodeConsume::AlreadyUsed
        ));
        assert!(matches!(
            db.consume_code("missing", "bob", 43).unwrap(),
            CodeConsume::NotFound
        ));

        // First consumer's marks survived, the second attempt changed nothing
        let stored = db.get_code("WELCOME").unwrap().unwrap();
        assert_eq!(stored.used_by.as_deref(), Some("alice"));
    }

    #[test]
    fn test_profile_roundtrip_and_delete() {
        let (db, _dir) = temp_db();
        db.store_profile(&UserProfile {
            handle: "alice".to_string(),
            name: "Alice".to_string(),
            created_at: 0,
        })
        .unwrap();

        assert_eq!(db.get_profile("alice").unwrap().unwrap().name, "Alice");
        assert!(db.delete_profile("alice").unwrap());
        assert!(!db.delete_profile("alice").unwrap());
        assert!(db.get_profile("alice").unwrap().is_none());
    }

    #[test]
    fn test_stats_counts() {
        let (db, _dir) = temp_db();
        db.store_account(&sample_account("alice")).unwrap();
        let mut off = sample_account("bob");
        off.access_on = false;
        off.access_off_since = Some(1_700_000_000_000);
        db.store_account(&off).unwrap();
        db.store_code(&RedeemCode {
            code: "A".to_string(),
            points: Points::from_whole(1),
            used: true,
            used_by: Some("alice".to_string()),
            used_at: Some(0),
            created_at: 0,
        })
        .unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.total_accounts, 2);
        assert_eq!(stats.accounts_with_access_on, 1);
        assert_eq!(stats.total_codes, 1);
        assert_eq!(stats.unused_codes, 0);
        assert_eq!(stats.total_profiles, 0);
    }
}
