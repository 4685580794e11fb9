//! ============================================================================
//! Ledger Module - Account state machine over the embedded store
//! ============================================================================
//! Grants and revokes access to the protected resource from a per-user point
//! balance: a daily fee is settled lazily on every touch, a once-per-day
//! check-in adds points, single-use codes top the balance up, and 30
//! continuous days with access off destroy the user's data.
//!
//! ## Pipeline
//! Every operation runs load -> settle -> mutate -> persist under the
//! handle's exclusive lock. Settlement may itself trigger the purge engine.
//!
//! ## Usage
//! ```rust,ignore
//! use pointgate_core::{AccountLedger, FsDataPurge, LedgerDb, SystemClock};
//!
//! let db = Arc::new(LedgerDb::open(None)?);
//! let purger = Arc::new(FsDataPurge::new(db.clone(), FsDataPurge::default_root()?));
//! let ledger = AccountLedger::new(db, Arc::new(SystemClock), purger);
//! let status = ledger.status("alice", "Alice").await?;
//! ```
//! ============================================================================

mod checkin;
mod gate;
mod locks;
mod redeem;
mod settle;
mod toggle;

use std::sync::Arc;
use tracing::{error, info};

use crate::clock::{Clock, ONE_DAY_MS};
use crate::db::{AccountRecord, LedgerDb};
use crate::points::Points;
use crate::purge::DataPurge;
use crate::types::{AccountStatus, LedgerError};
use locks::KeyedLocks;

/// Points granted when an account is first created
pub const INITIAL_GRANT: Points = Points::from_whole(20);

/// Points deducted per day while access is on
pub const DAILY_RATE: Points = Points::from_whole(1);

/// Points granted by the daily check-in
pub const CHECKIN_BONUS: Points = Points::from_whole(5);

/// One-time fee charged when access turns on
pub const ACTIVATION_FEE: Points = Points::from_whole(1);

/// Continuous off days after which an account is purged
pub const PURGE_AFTER_DAYS: i64 = 30;

/// The account ledger service. Cheap to share behind an `Arc`.
pub struct AccountLedger {
    db: Arc<LedgerDb>,
    clock: Arc<dyn Clock>,
    purger: Arc<dyn DataPurge>,
    locks: KeyedLocks,
}

impl AccountLedger {
    pub fn new(db: Arc<LedgerDb>, clock: Arc<dyn Clock>, purger: Arc<dyn DataPurge>) -> Self {
        Self {
            db,
            clock,
            purger,
            locks: KeyedLocks::new(),
        }
    }

    pub fn db(&self) -> &LedgerDb {
        &self.db
    }

    /// Load the account for `handle`, creating it with the initial grant on
    /// first touch. Callers must hold the handle's lock.
    pub(crate) async fn load_or_init(&self, handle: &str) -> Result<AccountRecord, LedgerError> {
        if let Some(record) = self
            .db
            .get_account(handle)
            .map_err(|e| storage_err("load account", handle, e))?
        {
            return Ok(record);
        }

        let record = AccountRecord {
            handle: handle.to_string(),
            points: INITIAL_GRANT,
            access_on: true,
            last_cost_applied_at: self.clock.today_midnight_ms(),
            last_checkin_date: String::new(),
            access_off_since: None,
            created_at: self.clock.now_ms(),
        };
        self.db
            .store_account(&record)
            .map_err(|e| storage_err("init account", handle, e))?;

        info!(
            "Initialized account for {} with {} points",
            handle, record.points
        );
        Ok(record)
    }

    pub(crate) fn persist(&self, record: &AccountRecord) -> Result<(), LedgerError> {
        self.db
            .store_account(record)
            .map_err(|e| storage_err("persist account", &record.handle, e))
    }

    /// Settled status snapshot for the authenticated user. The settlement it
    /// runs may mutate and persist the record; `purged` is true only on the
    /// call that performed a purge.
    pub async fn status(&self, handle: &str, name: &str) -> Result<AccountStatus, LedgerError> {
        let _guard = self.locks.acquire(handle).await;
        let mut record = self.load_or_init(handle).await?;
        let purged = self.settle_costs(&mut record).await?;

        let today_midnight = self.clock.today_midnight_ms();
        let off_days = match record.access_off_since {
            Some(since) if !record.access_on => {
                ((today_midnight - self.clock.midnight_of(since)) / ONE_DAY_MS).max(0)
            }
            _ => 0,
        };

        Ok(AccountStatus {
            handle: record.handle.clone(),
            name: name.to_string(),
            points: record.points,
            access_on: record.access_on,
            off_days,
            can_check_in_today: record.last_checkin_date != self.clock.today_string(),
            purged,
        })
    }
}

pub(crate) fn storage_err(context: &str, handle: &str, err: anyhow::Error) -> LedgerError {
    error!("Storage failure ({} for {}): {:#}", context, handle, err);
    LedgerError::Storage
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::clock::ManualClock;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Purge collaborator that records which handles were purged.
    pub struct RecordingPurge {
        pub purged: Mutex<Vec<String>>,
        pub fail: bool,
    }

    impl RecordingPurge {
        pub fn new() -> Self {
            Self {
                purged: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        pub fn failing() -> Self {
            Self {
                purged: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn handles(&self) -> Vec<String> {
            self.purged.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl crate::purge::DataPurge for RecordingPurge {
        async fn purge_user_data(&self, handle: &str) -> Result<()> {
            self.purged.lock().unwrap().push(handle.to_string());
            if self.fail {
                anyhow::bail!("simulated purge failure");
            }
            Ok(())
        }
    }

    pub struct Fixture {
        pub ledger: AccountLedger,
        pub db: Arc<LedgerDb>,
        pub clock: Arc<ManualClock>,
        pub purger: Arc<RecordingPurge>,
        _dir: tempfile::TempDir,
    }

    /// Ledger over a throwaway database, a manual clock parked mid-day, and
    /// a recording purger.
    pub fn fixture() -> Fixture {
        fixture_with_purger(Arc::new(RecordingPurge::new()))
    }

    pub fn fixture_with_purger(purger: Arc<RecordingPurge>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.redb");
        let db = Arc::new(LedgerDb::open(Some(path.to_str().unwrap())).unwrap());
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let ledger = AccountLedger::new(db.clone(), clock.clone(), purger.clone());
        Fixture {
            ledger,
            db,
            clock,
            purger,
            _dir: dir,
        }
    }
}
