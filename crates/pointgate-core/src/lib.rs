//! ============================================================================
//! POINTGATE-CORE: Points-gated access ledger
//! ============================================================================
//! This crate holds the account ledger and access state machine:
//! - Lazy daily cost settlement against a per-user point balance
//! - Once-per-day check-in bonus and single-use redeem codes
//! - Access toggling with a one-point activation fee
//! - Purge of identity and owned data after 30 continuous days off
//! - redb-backed repository and an injectable clock for deterministic tests
//! ============================================================================

pub mod clock;
pub mod db;
pub mod ledger;
pub mod points;
pub mod purge;
pub mod types;

// Re-export main types for convenience
pub use clock::{Clock, ManualClock, SystemClock, ONE_DAY_MS};
pub use db::{AccountRecord, CodeConsume, DbStats, LedgerDb, RedeemCode, UserProfile};
pub use ledger::{
    AccountLedger, ACTIVATION_FEE, CHECKIN_BONUS, DAILY_RATE, INITIAL_GRANT, PURGE_AFTER_DAYS,
};
pub use points::Points;
pub use purge::{DataPurge, FsDataPurge};
pub use types::{
    AccessDecision, AccountStatus, CheckInReceipt, DenyReason, LedgerError, RedeemReceipt,
    ToggleReceipt,
};
