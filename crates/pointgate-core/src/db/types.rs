//! ============================================================================
//! Database Types - Serializable records for redb storage
//! ============================================================================

use serde::{Deserialize, Serialize};

use crate::points::Points;

/// Per-user ledger state, one record per handle.
/// Mutated only through the ledger operations; the repository itself carries
/// no business logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRecord {
    pub handle: String,
    pub points: Points,
    pub access_on: bool,
    /// Epoch ms at local midnight through which daily costs are settled.
    pub last_cost_applied_at: i64,
    /// `YYYY-MM-DD` of the last granted check-in bonus, empty if never.
    pub last_checkin_date: String,
    /// Epoch ms when the current off period began. `Some` iff access is off.
    pub access_off_since: Option<i64>,
    pub created_at: i64,
}

/// Single-use redeem code. The `used` flag flips false -> true exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemCode {
    /// Normalized key (uppercase).
    pub code: String,
    pub points: Points,
    pub used: bool,
    pub used_by: Option<String>,
    pub used_at: Option<i64>,
    pub created_at: i64,
}

/// Identity entry written by the login collaborator and removed on purge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub handle: String,
    pub name: String,
    pub created_at: i64,
}

/// Database statistics for the inspection CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbStats {
    pub total_accounts: usize,
    pub accounts_with_access_on: usize,
    pub total_codes: usize,
    pub unused_codes: usize,
    pub total_profiles: usize,
}
