//! ============================================================================
//! Ledger Types - Operation payloads and the error taxonomy
//! ============================================================================

use serde::{Deserialize, Serialize};

use crate::points::Points;

/// Settled account snapshot returned by the status operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountStatus {
    pub handle: String,
    pub name: String,
    pub points: Points,
    pub access_on: bool,
    /// Whole days spent in the current off period, 0 while access is on.
    pub off_days: i64,
    pub can_check_in_today: bool,
    /// One-shot: true only on the call that performed a purge.
    pub purged: bool,
}

/// Result of a successful daily check-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInReceipt {
    pub points: Points,
    pub last_checkin_date: String,
}

/// Result of an access toggle (or an idempotent no-op).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleReceipt {
    pub access_on: bool,
    pub points: Points,
}

/// Result of a successful code redemption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemReceipt {
    pub success: bool,
    pub points: Points,
    pub added_points: Points,
    pub message: String,
}

/// Allow/deny decision for the protected resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenyReason>,
}

impl AccessDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: DenyReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenyReason {
    NotLoggedIn,
    Off,
    NoPoints,
}

/// Error types for ledger operations. Business-rule variants leave account
/// state unchanged; `Storage` is the opaque form of a persistence failure
/// whose details go to the log, not the caller.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum LedgerError {
    #[error("already checked in today")]
    AlreadyCheckedIn,

    #[error("insufficient points: need {needed}, have {available}")]
    InsufficientPoints { needed: f64, available: f64 },

    #[error("redeem code not found or no longer valid")]
    CodeNotFound,

    #[error("redeem code has already been used")]
    CodeAlreadyUsed,

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("internal storage failure")]
    Storage,
}
