//! ============================================================================
//! Redeem Engine - Single-use code credit
//! ============================================================================
//! Codes are case-insensitive and consumed by an atomic compare-and-set in
//! the store, decoupled from the account lock: a code presented by a user
//! whose account is contended still burns exactly once. Only a successful
//! consume settles and credits the account.
//! ============================================================================

use tracing::info;

use crate::db::CodeConsume;
use crate::types::{LedgerError, RedeemReceipt};

use super::{storage_err, AccountLedger};

impl AccountLedger {
    /// Redeem a single-use code and credit its point value to `handle`.
    pub async fn redeem(&self, handle: &str, code: &str) -> Result<RedeemReceipt, LedgerError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(LedgerError::Validation(
                "redeem code must not be empty".to_string(),
            ));
        }

        let consumed = match self
            .db
            .consume_code(code, handle, self.clock.now_ms())
            .map_err(|e| storage_err("consume code", handle, e))?
        {
            CodeConsume::Consumed(rec) => rec,
            CodeConsume::NotFound => return Err(LedgerError::CodeNotFound),
            CodeConsume::AlreadyUsed => return Err(LedgerError::CodeAlreadyUsed),
        };

        let _guard = self.locks.acquire(handle).await;
        let mut record = self.load_or_init(handle).await?;
        self.settle_costs(&mut record).await?;

        record.points = record.points.saturating_add(consumed.points);
        self.persist(&record)?;

        info!(
            "Redeemed code {} for {}: +{} -> {}",
            consumed.code, handle, consumed.points, record.points
        );

        Ok(RedeemReceipt {
            success: true,
            points: record.points,
            added_points: consumed.points,
            message: format!("Redeemed {} points", consumed.points),
        })
    }
}
