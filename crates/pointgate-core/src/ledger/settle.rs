//! ============================================================================
//! Daily Cost Engine - Lazy settlement and the purge timer
//! ============================================================================
//! Settlement charges one point per elapsed whole day while access is on and
//! advances the high-water mark. It runs before every other operation, so
//! balances are always current when a decision is made. An account that has
//! been off for 30 continuous days is purged and reset here.
//! ============================================================================

use tracing::{debug, info, warn};

use crate::clock::ONE_DAY_MS;
use crate::db::AccountRecord;
use crate::points::Points;
use crate::types::LedgerError;

use super::{AccountLedger, DAILY_RATE, PURGE_AFTER_DAYS};

impl AccountLedger {
    /// Settle elapsed daily costs up to today's local midnight, then apply
    /// the purge policy. Returns true iff this call performed a purge; the
    /// signal is derived from the pre-settlement off timestamp, never from
    /// state that outlives the call. Callers must hold the handle's lock.
    pub(crate) async fn settle_costs(
        &self,
        record: &mut AccountRecord,
    ) -> Result<bool, LedgerError> {
        let now = self.clock.now_ms();
        let today_midnight = self.clock.today_midnight_ms();

        let applied_from = if record.last_cost_applied_at > 0 {
            record.last_cost_applied_at
        } else {
            self.clock.midnight_of(record.created_at)
        };

        // Clock skew: the high-water mark is in the future. Clamp it back and
        // charge nothing; the next persisting operation writes the clamp out.
        if applied_from > today_midnight {
            warn!(
                "Settlement mark for {} is {}ms ahead of today, clamping",
                record.handle,
                applied_from - today_midnight
            );
            record.last_cost_applied_at = today_midnight;
            return Ok(false);
        }

        let days = (today_midnight - applied_from) / ONE_DAY_MS;
        if days > 0 {
            let rate = if record.access_on {
                DAILY_RATE
            } else {
                Points::ZERO
            };
            let cost = rate.saturating_mul(u32::try_from(days).unwrap_or(u32::MAX));
            record.points = record.points.saturating_sub(cost);
            record.last_cost_applied_at = applied_from + days * ONE_DAY_MS;
            self.persist(record)?;
            debug!(
                "Settled {} day(s) for {}: -{} -> {}",
                days, record.handle, cost, record.points
            );
        }

        // Purge after 30 continuous days off. The snapshot taken here is what
        // makes the returned signal one-shot: the reset below re-arms the
        // timer at today's midnight.
        let purge_due = match record.access_off_since {
            Some(off_since) if !record.access_on => {
                now - off_since >= PURGE_AFTER_DAYS * ONE_DAY_MS
            }
            _ => false,
        };
        if !purge_due {
            return Ok(false);
        }

        // Best-effort external destruction; the reset must happen regardless.
        if let Err(e) = self.purger.purge_user_data(&record.handle).await {
            warn!("User data purge for {} failed: {:#}", record.handle, e);
        }

        record.points = Points::ZERO;
        record.access_on = false;
        record.last_checkin_date.clear();
        record.access_off_since = Some(today_midnight);
        record.last_cost_applied_at = today_midnight;
        self.persist(record)?;

        info!(
            "Account {} purged after {}+ days off, timer re-armed",
            record.handle, PURGE_AFTER_DAYS
        );
        Ok(true)
    }
}
