//! ============================================================================
//! Access Toggle - On/off transitions with the activation fee
//! ============================================================================
//! Costs are settled before the transition is evaluated, so toggling at a
//! settlement boundary can neither dodge nor double-pay the current day's
//! fee. Turning on charges the one-point activation fee; turning off is free
//! and starts the purge clock.
//! ============================================================================

use tracing::info;

use crate::types::{LedgerError, ToggleReceipt};

use super::{AccountLedger, ACTIVATION_FEE};

impl AccountLedger {
    /// Transition the access flag to `desired`. Requesting the current state
    /// is an idempotent no-op.
    pub async fn toggle_access(
        &self,
        handle: &str,
        desired: bool,
    ) -> Result<ToggleReceipt, LedgerError> {
        let _guard = self.locks.acquire(handle).await;
        let mut record = self.load_or_init(handle).await?;
        self.settle_costs(&mut record).await?;

        if record.access_on != desired {
            if desired {
                if record.points < ACTIVATION_FEE {
                    return Err(LedgerError::InsufficientPoints {
                        needed: ACTIVATION_FEE.as_f64(),
                        available: record.points.as_f64(),
                    });
                }
                record.points = record.points.saturating_sub(ACTIVATION_FEE);
                record.access_on = true;
                record.access_off_since = None;
            } else {
                record.access_on = false;
                record.access_off_since = Some(self.clock.now_ms());
            }
            self.persist(&record)?;
            info!(
                "Access for {} now {}, {} points left",
                handle,
                if record.access_on { "on" } else { "off" },
                record.points
            );
        }

        Ok(ToggleReceipt {
            access_on: record.access_on,
            points: record.points,
        })
    }
}
