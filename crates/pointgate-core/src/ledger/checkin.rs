//! ============================================================================
//! Check-In - Once-per-calendar-day bonus
//! ============================================================================

use tracing::info;

use crate::types::{CheckInReceipt, LedgerError};

use super::{AccountLedger, CHECKIN_BONUS};

impl AccountLedger {
    /// Grant the daily check-in bonus. Fails with `AlreadyCheckedIn` if the
    /// bonus was already granted on the current calendar date.
    pub async fn check_in(&self, handle: &str) -> Result<CheckInReceipt, LedgerError> {
        let _guard = self.locks.acquire(handle).await;
        let mut record = self.load_or_init(handle).await?;
        self.settle_costs(&mut record).await?;

        let today = self.clock.today_string();
        if record.last_checkin_date == today {
            return Err(LedgerError::AlreadyCheckedIn);
        }

        record.points = record.points.saturating_add(CHECKIN_BONUS);
        record.last_checkin_date = today.clone();
        self.persist(&record)?;

        info!("Check-in for {}: +{} -> {}", handle, CHECKIN_BONUS, record.points);

        Ok(CheckInReceipt {
            points: record.points,
            last_checkin_date: today,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::fixture;
    use super::super::INITIAL_GRANT;
    use super::*;
    use crate::clock::Clock;
    use crate::points::Points;

    #[tokio::test]
    async fn test_check_in_grants_bonus_once_per_day() {
        let fx = fixture();

        let receipt = fx.ledger.check_in("alice").await.unwrap();
        assert_eq!(receipt.points, INITIAL_GRANT.saturating_add(CHECKIN_BONUS));
        assert_eq!(receipt.last_checkin_date, fx.clock.today_string());

        // Second call the same day fails and changes nothing
        let err = fx.ledger.check_in("alice").await.unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyCheckedIn));
        let record = fx.db.get_account("alice").unwrap().unwrap();
        assert_eq!(record.points, receipt.points);
    }

    #[tokio::test]
    async fn test_check_in_available_again_next_day() {
        let fx = fixture();
        fx.ledger.check_in("alice").await.unwrap();

        fx.clock.advance_days(1);
        // 25 points, minus 1 day of fees, plus the new bonus
        let receipt = fx.ledger.check_in("alice").await.unwrap();
        assert_eq!(receipt.points, Points::from_whole(29));
    }

    #[tokio::test]
    async fn test_status_reflects_check_in_eligibility() {
        let fx = fixture();
        assert!(fx.ledger.status("alice", "Alice").await.unwrap().can_check_in_today);

        fx.ledger.check_in("alice").await.unwrap();
        assert!(!fx.ledger.status("alice", "Alice").await.unwrap().can_check_in_today);

        fx.clock.advance_days(1);
        assert!(fx.ledger.status("alice", "Alice").await.unwrap().can_check_in_today);
    }
}
