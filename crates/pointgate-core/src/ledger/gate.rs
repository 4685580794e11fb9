//! ============================================================================
//! Access Gate - Allow/deny decision for the protected resource
//! ============================================================================
//! A thin read path over the settlement pipeline, used by the resource-gating
//! collaborator. Because settlement runs first, evaluating access may mutate
//! and persist the record; that lazy side effect is accepted.
//! ============================================================================

use tracing::debug;

use crate::types::{AccessDecision, DenyReason, LedgerError};

use super::AccountLedger;

impl AccountLedger {
    /// Decide whether the given identity may reach the protected resource.
    /// `None` means the caller failed authentication upstream.
    pub async fn evaluate_access(
        &self,
        identity: Option<&str>,
    ) -> Result<AccessDecision, LedgerError> {
        let Some(handle) = identity else {
            return Ok(AccessDecision::deny(DenyReason::NotLoggedIn));
        };

        let _guard = self.locks.acquire(handle).await;
        let mut record = self.load_or_init(handle).await?;
        self.settle_costs(&mut record).await?;

        let decision = if !record.access_on {
            AccessDecision::deny(DenyReason::Off)
        } else if record.points.is_zero() {
            AccessDecision::deny(DenyReason::NoPoints)
        } else {
            AccessDecision::allow()
        };

        debug!(
            "Access decision for {}: allowed={} reason={:?}",
            handle, decision.allowed, decision.reason
        );
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::fixture;
    use super::*;
    use crate::clock::Clock;
    use crate::db::AccountRecord;
    use crate::points::Points;

    #[tokio::test]
    async fn test_unauthenticated_is_denied_without_touching_state() {
        let fx = fixture();
        let decision = fx.ledger.evaluate_access(None).await.unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.reason, Some(DenyReason::NotLoggedIn));
    }

    #[tokio::test]
    async fn test_fresh_account_is_allowed() {
        let fx = fixture();
        let decision = fx.ledger.evaluate_access(Some("alice")).await.unwrap();
        assert!(decision.allowed);
        assert!(decision.reason.is_none());
    }

    #[tokio::test]
    async fn test_off_account_is_denied() {
        let fx = fixture();
        fx.ledger.toggle_access("alice", false).await.unwrap();

        let decision = fx.ledger.evaluate_access(Some("alice")).await.unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.reason, Some(DenyReason::Off));
    }

    #[tokio::test]
    async fn test_drained_account_is_denied() {
        let fx = fixture();
        let mid = fx.clock.today_midnight_ms();
        fx.db
            .store_account(&AccountRecord {
                handle: "alice".to_string(),
                points: Points::ZERO,
                access_on: true,
                last_cost_applied_at: mid,
                last_checkin_date: String::new(),
                access_off_since: None,
                created_at: fx.clock.now_ms(),
            })
            .unwrap();

        let decision = fx.ledger.evaluate_access(Some("alice")).await.unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.reason, Some(DenyReason::NoPoints));
    }

    #[tokio::test]
    async fn test_gate_settles_lazily() {
        let fx = fixture();
        fx.ledger.status("alice", "Alice").await.unwrap();

        // The fee backlog drains the balance; the read path notices
        fx.clock.advance_days(25);
        let decision = fx.ledger.evaluate_access(Some("alice")).await.unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.reason, Some(DenyReason::NoPoints));

        let record = fx.db.get_account("alice").unwrap().unwrap();
        assert_eq!(record.points, Points::ZERO);
    }
}
