//! Keeps exactly one countdown controller alive per listed policy.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;

use super::controller::{Clock, CountdownController, CountdownState};
use super::remaining::CountdownPhase;
use crate::models::policy::{Policy, PolicyId};

struct BoardEntry {
    controller: CountdownController,
    /// Set once an expiry has been handed out by `take_expired` (or the row
    /// was already due when it appeared).
    expiry_reported: bool,
}

impl BoardEntry {
    fn new(controller: CountdownController) -> Self {
        let expiry_reported = controller.current().phase() == CountdownPhase::Expired;
        Self {
            controller,
            expiry_reported,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub started: Vec<PolicyId>,
    pub retargeted: Vec<PolicyId>,
    pub cancelled: Vec<PolicyId>,
}

impl ReconcileSummary {
    pub fn is_empty(&self) -> bool {
        self.started.is_empty() && self.retargeted.is_empty() && self.cancelled.is_empty()
    }
}

pub struct CountdownBoard {
    clock: Arc<dyn Clock>,
    entries: HashMap<PolicyId, BoardEntry>,
}

impl CountdownBoard {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: HashMap::new(),
        }
    }

    /// Brings the controllers in line with `policies`: new rows get a timer,
    /// rows with a changed expiration are retargeted, vanished rows are
    /// torn down (which cancels their timers).
    pub fn reconcile(&mut self, policies: &[Policy]) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();

        let before = self.entries.len();
        self.entries.retain(|id, _| {
            let keep = policies.iter().any(|policy| policy.id == *id);
            if !keep {
                summary.cancelled.push(*id);
            }
            keep
        });

        for policy in policies {
            let target = policy.expires_at();
            match self.entries.get_mut(&policy.id) {
                Some(entry) => {
                    if entry.controller.retarget(target) {
                        entry.expiry_reported =
                            entry.controller.current().phase() == CountdownPhase::Expired;
                        summary.retargeted.push(policy.id);
                    }
                }
                None => {
                    let controller = CountdownController::start(target, Arc::clone(&self.clock));
                    self.entries.insert(policy.id, BoardEntry::new(controller));
                    summary.started.push(policy.id);
                }
            }
        }

        summary.cancelled.sort();
        if !summary.is_empty() {
            log::debug!(
                "Countdown board reconciled: {} rows before, started={:?}, retargeted={:?}, cancelled={:?}",
                before,
                summary.started,
                summary.retargeted,
                summary.cancelled
            );
        }
        summary
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn live_timers(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.controller.is_ticking())
            .count()
    }

    pub fn receiver(&self, id: PolicyId) -> Option<watch::Receiver<CountdownState>> {
        self.entries.get(&id).map(|entry| entry.controller.subscribe())
    }

    pub fn state(&self, id: PolicyId) -> Option<CountdownState> {
        self.entries.get(&id).map(|entry| entry.controller.current())
    }

    pub fn display(&self, id: PolicyId) -> Option<String> {
        self.entries.get(&id).map(|entry| entry.controller.display())
    }

    /// Ids that reached zero since the last call. Each expiry is reported once.
    pub fn take_expired(&mut self) -> Vec<PolicyId> {
        let mut expired: Vec<PolicyId> = self
            .entries
            .iter_mut()
            .filter(|(_, entry)| {
                !entry.expiry_reported
                    && entry.controller.current().phase() == CountdownPhase::Expired
            })
            .map(|(id, entry)| {
                entry.expiry_reported = true;
                *id
            })
            .collect();
        expired.sort();
        expired
    }

    /// Tears down every controller. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::super::controller::test_support::PausedClock;
    use super::*;
    use crate::models::policy::PolicyStatus;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn origin() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap()
    }

    fn policy(id: i64, expires_in_secs: i64) -> Policy {
        Policy {
            id: PolicyId(id),
            sender_id: None,
            recipients: "a@example.com".to_string(),
            subject: format!("policy {}", id),
            body: String::new(),
            expiration_date: (origin() + Duration::seconds(expires_in_secs)).to_rfc3339(),
            attachments: Vec::new(),
            status: PolicyStatus::Active,
        }
    }

    fn board() -> CountdownBoard {
        CountdownBoard::new(Arc::new(PausedClock::new(origin())))
    }

    #[tokio::test(start_paused = true)]
    async fn one_timer_per_row() {
        let mut board = board();
        let summary = board.reconcile(&[policy(1, 60), policy(2, 120), policy(3, 180)]);

        assert_eq!(summary.started, vec![PolicyId(1), PolicyId(2), PolicyId(3)]);
        assert_eq!(board.len(), 3);
        assert_eq!(board.live_timers(), 3);

        let again = board.reconcile(&[policy(1, 60), policy(2, 120), policy(3, 180)]);
        assert!(again.is_empty());
        assert_eq!(board.live_timers(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn removed_rows_stop_ticking() {
        let mut board = board();
        board.reconcile(&[policy(1, 60), policy(2, 60)]);
        let orphan = board.receiver(PolicyId(2)).unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(1_500)).await;
        let summary = board.reconcile(&[policy(1, 60)]);
        assert_eq!(summary.cancelled, vec![PolicyId(2)]);
        assert_eq!(board.live_timers(), 1);

        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        assert_eq!(orphan.borrow().ticks, 1);
        assert_eq!(board.state(PolicyId(1)).unwrap().ticks, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn changed_expiration_is_retargeted() {
        let mut board = board();
        board.reconcile(&[policy(1, 60)]);

        let summary = board.reconcile(&[policy(1, 600)]);
        assert_eq!(summary.retargeted, vec![PolicyId(1)]);
        assert!(summary.started.is_empty());
        assert_eq!(board.display(PolicyId(1)).unwrap(), "0d 0h 10m 0s");
        assert_eq!(board.live_timers(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expiries_are_reported_once() {
        let mut board = board();
        board.reconcile(&[policy(1, 2), policy(2, 3_600), policy(3, -10)]);

        // already due when listed: not a transition
        assert!(board.take_expired().is_empty());

        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        assert_eq!(board.take_expired(), vec![PolicyId(1)]);
        assert!(board.take_expired().is_empty());
        assert_eq!(board.display(PolicyId(1)).unwrap(), "Time's up!");
    }

    #[tokio::test(start_paused = true)]
    async fn clear_drops_everything() {
        let mut board = board();
        board.reconcile(&[policy(1, 60), policy(2, 60)]);
        assert_eq!(board.clear(), 2);
        assert!(board.is_empty());
        assert_eq!(board.live_timers(), 0);
        assert!(board.receiver(PolicyId(1)).is_none());
    }
}
