use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::sync::watch;
use tracing::debug;

/// How long a client waits for a change before being told to poll again.
pub const CHANGE_POLL_TIMEOUT: Duration = Duration::from_secs(25);

/// Per-budget revision counters.
///
/// Every change to a budget's items or members bumps its revision. Clients
/// remember the last revision they rendered and wait for a newer one to know
/// when to refetch. Revisions live in memory and restart at zero with the
/// process.
#[derive(Clone, Default)]
pub struct BudgetChanges {
    senders: Arc<Mutex<HashMap<i64, watch::Sender<u64>>>>,
}

impl BudgetChanges {
    fn subscribe(&self, budget_id: i64) -> watch::Receiver<u64> {
        let mut senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);

        senders
            .entry(budget_id)
            .or_insert_with(|| watch::channel(0).0)
            .subscribe()
    }

    /// Record a change to a budget.
    ///
    /// # Returns
    ///
    /// The budget's new revision.
    pub fn notify(&self, budget_id: i64) -> u64 {
        let mut senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = senders
            .entry(budget_id)
            .or_insert_with(|| watch::channel(0).0);

        sender.send_modify(|revision| *revision += 1);
        let revision = *sender.borrow();

        debug!(budget_id, revision, "Bumped budget revision.");

        revision
    }

    pub fn current(&self, budget_id: i64) -> u64 {
        *self.subscribe(budget_id).borrow()
    }

    /// Wait for a budget's revision to differ from the one a client has seen.
    ///
    /// # Arguments
    ///
    /// * `budget_id` - The budget to watch.
    /// * `since` - The last revision the client knows about.
    /// * `timeout` - The longest time to wait for a change.
    ///
    /// # Returns
    ///
    /// The current revision. This is `since` if nothing changed before the
    /// timeout elapsed.
    pub async fn wait_for_change(&self, budget_id: i64, since: u64, timeout: Duration) -> u64 {
        let mut receiver = self.subscribe(budget_id);

        let current = *receiver.borrow_and_update();
        if current != since {
            return current;
        }

        // Senders are never dropped, so `changed` only resolves on a new
        // revision.
        if tokio::time::timeout(timeout, receiver.changed())
            .await
            .is_err()
        {
            debug!(budget_id, since, "Timed out waiting for budget change.");
        }

        let revision = *receiver.borrow();
        revision
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn revisions_start_at_zero_and_increase() {
        let changes = BudgetChanges::default();

        assert_eq!(0, changes.current(1));
        assert_eq!(1, changes.notify(1));
        assert_eq!(2, changes.notify(1));
        assert_eq!(2, changes.current(1));
    }

    #[test]
    fn budgets_are_tracked_separately() {
        let changes = BudgetChanges::default();

        changes.notify(1);

        assert_eq!(0, changes.current(2));
    }

    #[tokio::test]
    async fn stale_revision_returns_immediately() {
        let changes = BudgetChanges::default();
        changes.notify(1);

        let revision = changes
            .wait_for_change(1, 0, Duration::from_secs(60))
            .await;

        assert_eq!(1, revision);
    }

    #[tokio::test]
    async fn waiting_client_wakes_on_change() {
        let changes = BudgetChanges::default();
        let waiter = {
            let changes = changes.clone();
            tokio::spawn(async move {
                changes
                    .wait_for_change(1, 0, Duration::from_secs(60))
                    .await
            })
        };

        // Give the waiter a chance to subscribe before notifying.
        tokio::time::sleep(Duration::from_millis(20)).await;
        changes.notify(1);

        let revision = waiter.await.expect("waiter should not panic");

        assert_eq!(1, revision);
    }

    #[tokio::test]
    async fn wait_times_out_with_unchanged_revision() {
        let changes = BudgetChanges::default();

        let revision = changes
            .wait_for_change(1, 0, Duration::from_millis(10))
            .await;

        assert_eq!(0, revision);
    }
}
