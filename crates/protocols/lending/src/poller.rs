//! Contract Data Poller
//!
//! Keeps a `ContractState` snapshot of the lending contract fresh while an
//! account is connected. A background task refetches both resources on a
//! fixed interval; `refresh()` runs an extra cycle on demand (after a
//! transaction confirms, for example).
//!
//! Every cycle takes a sequence number when it starts. A cycle's result is
//! applied only if no later-started cycle has been applied already, so a
//! slow response can never overwrite newer data.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;

use aptlend_core::{ContractConfig, ContractError};
use aptos_node_client::ResourceReader;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::fetch::{self, ContractSnapshot};
use crate::state::{self, ContractState, LoanOffer, LoanRequest};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Shared handle to the poller; clones see the same snapshot
#[derive(Clone)]
pub struct ContractPoller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    reader: Arc<dyn ResourceReader>,
    contract: ContractConfig,
    interval: Duration,
    state: RwLock<Snapshot>,
    account: RwLock<Option<String>>,
    next_seq: AtomicU64,
    in_flight: AtomicUsize,
    disposed: AtomicBool,
    timer: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Default)]
struct Snapshot {
    state: ContractState,
    /// Sequence number of the last applied cycle
    applied_seq: u64,
}

impl ContractPoller {
    pub fn new(reader: Arc<dyn ResourceReader>, contract: ContractConfig) -> Self {
        Self::with_interval(reader, contract, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_interval(
        reader: Arc<dyn ResourceReader>,
        contract: ContractConfig,
        interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(PollerInner {
                reader,
                contract,
                interval,
                state: RwLock::new(Snapshot::default()),
                account: RwLock::new(None),
                next_seq: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
                disposed: AtomicBool::new(false),
                timer: Mutex::new(None),
            }),
        }
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    pub fn account(&self) -> Option<String> {
        self.inner.read_account().clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Point the poller at a connected account, or stop polling with `None`.
    ///
    /// With an account, any running timer is replaced by a new one whose
    /// first cycle runs immediately. Without one, the timer is cancelled and
    /// the last snapshot is kept. Must be called within a Tokio runtime.
    pub fn set_account(&self, account: Option<String>) {
        if self.is_disposed() {
            return;
        }

        *self.inner.write_account() = account.clone();
        let mut timer = self.inner.lock_timer();
        if let Some(handle) = timer.take() {
            handle.abort();
        }

        let Some(account) = account else {
            tracing::debug!("Contract polling stopped");
            return;
        };

        tracing::info!(
            account = %account,
            interval_secs = self.inner.interval.as_secs(),
            "Contract polling started"
        );
        *timer = Some(tokio::spawn(poll_loop(
            Arc::downgrade(&self.inner),
            self.inner.interval,
        )));
    }

    /// Run one fetch cycle now and return the snapshot once it is applied.
    pub async fn refresh(&self) -> ContractState {
        self.inner.run_cycle().await;
        self.state()
    }

    /// Stop polling for good. Later cycles and refreshes are no-ops.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }

    /// Copy of the current snapshot
    pub fn state(&self) -> ContractState {
        self.inner.read_state().state.clone()
    }

    pub fn get_loan_offers(&self, lender: Option<&str>) -> Vec<LoanOffer> {
        state::filter_offers(&self.inner.read_state().state, lender)
    }

    pub fn get_loan_requests(
        &self,
        borrower: Option<&str>,
        offer_id: Option<&str>,
    ) -> Vec<LoanRequest> {
        state::filter_requests(&self.inner.read_state().state, borrower, offer_id)
    }

    /// Loans borrowed by `address`, or by the polled account if none is given
    pub fn get_my_loans(&self, address: Option<&str>) -> Vec<LoanRequest> {
        let account = self.account();
        let address = address.or(account.as_deref());
        state::my_loans(&self.inner.read_state().state, address)
    }

    pub fn get_user_loans(&self, address: &str) -> Vec<LoanRequest> {
        state::user_loans(&self.inner.read_state().state, address)
    }

    pub fn get_pending_requests_for_lender(&self, lender: &str) -> Vec<LoanRequest> {
        state::pending_requests_for_lender(&self.inner.read_state().state, lender)
    }

    pub fn orphaned_requests(&self) -> Vec<LoanRequest> {
        state::orphaned_requests(&self.inner.read_state().state)
    }
}

async fn poll_loop(inner: Weak<PollerInner>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        if inner.disposed.load(Ordering::SeqCst) {
            break;
        }
        inner.run_cycle().await;
    }
}

impl PollerInner {
    async fn run_cycle(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let _cycle = CycleGuard::start(self);

        tracing::debug!(seq, "Fetching contract data");
        let result = fetch::fetch_snapshot(self.reader.as_ref(), &self.contract).await;
        self.apply(seq, result);
    }

    fn apply(&self, seq: u64, result: Result<ContractSnapshot, aptlend_core::Error>) {
        let mut snapshot = self.write_state();
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        if seq <= snapshot.applied_seq {
            tracing::debug!(
                seq,
                applied = snapshot.applied_seq,
                "Discarding stale contract fetch"
            );
            return;
        }
        snapshot.applied_seq = seq;

        match result {
            Ok(fresh) => {
                tracing::debug!(
                    seq,
                    offers = fresh.offers.len(),
                    loans = fresh.loans.len(),
                    "Contract data updated"
                );
                snapshot.state.offers = fresh.offers;
                snapshot.state.loans = fresh.loans;
                snapshot.state.error = None;
                snapshot.state.last_updated = Some(fresh.fetched_at);
            }
            Err(e) => {
                let message = ContractError::FetchFailed {
                    message: e.to_string(),
                }
                .to_string();
                tracing::warn!(seq, error = %e, "Contract fetch failed, keeping last snapshot");
                snapshot.state.error = Some(message);
            }
        }
    }

    fn shutdown(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.lock_timer().take() {
            handle.abort();
        }
        tracing::debug!("Contract poller shut down");
    }

    fn read_state(&self) -> RwLockReadGuard<'_, Snapshot> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, Snapshot> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read_account(&self) -> RwLockReadGuard<'_, Option<String>> {
        self.account.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_account(&self) -> RwLockWriteGuard<'_, Option<String>> {
        self.account.write().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_timer(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Counts one cycle as in flight until dropped, including when the cycle's
/// future is cancelled mid-fetch (timer aborted, refresh caller gone).
struct CycleGuard<'a> {
    inner: &'a PollerInner,
}

impl<'a> CycleGuard<'a> {
    fn start(inner: &'a PollerInner) -> Self {
        let mut snapshot = inner.write_state();
        inner.in_flight.fetch_add(1, Ordering::SeqCst);
        snapshot.state.is_loading = true;
        Self { inner }
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        let mut snapshot = self.inner.write_state();
        let remaining = self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        snapshot.state.is_loading = remaining > 0;
    }
}

impl Drop for PollerInner {
    fn drop(&mut self) {
        self.disposed.store(true, Ordering::SeqCst);
        let timer = self.timer.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = timer.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use aptlend_core::NodeError;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::*;
    use crate::fetch::test_support::FakeLedger;
    use crate::state::LoanStatus;

    const OFFERS: &str = "0xc0ffee::lending::Offers";
    const LOANS: &str = "0xc0ffee::lending::Loans";

    fn contract() -> ContractConfig {
        ContractConfig {
            address: "0xc0ffee".to_string(),
            module_name: "lending".to_string(),
        }
    }

    fn seeded_ledger() -> Arc<FakeLedger> {
        let ledger = Arc::new(FakeLedger::default());
        ledger.set_resource(
            OFFERS,
            json!({"offers": {
                "1": {"lender": "0x123", "amount": "5000000", "interest_rate": "500"},
                "2": {"lender": "0x999", "amount": "1000000"}
            }}),
        );
        ledger.set_resource(
            LOANS,
            json!({"loans": {
                "10": {"offer_id": "1", "borrower": "0x456", "lender": "0x123", "status": 0},
                "11": {"offer_id": "2", "borrower": "0x789", "lender": "0x999", "status": 1},
                "12": {"offer_id": "1", "borrower": "0x789", "lender": "0x123", "status": 0}
            }}),
        );
        ledger
    }

    fn poller(ledger: &Arc<FakeLedger>) -> ContractPoller {
        ContractPoller::new(ledger.clone(), contract())
    }

    #[tokio::test]
    async fn test_refresh_populates_snapshot() {
        let ledger = seeded_ledger();
        let poller = poller(&ledger);

        let state = poller.refresh().await;
        assert_eq!(state.offers.len(), 2);
        assert_eq!(state.loans.len(), 3);
        assert!(!state.is_loading);
        assert!(state.error.is_none());
        assert!(state.last_updated.is_some());
    }

    #[tokio::test]
    async fn test_accessor_filters() {
        let ledger = seeded_ledger();
        let poller = poller(&ledger);
        poller.refresh().await;

        let offers = poller.get_loan_offers(Some("0x123"));
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].offer_id, "1");
        assert_eq!(poller.get_loan_offers(None).len(), 2);

        let requests = poller.get_loan_requests(None, Some("1"));
        let ids: Vec<_> = requests.iter().map(|r| r.request_id.as_str()).collect();
        assert_eq!(ids, vec!["10", "12"]);

        let both = poller.get_loan_requests(Some("0x789"), Some("1"));
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].request_id, "12");

        assert_eq!(poller.get_my_loans(Some("0x456")).len(), 1);
        assert!(poller.get_my_loans(None).is_empty());
        assert_eq!(poller.get_user_loans("0x999").len(), 1);

        let pending = poller.get_pending_requests_for_lender("0x123");
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|r| r.status == LoanStatus::Pending));
        assert!(poller.orphaned_requests().is_empty());
    }

    #[tokio::test]
    async fn test_my_loans_defaults_to_polled_account() {
        let ledger = seeded_ledger();
        let poller = poller(&ledger);
        poller.refresh().await;
        poller.set_account(Some("0x789".to_string()));

        assert_eq!(poller.get_my_loans(None).len(), 2);
        poller.shutdown();
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_last_snapshot() {
        let ledger = seeded_ledger();
        let poller = poller(&ledger);
        let before = poller.refresh().await;

        ledger.set_failure(Some("connection reset"));
        let after = poller.refresh().await;

        let error = after.error.expect("error recorded");
        assert!(error.starts_with("Failed to fetch contract data"), "{}", error);
        assert!(error.contains("connection reset"));
        assert_eq!(after.offers.len(), before.offers.len());
        assert_eq!(after.loans.len(), before.loans.len());
        assert_eq!(after.last_updated, before.last_updated);
        assert!(!after.is_loading);

        ledger.set_failure(None);
        assert!(poller.refresh().await.error.is_none());
    }

    #[tokio::test]
    async fn test_unpublished_resources_read_as_empty() {
        let ledger = Arc::new(FakeLedger::default());
        let poller = poller(&ledger);

        let state = poller.refresh().await;
        assert!(state.offers.is_empty());
        assert!(state.loans.is_empty());
        assert!(state.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_interval_until_account_cleared() {
        let ledger = seeded_ledger();
        let poller = poller(&ledger);

        poller.set_account(Some("0x456".to_string()));
        tokio::time::sleep(Duration::from_millis(1)).await;
        // One cycle reads both resources
        assert_eq!(ledger.reads(), 2);

        tokio::time::sleep(DEFAULT_POLL_INTERVAL).await;
        assert_eq!(ledger.reads(), 4);

        poller.set_account(None);
        tokio::time::sleep(DEFAULT_POLL_INTERVAL * 3).await;
        assert_eq!(ledger.reads(), 4);
        assert_eq!(poller.state().offers.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_fetch_after_shutdown() {
        let ledger = seeded_ledger();
        let poller = poller(&ledger);

        poller.set_account(Some("0x456".to_string()));
        tokio::time::sleep(Duration::from_millis(1)).await;
        let reads = ledger.reads();

        poller.shutdown();
        tokio::time::sleep(DEFAULT_POLL_INTERVAL + Duration::from_millis(1)).await;
        assert_eq!(ledger.reads(), reads);

        poller.refresh().await;
        poller.set_account(Some("0x456".to_string()));
        tokio::time::sleep(DEFAULT_POLL_INTERVAL).await;
        assert_eq!(ledger.reads(), reads);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_last_handle_stops_polling() {
        let ledger = seeded_ledger();
        let poller = poller(&ledger);

        poller.set_account(Some("0x456".to_string()));
        tokio::time::sleep(Duration::from_millis(1)).await;
        let reads = ledger.reads();

        drop(poller);
        tokio::time::sleep(DEFAULT_POLL_INTERVAL * 2).await;
        assert_eq!(ledger.reads(), reads);
    }

    #[tokio::test(start_paused = true)]
    async fn test_account_change_restarts_timer() {
        let ledger = seeded_ledger();
        let poller = poller(&ledger);

        poller.set_account(Some("0x456".to_string()));
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(ledger.reads(), 2);

        tokio::time::sleep(Duration::from_secs(2)).await;
        poller.set_account(Some("0x789".to_string()));
        tokio::time::sleep(Duration::from_millis(1)).await;
        // New account is fetched right away
        assert_eq!(ledger.reads(), 4);
        assert_eq!(poller.account().as_deref(), Some("0x789"));

        // The old timer would have fired 5s after the first start
        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(ledger.reads(), 4);

        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert_eq!(ledger.reads(), 6);

        tokio::time::sleep(DEFAULT_POLL_INTERVAL).await;
        assert_eq!(ledger.reads(), 8);
        assert!(!poller.state().is_loading);
        poller.shutdown();
    }

    /// Snapshots ledger contents at call time, then waits a scripted delay
    struct SlowLedger {
        ledger: Arc<FakeLedger>,
        delays: Mutex<VecDeque<Duration>>,
    }

    #[async_trait]
    impl ResourceReader for SlowLedger {
        async fn read_resource(
            &self,
            address: &str,
            resource_type: &str,
        ) -> Result<Option<Value>, NodeError> {
            let result = self.ledger.read_resource(address, resource_type).await;
            let delay = self.delays.lock().unwrap().pop_front();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result
        }

        async fn read_table_item(
            &self,
            handle: &str,
            key_type: &str,
            value_type: &str,
            key: Value,
        ) -> Result<Option<Value>, NodeError> {
            self.ledger
                .read_table_item(handle, key_type, value_type, key)
                .await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_stale_response_is_discarded() {
        let ledger = Arc::new(FakeLedger::default());
        ledger.set_resource(OFFERS, json!({"offers": {"1": {"lender": "0x1"}}}));
        let slow = Arc::new(SlowLedger {
            ledger: ledger.clone(),
            delays: Mutex::new(VecDeque::from([
                Duration::from_secs(10),
                Duration::from_secs(10),
            ])),
        });
        let poller = ContractPoller::new(slow, contract());

        let first = tokio::spawn({
            let poller = poller.clone();
            async move { poller.refresh().await }
        });
        tokio::task::yield_now().await;
        assert!(poller.state().is_loading);

        ledger.set_resource(
            OFFERS,
            json!({"offers": {"1": {"lender": "0x1"}, "2": {"lender": "0x2"}}}),
        );
        let second = poller.refresh().await;
        assert_eq!(second.offers.len(), 2);
        // The first cycle is still outstanding
        assert!(second.is_loading);

        first.await.unwrap();
        let state = poller.state();
        assert_eq!(state.offers.len(), 2);
        assert!(!state.is_loading);
    }

    fn slow_ledger(delays: &[Duration]) -> (Arc<FakeLedger>, Arc<SlowLedger>) {
        let ledger = seeded_ledger();
        let slow = Arc::new(SlowLedger {
            ledger: ledger.clone(),
            delays: Mutex::new(delays.iter().copied().collect()),
        });
        (ledger, slow)
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_clears_after_account_switch_mid_fetch() {
        let (_ledger, slow) = slow_ledger(&[Duration::from_secs(3), Duration::from_secs(3)]);
        let poller = ContractPoller::new(slow, contract());

        poller.set_account(Some("0xa".to_string()));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(poller.state().is_loading);

        poller.set_account(Some("0xb".to_string()));
        tokio::time::sleep(Duration::from_secs(30)).await;

        let state = poller.state();
        assert_eq!(state.offers.len(), 2);
        assert!(state.error.is_none());
        assert!(!state.is_loading);
        poller.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_clears_after_shutdown_mid_fetch() {
        let (_ledger, slow) = slow_ledger(&[Duration::from_secs(3), Duration::from_secs(3)]);
        let poller = ContractPoller::new(slow, contract());

        poller.set_account(Some("0xa".to_string()));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(poller.state().is_loading);

        poller.shutdown();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!poller.state().is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_clears_when_refresh_is_dropped() {
        let (_ledger, slow) = slow_ledger(&[Duration::from_secs(3), Duration::from_secs(3)]);
        let poller = ContractPoller::new(slow, contract());

        let timed_out = tokio::time::timeout(Duration::from_secs(1), poller.refresh()).await;
        assert!(timed_out.is_err());
        assert!(!poller.state().is_loading);

        let state = poller.refresh().await;
        assert_eq!(state.offers.len(), 2);
        assert!(!state.is_loading);
    }
}
