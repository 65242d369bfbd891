//! Shared polling feeds.
//!
//! A [`RefreshHub`] runs at most one poller per [`FeedKey`]. Every subscriber of a key gets
//! a [`Feed`] reading the same watch channel, so two dashboards showing requests cause
//! one fetch per interval, not two. A poller fetches as soon as it starts, then once per
//! interval, and again whenever [`Feed::refresh_now`] is called. A failed fetch keeps the
//! previous value and only records the error. The poller is aborted when the last feed
//! for its key is dropped.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use procure_core::config::PollingConfig;
use procure_core::dashboard::FeedKind;
use procure_core::domain::approval::PendingApproval;
use procure_core::domain::directory::{Directory, UserId};
use procure_core::domain::payment::Payment;
use procure_core::domain::request::{PurchaseRequest, RequestDetail, RequestId};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::api::ProcurementApi;
use crate::error::ApiError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeedKey {
    Reference,
    Requests,
    Payments,
    PendingApprovals(UserId),
    RequestDetail(RequestId),
}

impl FeedKey {
    pub fn kind(&self) -> FeedKind {
        match self {
            Self::Reference => FeedKind::Reference,
            Self::Requests => FeedKind::Requests,
            Self::Payments => FeedKind::Payments,
            Self::PendingApprovals(_) => FeedKind::PendingApprovals,
            Self::RequestDetail(_) => FeedKind::RequestDetail,
        }
    }
}

impl fmt::Display for FeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reference => f.write_str("reference"),
            Self::Requests => f.write_str("requests"),
            Self::Payments => f.write_str("payments"),
            Self::PendingApprovals(user) => write!(f, "pending_approvals/{user}"),
            Self::RequestDetail(request) => write!(f, "request_detail/{request}"),
        }
    }
}

/// Latest state of one feed.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot<T> {
    /// Last successfully fetched value; `None` until the first success.
    pub value: Option<T>,
    pub fetched_at: Option<DateTime<Utc>>,
    /// Error from the most recent fetch, cleared by the next success.
    pub last_error: Option<ApiError>,
    /// Number of completed fetch attempts.
    pub generation: u64,
}

impl<T> Snapshot<T> {
    fn empty() -> Self {
        Self { value: None, fetched_at: None, last_error: None, generation: 0 }
    }

    pub fn is_loaded(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_stale(&self) -> bool {
        self.last_error.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeedClosed;

impl fmt::Display for FeedClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("feed poller has stopped")
    }
}

impl std::error::Error for FeedClosed {}

type FeedFuture<T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send>>;
type Fetch<T> = Arc<dyn Fn() -> FeedFuture<T> + Send + Sync>;
type Slots = Arc<Mutex<HashMap<FeedKey, Box<dyn PollerSlot>>>>;

trait PollerSlot: Send {
    fn receiver_count(&self) -> usize;
    fn refresh(&self);
    fn abort(&self);
    fn as_any(&self) -> &dyn Any;
}

struct Poller<T> {
    sender: Arc<watch::Sender<Snapshot<T>>>,
    notify: Arc<Notify>,
    task: JoinHandle<()>,
}

impl<T: Send + Sync + 'static> PollerSlot for Poller<T> {
    fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    fn refresh(&self) {
        self.notify.notify_one();
    }

    fn abort(&self) {
        self.task.abort();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A subscription to one feed. Cloning adds a subscriber to the same poller.
pub struct Feed<T> {
    key: FeedKey,
    receiver: watch::Receiver<Snapshot<T>>,
    notify: Arc<Notify>,
    slots: Weak<Mutex<HashMap<FeedKey, Box<dyn PollerSlot>>>>,
}

impl<T: Clone> Feed<T> {
    pub fn key(&self) -> &FeedKey {
        &self.key
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        self.receiver.borrow().clone()
    }

    /// Waits for the next completed fetch.
    pub async fn changed(&mut self) -> Result<Snapshot<T>, FeedClosed> {
        self.receiver.changed().await.map_err(|_| FeedClosed)?;
        Ok(self.receiver.borrow_and_update().clone())
    }

    /// Waits until at least one fetch has completed, successful or not.
    pub async fn first(&mut self) -> Result<Snapshot<T>, FeedClosed> {
        let snapshot = self.receiver.wait_for(|snapshot| snapshot.generation > 0).await;
        snapshot.map(|snapshot| snapshot.clone()).map_err(|_| FeedClosed)
    }

    /// Asks the poller for an immediate out-of-band fetch.
    pub fn refresh_now(&self) {
        self.notify.notify_one();
    }

    /// Forces a fetch and waits for a result newer than the current snapshot.
    pub async fn refresh_and_wait(&mut self) -> Result<Snapshot<T>, FeedClosed> {
        let seen = self.receiver.borrow().generation;
        self.refresh_now();
        let snapshot = self.receiver.wait_for(|snapshot| snapshot.generation > seen).await;
        snapshot.map(|snapshot| snapshot.clone()).map_err(|_| FeedClosed)
    }
}

impl<T> Clone for Feed<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            receiver: self.receiver.clone(),
            notify: Arc::clone(&self.notify),
            slots: Weak::clone(&self.slots),
        }
    }
}

impl<T> Drop for Feed<T> {
    fn drop(&mut self) {
        let Some(slots) = self.slots.upgrade() else {
            return;
        };
        let mut slots = lock(&slots);
        // This feed's receiver is still alive here, so a count of one means it is the last.
        let last = slots.get(&self.key).is_some_and(|slot| slot.receiver_count() <= 1);
        if last {
            if let Some(slot) = slots.remove(&self.key) {
                slot.abort();
                debug!(event_name = "client.feed.stopped", feed = %self.key, "feed poller stopped");
            }
        }
    }
}

pub struct RefreshHub {
    api: Arc<dyn ProcurementApi>,
    polling: PollingConfig,
    slots: Slots,
}

impl RefreshHub {
    /// Pollers are spawned onto the current tokio runtime, so subscribe from inside one.
    pub fn new(api: Arc<dyn ProcurementApi>, polling: PollingConfig) -> Self {
        Self { api, polling, slots: Arc::new(Mutex::new(HashMap::new())) }
    }

    pub fn api(&self) -> Arc<dyn ProcurementApi> {
        Arc::clone(&self.api)
    }

    pub fn reference(&self) -> Feed<Directory> {
        let api = Arc::clone(&self.api);
        self.subscribe(FeedKey::Reference, move || {
            let api = Arc::clone(&api);
            Box::pin(async move { api.directory().await })
        })
    }

    pub fn requests(&self) -> Feed<Vec<PurchaseRequest>> {
        let api = Arc::clone(&self.api);
        self.subscribe(FeedKey::Requests, move || {
            let api = Arc::clone(&api);
            Box::pin(async move { api.requests().await })
        })
    }

    pub fn payments(&self) -> Feed<Vec<Payment>> {
        let api = Arc::clone(&self.api);
        self.subscribe(FeedKey::Payments, move || {
            let api = Arc::clone(&api);
            Box::pin(async move { api.payments().await })
        })
    }

    pub fn pending_approvals(&self, user: UserId) -> Feed<Vec<PendingApproval>> {
        let api = Arc::clone(&self.api);
        self.subscribe(FeedKey::PendingApprovals(user), move || {
            let api = Arc::clone(&api);
            Box::pin(async move { api.pending_approvals(user).await })
        })
    }

    pub fn request_detail(&self, request: RequestId) -> Feed<RequestDetail> {
        let api = Arc::clone(&self.api);
        self.subscribe(FeedKey::RequestDetail(request), move || {
            let api = Arc::clone(&api);
            Box::pin(async move { api.request_detail(request).await })
        })
    }

    /// Keys that currently have a running poller.
    pub fn active_feeds(&self) -> Vec<FeedKey> {
        let mut keys: Vec<FeedKey> = lock(&self.slots).keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Triggers an immediate fetch on every running feed `matches` accepts.
    pub fn refresh_where<F>(&self, matches: F)
    where
        F: Fn(&FeedKey) -> bool,
    {
        for (key, slot) in lock(&self.slots).iter() {
            if matches(key) {
                slot.refresh();
            }
        }
    }

    pub fn refresh(&self, key: &FeedKey) {
        self.refresh_where(|candidate| candidate == key);
    }

    fn subscribe<T, F>(&self, key: FeedKey, fetch: F) -> Feed<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> FeedFuture<T> + Send + Sync + 'static,
    {
        let mut slots = lock(&self.slots);
        if let Some(poller) =
            slots.get(&key).and_then(|slot| slot.as_any().downcast_ref::<Poller<T>>())
        {
            return Feed {
                key,
                receiver: poller.sender.subscribe(),
                notify: Arc::clone(&poller.notify),
                slots: Arc::downgrade(&self.slots),
            };
        }

        let (sender, receiver) = watch::channel(Snapshot::empty());
        let sender = Arc::new(sender);
        let notify = Arc::new(Notify::new());
        let period = key.kind().interval(&self.polling);
        let task = tokio::spawn(run_poller(
            key.clone(),
            Arc::clone(&sender),
            Arc::clone(&notify),
            period,
            Arc::new(fetch),
        ));
        debug!(
            event_name = "client.feed.started",
            feed = %key,
            interval_ms = period.as_millis() as u64,
            "feed poller started"
        );

        let poller = Box::new(Poller { sender, notify: Arc::clone(&notify), task });
        if let Some(replaced) = slots.insert(key.clone(), poller) {
            replaced.abort();
        }
        Feed { key, receiver, notify, slots: Arc::downgrade(&self.slots) }
    }
}

impl Drop for RefreshHub {
    fn drop(&mut self) {
        for (_, slot) in lock(&self.slots).drain() {
            slot.abort();
        }
    }
}

async fn run_poller<T>(
    key: FeedKey,
    sender: Arc<watch::Sender<Snapshot<T>>>,
    notify: Arc<Notify>,
    period: Duration,
    fetch: Fetch<T>,
) {
    let mut ticker = interval(period.max(Duration::from_secs(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = notify.notified() => ticker.reset(),
        }

        let outcome = fetch().await;
        let fetched_at = Utc::now();
        sender.send_modify(|snapshot| {
            snapshot.generation += 1;
            match outcome {
                Ok(value) => {
                    snapshot.value = Some(value);
                    snapshot.fetched_at = Some(fetched_at);
                    snapshot.last_error = None;
                }
                Err(error) => {
                    warn!(
                        event_name = "client.feed.fetch_failed",
                        feed = %key,
                        error = %error,
                        "fetch failed; keeping previous snapshot"
                    );
                    snapshot.last_error = Some(error);
                }
            }
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use procure_core::config::PollingConfig;
    use procure_core::domain::approval::PendingApproval;
    use procure_core::domain::directory::{Department, User, UserId, Vendor};
    use procure_core::domain::payment::{Payment, PaymentId, PaymentOutcome};
    use procure_core::domain::request::{
        DecisionReceipt, NewRequest, PurchaseRequest, RequestDetail, RequestId, SubmissionReceipt,
    };

    use super::{FeedKey, RefreshHub};
    use crate::api::{HealthStatus, ProcessReceipt, ProcurementApi};
    use crate::error::ApiError;

    /// Counts `GET /requests` calls and fails them while `failing` is set.
    #[derive(Default)]
    struct CountingApi {
        request_fetches: AtomicUsize,
        failing: std::sync::atomic::AtomicBool,
    }

    fn unused<T>() -> Result<T, ApiError> {
        Err(ApiError::Status { status: 501, detail: "not used in this test".to_owned() })
    }

    #[async_trait]
    impl ProcurementApi for CountingApi {
        async fn health(&self) -> Result<HealthStatus, ApiError> {
            unused()
        }
        async fn users(&self) -> Result<Vec<User>, ApiError> {
            Ok(Vec::new())
        }
        async fn vendors(&self) -> Result<Vec<Vendor>, ApiError> {
            Ok(Vec::new())
        }
        async fn departments(&self) -> Result<Vec<Department>, ApiError> {
            Ok(Vec::new())
        }
        async fn requests(&self) -> Result<Vec<PurchaseRequest>, ApiError> {
            self.request_fetches.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(ApiError::Transport {
                    endpoint: "/requests".to_owned(),
                    message: "connection refused".to_owned(),
                });
            }
            Ok(Vec::new())
        }
        async fn request_detail(&self, _: RequestId) -> Result<RequestDetail, ApiError> {
            unused()
        }
        async fn submit_request(&self, _: &NewRequest) -> Result<SubmissionReceipt, ApiError> {
            unused()
        }
        async fn approve(&self, _: RequestId, _: UserId) -> Result<DecisionReceipt, ApiError> {
            unused()
        }
        async fn reject(&self, _: RequestId, _: UserId) -> Result<DecisionReceipt, ApiError> {
            unused()
        }
        async fn pending_approvals(&self, _: UserId) -> Result<Vec<PendingApproval>, ApiError> {
            Ok(Vec::new())
        }
        async fn payments(&self) -> Result<Vec<Payment>, ApiError> {
            Ok(Vec::new())
        }
        async fn process_payment(
            &self,
            _: PaymentId,
            _: UserId,
            _: PaymentOutcome,
        ) -> Result<ProcessReceipt, ApiError> {
            unused()
        }
    }

    fn slow_polling() -> PollingConfig {
        PollingConfig {
            reference_secs: 300,
            requests_secs: 300,
            approvals_secs: 300,
            payments_secs: 300,
            detail_secs: 300,
        }
    }

    #[tokio::test]
    async fn subscribers_of_one_key_share_a_poller() {
        let api = Arc::new(CountingApi::default());
        let hub = RefreshHub::new(api.clone(), slow_polling());

        let mut first = hub.requests();
        let mut second = hub.requests();
        first.first().await.expect("first fetch");
        second.first().await.expect("shared snapshot");

        assert_eq!(api.request_fetches.load(Ordering::SeqCst), 1);
        assert_eq!(hub.active_feeds(), vec![FeedKey::Requests]);
    }

    #[tokio::test]
    async fn refresh_now_triggers_an_out_of_band_fetch() {
        let api = Arc::new(CountingApi::default());
        let hub = RefreshHub::new(api.clone(), slow_polling());

        let mut feed = hub.requests();
        let initial = feed.first().await.expect("initial fetch");
        let refreshed = feed.refresh_and_wait().await.expect("refresh");

        assert!(refreshed.generation > initial.generation);
        assert_eq!(api.request_fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_value() {
        let api = Arc::new(CountingApi::default());
        let hub = RefreshHub::new(api.clone(), slow_polling());

        let mut feed = hub.requests();
        let loaded = feed.first().await.expect("initial fetch");
        assert!(loaded.is_loaded());

        api.failing.store(true, Ordering::SeqCst);
        let stale = feed.refresh_and_wait().await.expect("refresh");

        assert!(stale.is_loaded(), "previous value survives a failed fetch");
        assert!(stale.is_stale());
        assert_eq!(stale.fetched_at, loaded.fetched_at);
    }

    #[tokio::test]
    async fn dropping_the_last_feed_stops_its_poller() {
        let api = Arc::new(CountingApi::default());
        let hub = RefreshHub::new(api.clone(), slow_polling());

        let feed = hub.requests();
        let copy = feed.clone();
        let approvals = hub.pending_approvals(UserId(2));
        drop(feed);
        assert_eq!(
            hub.active_feeds(),
            vec![FeedKey::Requests, FeedKey::PendingApprovals(UserId(2))]
        );

        drop(copy);
        assert_eq!(hub.active_feeds(), vec![FeedKey::PendingApprovals(UserId(2))]);

        drop(approvals);
        assert!(hub.active_feeds().is_empty());
    }

    #[tokio::test]
    async fn short_intervals_keep_polling() {
        let api = Arc::new(CountingApi::default());
        let polling = PollingConfig { requests_secs: 1, ..slow_polling() };
        let hub = RefreshHub::new(api.clone(), polling);

        let mut feed = hub.requests();
        feed.first().await.expect("initial fetch");
        let next = tokio::time::timeout(Duration::from_secs(3), feed.changed())
            .await
            .expect("a scheduled fetch within the interval")
            .expect("feed open");

        assert!(next.generation >= 2);
    }
}
