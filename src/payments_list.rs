//! Date-filtered payments listing with last-request-wins semantics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::gateway::PaymentsApi;
use crate::models::{DateRange, Payment};
use crate::timer::TaskSlot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListStatus {
    Loading,
    Error(String),
    Ready,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentsListState {
    pub items: Vec<Payment>,
    pub status: ListStatus,
    pub filter: DateRange,
}

impl Default for PaymentsListState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            status: ListStatus::Loading,
            filter: DateRange::all(),
        }
    }
}

/// What the presentation layer should draw for the current state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ListView<'a> {
    Loading,
    Error(&'a str),
    Empty,
    Rows(&'a [Payment]),
}

impl PaymentsListState {
    pub fn view(&self) -> ListView<'_> {
        match &self.status {
            ListStatus::Loading => ListView::Loading,
            ListStatus::Error(message) => ListView::Error(message),
            ListStatus::Ready if self.items.is_empty() => ListView::Empty,
            ListStatus::Ready => ListView::Rows(&self.items),
        }
    }
}

/// Version counter bumped after every successful create.
///
/// Listings that `follow` it refetch with their current filter.
#[derive(Clone)]
pub struct DataChanges {
    tx: Arc<watch::Sender<u64>>,
}

impl Default for DataChanges {
    fn default() -> Self {
        Self::new()
    }
}

impl DataChanges {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    pub fn bump(&self) {
        self.tx.send_modify(|version| *version += 1);
    }

    pub fn version(&self) -> u64 {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

struct Inner {
    api: Arc<dyn PaymentsApi>,
    state: watch::Sender<PaymentsListState>,
    latest_request: AtomicU64,
}

impl Inner {
    async fn fetch(&self, range: DateRange) {
        let request = self.latest_request.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|state| state.status = ListStatus::Loading);

        tracing::debug!("fetching payments #{} for {:?}", request, range);
        let result = self.api.list_payments(&range).await;

        if self.latest_request.load(Ordering::SeqCst) != request {
            tracing::debug!("discarding stale payments response #{}", request);
            return;
        }

        self.state.send_modify(|state| match result {
            Ok(items) => {
                state.items = items;
                state.status = ListStatus::Ready;
            }
            Err(err) => {
                tracing::debug!("payments request #{} failed: {}", request, err);
                state.status = ListStatus::Error(err.to_string());
            }
        });
    }

    async fn refresh(&self) {
        let filter = self.state.borrow().filter;
        self.fetch(filter).await;
    }
}

/// Payments listing controller.
///
/// Each fetch is tagged; only the response to the most recently issued request is
/// applied, whatever order responses arrive in.
pub struct PaymentsList {
    inner: Arc<Inner>,
    follower: TaskSlot,
}

impl PaymentsList {
    pub fn new(api: Arc<dyn PaymentsApi>) -> Self {
        let (state, _) = watch::channel(PaymentsListState::default());
        Self {
            inner: Arc::new(Inner {
                api,
                state,
                latest_request: AtomicU64::new(0),
            }),
            follower: TaskSlot::new(),
        }
    }

    pub fn state(&self) -> PaymentsListState {
        self.inner.state.borrow().clone()
    }

    /// Initial unfiltered load
    pub async fn mount(&self) {
        self.apply_filter(DateRange::all()).await;
    }

    /// Replace the active filter and fetch. An unbounded range shows everything.
    pub async fn apply_filter(&self, range: DateRange) {
        self.inner.state.send_modify(|state| state.filter = range);
        self.inner.fetch(range).await;
    }

    pub async fn reset_filter(&self) {
        self.apply_filter(DateRange::all()).await;
    }

    /// Fetch again with the filter currently applied
    pub async fn refresh(&self) {
        self.inner.refresh().await;
    }

    /// Refresh on every bump of `changes` for as long as this listing lives.
    pub fn follow(&self, changes: &DataChanges) {
        let mut versions = changes.subscribe();
        let inner = self.inner.clone();
        self.follower.schedule(async move {
            while versions.changed().await.is_ok() {
                inner.refresh().await;
            }
        });
    }
}
