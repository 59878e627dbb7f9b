//! User table record store: the full fetched collection plus load/error status.
//!
//! Readers take cheap `Arc` snapshots; every successful load swaps in a new
//! snapshot with a bumped epoch. Loads carry sequence numbers so an outcome that
//! completes after a newer call has already been committed is discarded.

#![forbid(unsafe_code)]

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use arc_swap::ArcSwap;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use usertable_core::{RecordId, UserRecord};
use usertable_source::{FetchError, FetchRequest, UserSource};

/// Immutable view of one committed collection.
#[derive(Debug, Clone, Default)]
pub struct RecordSnapshot {
    pub epoch: u64,
    pub records: Vec<UserRecord>,
    by_id: FxHashMap<RecordId, usize>,
}

impl RecordSnapshot {
    pub fn new(epoch: u64, records: Vec<UserRecord>) -> Self {
        let by_id = records.iter().enumerate().map(|(i, r)| (r.id, i)).collect();
        Self { epoch, records, by_id }
    }

    pub fn get(&self, id: RecordId) -> Option<&UserRecord> {
        self.by_id.get(&id).and_then(|&i| self.records.get(i))
    }

    pub fn len(&self) -> usize { self.records.len() }
    pub fn is_empty(&self) -> bool { self.records.is_empty() }
}

/// Loading/error flags exposed to the UI.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct LoadStatus {
    pub loading: bool,
    pub error: Option<FetchError>,
    /// Epoch of the committed collection; 0 until the first successful load.
    pub epoch: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Committed { epoch: u64, count: usize },
    /// A newer load already decided the store state; this result was dropped.
    Superseded,
}

#[derive(Default)]
struct Ledger {
    issued: u64,
    decided: u64,
    in_flight: usize,
    error: Option<FetchError>,
}

/// Decrements the in-flight count even when a load future is dropped mid-await.
struct InFlight<'a> {
    ledger: &'a Mutex<Ledger>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut l = self.ledger.lock().unwrap_or_else(|e| e.into_inner());
        l.in_flight = l.in_flight.saturating_sub(1);
    }
}

pub struct RecordStore {
    source: Arc<dyn UserSource>,
    request: FetchRequest,
    snap: ArcSwap<RecordSnapshot>,
    ledger: Mutex<Ledger>,
    epoch_tx: watch::Sender<u64>,
}

impl RecordStore {
    pub fn new(source: Arc<dyn UserSource>) -> Self { Self::with_request(source, FetchRequest::default()) }

    pub fn with_request(source: Arc<dyn UserSource>, request: FetchRequest) -> Self {
        let (epoch_tx, _) = watch::channel(0u64);
        Self {
            source,
            request,
            snap: ArcSwap::from_pointee(RecordSnapshot::default()),
            ledger: Mutex::new(Ledger::default()),
            epoch_tx,
        }
    }

    pub fn current(&self) -> Arc<RecordSnapshot> { self.snap.load_full() }
    pub fn subscribe_epoch(&self) -> watch::Receiver<u64> { self.epoch_tx.subscribe() }

    pub fn status(&self) -> LoadStatus {
        let l = self.ledger();
        LoadStatus { loading: l.in_flight > 0, error: l.error.clone(), epoch: self.snap.load().epoch }
    }

    pub fn is_loading(&self) -> bool { self.ledger().in_flight > 0 }
    pub fn error(&self) -> Option<FetchError> { self.ledger().error.clone() }

    fn ledger(&self) -> MutexGuard<'_, Ledger> { self.ledger.lock().unwrap_or_else(|e| e.into_inner()) }

    /// Fetch the whole collection in one bulk request and commit it atomically.
    ///
    /// On failure the previous collection stays in place and the classified error is
    /// recorded. The error of the last decided outcome stays visible until a newer
    /// load commits successfully, so a dropped or superseded call never hides it.
    /// Overlapping calls are allowed; only outcomes newer than the last committed
    /// one are applied.
    pub async fn load(&self) -> Result<LoadOutcome, FetchError> {
        let t0 = Instant::now();
        let seq = {
            let mut l = self.ledger();
            l.issued += 1;
            l.in_flight += 1;
            l.issued
        };
        let _in_flight = InFlight { ledger: &self.ledger };
        debug!(seq, skip = self.request.skip, limit = self.request.limit, "store: load start");

        let res = self.source.fetch_users(self.request).await;

        let mut l = self.ledger();
        if seq <= l.decided {
            metrics::counter!("store_loads_total", 1u64, "outcome" => "stale");
            debug!(seq, decided = l.decided, ok = res.is_ok(), "store: discarding superseded load");
            return Ok(LoadOutcome::Superseded);
        }
        l.decided = seq;
        match res {
            Ok(page) => {
                let epoch = self.snap.load().epoch + 1;
                let count = page.users.len();
                self.snap.store(Arc::new(RecordSnapshot::new(epoch, page.users)));
                l.error = None;
                self.epoch_tx.send_replace(epoch);
                metrics::counter!("store_loads_total", 1u64, "outcome" => "committed");
                metrics::gauge!("store_records", count as f64);
                info!(seq, epoch, count, total = page.total, took_ms = %t0.elapsed().as_millis(), "store: snapshot committed");
                Ok(LoadOutcome::Committed { epoch, count })
            }
            Err(e) => {
                l.error = Some(e.clone());
                metrics::counter!("store_loads_total", 1u64, "outcome" => "failed");
                warn!(seq, error = %e, kept = self.snap.load().records.len(), "store: load failed; keeping previous collection");
                Err(e)
            }
        }
    }

    /// User-triggered repeat of [`RecordStore::load`].
    pub async fn retry(&self) -> Result<LoadOutcome, FetchError> {
        info!("store: retry requested");
        self.load().await
    }
}
