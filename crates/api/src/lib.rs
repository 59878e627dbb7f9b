//! User table query coordinator.
//!
//! [`TableSession`] owns the filter, sort and page state for one browsing session
//! and exposes the mutation API a UI calls. Every mutation is followed by a full
//! Filter → Sort → Paginate pass over the store's current collection; nothing is
//! derived incrementally from the previous view.

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};
use usertable_core::{
    DerivedView, FilterPatch, FilterState, PageState, RecordId, SortField, SortState, UserRecord, ITEMS_PER_PAGE,
};
use usertable_query::{compute_view, next_sort_state, page_links, PageLink};
use usertable_source::FetchError;
use usertable_store::{LoadOutcome, LoadStatus, RecordStore};

/// Errors surfaced by the session façade.
#[derive(Debug, Clone, thiserror::Error, Serialize, PartialEq, Eq)]
pub enum ApiError {
    #[error("not_found: record {0}")]
    NotFound(RecordId),
    #[error("load: {0}")]
    Load(#[from] FetchError),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Everything a UI needs to draw one frame.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableState {
    pub loading: bool,
    pub error: Option<FetchError>,
    pub error_message: Option<&'static str>,
    pub view: DerivedView,
    pub filter: FilterState,
    pub sort: SortState,
    pub page_links: Vec<PageLink>,
    pub selected: Option<UserRecord>,
}

pub struct TableSession {
    store: Arc<RecordStore>,
    filter: FilterState,
    sort: SortState,
    page: PageState,
    view: DerivedView,
    /// Page correction reported by the last pass, applied on the next turn.
    pending_page: Option<usize>,
    seen_epoch: u64,
    epoch_rx: watch::Receiver<u64>,
    selected: Option<UserRecord>,
}

impl TableSession {
    pub fn new(store: Arc<RecordStore>) -> Self { Self::with_page_size(store, ITEMS_PER_PAGE) }

    pub fn with_page_size(store: Arc<RecordStore>, page_size: usize) -> Self {
        let epoch_rx = store.subscribe_epoch();
        let mut s = Self {
            store,
            filter: FilterState::default(),
            sort: SortState::default(),
            page: PageState { current_page: 1, items_per_page: page_size.max(1) },
            view: DerivedView::default(),
            pending_page: None,
            seen_epoch: 0,
            epoch_rx,
            selected: None,
        };
        s.recompute("init");
        s
    }

    pub fn store(&self) -> &Arc<RecordStore> { &self.store }
    pub fn filter(&self) -> &FilterState { &self.filter }
    pub fn sort(&self) -> SortState { self.sort }
    /// Persisted page; may briefly differ from `view().valid_page` until the correction settles.
    pub fn current_page(&self) -> usize { self.page.current_page }
    pub fn page_size(&self) -> usize { self.page.items_per_page }
    pub fn status(&self) -> LoadStatus { self.store.status() }
    pub fn has_pending_correction(&self) -> bool { self.pending_page.is_some() }

    /// Load through the store, then pick up the new collection (page resets to 1).
    pub async fn load(&mut self) -> ApiResult<LoadOutcome> {
        let res = self.store.load().await;
        self.sync();
        Ok(res?)
    }

    pub async fn retry(&mut self) -> ApiResult<LoadOutcome> {
        let res = self.store.retry().await;
        self.sync();
        Ok(res?)
    }

    /// Shallow-merge partial criteria, reset to page 1 and recompute.
    pub fn set_filter(&mut self, patch: FilterPatch) -> &DerivedView {
        self.sync();
        self.filter.merge(patch);
        self.page.current_page = 1;
        self.recompute("filter");
        &self.view
    }

    /// Header click on `field`: asc → desc → unsorted. Resets to page 1.
    pub fn set_sort(&mut self, field: SortField) -> &DerivedView {
        self.sync();
        self.sort = next_sort_state(self.sort, field);
        self.page.current_page = 1;
        debug!(field = %field, sort = ?self.sort.active(), "session: sort changed");
        self.recompute("sort");
        &self.view
    }

    /// Out-of-range pages are accepted here and corrected by pagination.
    pub fn set_page(&mut self, page: usize) -> &DerivedView {
        self.sync();
        self.page.current_page = page;
        self.recompute("page");
        &self.view
    }

    pub fn first_page(&mut self) -> &DerivedView { self.set_page(1) }

    pub fn prev_page(&mut self) -> &DerivedView {
        self.sync();
        let target = self.view.valid_page.saturating_sub(1);
        self.set_page(target)
    }

    pub fn next_page(&mut self) -> &DerivedView {
        self.sync();
        let target = self.view.valid_page + 1;
        self.set_page(target)
    }

    pub fn last_page(&mut self) -> &DerivedView {
        self.sync();
        let target = self.view.total_pages;
        self.set_page(target)
    }

    /// Current derived view, consistent with the latest committed collection.
    pub fn view(&mut self) -> &DerivedView {
        self.sync();
        &self.view
    }

    /// Apply a page correction deferred by the previous pass. Returns whether one was applied.
    pub fn settle(&mut self) -> bool {
        match self.pending_page.take() {
            Some(page) => {
                debug!(from = self.page.current_page, to = page, "session: applying page correction");
                self.page.current_page = page;
                self.recompute("correction");
                true
            }
            None => false,
        }
    }

    pub fn state(&mut self) -> TableState {
        self.sync();
        let status = self.store.status();
        TableState {
            loading: status.loading,
            error_message: status.error.as_ref().map(FetchError::user_message),
            error: status.error,
            page_links: page_links(self.view.valid_page, self.view.total_pages),
            view: self.view.clone(),
            filter: self.filter.clone(),
            sort: self.sort,
            selected: self.selected.clone(),
        }
    }

    /// Select a record of the current collection for the detail view.
    pub fn open_detail(&mut self, id: RecordId) -> ApiResult<&UserRecord> {
        let snap = self.store.current();
        let rec = snap.get(id).cloned().ok_or(ApiError::NotFound(id))?;
        debug!(id, "session: detail opened");
        Ok(&*self.selected.insert(rec))
    }

    pub fn close_detail(&mut self) { self.selected = None; }
    pub fn selected(&self) -> Option<&UserRecord> { self.selected.as_ref() }

    // Pick up a newly committed collection, then any deferred correction.
    fn sync(&mut self) {
        if self.epoch_rx.has_changed().unwrap_or(false) {
            let epoch = *self.epoch_rx.borrow_and_update();
            if epoch != self.seen_epoch {
                self.recompute("load");
            }
        }
        self.settle();
    }

    fn recompute(&mut self, reason: &'static str) {
        let t0 = Instant::now();
        let snap = self.store.current();
        if snap.epoch != self.seen_epoch {
            info!(epoch = snap.epoch, records = snap.len(), "session: new collection; page reset");
            self.seen_epoch = snap.epoch;
            self.page.current_page = 1;
        }
        let out = compute_view(&snap.records, &self.filter, &self.sort, &self.page);
        if let Some(valid) = out.correction {
            debug!(requested = self.page.current_page, valid, "session: page correction deferred");
        }
        self.pending_page = out.correction;
        self.view = out.view;
        metrics::histogram!("query_filtered_records", self.view.total_filtered as f64);
        metrics::histogram!("query_recompute_ms", t0.elapsed().as_secs_f64() * 1000.0);
        debug!(
            reason,
            total = snap.len(),
            filtered = self.view.total_filtered,
            pages = self.view.total_pages,
            page = self.view.valid_page,
            "session: view recomputed"
        );
    }
}
