//! User table query pipeline.
//!
//! Filter → Sort → Paginate, always evaluated from the full stored collection.
//! Every function here is total: there is no error state, and pagination yields a
//! valid page even for an empty collection.

#![forbid(unsafe_code)]

use usertable_core::{DerivedView, FilterState, PageState, SortState, UserRecord};

pub mod filter;
pub mod paginate;
pub mod sort;

pub use filter::{filter_records, CompiledFilter};
pub use paginate::{clamp_page, page_links, paginate, total_pages, PageLink, Paginated};
pub use sort::{next_sort_state, sort_records};

/// Result of one pipeline pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub view: DerivedView,
    /// Page the caller should persist when the requested one was out of range.
    pub correction: Option<usize>,
}

pub fn compute_view(records: &[UserRecord], filter: &FilterState, sort: &SortState, page: &PageState) -> PipelineOutput {
    let filtered = filter_records(records, filter);
    let sorted = sort_records(&filtered, sort);
    let paged = paginate(&sorted, page.current_page, page.items_per_page);
    let correction = paged.needs_correction().then_some(paged.valid_page);
    let view = DerivedView {
        total_filtered: paged.total_items,
        total_pages: paged.total_pages,
        valid_page: paged.valid_page,
        page_size: page.items_per_page.max(1),
        page_items: paged.items.into_iter().cloned().collect(),
    };
    PipelineOutput { view, correction }
}
