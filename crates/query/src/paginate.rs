//! Pagination engine: page count, page clamping and the page window.

use serde::Serialize;

/// One page of a sequence plus the bookkeeping needed to correct the requested page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginated<T> {
    pub total_items: usize,
    pub total_pages: usize,
    pub requested_page: usize,
    pub valid_page: usize,
    pub items: Vec<T>,
}

impl<T> Paginated<T> {
    /// The caller asked for a page outside `[1, max(total_pages, 1)]`.
    pub fn needs_correction(&self) -> bool { self.requested_page != self.valid_page }
}

/// `ceil(total_items / page_size)`; zero items means zero pages.
pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    total_items.div_ceil(page_size.max(1))
}

/// Clamp into `[1, max(total_pages, 1)]`.
pub fn clamp_page(page: usize, total_pages: usize) -> usize { page.clamp(1, total_pages.max(1)) }

pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Paginated<T> {
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_pages(total_items, page_size);
    let valid_page = clamp_page(page, total_pages);
    let start = ((valid_page - 1) * page_size).min(total_items);
    let end = (start + page_size).min(total_items);
    Paginated { total_items, total_pages, requested_page: page, valid_page, items: items[start..end].to_vec() }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PageLink {
    Page(usize),
    Ellipsis,
}

const VISIBLE_PAGES: usize = 3;

/// Page buttons to show for `current` out of `total` pages.
pub fn page_links(current: usize, total: usize) -> Vec<PageLink> {
    if total <= VISIBLE_PAGES {
        return (1..=total).map(PageLink::Page).collect();
    }
    let mut start = current.saturating_sub(2).max(1);
    let mut end = (start + VISIBLE_PAGES - 1).min(total);
    if start == 1 {
        end = VISIBLE_PAGES;
    }
    if end == total {
        start = total - VISIBLE_PAGES + 1;
    }

    let mut out = Vec::with_capacity(VISIBLE_PAGES + 4);
    if start > 1 {
        out.push(PageLink::Page(1));
        if start > 2 {
            out.push(PageLink::Ellipsis);
        }
    }
    out.extend((start..=end).map(PageLink::Page));
    if end < total {
        if end < total - 1 {
            out.push(PageLink::Ellipsis);
        }
        out.push(PageLink::Page(total));
    }
    out
}
