use std::sync::Arc;

use usertable_api::{ApiError, TableSession};
use usertable_core::{FilterPatch, Gender, SortDirection, SortField, SortState, UserRecord};
use usertable_query::PageLink;
use usertable_source::{FetchError, MockSource};
use usertable_store::{LoadOutcome, RecordStore};

fn rec(id: u64) -> UserRecord {
    let (first, gender) = if id % 2 == 0 { ("Anna", "female") } else { ("Bob", "male") };
    serde_json::from_value(serde_json::json!({
        "id": id, "firstName": first, "lastName": format!("Doe{id}"), "age": 20 + (id * 3) % 40,
        "gender": gender, "email": format!("user{id}@example.com"), "phone": format!("+1 555-{id:04}")
    }))
    .unwrap()
}

fn records(n: u64) -> Vec<UserRecord> { (1..=n).map(rec).collect() }

fn session(n: u64) -> (Arc<MockSource>, TableSession) {
    let src = Arc::new(MockSource::new(records(n)));
    let store = Arc::new(RecordStore::new(src.clone()));
    (src, TableSession::new(store))
}

fn page_ids(s: &mut TableSession) -> Vec<u64> { s.view().page_items.iter().map(|r| r.id).collect() }

#[tokio::test]
async fn empty_before_first_load() {
    let (_src, mut s) = session(25);
    let view = s.view().clone();
    assert_eq!(view.total_filtered, 0);
    assert_eq!(view.total_pages, 0);
    assert_eq!(view.valid_page, 1);
    assert!(s.state().page_links.is_empty());
}

#[tokio::test]
async fn load_shows_first_page() {
    let (_src, mut s) = session(25);
    let outcome = s.load().await.unwrap();
    assert_eq!(outcome, LoadOutcome::Committed { epoch: 1, count: 25 });
    assert_eq!(page_ids(&mut s), (1..=10).collect::<Vec<_>>());
    let view = s.view();
    assert_eq!(view.total_pages, 3);
    assert_eq!(view.item_range(), Some((1, 10)));
}

#[tokio::test]
async fn reload_resets_page_to_one() {
    let (_src, mut s) = session(25);
    s.load().await.unwrap();
    s.set_page(3);
    assert_eq!(s.view().valid_page, 3);
    s.load().await.unwrap();
    assert_eq!(s.current_page(), 1);
    assert_eq!(s.view().valid_page, 1);
}

#[tokio::test]
async fn out_of_range_page_is_corrected_on_next_turn() {
    let (_src, mut s) = session(25);
    s.load().await.unwrap();
    let view = s.set_page(99).clone();
    assert_eq!(view.valid_page, 3);
    assert_eq!(view.page_items.len(), 5);
    assert_eq!(s.current_page(), 99);
    assert!(s.has_pending_correction());

    assert_eq!(s.view().valid_page, 3);
    assert_eq!(s.current_page(), 3);
    assert!(!s.has_pending_correction());
    assert!(!s.settle());
}

#[tokio::test]
async fn page_zero_clamps_to_first_page() {
    let (_src, mut s) = session(25);
    s.load().await.unwrap();
    assert_eq!(s.set_page(0).valid_page, 1);
    assert!(s.settle());
    assert_eq!(s.current_page(), 1);
}

#[tokio::test]
async fn navigation_stays_within_bounds() {
    let (_src, mut s) = session(25);
    s.load().await.unwrap();
    assert_eq!(s.prev_page().valid_page, 1);
    assert_eq!(s.next_page().valid_page, 2);
    assert_eq!(s.last_page().valid_page, 3);
    assert_eq!(s.next_page().valid_page, 3);
    assert_eq!(s.first_page().valid_page, 1);
    assert_eq!(s.current_page(), 1);
}

#[tokio::test]
async fn filter_change_merges_and_resets_page() {
    let (_src, mut s) = session(25);
    s.load().await.unwrap();
    s.set_page(2);
    s.set_filter(FilterPatch::new().search("anna"));
    assert_eq!(s.current_page(), 1);
    assert_eq!(s.view().total_filtered, 12);

    s.set_filter(FilterPatch::new().age_max(40));
    assert_eq!(s.filter().search.as_deref(), Some("anna"));
    assert_eq!(s.filter().age_max, Some(40));
    assert!(s.view().page_items.iter().all(|r| r.gender == Gender::Female && r.age <= 40));

    s.set_filter(FilterPatch::new().clear_search().clear_age_max());
    assert_eq!(s.view().total_filtered, 25);
}

#[tokio::test]
async fn filter_matching_nothing_yields_empty_first_page() {
    let (_src, mut s) = session(25);
    s.load().await.unwrap();
    s.set_page(3);
    let view = s.set_filter(FilterPatch::new().search("nobody")).clone();
    assert_eq!(view.total_filtered, 0);
    assert_eq!(view.total_pages, 0);
    assert_eq!(view.valid_page, 1);
    assert!(view.page_items.is_empty());
}

#[tokio::test]
async fn header_clicks_cycle_and_reset_page() {
    let (_src, mut s) = session(25);
    s.load().await.unwrap();
    s.set_page(2);

    s.set_sort(SortField::Age);
    assert_eq!(s.sort(), SortState::by(SortField::Age, SortDirection::Asc));
    assert_eq!(s.current_page(), 1);
    let ages: Vec<u32> = s.view().page_items.iter().map(|r| r.age).collect();
    assert!(ages.windows(2).all(|w| w[0] <= w[1]));

    s.set_sort(SortField::Age);
    let ages: Vec<u32> = s.view().page_items.iter().map(|r| r.age).collect();
    assert!(ages.windows(2).all(|w| w[0] >= w[1]));

    s.set_sort(SortField::Age);
    assert_eq!(s.sort().active(), None);
    assert_eq!(page_ids(&mut s), (1..=10).collect::<Vec<_>>());
}

#[tokio::test]
async fn failed_reload_keeps_view_and_retry_recovers() {
    let (src, mut s) = session(25);
    s.load().await.unwrap();
    s.set_page(2);
    let before = s.view().clone();

    src.push_err(FetchError::Network("connection reset".into()));
    let err = s.load().await.unwrap_err();
    assert_eq!(err, ApiError::Load(FetchError::Network("connection reset".into())));
    assert_eq!(s.view(), &before);

    let state = s.state();
    assert!(!state.loading);
    assert_eq!(state.error, Some(FetchError::Network("connection reset".into())));
    assert_eq!(state.error_message, Some("Network error. Check your internet connection."));

    let outcome = s.retry().await.unwrap();
    assert_eq!(outcome, LoadOutcome::Committed { epoch: 2, count: 25 });
    let state = s.state();
    assert_eq!(state.error, None);
    assert_eq!(state.view.valid_page, 1);
}

#[tokio::test]
async fn detail_opens_known_records_only() {
    let (_src, mut s) = session(25);
    s.load().await.unwrap();
    assert_eq!(s.open_detail(5).unwrap().id, 5);
    assert_eq!(s.open_detail(999).unwrap_err(), ApiError::NotFound(999));
    assert_eq!(s.selected().map(|r| r.id), Some(5));
    assert_eq!(s.state().selected.map(|r| r.id), Some(5));
    s.close_detail();
    assert!(s.selected().is_none());
}

#[tokio::test]
async fn repeated_reads_are_identical() {
    let (_src, mut s) = session(25);
    s.load().await.unwrap();
    s.set_filter(FilterPatch::new().gender(Gender::Male));
    s.set_sort(SortField::LastName);
    let a = s.view().clone();
    let b = s.view().clone();
    assert_eq!(a, b);
}

#[tokio::test]
async fn custom_page_size_is_honoured() {
    let src = Arc::new(MockSource::new(records(25)));
    let mut s = TableSession::with_page_size(Arc::new(RecordStore::new(src)), 0);
    assert_eq!(s.page_size(), 1);
    s.load().await.unwrap();
    assert_eq!(s.view().total_pages, 25);
}

#[tokio::test]
async fn state_serializes_for_the_ui() {
    let (_src, mut s) = session(25);
    s.load().await.unwrap();
    s.set_page(2);
    let state = s.state();
    assert_eq!(state.page_links, vec![PageLink::Page(1), PageLink::Page(2), PageLink::Page(3)]);
    let json = serde_json::to_value(&state).unwrap();
    assert_eq!(json["view"]["validPage"], 2);
    assert_eq!(json["view"]["totalFiltered"], 25);
    assert_eq!(json["loading"], false);
    assert!(json["pageLinks"].is_array());
}

#[tokio::test]
async fn loads_committed_outside_the_session_are_picked_up() {
    let (src, mut s) = session(25);
    s.load().await.unwrap();
    s.set_page(3);

    src.push_ok(records(12));
    let outcome = s.store().load().await.unwrap();
    assert_eq!(outcome, LoadOutcome::Committed { epoch: 2, count: 12 });

    let view = s.view().clone();
    assert_eq!(view.total_filtered, 12);
    assert_eq!(view.total_pages, 2);
    assert_eq!(view.valid_page, 1);
    assert_eq!(s.current_page(), 1);
}

#[tokio::test]
async fn session_opened_on_a_loaded_store_shows_its_collection() {
    let store = Arc::new(RecordStore::new(Arc::new(MockSource::new(records(25)))));
    store.load().await.unwrap();
    let mut s = TableSession::new(store);
    assert_eq!(s.view().total_filtered, 25);
    assert_eq!(page_ids(&mut s), (1..=10).collect::<Vec<_>>());
}
