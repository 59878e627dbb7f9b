//! Sort engine: stable single-key ordering and the tri-state header cycle.

use std::cmp::Reverse;

use usertable_core::{SortDirection, SortField, SortState, UserRecord};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Number(u32),
    Text(String),
}

fn sort_key(rec: &UserRecord, field: SortField) -> SortKey {
    match field {
        SortField::FirstName => SortKey::Text(rec.first_name.to_lowercase()),
        SortField::LastName => SortKey::Text(rec.last_name.to_lowercase()),
        SortField::MaidenName => SortKey::Text(rec.maiden_name().to_lowercase()),
        SortField::Age => SortKey::Number(rec.age),
        SortField::Gender => SortKey::Text(rec.gender.as_str().to_string()),
        SortField::Phone => SortKey::Text(rec.phone.to_lowercase()),
    }
}

/// Ordered copy of `records`. The input is never reordered; ties keep their
/// original relative order in both directions.
pub fn sort_records<'r>(records: &[&'r UserRecord], sort: &SortState) -> Vec<&'r UserRecord> {
    let mut out = records.to_vec();
    let Some((field, direction)) = sort.active() else {
        return out;
    };
    match direction {
        SortDirection::Asc => out.sort_by_cached_key(|r| sort_key(r, field)),
        SortDirection::Desc => out.sort_by_cached_key(|r| Reverse(sort_key(r, field))),
    }
    out
}

/// Header click on `field`: new field → asc, asc → desc, desc → unsorted.
pub fn next_sort_state(current: SortState, field: SortField) -> SortState {
    match current.active() {
        Some((f, SortDirection::Asc)) if f == field => SortState::by(field, SortDirection::Desc),
        Some((f, SortDirection::Desc)) if f == field => SortState::unsorted(),
        _ => SortState::by(field, SortDirection::Asc),
    }
}
