//! User table core types: records, filter/sort/page state and the derived view.

#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod columns;

/// Unique record identifier as served by the data source.
pub type RecordId = u64;

/// Fixed number of rows per table page.
pub const ITEMS_PER_PAGE: usize = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[serde(other)]
    Other,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }

    /// Human label used by table cells and the detail view.
    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what}: {value:?}")]
pub struct ParseError {
    pub what: &'static str,
    pub value: String,
}

impl FromStr for Gender {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gender::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseError { what: "gender", value: s.to_string() })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    /// Street line.
    pub address: String,
    pub city: String,
    pub state: String,
    pub state_code: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Company {
    pub name: String,
}

/// One user entity. Never mutated after it has been fetched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub maiden_name: Option<String>,
    pub age: u32,
    pub gender: Gender,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub company: Company,
}

impl UserRecord {
    /// Maiden name with absent treated as empty.
    pub fn maiden_name(&self) -> &str { self.maiden_name.as_deref().unwrap_or("") }

    pub fn full_name(&self) -> String { format!("{} {}", self.first_name, self.last_name) }

    /// Street, city, state and country joined for display; empty parts are skipped.
    pub fn full_address(&self) -> String {
        let a = &self.address;
        [a.address.as_str(), a.city.as_str(), a.state.as_str(), a.country.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Optional filter criteria. Absent fields impose no constraint; present fields are ANDed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub search: Option<String>,
    pub gender: Option<Gender>,
    pub age_min: Option<u32>,
    pub age_max: Option<u32>,
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        self.search.as_deref().map(str::is_empty).unwrap_or(true)
            && self.gender.is_none()
            && self.age_min.is_none()
            && self.age_max.is_none()
    }

    /// Shallow merge: every key of the patch is applied independently.
    pub fn merge(&mut self, patch: FilterPatch) {
        patch.search.apply_to(&mut self.search);
        patch.gender.apply_to(&mut self.gender);
        patch.age_min.apply_to(&mut self.age_min);
        patch.age_max.apply_to(&mut self.age_max);
    }
}

/// Update for a single optional criterion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Keep,
    Clear,
    Set(T),
}

impl<T> Patch<T> {
    pub fn apply_to(self, slot: &mut Option<T>) {
        match self {
            Patch::Keep => {}
            Patch::Clear => *slot = None,
            Patch::Set(v) => *slot = Some(v),
        }
    }

    fn from_option(v: Option<T>) -> Self {
        match v {
            Some(v) => Patch::Set(v),
            None => Patch::Clear,
        }
    }
}

/// Partial criteria passed to `set_filter`; keys left as `Keep` are untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    pub search: Patch<String>,
    pub gender: Patch<Gender>,
    pub age_min: Patch<u32>,
    pub age_max: Patch<u32>,
}

impl FilterPatch {
    pub fn new() -> Self { Self::default() }

    pub fn search(mut self, q: impl Into<String>) -> Self {
        let q = q.into();
        self.search = if q.is_empty() { Patch::Clear } else { Patch::Set(q) };
        self
    }
    pub fn clear_search(mut self) -> Self { self.search = Patch::Clear; self }
    pub fn gender(mut self, g: Gender) -> Self { self.gender = Patch::Set(g); self }
    pub fn clear_gender(mut self) -> Self { self.gender = Patch::Clear; self }
    pub fn age_min(mut self, v: u32) -> Self { self.age_min = Patch::Set(v); self }
    pub fn clear_age_min(mut self) -> Self { self.age_min = Patch::Clear; self }
    pub fn age_max(mut self, v: u32) -> Self { self.age_max = Patch::Set(v); self }
    pub fn clear_age_max(mut self) -> Self { self.age_max = Patch::Clear; self }

    /// Raw gender select value; empty or unknown text clears the constraint.
    pub fn gender_input(mut self, text: &str) -> Self {
        self.gender = Patch::from_option(text.parse().ok());
        self
    }

    /// Raw age input; empty or unparseable text clears the bound.
    pub fn age_min_input(mut self, text: &str) -> Self {
        self.age_min = Patch::from_option(parse_age_input(text));
        self
    }

    pub fn age_max_input(mut self, text: &str) -> Self {
        self.age_max = Patch::from_option(parse_age_input(text));
        self
    }
}

/// Parse an age bound typed by the user. Anything that is not a non-negative integer is `None`.
pub fn parse_age_input(text: &str) -> Option<u32> {
    text.trim().parse::<u32>().ok()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    FirstName,
    LastName,
    MaidenName,
    Age,
    Gender,
    Phone,
}

impl SortField {
    pub const ALL: [SortField; 6] = [
        SortField::FirstName,
        SortField::LastName,
        SortField::MaidenName,
        SortField::Age,
        SortField::Gender,
        SortField::Phone,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::FirstName => "firstName",
            SortField::LastName => "lastName",
            SortField::MaidenName => "maidenName",
            SortField::Age => "age",
            SortField::Gender => "gender",
            SortField::Phone => "phone",
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for SortField {
    type Err = ParseError;

    /// Accepts the camelCase key (`firstName`) as well as kebab/snake forms (`first-name`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s.trim().chars().filter(|c| *c != '-' && *c != '_').collect();
        SortField::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(&norm))
            .ok_or_else(|| ParseError { what: "sort field", value: s.to_string() })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Active sort column. `direction` only has meaning when `field` is set.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortState {
    pub field: Option<SortField>,
    pub direction: Option<SortDirection>,
}

impl SortState {
    pub fn unsorted() -> Self { Self::default() }

    pub fn by(field: SortField, direction: SortDirection) -> Self {
        Self { field: Some(field), direction: Some(direction) }
    }

    /// Field and direction when both are set.
    pub fn active(&self) -> Option<(SortField, SortDirection)> {
        match (self.field, self.direction) {
            (Some(f), Some(d)) => Some((f, d)),
            _ => None,
        }
    }

    /// Direction shown for the given column header, if it is the sorted one.
    pub fn direction_for(&self, field: SortField) -> Option<SortDirection> {
        self.active().filter(|(f, _)| *f == field).map(|(_, d)| d)
    }
}

/// Requested page. Never authoritative: always re-clamped by pagination.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageState {
    pub current_page: usize,
    pub items_per_page: usize,
}

impl Default for PageState {
    fn default() -> Self { Self { current_page: 1, items_per_page: ITEMS_PER_PAGE } }
}

/// Filtered, sorted and paginated projection of the record collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DerivedView {
    pub total_filtered: usize,
    pub total_pages: usize,
    pub valid_page: usize,
    pub page_size: usize,
    pub page_items: Vec<UserRecord>,
}

impl Default for DerivedView {
    fn default() -> Self {
        Self { total_filtered: 0, total_pages: 0, valid_page: 1, page_size: ITEMS_PER_PAGE, page_items: Vec::new() }
    }
}

impl DerivedView {
    pub fn is_empty(&self) -> bool { self.page_items.is_empty() }

    /// 1-based inclusive range of rows shown on the current page.
    pub fn item_range(&self) -> Option<(usize, usize)> {
        if self.page_items.is_empty() {
            return None;
        }
        let start = (self.valid_page - 1) * self.page_size + 1;
        Some((start, start + self.page_items.len() - 1))
    }

    pub fn has_prev(&self) -> bool { self.valid_page > 1 }
    pub fn has_next(&self) -> bool { self.valid_page < self.total_pages }
}

pub mod prelude {
    pub use super::{
        DerivedView, FilterPatch, FilterState, Gender, PageState, Patch, RecordId, SortDirection, SortField,
        SortState, UserRecord, ITEMS_PER_PAGE,
    };
}
