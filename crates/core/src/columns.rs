//! Table columns: stable keys, labels, widths and which ones are sortable.

#![forbid(unsafe_code)]

use crate::{SortDirection, SortField, SortState, UserRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnKey {
    FirstName,
    LastName,
    MaidenName,
    Age,
    Gender,
    Phone,
    Email,
    Country,
    City,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSpec {
    pub key: ColumnKey,
    pub label: &'static str,
    /// Default width in terminal cells.
    pub width: usize,
    pub sortable: bool,
}

impl ColumnSpec {
    /// Sort field driven by clicking this column's header.
    pub fn sort_field(&self) -> Option<SortField> {
        if !self.sortable {
            return None;
        }
        match self.key {
            ColumnKey::FirstName => Some(SortField::FirstName),
            ColumnKey::LastName => Some(SortField::LastName),
            ColumnKey::MaidenName => Some(SortField::MaidenName),
            ColumnKey::Age => Some(SortField::Age),
            ColumnKey::Gender => Some(SortField::Gender),
            ColumnKey::Phone => Some(SortField::Phone),
            ColumnKey::Email | ColumnKey::Country | ColumnKey::City => None,
        }
    }

    /// Header text with an arrow when this column is the active sort.
    pub fn header(&self, sort: &SortState) -> String {
        let arrow = self
            .sort_field()
            .and_then(|f| sort.direction_for(f))
            .map(|d| match d {
                SortDirection::Asc => " ↑",
                SortDirection::Desc => " ↓",
            })
            .unwrap_or("");
        format!("{}{}", self.label, arrow)
    }
}

fn col(key: ColumnKey, label: &'static str, width: usize, sortable: bool) -> ColumnSpec {
    ColumnSpec { key, label, width, sortable }
}

/// Full column set in display order.
pub fn table_columns() -> Vec<ColumnSpec> {
    vec![
        col(ColumnKey::FirstName, "First name", 12, true),
        col(ColumnKey::LastName, "Last name", 12, true),
        col(ColumnKey::MaidenName, "Maiden name", 12, true),
        col(ColumnKey::Age, "Age", 5, true),
        col(ColumnKey::Gender, "Gender", 8, true),
        col(ColumnKey::Phone, "Phone", 18, true),
        col(ColumnKey::Email, "Email", 30, false),
        col(ColumnKey::Country, "Country", 16, false),
        col(ColumnKey::City, "City", 16, false),
    ]
}

fn or_dash(s: &str) -> String {
    if s.is_empty() { "-".to_string() } else { s.to_string() }
}

/// Rendered cell text for a record in the given column.
pub fn display_cell(rec: &UserRecord, key: ColumnKey) -> String {
    match key {
        ColumnKey::FirstName => rec.first_name.clone(),
        ColumnKey::LastName => rec.last_name.clone(),
        ColumnKey::MaidenName => rec.maiden_name().to_string(),
        ColumnKey::Age => rec.age.to_string(),
        ColumnKey::Gender => rec.gender.label().to_string(),
        ColumnKey::Phone => rec.phone.clone(),
        ColumnKey::Email => rec.email.clone(),
        ColumnKey::Country => or_dash(&rec.address.country),
        ColumnKey::City => or_dash(&rec.address.city),
    }
}
