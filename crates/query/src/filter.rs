//! Filter engine: AND-composed predicates over the full collection.

use usertable_core::{FilterState, Gender, UserRecord};

/// Criteria prepared once per pass so the search text is lowercased a single time.
#[derive(Debug, Clone)]
pub struct CompiledFilter<'a> {
    search_raw: Option<&'a str>,
    search_lower: Option<String>,
    gender: Option<Gender>,
    age_min: Option<u32>,
    age_max: Option<u32>,
}

impl<'a> CompiledFilter<'a> {
    pub fn new(criteria: &'a FilterState) -> Self {
        let search_raw = criteria.search.as_deref().filter(|s| !s.is_empty());
        Self {
            search_raw,
            search_lower: search_raw.map(str::to_lowercase),
            gender: criteria.gender,
            age_min: criteria.age_min,
            age_max: criteria.age_max,
        }
    }

    /// True when no criterion is present, i.e. filtering is the identity.
    pub fn is_identity(&self) -> bool {
        self.search_raw.is_none() && self.gender.is_none() && self.age_min.is_none() && self.age_max.is_none()
    }

    pub fn matches(&self, rec: &UserRecord) -> bool {
        if let (Some(raw), Some(lower)) = (self.search_raw, self.search_lower.as_deref()) {
            if !search_matches(rec, raw, lower) {
                return false;
            }
        }
        if let Some(g) = self.gender {
            if rec.gender != g {
                return false;
            }
        }
        if let Some(min) = self.age_min {
            if rec.age < min {
                return false;
            }
        }
        if let Some(max) = self.age_max {
            if rec.age > max {
                return false;
            }
        }
        true
    }
}

// Names and email match case-insensitively; phone matches the raw query.
fn search_matches(rec: &UserRecord, raw: &str, lower: &str) -> bool {
    rec.first_name.to_lowercase().contains(lower)
        || rec.last_name.to_lowercase().contains(lower)
        || rec.maiden_name().to_lowercase().contains(lower)
        || rec.email.to_lowercase().contains(lower)
        || rec.phone.contains(raw)
}

/// Records satisfying every present criterion, in their original order.
pub fn filter_records<'r>(records: &'r [UserRecord], criteria: &FilterState) -> Vec<&'r UserRecord> {
    let compiled = CompiledFilter::new(criteria);
    if compiled.is_identity() {
        return records.iter().collect();
    }
    records.iter().filter(|r| compiled.matches(r)).collect()
}
