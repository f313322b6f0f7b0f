pub mod criteria;

pub use criteria::{active, Criteria, CriteriaConfig, ANY};

use crate::records::Record;

// Flat backend rows carry these instead of `tags` / `group`
const CATEGORY_FIELDS: [&str; 2] = ["type", "category"];
const GROUP_FIELDS: [&str; 2] = ["store", "team"];

/// Keep records matching every active criterion, in input order
pub fn filter_records(records: &[Record], criteria: &Criteria) -> Vec<Record> {
    records
        .iter()
        .filter(|record| matches(record, criteria))
        .cloned()
        .collect()
}

/// Whether a single record passes all active criteria
pub fn matches(record: &Record, criteria: &Criteria) -> bool {
    if let Some(category) = active(&criteria.category) {
        if !record.has_tag(category) && !extra_equals(record, &CATEGORY_FIELDS, category) {
            return false;
        }
    }

    if let Some(group) = active(&criteria.group) {
        let own = record
            .group
            .as_deref()
            .is_some_and(|g| g.trim().eq_ignore_ascii_case(group));
        if !own && !extra_equals(record, &GROUP_FIELDS, group) {
            return false;
        }
    }

    if let Some(search) = active(&criteria.search) {
        if !record.name.to_lowercase().contains(&search.to_lowercase()) {
            return false;
        }
    }

    if criteria.from.is_some() || criteria.to.is_some() {
        let Some(at) = record.recorded_at else {
            return false;
        };
        if criteria.from.is_some_and(|from| at < from) || criteria.to.is_some_and(|to| at > to) {
            return false;
        }
    }

    if !criteria.entities.is_empty()
        && !criteria.entities.iter().any(|e| e == record.entity_key())
    {
        return false;
    }

    true
}

fn extra_equals(record: &Record, fields: &[&str], wanted: &str) -> bool {
    fields.iter().any(|field| {
        record
            .extra
            .get(*field)
            .and_then(|v| v.as_str())
            .is_some_and(|v| v.trim().eq_ignore_ascii_case(wanted))
    })
}
