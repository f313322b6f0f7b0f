use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel meaning "no filter selected"
pub const ANY: &str = "all";

/// Resolved filter predicates, AND-combined. `None` / empty means "match
/// everything" for that predicate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    pub category: Option<String>,
    pub group: Option<String>,
    pub search: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub entities: Vec<String>,
}

impl Criteria {
    pub fn is_empty(&self) -> bool {
        active(&self.category).is_none()
            && active(&self.group).is_none()
            && active(&self.search).is_none()
            && self.from.is_none()
            && self.to.is_none()
            && self.entities.is_empty()
    }
}

/// The value of a criterion if it actually filters anything
pub fn active(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(ANY))
}

/// Criteria as written in a board definition or passed on the command line.
///
/// Example YAML:
/// ```yaml
/// criteria:
///   category: bier
///   group: Netto
///   since: 4w
///   to: 2024-06-30
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CriteriaConfig {
    pub category: Option<String>,
    pub group: Option<String>,
    pub search: Option<String>,
    /// Inclusive lower bound: RFC 3339 timestamp or YYYY-MM-DD (start of day)
    pub from: Option<String>,
    /// Inclusive upper bound: RFC 3339 timestamp or YYYY-MM-DD (end of day)
    pub to: Option<String>,
    /// Relative lower bound, e.g. "7d" or "2w"
    pub since: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<String>,
}

impl CriteriaConfig {
    /// Overlay `other` on top of `self`; set fields in `other` win
    pub fn merge(self, other: CriteriaConfig) -> CriteriaConfig {
        CriteriaConfig {
            category: other.category.or(self.category),
            group: other.group.or(self.group),
            search: other.search.or(self.search),
            from: other.from.or(self.from),
            to: other.to.or(self.to),
            since: other.since.or(self.since),
            entities: if other.entities.is_empty() {
                self.entities
            } else {
                other.entities
            },
        }
    }

    /// Resolve date strings and the relative `since` window against `now`.
    /// When both `from` and `since` are set the later bound applies.
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<Criteria> {
        let mut from = self
            .from
            .as_deref()
            .map(|s| parse_bound(s, Bound::Start))
            .transpose()
            .context("invalid 'from' date")?;
        let to = self
            .to
            .as_deref()
            .map(|s| parse_bound(s, Bound::End))
            .transpose()
            .context("invalid 'to' date")?;

        if let Some(since) = active(&self.since) {
            let window = humantime::parse_duration(since)
                .with_context(|| format!("invalid 'since' duration '{}'", since))?;
            let window = TimeDelta::from_std(window)
                .with_context(|| format!("'since' duration '{}' is too large", since))?;
            let lower = now - window;
            from = Some(from.map_or(lower, |f| f.max(lower)));
        }

        Ok(Criteria {
            category: active(&self.category).map(str::to_string),
            group: active(&self.group).map(str::to_string),
            search: active(&self.search).map(str::to_string),
            from,
            to,
            entities: self
                .entities
                .iter()
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect(),
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Start,
    End,
}

fn parse_bound(s: &str, bound: Bound) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Ok(at.with_timezone(&Utc));
    }
    let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") else {
        bail!("expected YYYY-MM-DD or an RFC 3339 timestamp, got '{}'", s)
    };
    let time = match bound {
        Bound::Start => NaiveTime::MIN,
        Bound::End => NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)
            .unwrap_or(NaiveTime::MIN),
    };
    Ok(date.and_time(time).and_utc())
}
