use crate::ranking::compare_names;
use crate::records::Record;
use crate::scoring::{evaluate, Formula};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Label of the single series produced when not grouping by entity
pub const ALL_SERIES: &str = "all";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub at: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub label: String,
    /// Entity key the series belongs to
    pub key: String,
    pub points: Vec<ChartPoint>,
}

/// Time series of formula values.
///
/// Records without a timestamp or without a computable value are left out;
/// gaps are not interpolated. Points are in ascending time order and series
/// are ordered by label.
pub fn compute_chart_series(
    records: &[Record],
    formula: &Formula,
    group_by_entity: bool,
) -> Vec<ChartSeries> {
    let mut series: BTreeMap<&str, ChartSeries> = BTreeMap::new();

    for record in records {
        let (Some(at), Some(value)) = (record.recorded_at, evaluate(record, formula)) else {
            continue;
        };
        let (key, label) = if group_by_entity {
            (record.entity_key(), record.name.as_str())
        } else {
            (ALL_SERIES, ALL_SERIES)
        };
        series
            .entry(key)
            .or_insert_with(|| ChartSeries {
                label: label.to_string(),
                key: key.to_string(),
                points: Vec::new(),
            })
            .points
            .push(ChartPoint { at, value });
    }

    let mut series: Vec<ChartSeries> = series.into_values().collect();
    for s in &mut series {
        // Stable: equal timestamps keep input order
        s.points.sort_by_key(|p| p.at);
    }
    series.sort_by(|a, b| compare_names(&a.label, &b.label).then_with(|| a.key.cmp(&b.key)));
    series
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestValue {
    pub label: String,
    pub value: f64,
    pub at: DateTime<Utc>,
}

/// Each entity's most recent value, for a side-by-side comparison
pub fn latest_values(records: &[Record], formula: &Formula) -> Vec<LatestValue> {
    compute_chart_series(records, formula, true)
        .into_iter()
        .filter_map(|s| {
            let last = s.points.last()?;
            Some(LatestValue {
                label: s.label,
                value: last.value,
                at: last.at,
            })
        })
        .collect()
}
