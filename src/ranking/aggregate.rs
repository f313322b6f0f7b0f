use super::ranker::{compare_names, RankOrder};
use crate::scoring::ScoredRecord;
use serde::Serialize;
use std::collections::BTreeMap;

/// Keep each entity's best complete measurement.
///
/// "Best" follows the board order: the lowest value for ascending boards, the
/// highest otherwise. On equal values the earlier measurement wins. Output is
/// in first-seen entity order; rank it afterwards.
pub fn best_per_entity(scored: Vec<ScoredRecord>, order: RankOrder) -> Vec<ScoredRecord> {
    let mut best: Vec<ScoredRecord> = Vec::new();
    let mut index: BTreeMap<String, usize> = BTreeMap::new();

    for candidate in scored.into_iter().filter(|s| !s.incomplete) {
        let key = candidate.record.entity_key().to_string();
        match index.get(&key) {
            None => {
                index.insert(key, best.len());
                best.push(candidate);
            }
            Some(&i) => {
                if beats(&candidate, &best[i], order) {
                    best[i] = candidate;
                }
            }
        }
    }

    best
}

fn beats(candidate: &ScoredRecord, current: &ScoredRecord, order: RankOrder) -> bool {
    if candidate.score == current.score {
        return match (candidate.record.recorded_at, current.record.recorded_at) {
            (Some(c), Some(b)) => c < b,
            (Some(_), None) => true,
            _ => false,
        };
    }
    if order.higher_is_better() {
        candidate.score > current.score
    } else {
        candidate.score < current.score
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Worsening,
    Stable,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Trend::Improving => "improving",
            Trend::Worsening => "worsening",
            Trend::Stable => "stable",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementStats {
    pub average: Option<f64>,
    pub best: Option<f64>,
    pub trend: Option<Trend>,
    pub count: usize,
}

/// Average, best and trend of chronologically ordered values.
///
/// With four or more values the trend compares the mean of the first quarter
/// against the mean of the last quarter; with two or three it compares the
/// first and last value. Fewer than two values have no trend.
pub fn summarize(values: &[f64], order: RankOrder) -> MeasurementStats {
    let count = values.len();
    if count == 0 {
        return MeasurementStats {
            average: None,
            best: None,
            trend: None,
            count: 0,
        };
    }

    let higher_better = order.higher_is_better();
    let best = values.iter().copied().fold(None, |acc: Option<f64>, v| {
        Some(match acc {
            None => v,
            Some(b) if higher_better => b.max(v),
            Some(b) => b.min(v),
        })
    });

    let (first, last) = if count >= 4 {
        let quarter = count / 4;
        (mean(&values[..quarter]), mean(&values[count - quarter..]))
    } else {
        (values[0], values[count - 1])
    };

    let trend = (count >= 2).then(|| {
        if first == last {
            Trend::Stable
        } else if (last > first) == higher_better {
            Trend::Improving
        } else {
            Trend::Worsening
        }
    });

    MeasurementStats {
        average: Some(mean(values)),
        best,
        trend,
        count,
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityStats {
    pub label: String,
    pub stats: MeasurementStats,
}

/// Per-entity statistics over complete measurements, in timestamp order.
/// Entities are ordered by label.
pub fn entity_stats(scored: &[ScoredRecord], order: RankOrder) -> Vec<EntityStats> {
    let mut groups: BTreeMap<&str, (String, Vec<&ScoredRecord>)> = BTreeMap::new();
    for s in scored.iter().filter(|s| !s.incomplete) {
        groups
            .entry(s.record.entity_key())
            .or_insert_with(|| (s.record.name.clone(), Vec::new()))
            .1
            .push(s);
    }

    let mut stats: Vec<EntityStats> = groups
        .into_values()
        .map(|(label, mut entries)| {
            // None sorts before Some; stable sort keeps input order otherwise
            entries.sort_by_key(|s| s.record.recorded_at);
            let values: Vec<f64> = entries.iter().map(|s| s.score).collect();
            EntityStats {
                label,
                stats: summarize(&values, order),
            }
        })
        .collect();

    stats.sort_by(|a, b| compare_names(&a.label, &b.label));
    stats
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChallengeSummary {
    pub participants: usize,
    pub total_done: f64,
    pub total_remaining: f64,
    pub completed: usize,
    pub all_complete: bool,
}

/// Totals across a progress board. Participants without progress detail are
/// counted but contribute nothing to the totals.
pub fn challenge_summary(scored: &[ScoredRecord]) -> ChallengeSummary {
    let details: Vec<_> = scored.iter().filter_map(|s| s.progress).collect();
    let completed = details.iter().filter(|d| d.completed).count();

    ChallengeSummary {
        participants: scored.len(),
        total_done: details.iter().map(|d| d.done).sum(),
        total_remaining: details.iter().map(|d| d.remaining).sum(),
        completed,
        all_complete: !scored.is_empty() && completed == scored.len(),
    }
}
