use crate::config::BoardConfig;
use crate::filter::{filter_records, Criteria, CriteriaConfig};
use crate::ranking::{best_per_entity, rank, RankOrder, RankedEntry};
use crate::records::Record;
use crate::scoring::{evaluate, score_all, Formula};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, warn};

/// Filter, score and rank a record snapshot.
///
/// Pure: the same inputs always produce the same entries in the same order.
pub fn compute_leaderboard(
    records: &[Record],
    formula: &Formula,
    order: RankOrder,
    criteria: &Criteria,
) -> Vec<RankedEntry> {
    let filtered = filter_records(records, criteria);
    let scored = score_all(&filtered, formula);
    rank(scored, order)
}

/// A board definition with its formula and criteria resolved
#[derive(Debug, Clone)]
pub struct ResolvedBoard {
    pub name: String,
    pub formula: Formula,
    pub order: RankOrder,
    pub criteria: Criteria,
    pub best_per_entity: bool,
}

impl ResolvedBoard {
    /// Resolve a configured board, layering `overrides` on its default
    /// criteria
    pub fn from_config(
        board: &BoardConfig,
        overrides: CriteriaConfig,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let formula = board
            .resolve_formula()
            .with_context(|| format!("Board '{}' has neither a formula nor an exercise", board.name))?;
        let criteria = board
            .criteria
            .clone()
            .merge(overrides)
            .resolve(now)
            .with_context(|| format!("Invalid criteria for board '{}'", board.name))?;

        Ok(Self {
            name: board.name.clone(),
            order: board.effective_order(&formula),
            formula,
            criteria,
            best_per_entity: board.best_per_entity,
        })
    }

    /// Rank a snapshot for this board. Boards that keep one entry per entity
    /// drop incomplete measurements before ranking.
    pub fn leaderboard(&self, records: &[Record]) -> Vec<RankedEntry> {
        if !self.best_per_entity {
            return compute_leaderboard(records, &self.formula, self.order, &self.criteria);
        }
        let filtered = filter_records(records, &self.criteria);
        let best = best_per_entity(score_all(&filtered, &self.formula), self.order);
        rank(best, self.order)
    }
}

/// Whether `candidate` would take the top spot: its score must be strictly
/// greater than every existing record's. A candidate without a computable
/// score never does.
pub fn is_new_top_entry(candidate: &Record, existing: &[Record], formula: &Formula) -> bool {
    let Some(score) = evaluate(candidate, formula) else {
        return false;
    };
    existing
        .iter()
        .filter(|r| r.id.is_empty() || r.id != candidate.id)
        .filter_map(|r| evaluate(r, formula))
        .all(|other| score > other)
}

/// Load the record snapshots of several boards concurrently.
///
/// Results come back in the order of `boards`. Individual failures are kept
/// per board; the call only fails when every source failed.
pub async fn fetch_boards<'a>(
    boards: &'a [BoardConfig],
) -> Result<Vec<(&'a BoardConfig, Result<Vec<Record>>)>> {
    let mut futures = FuturesUnordered::new();
    for (idx, board) in boards.iter().enumerate() {
        futures.push(async move {
            let result = board.source.list_records().await;
            (idx, result)
        });
    }

    let mut results: Vec<Option<Result<Vec<Record>>>> = boards.iter().map(|_| None).collect();
    let mut any_succeeded = false;

    while let Some((idx, result)) = futures.next().await {
        let board = &boards[idx];
        match &result {
            Ok(records) => {
                debug!(board = %board.name, count = records.len(), "records loaded");
                any_succeeded = true;
            }
            Err(e) => {
                warn!(board = %board.name, source = %board.source.describe(), "load failed: {:#}", e);
            }
        }
        results[idx] = Some(result);
    }

    if !any_succeeded && !boards.is_empty() {
        anyhow::bail!("All record sources failed. Check your network connection and record files.");
    }

    Ok(boards
        .iter()
        .zip(results)
        .filter_map(|(board, result)| result.map(|r| (board, r)))
        .collect())
}
