pub mod chart;
pub mod config;
pub mod filter;
pub mod output;
pub mod pipeline;
pub mod ranking;
pub mod records;
pub mod scoring;

pub use chart::{compute_chart_series, latest_values, ChartPoint, ChartSeries, LatestValue};
pub use filter::{filter_records, Criteria};
pub use pipeline::{compute_leaderboard, is_new_top_entry};
pub use ranking::{best_per_entity, challenge_summary, rank, summarize, RankOrder, RankedEntry};
pub use records::{Record, RecordSource};
pub use scoring::{score, Formula};
