pub mod aggregate;
pub mod ranker;

pub use aggregate::{
    best_per_entity, challenge_summary, entity_stats, summarize, ChallengeSummary, EntityStats,
    MeasurementStats, Trend,
};
pub use ranker::{compare_names, rank, RankOrder, RankedEntry};
