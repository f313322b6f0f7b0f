pub mod config;
pub mod engine;
pub mod validation;

pub use config::*;
pub use engine::{evaluate, progress_detail, score, score_all, score_record, ProgressDetail, ScoredRecord};
pub use validation::{validate_exercise, validate_formula};
