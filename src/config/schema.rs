use crate::filter::CriteriaConfig;
use crate::ranking::RankOrder;
use crate::records::RecordSource;
use crate::scoring::{Exercise, Formula};
use serde::{Deserialize, Serialize};

// Measurement types where a smaller value is the better performance.
// Only times: distances (meters, centimeters) rank and summarize as
// higher-is-better on every board, including their `best` in stats.
// Set `order: ascending` on a board to change that.
const LOWER_IS_BETTER: [&str; 2] = ["seconds", "sekunden"];

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub boards: Vec<BoardConfig>,
    #[serde(default)]
    pub display: DisplayConfig,
}

impl Config {
    pub fn board(&self, name: &str) -> Option<&BoardConfig> {
        self.boards.iter().find(|b| b.name == name)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BoardConfig {
    pub name: String,
    pub source: RecordSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<Formula>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise: Option<Exercise>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<RankOrder>,
    #[serde(default)]
    pub criteria: CriteriaConfig,
    /// Rank only each entity's best measurement
    #[serde(default)]
    pub best_per_entity: bool,
}

impl BoardConfig {
    /// The board's formula: the explicit one, or the one derived from its
    /// exercise. `None` only for a board that defines neither, which
    /// validation rejects.
    pub fn resolve_formula(&self) -> Option<Formula> {
        match (&self.formula, &self.exercise) {
            (Some(formula), _) => Some(formula.clone()),
            (None, Some(exercise)) => Some(exercise.formula()),
            (None, None) => None,
        }
    }

    /// Explicit order, otherwise one suited to the formula
    pub fn effective_order(&self, formula: &Formula) -> RankOrder {
        if let Some(order) = self.order {
            return order;
        }
        match formula {
            Formula::Progress(_) => RankOrder::Progress,
            Formula::Primary(p)
                if LOWER_IS_BETTER
                    .iter()
                    .any(|t| p.field.eq_ignore_ascii_case(t)) =>
            {
                RankOrder::Ascending
            }
            _ => RankOrder::Descending,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    /// Label shown next to the rank-1 entry
    pub top_label: String,
    /// Label shown next to completed progress entries
    pub done_label: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            top_label: "TOP".to_string(),
            done_label: "done".to_string(),
        }
    }
}
