use serde::{Deserialize, Serialize};

/// Category that marks an exercise as strength training
pub const STRENGTH_CATEGORY: &str = "maximalkraft";

/// Scoring formula for a board.
///
/// Each variant names the record inputs it reads; every field has a default
/// matching the backends this tool was built against, so most boards only
/// need the `kind`.
///
/// Example YAML:
/// ```yaml
/// formula: { kind: cost-efficiency }
/// formula: { kind: progress, remaining: total_remaining, default_target: 500 }
/// formula: { kind: strength, weight: kilograms, reps: repetitions, fallback: seconds }
/// formula: { kind: primary, field: seconds }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Formula {
    CostEfficiency(CostEfficiency),
    Progress(Progress),
    Strength(Strength),
    Primary(Primary),
}

/// Formula families. `Strength` and `Primary` are both best-effort scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaFamily {
    CostEfficiency,
    Progress,
    BestEffort,
}

impl Formula {
    pub fn family(&self) -> FormulaFamily {
        match self {
            Formula::CostEfficiency(_) => FormulaFamily::CostEfficiency,
            Formula::Progress(_) => FormulaFamily::Progress,
            Formula::Strength(_) | Formula::Primary(_) => FormulaFamily::BestEffort,
        }
    }

    /// Short human description, e.g. "volume * alcohol_content% / price"
    pub fn describe(&self) -> String {
        match self {
            Formula::CostEfficiency(f) => {
                format!("{} * {}% / {}", f.volume, f.concentration, f.price)
            }
            Formula::Progress(f) => format!(
                "100 * ({} - {}) / {} (default {})",
                f.target, f.remaining, f.target, f.default_target
            ),
            Formula::Strength(f) => match &f.fallback {
                Some(fallback) => format!("{} * (1 + {}/30), else {}", f.weight, f.reps, fallback),
                None => format!("{} * (1 + {}/30)", f.weight, f.reps),
            },
            Formula::Primary(f) => f.field.clone(),
        }
    }
}

/// Value per currency unit: `volume * concentration / 100 / price`
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CostEfficiency {
    pub volume: String,
    /// Concentration in percent (e.g. alcohol content)
    pub concentration: String,
    pub price: String,
}

impl Default for CostEfficiency {
    fn default() -> Self {
        Self {
            volume: "volume".to_string(),
            concentration: "alcohol_content".to_string(),
            price: "price".to_string(),
        }
    }
}

/// Completion percentage towards a target count
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Progress {
    pub remaining: String,
    /// Per-record target input; records without it use `default_target`
    pub target: String,
    pub default_target: f64,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            remaining: "total_remaining".to_string(),
            target: "target".to_string(),
            default_target: 500.0,
        }
    }
}

/// Estimated one-rep max: `weight * (1 + reps/30)`
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Strength {
    pub weight: String,
    pub reps: String,
    /// Primary measured value used when a record carries no weight
    pub fallback: Option<String>,
}

impl Default for Strength {
    fn default() -> Self {
        Self {
            weight: "kilograms".to_string(),
            reps: "repetitions".to_string(),
            fallback: None,
        }
    }
}

/// A single designated measured value taken as-is
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Primary {
    pub field: String,
}

/// Exercise definition from which a best-effort formula is derived.
///
/// The first measurement type is the primary one.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Exercise {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub measurement_types: Vec<String>,
}

impl Exercise {
    pub fn is_strength(&self) -> bool {
        self.categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(STRENGTH_CATEGORY))
    }

    pub fn primary_type(&self) -> Option<&str> {
        self.measurement_types.first().map(String::as_str)
    }

    /// Resolve the scoring formula once for this exercise
    pub fn formula(&self) -> Formula {
        if self.is_strength() {
            let defaults = Strength::default();
            Formula::Strength(Strength {
                fallback: self.primary_type().map(str::to_string),
                ..defaults
            })
        } else {
            Formula::Primary(Primary {
                field: self.primary_type().unwrap_or_default().to_string(),
            })
        }
    }
}
