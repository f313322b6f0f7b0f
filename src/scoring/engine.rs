use super::config::{CostEfficiency, Formula, Primary, Progress, Strength};
use crate::records::Record;
use serde::Serialize;

/// Progress towards a target, derived by the progress formula
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressDetail {
    pub target: f64,
    pub done: f64,
    pub remaining: f64,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub record: Record,
    pub score: f64,
    /// True when a required input was missing or degenerate and the score is
    /// the 0 sentinel
    pub incomplete: bool,
    pub progress: Option<ProgressDetail>,
}

/// Compute the formula's value for a record.
///
/// Returns `None` when a required input is missing, unparseable or
/// degenerate (zero or negative where the formula needs a positive value).
pub fn evaluate(record: &Record, formula: &Formula) -> Option<f64> {
    let value = match formula {
        Formula::CostEfficiency(f) => cost_efficiency(record, f),
        Formula::Progress(f) => progress_detail(record, f).map(|d| percentage(&d)),
        Formula::Strength(f) => strength(record, f),
        Formula::Primary(f) => primary(record, f),
    }?;
    value.is_finite().then_some(value)
}

/// Score a record; degenerate inputs yield the sentinel 0, never NaN or
/// infinity.
pub fn score(record: &Record, formula: &Formula) -> f64 {
    evaluate(record, formula).unwrap_or(0.0)
}

pub fn score_record(record: Record, formula: &Formula) -> ScoredRecord {
    let value = evaluate(&record, formula);
    let progress = match formula {
        Formula::Progress(f) => progress_detail(&record, f),
        _ => None,
    };
    ScoredRecord {
        record,
        score: value.unwrap_or(0.0),
        incomplete: value.is_none(),
        progress,
    }
}

pub fn score_all(records: &[Record], formula: &Formula) -> Vec<ScoredRecord> {
    records
        .iter()
        .cloned()
        .map(|record| score_record(record, formula))
        .collect()
}

fn positive(record: &Record, key: &str) -> Option<f64> {
    record.input(key).filter(|v| *v > 0.0)
}

fn non_negative(record: &Record, key: &str) -> Option<f64> {
    record.input(key).filter(|v| *v >= 0.0)
}

fn cost_efficiency(record: &Record, f: &CostEfficiency) -> Option<f64> {
    let volume = positive(record, &f.volume)?;
    let concentration = positive(record, &f.concentration)?;
    let price = positive(record, &f.price)?;
    Some(volume * (concentration / 100.0) / price)
}

/// Remaining is clamped into `[0, target]`; a target that is not positive
/// has no defined progress.
pub fn progress_detail(record: &Record, f: &Progress) -> Option<ProgressDetail> {
    let target = record.input(&f.target).unwrap_or(f.default_target);
    if target <= 0.0 || !target.is_finite() {
        return None;
    }
    let remaining = record.input(&f.remaining)?.clamp(0.0, target);
    Some(ProgressDetail {
        target,
        done: target - remaining,
        remaining,
        completed: remaining == 0.0,
    })
}

fn percentage(detail: &ProgressDetail) -> f64 {
    (100.0 * detail.done / detail.target).clamp(0.0, 100.0)
}

fn strength(record: &Record, f: &Strength) -> Option<f64> {
    match non_negative(record, &f.weight) {
        Some(weight) => match non_negative(record, &f.reps) {
            Some(reps) if reps > 0.0 => Some(weight * (1.0 + reps / 30.0)),
            _ => Some(weight),
        },
        None => f
            .fallback
            .as_deref()
            .and_then(|field| non_negative(record, field)),
    }
}

fn primary(record: &Record, f: &Primary) -> Option<f64> {
    non_negative(record, &f.field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::config::Exercise;

    fn beverage(volume: f64, price: f64, alcohol: f64) -> Record {
        Record::new("1", "Pils")
            .with_input("volume", volume)
            .with_input("price", price)
            .with_input("alcohol_content", alcohol)
    }

    fn cost() -> Formula {
        Formula::CostEfficiency(CostEfficiency::default())
    }

    fn progress() -> Formula {
        Formula::Progress(Progress::default())
    }

    fn strength_formula() -> Formula {
        Formula::Strength(Strength {
            fallback: Some("seconds".to_string()),
            ..Strength::default()
        })
    }

    #[test]
    fn test_cost_efficiency_example() {
        let result = score(&beverage(0.5, 1.0, 5.0), &cost());
        assert!((result - 0.025).abs() < 1e-12);
    }

    #[test]
    fn test_cost_efficiency_degenerate_inputs_score_zero() {
        for (volume, price, alcohol) in [
            (0.0, 1.0, 5.0),
            (0.5, 0.0, 5.0),
            (0.5, 1.0, 0.0),
            (-1.0, 1.0, 5.0),
            (0.5, -2.0, 5.0),
            (0.5, 1.0, -4.0),
        ] {
            let record = beverage(volume, price, alcohol);
            assert_eq!(score(&record, &cost()), 0.0);
            assert!(score_record(record, &cost()).incomplete);
        }
    }

    #[test]
    fn test_cost_efficiency_missing_input_scores_zero() {
        let record = Record::new("1", "Pils")
            .with_input("volume", 0.5)
            .with_input("price", "free");
        assert_eq!(score(&record, &cost()), 0.0);
    }

    #[test]
    fn test_null_input_scores_zero() {
        let json = r#"{"id": 1, "name": "Pils", "inputs": {"price": null, "volume": 0.5, "alcohol_content": 4.9}}"#;
        let record: Record = serde_json::from_str(json).unwrap();
        let scored = score_record(record, &cost());
        assert_eq!(scored.score, 0.0);
        assert!(scored.incomplete);
    }

    #[test]
    fn test_progress_completed() {
        let record = Record::new("1", "Anna")
            .with_input("target", 500.0)
            .with_input("total_remaining", 0.0);
        let scored = score_record(record, &progress());
        assert_eq!(scored.score, 100.0);
        let detail = scored.progress.unwrap();
        assert_eq!(detail.done, 500.0);
        assert!(detail.completed);
        assert!(!scored.incomplete);
    }

    #[test]
    fn test_progress_uses_default_target() {
        let record = Record::new("1", "Ben").with_input("total_remaining", 125.0);
        let scored = score_record(record, &progress());
        assert_eq!(scored.score, 75.0);
        assert_eq!(scored.progress.unwrap().target, 500.0);
    }

    #[test]
    fn test_progress_per_record_target() {
        // One participant carries a doubled target
        let record = Record::new("1", "Andi")
            .with_input("target", 1000.0)
            .with_input("total_remaining", 750.0);
        assert_eq!(score(&record, &progress()), 25.0);
    }

    #[test]
    fn test_progress_clamped() {
        let over = Record::new("1", "A").with_input("total_remaining", 900.0);
        assert_eq!(score(&over, &progress()), 0.0);
        let over_detail = score_record(over, &progress()).progress.unwrap();
        assert_eq!(over_detail.remaining, 500.0);
        assert_eq!(over_detail.done, 0.0);

        let negative = Record::new("2", "B").with_input("total_remaining", -20.0);
        assert_eq!(score(&negative, &progress()), 100.0);
    }

    #[test]
    fn test_progress_zero_target_scores_zero() {
        let record = Record::new("1", "A")
            .with_input("target", 0.0)
            .with_input("total_remaining", 0.0);
        let scored = score_record(record, &progress());
        assert_eq!(scored.score, 0.0);
        assert!(scored.incomplete);
        assert!(scored.progress.is_none());
    }

    #[test]
    fn test_strength_epley() {
        let record = Record::new("1", "Bench")
            .with_input("kilograms", 100.0)
            .with_input("repetitions", 5.0);
        let result = score(&record, &strength_formula());
        assert!((result - 116.666_666_666).abs() < 1e-6);
    }

    #[test]
    fn test_strength_without_reps_is_weight() {
        let record = Record::new("1", "Bench").with_input("kilograms", 80.0);
        assert_eq!(score(&record, &strength_formula()), 80.0);

        let zero_reps = Record::new("2", "Bench")
            .with_input("kilograms", 80.0)
            .with_input("repetitions", 0.0);
        assert_eq!(score(&zero_reps, &strength_formula()), 80.0);
    }

    #[test]
    fn test_strength_falls_back_to_primary() {
        let record = Record::new("1", "Sprint").with_input("seconds", 4.2);
        assert_eq!(evaluate(&record, &strength_formula()), Some(4.2));
    }

    #[test]
    fn test_strength_nothing_measured() {
        let record = Record::new("1", "Empty");
        assert_eq!(evaluate(&record, &strength_formula()), None);
        assert_eq!(score(&record, &strength_formula()), 0.0);
    }

    #[test]
    fn test_primary_value() {
        let formula = Exercise {
            categories: vec!["ausdauer".to_string()],
            measurement_types: vec!["meters".to_string()],
        }
        .formula();
        let record = Record::new("1", "Run").with_input("meters", "2400");
        assert_eq!(score(&record, &formula), 2400.0);
    }

    #[test]
    fn test_score_all_preserves_order() {
        let records = vec![beverage(0.5, 1.0, 5.0), beverage(1.0, 1.0, 5.0)];
        let scored = score_all(&records, &cost());
        assert_eq!(scored.len(), 2);
        assert!(scored[0].score < scored[1].score);
        assert!(scored.iter().all(|s| s.progress.is_none()));
    }
}
