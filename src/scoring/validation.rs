use super::config::{Exercise, Formula};

/// Validate a formula definition. `path` prefixes each message, e.g.
/// "boards[0].formula". Returns every problem found, not just the first.
pub fn validate_formula(formula: &Formula, path: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let mut require = |field: &str, value: &str| {
        if value.trim().is_empty() {
            errors.push(format!("{}.{}: input name must not be empty", path, field));
        }
    };

    match formula {
        Formula::CostEfficiency(f) => {
            require("volume", &f.volume);
            require("concentration", &f.concentration);
            require("price", &f.price);
        }
        Formula::Progress(f) => {
            require("remaining", &f.remaining);
            require("target", &f.target);
            if !(f.default_target > 0.0 && f.default_target.is_finite()) {
                errors.push(format!(
                    "{}.default_target: must be positive, got {}",
                    path, f.default_target
                ));
            }
        }
        Formula::Strength(f) => {
            require("weight", &f.weight);
            require("reps", &f.reps);
            if let Some(ref fallback) = f.fallback {
                require("fallback", fallback);
            }
        }
        Formula::Primary(f) => require("field", &f.field),
    }

    errors
}

/// Validate an exercise definition used in place of an explicit formula
pub fn validate_exercise(exercise: &Exercise, path: &str) -> Vec<String> {
    let mut errors = Vec::new();

    if exercise.measurement_types.is_empty() {
        errors.push(format!(
            "{}.measurement_types: at least one measurement type is required",
            path
        ));
    }
    for (i, mt) in exercise.measurement_types.iter().enumerate() {
        if mt.trim().is_empty() {
            errors.push(format!("{}.measurement_types[{}]: must not be empty", path, i));
        }
    }

    errors
}
