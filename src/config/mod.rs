mod schema;

pub use schema::{BoardConfig, Config, DisplayConfig};

use crate::scoring::{validate_exercise, validate_formula};
use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path (~/.config/leaderboard/)
pub fn get_config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("leaderboard"))
}

/// Get the default config file path (~/.config/leaderboard/config.yaml)
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.yaml"))
}

/// Load configuration from a YAML file
///
/// # Arguments
///
/// * `path` - Optional path to config file. If None, uses default path (~/.config/leaderboard/config.yaml)
///
/// Relative file sources are resolved against the directory holding the
/// config file.
///
/// # Errors
///
/// Returns an error if:
/// - The config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(path) => path,
        None => get_config_path()?,
    };

    if !config_path.exists() {
        anyhow::bail!(
            "Config file not found at {}. Create ~/.config/leaderboard/config.yaml",
            config_path.display()
        );
    }

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    let config = parse_config(&config_content)
        .with_context(|| format!("Failed to parse config: invalid YAML in {}", config_path.display()))?;

    let base_dir = config_path.parent().unwrap_or(Path::new("."));
    Ok(resolve_sources(config, base_dir))
}

pub fn parse_config(content: &str) -> Result<Config> {
    Ok(serde_saphyr::from_str(content)?)
}

fn resolve_sources(mut config: Config, base_dir: &Path) -> Config {
    for board in &mut config.boards {
        board.source = board.source.clone().resolved(base_dir);
    }
    config
}

/// Validate a loaded configuration, collecting every problem found
pub fn validate_config(config: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if config.display.top_label.trim().is_empty() {
        errors.push("display.top_label: must not be empty".to_string());
    }

    let mut seen = HashSet::new();
    for (i, board) in config.boards.iter().enumerate() {
        if !seen.insert(board.name.as_str()) {
            errors.push(format!("boards[{}].name: duplicate board name '{}'", i, board.name));
        }
        errors.extend(validate_board(board, &format!("boards[{}]", i)));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a single board definition. `path` prefixes each message.
pub fn validate_board(board: &BoardConfig, path: &str) -> Vec<String> {
    let mut errors = Vec::new();

    if board.name.trim().is_empty() {
        errors.push(format!("{}.name: must not be empty", path));
    }

    match (&board.formula, &board.exercise) {
        (Some(formula), None) => {
            errors.extend(validate_formula(formula, &format!("{}.formula", path)));
        }
        (None, Some(exercise)) => {
            errors.extend(validate_exercise(exercise, &format!("{}.exercise", path)));
        }
        (Some(_), Some(_)) => {
            errors.push(format!("{}: set either 'formula' or 'exercise', not both", path));
        }
        (None, None) => {
            errors.push(format!("{}: one of 'formula' or 'exercise' is required", path));
        }
    }

    if let Err(e) = board.criteria.resolve(Utc::now()) {
        errors.push(format!("{}.criteria: {:#}", path, e));
    }

    errors
}
