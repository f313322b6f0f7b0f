use std::io::IsTerminal;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde::Serialize;
use terminal_size::{Width, terminal_size};

use crate::chart::{ChartSeries, LatestValue};
use crate::config::DisplayConfig;
use crate::ranking::{ChallengeSummary, EntityStats, RankedEntry};
use crate::scoring::{Formula, FormulaFamily, ProgressDetail};

/// How a score is shown. Derived from the formula family, never guessed
/// from the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Score is a completion percentage, one decimal
    Percentage,
    /// Score as computed, three decimals
    Raw,
}

impl DisplayMode {
    pub fn for_formula(formula: &Formula) -> Self {
        match formula.family() {
            FormulaFamily::Progress => DisplayMode::Percentage,
            FormulaFamily::CostEfficiency | FormulaFamily::BestEffort => DisplayMode::Raw,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DisplayOptions {
    pub mode: DisplayMode,
    pub top_label: String,
    pub done_label: String,
}

impl DisplayOptions {
    pub fn new(formula: &Formula, display: &DisplayConfig) -> Self {
        Self {
            mode: DisplayMode::for_formula(formula),
            top_label: display.top_label.clone(),
            done_label: display.done_label.clone(),
        }
    }
}

/// One presentation row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    pub rank: usize,
    pub id: String,
    pub name: String,
    pub value: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    /// "done/target" for progress boards
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub is_top_entry: bool,
    pub incomplete: bool,
}

/// Map ranked entries to presentation rows, keeping rank and order
pub fn format_entries(entries: &[RankedEntry], options: &DisplayOptions) -> Vec<ViewModel> {
    entries
        .iter()
        .map(|ranked| {
            let scored = &ranked.entry;
            let completed = scored.progress.is_some_and(|p| p.completed);
            let label = if ranked.is_top_entry {
                Some(options.top_label.clone())
            } else if completed {
                Some(options.done_label.clone())
            } else {
                None
            };

            let (percentage, progress) = match options.mode {
                DisplayMode::Percentage => (
                    Some(round_to(scored.score, 1)),
                    scored.progress.as_ref().map(format_progress),
                ),
                DisplayMode::Raw => (None, None),
            };

            ViewModel {
                rank: ranked.rank,
                id: scored.record.id.clone(),
                name: scored.record.name.clone(),
                value: format_value(scored.score, options.mode),
                score: scored.score,
                percentage,
                progress,
                label,
                is_top_entry: ranked.is_top_entry,
                incomplete: scored.incomplete,
            }
        })
        .collect()
}

/// "42.5%" in percentage mode, "0.025" in raw mode
pub fn format_value(score: f64, mode: DisplayMode) -> String {
    match mode {
        DisplayMode::Percentage => format!("{:.1}%", round_to(score, 1)),
        DisplayMode::Raw => format!("{:.3}", round_to(score, 3)),
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn format_progress(detail: &ProgressDetail) -> String {
    format!("{}/{}", format_amount(detail.done), format_amount(detail.target))
}

/// Whole amounts without decimals, others with one
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{:.0}", amount)
    } else {
        format!("{:.1}", amount)
    }
}

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate name to fit available width, accounting for Unicode
fn truncate_name(name: &str, max_width: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= max_width {
        name.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

fn pad_right(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(width - len))
    }
}

/// Format rows as an aligned table: Rank, Value, Name, Progress, Label
/// No headers. Incomplete scores are marked with an asterisk.
pub fn format_table(rows: &[ViewModel], use_colors: bool) -> String {
    format_table_with_width(rows, use_colors, get_terminal_width())
}

fn format_table_with_width(rows: &[ViewModel], use_colors: bool, term_width: Option<usize>) -> String {
    if rows.is_empty() {
        return "No entries found.".to_string();
    }

    let separator = "  ";
    let rank_width = rows.iter().map(|r| r.rank.to_string().len()).max().unwrap_or(1).max(2) + 1;
    let value_width = rows.iter().map(|r| display_value(r).len()).max().unwrap_or(0);
    let progress_width = rows
        .iter()
        .filter_map(|r| r.progress.as_ref().map(|p| p.len()))
        .max()
        .unwrap_or(0);
    let label_width = rows
        .iter()
        .filter_map(|r| r.label.as_ref().map(|l| l.chars().count()))
        .max()
        .unwrap_or(0);
    let name_width = rows.iter().map(|r| r.name.chars().count()).max().unwrap_or(0);

    let mut fixed_width = rank_width + 1 + value_width + separator.len();
    if progress_width > 0 {
        fixed_width += separator.len() + progress_width;
    }
    if label_width > 0 {
        fixed_width += separator.len() + label_width;
    }

    let name_width = match term_width {
        Some(width) if width > fixed_width + 10 => name_width.min(width - fixed_width),
        // Very narrow terminal, show truncated
        Some(_) => name_width.min(20),
        // No terminal (pipe), don't truncate
        None => name_width,
    };

    rows.iter()
        .map(|row| {
            let rank_str = format!("{:>width$}", format!("{}.", row.rank), width = rank_width);
            let value_str = format!("{:>width$}", display_value(row), width = value_width);
            let name = pad_right(&truncate_name(&row.name, name_width), name_width);

            let mut line = if use_colors {
                format!("{} {}{}{}", rank_str.dimmed(), value_str.bold(), separator, name)
            } else {
                format!("{} {}{}{}", rank_str, value_str, separator, name)
            };

            if progress_width > 0 {
                let progress = format!(
                    "{:>width$}",
                    row.progress.as_deref().unwrap_or(""),
                    width = progress_width
                );
                line.push_str(separator);
                if use_colors {
                    line.push_str(&progress.cyan().to_string());
                } else {
                    line.push_str(&progress);
                }
            }

            if let Some(label) = &row.label {
                line.push_str(separator);
                if use_colors && row.is_top_entry {
                    line.push_str(&label.green().bold().to_string());
                } else if use_colors {
                    line.push_str(&label.dimmed().to_string());
                } else {
                    line.push_str(label);
                }
            }

            line.trim_end().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn display_value(row: &ViewModel) -> String {
    if row.incomplete {
        format!("{}*", row.value)
    } else {
        row.value.clone()
    }
}

/// Format rows as tab-separated values for scripting
/// Columns: rank, value, name, id, progress, label (no headers, no colors)
pub fn format_tsv(rows: &[ViewModel]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    rows.iter()
        .map(|row| {
            format!(
                "{}\t{}\t{}\t{}\t{}\t{}",
                row.rank,
                row.value,
                row.name,
                row.id,
                row.progress.as_deref().unwrap_or(""),
                row.label.as_deref().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize output as JSON")
}

/// Chart series as TSV: label, RFC 3339 timestamp, value
pub fn format_series_tsv(series: &[ChartSeries], mode: DisplayMode) -> String {
    series
        .iter()
        .flat_map(|s| {
            s.points.iter().map(move |p| {
                format!("{}\t{}\t{}", s.label, p.at.to_rfc3339(), format_value(p.value, mode))
            })
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Latest value per entity as TSV: label, value, RFC 3339 timestamp
pub fn format_latest_tsv(latest: &[LatestValue], mode: DisplayMode) -> String {
    latest
        .iter()
        .map(|l| format!("{}\t{}\t{}", l.label, format_value(l.value, mode), l.at.to_rfc3339()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line per entity: label, average, best, trend, count
pub fn format_entity_stats(stats: &[EntityStats], mode: DisplayMode, use_colors: bool) -> String {
    if stats.is_empty() {
        return "No measurements found.".to_string();
    }

    let label_width = stats.iter().map(|s| s.label.chars().count()).max().unwrap_or(0);
    let dash = || "-".to_string();

    stats
        .iter()
        .map(|entry| {
            let s = &entry.stats;
            let label = pad_right(&entry.label, label_width);
            let average = s.average.map(|v| format_value(v, mode)).unwrap_or_else(dash);
            let best = s.best.map(|v| format_value(v, mode)).unwrap_or_else(dash);
            let trend = s.trend.map(|t| t.to_string()).unwrap_or_else(dash);
            if use_colors {
                format!(
                    "{}  avg {}  best {}  {}  ({})",
                    label.bold(),
                    average,
                    best.green(),
                    trend.cyan(),
                    s.count
                )
            } else {
                format!("{}  avg {}  best {}  {}  ({})", label, average, best, trend, s.count)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_challenge(summary: &ChallengeSummary, use_colors: bool) -> String {
    let status = if summary.all_complete {
        "Challenge complete!"
    } else {
        "Challenge in progress"
    };
    let status = if use_colors && summary.all_complete {
        status.green().bold().to_string()
    } else {
        status.to_string()
    };

    format!(
        "{}\n  Participants: {}\n  Completed: {}/{}\n  Done: {}\n  Remaining: {}",
        status,
        summary.participants,
        summary.completed,
        summary.participants,
        format_amount(summary.total_done),
        format_amount(summary.total_remaining)
    )
}
