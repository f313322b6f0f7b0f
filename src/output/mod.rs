pub mod formatter;

pub use formatter::{
    format_amount, format_challenge, format_entity_stats, format_entries, format_json,
    format_latest_tsv, format_series_tsv, format_table, format_tsv, format_value,
    should_use_colors, DisplayMode, DisplayOptions, ViewModel,
};
