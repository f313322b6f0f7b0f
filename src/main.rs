use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use leaderboard::config::{BoardConfig, Config};
use leaderboard::filter::{filter_records, CriteriaConfig};
use leaderboard::output::{self, DisplayMode, DisplayOptions};
use leaderboard::pipeline::{fetch_boards, is_new_top_entry, ResolvedBoard};
use leaderboard::ranking::{challenge_summary, entity_stats, RankOrder};
use leaderboard::records::{InputValue, Record};
use leaderboard::scoring::{score_all, FormulaFamily};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_NETWORK: i32 = 2;
const EXIT_CONFIG: i32 = 4;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show ranked leaderboards (default if no subcommand)
    List(ListArgs),
    /// Print a board's values over time as TSV
    Chart {
        /// Board name from the config file
        board: String,
        /// One series for all entries instead of one per entity
        #[arg(long)]
        no_group: bool,
        /// Only each entity's most recent value
        #[arg(long)]
        latest: bool,
    },
    /// Challenge totals for progress boards, per-entity statistics otherwise
    Stats {
        /// Board name from the config file
        board: String,
    },
    /// Submit a new record to a board's source
    Add(AddArgs),
    /// List configured boards
    Boards,
}

#[derive(Args, Debug, Default)]
struct ListArgs {
    /// Board name; all boards when omitted
    board: Option<String>,

    #[command(flatten)]
    filters: FilterArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Show at most N entries per board
    #[arg(short = 'n', long)]
    limit: Option<usize>,
}

#[derive(Args, Clone, Debug, Default)]
struct FilterArgs {
    /// Only records with this category ("all" disables the board default)
    #[arg(long)]
    category: Option<String>,
    /// Only records from this group (store, team)
    #[arg(long)]
    group: Option<String>,
    /// Case-insensitive substring of the record name
    #[arg(long)]
    search: Option<String>,
    /// Earliest date, YYYY-MM-DD or RFC 3339
    #[arg(long)]
    from: Option<String>,
    /// Latest date, YYYY-MM-DD or RFC 3339
    #[arg(long)]
    to: Option<String>,
    /// Only records from the last DURATION, e.g. 7d or 2w
    #[arg(long)]
    since: Option<String>,
    /// Only these entities (repeatable)
    #[arg(long = "entity")]
    entities: Vec<String>,
}

impl FilterArgs {
    fn into_criteria(self) -> CriteriaConfig {
        CriteriaConfig {
            category: self.category,
            group: self.group,
            search: self.search,
            from: self.from,
            to: self.to,
            since: self.since,
            entities: self.entities,
        }
    }
}

#[derive(Args, Debug)]
struct AddArgs {
    /// Board name from the config file
    board: String,
    /// Display name of the record
    #[arg(long)]
    name: String,
    /// Raw input as key=value (repeatable)
    #[arg(short, long = "input", value_parser = parse_input)]
    inputs: Vec<(String, InputValue)>,
    /// Category tag (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,
    #[arg(long)]
    group: Option<String>,
    #[arg(long)]
    entity: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Table,
    Tsv,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "leaderboard")]
#[command(about = "Score, filter and rank records into leaderboards", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/leaderboard/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn parse_input(s: &str) -> Result<(String, InputValue), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing input name in '{}'", s));
    }
    let value = value.trim();
    // "inf" and "NaN" parse as floats but have no JSON form; keep them as text
    let value = match value.parse::<f64>() {
        Ok(n) if n.is_finite() => InputValue::Number(n),
        _ => InputValue::Text(value.to_string()),
    };
    Ok((key.to_string(), value))
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,leaderboard={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn exit_with(code: i32, context: &str, err: anyhow::Error) -> ! {
    eprintln!("{}: {:#}", context, err);
    std::process::exit(code);
}

fn find_board<'a>(config: &'a Config, name: &str) -> &'a BoardConfig {
    match config.board(name) {
        Some(board) => board,
        None => {
            let known: Vec<&str> = config.boards.iter().map(|b| b.name.as_str()).collect();
            eprintln!("Unknown board '{}'. Configured boards: {}", name, known.join(", "));
            std::process::exit(EXIT_CONFIG);
        }
    }
}

fn resolve_board(board: &BoardConfig, overrides: CriteriaConfig) -> ResolvedBoard {
    ResolvedBoard::from_config(board, overrides, Utc::now())
        .unwrap_or_else(|e| exit_with(EXIT_CONFIG, "Config error", e))
}

async fn load_board_records(board: &BoardConfig) -> Vec<Record> {
    let start = Instant::now();
    match board.source.list_records().await {
        Ok(records) => {
            debug!(board = %board.name, count = records.len(), elapsed = ?start.elapsed(), "records loaded");
            records
        }
        Err(e) => exit_with(
            EXIT_NETWORK,
            &format!("Failed to load records for '{}'", board.name),
            e,
        ),
    }
}

fn render_board(board: &ResolvedBoard, records: &[Record], config: &Config, args: &ListArgs) -> String {
    let mut entries = board.leaderboard(records);
    if let Some(limit) = args.limit {
        entries.truncate(limit);
    }
    let options = DisplayOptions::new(&board.formula, &config.display);
    let rows = output::format_entries(&entries, &options);

    match args.format {
        OutputFormat::Table => output::format_table(&rows, output::should_use_colors()),
        OutputFormat::Tsv => output::format_tsv(&rows),
        OutputFormat::Json => output::format_json(&rows)
            .unwrap_or_else(|e| exit_with(EXIT_CONFIG, "Output error", e)),
    }
}

/// Resolve every board's criteria with the command-line overrides. Needs no
/// record I/O, so bad filters fail before any source is contacted.
fn resolve_boards(
    boards: &[BoardConfig],
    filters: &FilterArgs,
    now: DateTime<Utc>,
) -> anyhow::Result<Vec<ResolvedBoard>> {
    boards
        .iter()
        .map(|board| ResolvedBoard::from_config(board, filters.clone().into_criteria(), now))
        .collect()
}

async fn run_list(config: &Config, args: ListArgs) {
    if let Some(name) = args.board.as_deref() {
        let board_config = find_board(config, name);
        let board = resolve_board(board_config, args.filters.clone().into_criteria());
        let records = load_board_records(board_config).await;
        println!("{}", render_board(&board, &records, config, &args));
        return;
    }

    if config.boards.is_empty() {
        eprintln!("No boards configured in config file.");
        eprintln!("Add boards to ~/.config/leaderboard/config.yaml:");
        eprintln!("  boards:");
        eprintln!("    - name: upe");
        eprintln!("      source: {{ url: \"http://localhost:8000/beverages/\" }}");
        eprintln!("      formula: {{ kind: cost-efficiency }}");
        std::process::exit(EXIT_CONFIG);
    }

    let boards = resolve_boards(&config.boards, &args.filters, Utc::now())
        .unwrap_or_else(|e| exit_with(EXIT_CONFIG, "Config error", e));

    // Results come back in config order, matching `boards`
    let results = fetch_boards(&config.boards)
        .await
        .unwrap_or_else(|e| exit_with(EXIT_NETWORK, "Failed to load boards", e));

    let use_colors = output::should_use_colors();
    let mut sections = Vec::new();
    for (board, (_, result)) in boards.iter().zip(results) {
        let records = match result {
            Ok(records) => records,
            // Already logged by fetch_boards
            Err(_) => continue,
        };
        let body = render_board(board, &records, config, &args);
        let section = match args.format {
            OutputFormat::Table if use_colors => {
                use owo_colors::OwoColorize;
                format!("{}\n{}", board.name.bold().underline(), body)
            }
            OutputFormat::Table => format!("{}\n{}", board.name, body),
            _ => body,
        };
        sections.push(section);
    }

    let joiner = if args.format == OutputFormat::Table { "\n\n" } else { "\n" };
    println!("{}", sections.join(joiner));
}

async fn run_chart(config: &Config, name: &str, no_group: bool, latest: bool) {
    let board_config = find_board(config, name);
    let board = resolve_board(board_config, CriteriaConfig::default());
    let records = filter_records(&load_board_records(board_config).await, &board.criteria);
    let mode = DisplayMode::for_formula(&board.formula);

    let out = if latest {
        output::format_latest_tsv(&leaderboard::latest_values(&records, &board.formula), mode)
    } else {
        let series = leaderboard::compute_chart_series(&records, &board.formula, !no_group);
        output::format_series_tsv(&series, mode)
    };
    if !out.is_empty() {
        println!("{}", out);
    }
}

async fn run_stats(config: &Config, name: &str) {
    let board_config = find_board(config, name);
    let board = resolve_board(board_config, CriteriaConfig::default());
    let records = filter_records(&load_board_records(board_config).await, &board.criteria);
    let scored = score_all(&records, &board.formula);
    let use_colors = output::should_use_colors();

    if board.formula.family() == FormulaFamily::Progress {
        println!("{}", output::format_challenge(&challenge_summary(&scored), use_colors));
    } else {
        let mode = DisplayMode::for_formula(&board.formula);
        let stats = entity_stats(&scored, board.order);
        println!("{}", output::format_entity_stats(&stats, mode, use_colors));
    }
}

async fn run_add(config: &Config, args: AddArgs) {
    let board_config = find_board(config, &args.board);
    let board = resolve_board(board_config, CriteriaConfig::default());

    let mut record = Record::new("", args.name.trim());
    record.inputs = args.inputs.into_iter().collect();
    record.tags = args.tags;
    record.group = args.group;
    record.entity = args.entity;
    record.recorded_at = Some(Utc::now());

    let stored = board_config
        .source
        .submit_record(record)
        .await
        .unwrap_or_else(|e| exit_with(EXIT_NETWORK, "Failed to submit record", e));
    info!(board = %board.name, id = %stored.id, "record submitted");
    println!("Added '{}' (id {})", stored.name, stored.id);

    // Re-read so the comparison sees what the source actually holds
    let refreshed = filter_records(&load_board_records(board_config).await, &board.criteria);
    let mode = DisplayMode::for_formula(&board.formula);
    match leaderboard::scoring::evaluate(&stored, &board.formula) {
        Some(value) => {
            println!("Score: {}", output::format_value(value, mode));
            if board.order == RankOrder::Descending
                && is_new_top_entry(&stored, &refreshed, &board.formula)
            {
                println!("New {}!", config.display.top_label);
            }
        }
        None => println!("Score: incomplete (missing or invalid inputs)"),
    }
}

fn run_boards(config: &Config) {
    if config.boards.is_empty() {
        println!("No boards configured.");
        return;
    }
    for board in &config.boards {
        let formula = board
            .resolve_formula()
            .map(|f| f.describe())
            .unwrap_or_else(|| "-".to_string());
        let order = board
            .resolve_formula()
            .map(|f| format!("{:?}", board.effective_order(&f)).to_lowercase())
            .unwrap_or_default();
        println!(
            "{}\t{}\t{}\t{}",
            board.name,
            board.source.describe(),
            formula,
            order
        );
    }
}

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let cli = Cli::parse();
    init_logging(cli.verbose);
    let command = cli.command.unwrap_or(Commands::List(ListArgs::default()));

    // Load config
    let config_path = cli.config.map(PathBuf::from);
    let config = match leaderboard::config::load_config(config_path) {
        Ok(c) => c,
        Err(e) => exit_with(EXIT_CONFIG, "Config error", e),
    };

    if let Err(errors) = leaderboard::config::validate_config(&config) {
        eprintln!("Config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    debug!(boards = config.boards.len(), "config loaded");

    match command {
        Commands::List(args) => run_list(&config, args).await,
        Commands::Chart { board, no_group, latest } => {
            run_chart(&config, &board, no_group, latest).await
        }
        Commands::Stats { board } => run_stats(&config, &board).await,
        Commands::Add(args) => run_add(&config, args).await,
        Commands::Boards => run_boards(&config),
    }

    std::process::exit(EXIT_SUCCESS);
}
