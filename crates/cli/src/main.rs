mod commands;
mod serve;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use replan_engine::{EngineConfig, ScheduleEditor, SystemClock};
use replan_storage::FileStorage;
use time::Date;

/// Store directory used when neither `--store` nor `REPLAN_STORE` is set.
const DEFAULT_STORE_DIR: &str = ".replan";

/// Config file picked up from the working directory when present.
const DEFAULT_CONFIG_FILE: &str = "replan.toml";

/// The editor every subcommand works through.
pub(crate) type Editor = ScheduleEditor<FileStorage, SystemClock>;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Edit a date-indexed schedule with natural date phrases.
#[derive(Parser)]
#[command(
    name = "replan",
    version,
    about = "Resolve date phrases and apply validated schedule patches"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Store directory (default: $REPLAN_STORE or ./.replan)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Config file (default: $REPLAN_CONFIG or ./replan.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Reference date for phrase resolution (YYYY-MM-DD); defaults to the clock
    #[arg(long, global = true, value_parser = parse_date)]
    today: Option<Date>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve date phrases such as "last Tuesday" to calendar dates
    Resolve {
        /// Phrases to resolve
        #[arg(required = true)]
        phrases: Vec<String>,
        /// Anchor date for rolling week numbers
        #[arg(long, value_parser = parse_date, conflicts_with = "schedule")]
        anchor: Option<Date>,
        /// Take the anchor date from a stored schedule
        #[arg(long)]
        schedule: Option<String>,
    },

    /// Compute the date of a weekday within a rolling week
    WeekDay {
        /// Anchor date (first day of week 1)
        #[arg(long, value_parser = parse_date)]
        anchor: Date,
        /// Rolling week number, starting at 1
        #[arg(long)]
        week: u32,
        /// Weekday name or abbreviation
        #[arg(long)]
        weekday: String,
    },

    /// Store a new schedule from a JSON document
    Init {
        /// Schedule id
        schedule_id: String,
        /// Path to the schedule JSON file
        file: PathBuf,
    },

    /// Print a stored schedule
    Show {
        /// Schedule id
        schedule_id: String,
    },

    /// List stored schedules
    List,

    /// Validate proposed patches and store them as a proposal
    Propose {
        /// Schedule id
        schedule_id: String,
        /// Path to a JSON array of proposed patches
        file: PathBuf,
    },

    /// Print a pending proposal
    Proposal {
        /// Proposal id
        id: String,
    },

    /// Drop a pending proposal
    Discard {
        /// Proposal id
        id: String,
    },

    /// Apply a proposal to its schedule
    Commit {
        /// Proposal id
        id: String,
        /// Schedule version the proposal was reviewed against
        #[arg(long)]
        version: u64,
    },

    /// Remove expired proposals
    Purge,

    /// Start the HTTP JSON API server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(
                &format!("error: failed to start runtime: {}", e),
                cli.output,
                cli.quiet,
            );
            process::exit(1);
        }
    };

    let output = cli.output;
    let quiet = cli.quiet;

    // week-day is pure date math and needs no store.
    if let Commands::WeekDay {
        anchor,
        week,
        weekday,
    } = &cli.command
    {
        commands::resolve::cmd_week_day(*anchor, *week, weekday, output, quiet);
        return;
    }

    let editor = open_editor(&cli);

    rt.block_on(async {
        match cli.command {
            Commands::Resolve {
                phrases,
                anchor,
                schedule,
            } => {
                commands::resolve::cmd_resolve(
                    &editor,
                    &phrases,
                    anchor,
                    schedule.as_deref(),
                    output,
                    quiet,
                )
                .await;
            }
            Commands::WeekDay { .. } => {}
            Commands::Init { schedule_id, file } => {
                commands::schedule::cmd_init(&editor, &schedule_id, &file, output, quiet).await;
            }
            Commands::Show { schedule_id } => {
                commands::schedule::cmd_show(&editor, &schedule_id, output, quiet).await;
            }
            Commands::List => {
                commands::schedule::cmd_list(&editor, output, quiet).await;
            }
            Commands::Propose { schedule_id, file } => {
                commands::proposal::cmd_propose(&editor, &schedule_id, &file, output, quiet).await;
            }
            Commands::Proposal { id } => {
                commands::proposal::cmd_proposal(&editor, &id, output, quiet).await;
            }
            Commands::Discard { id } => {
                commands::proposal::cmd_discard(&editor, &id, output, quiet).await;
            }
            Commands::Commit { id, version } => {
                commands::proposal::cmd_commit(&editor, &id, version, output, quiet).await;
            }
            Commands::Purge => {
                commands::proposal::cmd_purge(&editor, output, quiet).await;
            }
            Commands::Serve { port } => {
                if let Err(e) = serve::start_server(port, editor).await {
                    eprintln!("Server error: {}", e);
                    process::exit(1);
                }
            }
        }
    });
}

/// Log to stderr, filtered by `REPLAN_LOG` (default `warn`).
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("REPLAN_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Build the editor from flags, environment and config file, exiting on
/// any failure.
fn open_editor(cli: &Cli) -> Editor {
    let config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(msg) => {
            report_error(&msg, cli.output, cli.quiet);
            process::exit(1);
        }
    };

    let offset = match config.clock.offset() {
        Ok(o) => o,
        Err(e) => {
            report_error(&format!("error: {}", e), cli.output, cli.quiet);
            process::exit(1);
        }
    };

    let store_dir = cli
        .store
        .clone()
        .or_else(|| std::env::var_os("REPLAN_STORE").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_DIR));

    let storage = match FileStorage::open(&store_dir) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!(
                "error: cannot open store {}: {}",
                store_dir.display(),
                e
            );
            report_error(&msg, cli.output, cli.quiet);
            process::exit(1);
        }
    };

    let editor = ScheduleEditor::new(storage, SystemClock::with_offset(offset), config);
    match cli.today {
        Some(today) => editor.with_today(today),
        None => editor,
    }
}

fn load_config(explicit: Option<&Path>) -> Result<EngineConfig, String> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os("REPLAN_CONFIG").map(PathBuf::from));

    let path = match path {
        Some(p) => p,
        None => {
            let local = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !local.exists() {
                return Ok(EngineConfig::default());
            }
            local
        }
    };

    EngineConfig::load(&path).map_err(|e| format!("error: {}", e))
}

pub(crate) fn parse_date(raw: &str) -> Result<Date, String> {
    let format = time::macros::format_description!("[year]-[month]-[day]");
    Date::parse(raw.trim(), &format).map_err(|_| format!("expected YYYY-MM-DD, got '{}'", raw))
}

/// Print `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("error: failed to serialize output: {}", e),
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
