//! # Quest Hub
//!
//! A family quest board for the terminal. Chores and homework become quests,
//! completing them earns XP, XP earns levels, and recurring quests keep the
//! routine going without re-typing it every week.
//!
//! ## Features
//!
//! *   **XP and levels**: every quest carries an XP reward fixed by its priority
//!     (low 10, medium 25, high 50, critical 100). Every 100 XP is a level.
//! *   **Streaks and achievements**: consecutive days with a completion build a
//!     streak; achievements unlock from the same numbers.
//! *   **Recurring quests**: daily, weekly (optionally on chosen weekdays) and
//!     monthly patterns, with an optional end date and occurrence cap.
//! *   **Calendar sync**: quests with a due date can be pushed to a calendar and
//!     exported as an `.ics` file.
//!
//! ## Usage
//!
//! ```bash
//! # A one-off quest
//! questhub add "Clean room" --priority high --category chores --due 2025-12-01
//!
//! # Every Monday, Wednesday and Friday until the end of the year
//! questhub recur add "Practice piano" -r weekly --days mon,wed,fri --until 2025-12-31
//!
//! # See what a pattern would generate
//! questhub recur preview -r monthly --from 2025-01-31 -n 3
//!
//! questhub list --sort priority
//! questhub complete 3
//! questhub stats
//! ```
//!
//! ## Data Storage
//!
//! Quests are saved in your local data directory:
//! *   Linux: `~/.local/share/questhub/quests.json`
//! *   macOS: `~/Library/Application Support/questhub/quests.json`
//! *   Windows: `%APPDATA%\questhub\quests.json`
//!
//! Override the directory with `QUESTHUB_DIR` or `--data-dir`, and the acting
//! user with `QUESTHUB_USER` or `--user`. Set `RUST_LOG=info` to see what
//! happens under the hood.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::EnvFilter;

use questhub::calendar::{CalendarProvider, LocalCalendar};
use questhub::commands::*;
use questhub::config::{CalendarSettings, Config};
use questhub::filters::{QuestFilters, SortBy, SortOrder};
use questhub::models::{Category, Priority, RecurrencePattern, RecurrenceType, Status};
use questhub::recurrence::DEFAULT_MAX_OCCURRENCES;
use questhub::storage::{default_data_dir, Store};
use questhub::Result;

#[derive(Parser)]
#[command(name = "questhub")]
#[command(about = "Family quest board: chores, XP and levels", long_about = None)]
struct Cli {
    /// Act as this user instead of the configured one
    #[arg(long, global = true)]
    user: Option<String>,
    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new quest
    Add {
        #[command(flatten)]
        quest: QuestArgs,
    },
    /// Manage recurring quests
    Recur {
        #[command(subcommand)]
        command: RecurCommands,
    },
    /// List quests
    List {
        /// Include completed quests
        #[arg(short, long)]
        all: bool,
        /// Only quests with this status (active, completed, paused)
        #[arg(long)]
        status: Option<Status>,
        /// Only quests with this priority
        #[arg(short, long)]
        priority: Option<Priority>,
        /// Only quests in this category
        #[arg(short, long)]
        category: Option<Category>,
        /// Only quests carrying this tag
        #[arg(short, long)]
        tag: Option<String>,
        /// Only quests whose title contains this text
        #[arg(short, long)]
        search: Option<String>,
        /// Sort key (created, priority, due, xp)
        #[arg(long, default_value = "created")]
        sort: SortBy,
        /// Sort order (asc, desc)
        #[arg(long, default_value = "desc")]
        order: SortOrder,
    },
    /// Mark a quest as completed
    Complete {
        id: u64,
    },
    /// Move a completed quest back to active
    Reopen {
        id: u64,
    },
    /// Pause an active quest
    Pause {
        id: u64,
    },
    /// Resume a paused quest
    Resume {
        id: u64,
    },
    /// Edit a quest
    Edit {
        id: u64,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// New priority
        #[arg(short, long)]
        priority: Option<Priority>,
        /// New category
        #[arg(short, long)]
        category: Option<Category>,
        /// New due date (YYYY-MM-DD)
        #[arg(short, long, value_parser = parse_date)]
        due: Option<NaiveDate>,
        /// New XP reward
        #[arg(long)]
        xp: Option<u32>,
        /// Replace tags (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
        /// New estimate in minutes
        #[arg(short, long)]
        estimate: Option<u32>,
        /// New assignee
        #[arg(short, long)]
        assign: Option<String>,
    },
    /// Remove a quest (creator only)
    Remove {
        id: u64,
    },
    /// Show XP, level and streaks
    Stats,
    /// Show achievements and progress
    Achievements {
        /// Only unlocked achievements
        #[arg(short, long)]
        unlocked: bool,
    },
    /// Calendar integration
    Calendar {
        #[command(subcommand)]
        command: CalendarCommands,
    },
    /// Reset the database (delete all quests and calendar events)
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        shell: Shell,
    },
}

#[derive(Args)]
struct QuestArgs {
    /// Quest title (quoted if it has spaces)
    title: String,
    /// Longer description
    #[arg(long)]
    description: Option<String>,
    /// Priority (low, medium, high, critical)
    #[arg(short, long, default_value = "medium")]
    priority: Priority,
    /// Category (school, health, chores, personal)
    #[arg(short, long, default_value = "personal")]
    category: Category,
    /// Due date in YYYY-MM-DD
    #[arg(short, long, value_parser = parse_date)]
    due: Option<NaiveDate>,
    /// XP reward (defaults to the priority's value)
    #[arg(long)]
    xp: Option<u32>,
    /// Tags (comma separated)
    #[arg(short, long, value_delimiter = ',')]
    tags: Vec<String>,
    /// Estimated time in minutes
    #[arg(short, long)]
    estimate: Option<u32>,
    /// Assign to another user
    #[arg(short, long)]
    assign: Option<String>,
}

impl QuestArgs {
    fn into_input(self) -> QuestInput {
        QuestInput {
            title: self.title,
            description: self.description,
            priority: self.priority,
            category: self.category,
            due: self.due,
            xp: self.xp,
            tags: self.tags,
            estimated_minutes: self.estimate,
            assign_to: self.assign,
        }
    }
}

#[derive(Args)]
struct PatternArgs {
    /// Recurrence type (daily, weekly, monthly)
    #[arg(short = 'r', long = "type")]
    kind: RecurrenceType,
    /// Repeat every N days/weeks/months
    #[arg(short, long, default_value_t = 1)]
    interval: u32,
    /// Weekdays for weekly quests, e.g. "mon,wed,fri" or "1,3,5"
    #[arg(long)]
    days: Option<String>,
    /// Last day (exclusive) on which the quest may fall, YYYY-MM-DD
    #[arg(long, value_parser = parse_date)]
    until: Option<NaiveDate>,
    /// Maximum number of occurrences
    #[arg(long)]
    max: Option<u32>,
}

impl PatternArgs {
    fn into_pattern(self) -> Result<RecurrencePattern> {
        Ok(RecurrencePattern {
            kind: self.kind,
            interval: self.interval,
            days_of_week: self.days.as_deref().map(parse_days).transpose()?,
            end_date: self.until,
            max_occurrences: self.max,
        })
    }
}

#[derive(Subcommand)]
enum RecurCommands {
    /// Add a recurring quest and its upcoming instances
    Add {
        #[command(flatten)]
        quest: QuestArgs,
        #[command(flatten)]
        pattern: PatternArgs,
        /// Push every instance to the calendar
        #[arg(long)]
        sync: bool,
    },
    /// List recurring quests
    List,
    /// Show the dates a pattern would generate
    Preview {
        #[command(flatten)]
        pattern: PatternArgs,
        /// Start date (defaults to today)
        #[arg(long, value_parser = parse_date)]
        from: Option<NaiveDate>,
        /// Number of occurrences
        #[arg(short = 'n', long, default_value_t = DEFAULT_MAX_OCCURRENCES)]
        count: usize,
    },
}

#[derive(Subcommand)]
enum CalendarCommands {
    /// Connect the calendar
    Connect {
        /// Time zone attached to events
        #[arg(long, default_value = "UTC")]
        tz: String,
        /// Hour (0-23) at which events start
        #[arg(long, default_value_t = 9)]
        hour: u32,
    },
    /// Disconnect the calendar
    Disconnect,
    /// Show whether a calendar is connected
    Status,
    /// Push a quest to the calendar
    Sync {
        id: u64,
    },
    /// Remove a quest from the calendar
    Unsync {
        id: u64,
    },
    /// List upcoming events
    Events {
        /// How many days ahead
        #[arg(long, default_value_t = 14)]
        days: u64,
    },
    /// Export all events to an .ics file
    Export {
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Opens the calendar if one is connected.
fn open_calendar(store: &Store, config: &Config) -> Result<Option<LocalCalendar>> {
    match config.calendar {
        Some(_) => Ok(Some(LocalCalendar::open(store)?)),
        None => Ok(None),
    }
}

fn run(cli: Cli) -> Result<()> {
    let store = Store::open(cli.data_dir.unwrap_or_else(default_data_dir))?;
    let mut config = Config::load(store.dir())?;
    if let Some(user) = cli.user {
        config.user = user;
    }
    let user = config.user.clone();

    let command = cli.command.unwrap_or(Commands::List {
        all: false,
        status: None,
        priority: None,
        category: None,
        tag: None,
        search: None,
        sort: SortBy::default(),
        order: SortOrder::default(),
    });

    match command {
        Commands::Add { quest } => {
            cmd_add(&store, &user, quest.into_input(), false)?;
        }
        Commands::Recur { command } => match command {
            RecurCommands::Add { quest, pattern, sync } => {
                let mut calendar = open_calendar(&store, &config)?;
                cmd_add_recurring(
                    &store,
                    &config,
                    calendar.as_mut().map(|c| c as &mut dyn CalendarProvider),
                    quest.into_input(),
                    pattern.into_pattern()?,
                    sync,
                    false,
                )?;
            }
            RecurCommands::List => {
                cmd_recurring_list(&store, &user)?;
            }
            RecurCommands::Preview { pattern, from, count } => {
                let from = from.unwrap_or_else(|| chrono::Local::now().date_naive());
                cmd_preview(&pattern.into_pattern()?, from, count, false)?;
            }
        },
        Commands::List { all, status, priority, category, tag, search, sort, order } => {
            let status = match status {
                None if !all => Some(Status::Active),
                s => s,
            };
            let filters = QuestFilters { status, priority, category, tag, search, sort_by: sort, sort_order: order };
            cmd_list(&store, &user, &filters, false)?;
        }
        Commands::Complete { id } => {
            cmd_complete(&store, &user, id, false)?;
        }
        Commands::Reopen { id } => cmd_reopen(&store, &user, id, false)?,
        Commands::Pause { id } => cmd_set_paused(&store, &user, id, true, false)?,
        Commands::Resume { id } => cmd_set_paused(&store, &user, id, false, false)?,
        Commands::Edit { id, title, description, priority, category, due, xp, tags, estimate, assign } => {
            let edit = QuestEdit {
                title,
                description,
                priority,
                category,
                due,
                xp,
                tags,
                estimated_minutes: estimate,
                assign_to: assign,
            };
            cmd_edit(&store, &user, id, edit, false)?;
        }
        Commands::Remove { id } => {
            let mut calendar = open_calendar(&store, &config)?;
            cmd_remove(&store, calendar.as_mut().map(|c| c as &mut dyn CalendarProvider), &user, id, false)?;
        }
        Commands::Stats => {
            cmd_stats(&store, &user, false)?;
        }
        Commands::Achievements { unlocked } => {
            cmd_achievements(&store, &user, unlocked, false)?;
        }
        Commands::Calendar { command } => match command {
            CalendarCommands::Connect { tz, hour } => {
                let settings = CalendarSettings { time_zone: tz, event_hour: hour };
                cmd_calendar_connect(&store, &mut config, settings, false)?;
            }
            CalendarCommands::Disconnect => cmd_calendar_disconnect(&store, &mut config, false)?,
            CalendarCommands::Status => cmd_calendar_status(&config),
            CalendarCommands::Sync { id } => {
                let mut calendar = LocalCalendar::open(&store)?;
                cmd_calendar_sync(&store, &mut calendar, &config, id, false)?;
            }
            CalendarCommands::Unsync { id } => {
                let mut calendar = open_calendar(&store, &config)?;
                cmd_calendar_unsync(&store, calendar.as_mut().map(|c| c as &mut dyn CalendarProvider), &user, id, false)?;
            }
            CalendarCommands::Events { days } => {
                cmd_calendar_events(&LocalCalendar::open(&store)?, days, false)?;
            }
            CalendarCommands::Export { path } => {
                cmd_calendar_export(&LocalCalendar::open(&store)?, &path)?;
            }
        },
        Commands::Reset { force } => cmd_reset(&store, force)?,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "questhub", &mut io::stdout());
        }
    }
    Ok(())
}
