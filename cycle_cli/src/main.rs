use chrono::{Datelike, Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use cycle_core::*;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "cyclefit")]
#[command(about = "Cycle-aware workout, nutrition and recovery guide", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Treat this date as today (YYYY-MM-DD)
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    /// Log more detail to stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Show today's phase and recommendations (default)
    Today {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the phase for a specific date
    Phase {
        /// Date to look up (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a month calendar with phase markers
    Calendar {
        /// Year to show (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,

        /// Month to show, 1-12 (defaults to the current month)
        #[arg(long)]
        month: Option<u32>,

        /// Print the 42 grid cells as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage your cycle profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Manage cycle records
    Cycle {
        #[command(subcommand)]
        action: CycleAction,
    },

    /// Mark a recommendation as done and earn points
    Done {
        /// What you completed (workout, nutrition, recovery)
        #[arg(long)]
        kind: String,
    },

    /// Show points, level and streak
    Points,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Set the first day of your last period and your average cycle length
    Set {
        /// First day of your last period (YYYY-MM-DD)
        #[arg(long)]
        last_period: NaiveDate,

        /// Average cycle length in days
        #[arg(long)]
        length: Option<u32>,
    },

    /// Show the saved profile
    Show,

    /// Import a profile exported from the mobile app
    Import {
        /// Path to the exported JSON
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum CycleAction {
    /// Log a cycle record (phase and day default to the calculated values)
    Add {
        /// Record start date (defaults to today)
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// Phase (menstrual, follicular, ovulation, luteal)
        #[arg(long)]
        phase: Option<String>,

        /// Day of cycle, 1-40
        #[arg(long, allow_hyphen_values = true)]
        day: Option<i64>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Change fields of an existing record
    Update {
        id: Uuid,

        #[arg(long)]
        start_date: Option<NaiveDate>,

        #[arg(long)]
        phase: Option<String>,

        #[arg(long, allow_hyphen_values = true)]
        day: Option<i64>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete a record
    Delete { id: Uuid },

    /// Show your most recent record
    Current {
        #[arg(long)]
        json: bool,
    },

    /// List your records, newest first
    List {
        #[arg(long)]
        json: bool,
    },

    /// Export records to CSV
    Export {
        /// Output path (defaults to <data-dir>/cycle_records.csv)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Rewrite the journal keeping only live records
    Compact {
        /// Remove the archived journal afterwards
        #[arg(long)]
        cleanup: bool,
    },
}

/// File locations under the data directory
struct DataPaths {
    state: PathBuf,
    journal_dir: PathBuf,
    journal: PathBuf,
    csv: PathBuf,
}

impl DataPaths {
    fn new(data_dir: &Path) -> Self {
        let journal_dir = data_dir.join("journal");
        Self {
            state: data_dir.join("state.json"),
            journal: journal_dir.join("cycle_records.jsonl"),
            journal_dir,
            csv: data_dir.join("cycle_records.csv"),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    cycle_core::logging::init_with_verbosity(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    std::fs::create_dir_all(&data_dir)?;
    let paths = DataPaths::new(&data_dir);
    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());

    tracing::debug!("Using data dir {:?}, today = {}", data_dir, today);

    match cli.command {
        Some(Commands::Today { json }) => cmd_today(&paths, today, json),
        Some(Commands::Phase { date, json }) => cmd_phase(&paths, date, json),
        Some(Commands::Calendar { year, month, json }) => {
            cmd_calendar(&paths, today, year, month, json)
        }
        Some(Commands::Profile { action }) => cmd_profile(&paths, &config, action),
        Some(Commands::Cycle { action }) => cmd_cycle(&paths, &config, today, action),
        Some(Commands::Done { kind }) => cmd_done(&paths, &config, today, &kind),
        Some(Commands::Points) => cmd_points(&paths, &config),
        None => cmd_today(&paths, today, false),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_today(paths: &DataPaths, today: NaiveDate, json: bool) -> Result<()> {
    let state = UserState::load(&paths.state)?;
    let profile = state.require_profile()?;
    let snap = snapshot(profile, today);

    if json {
        return print_json(&snap);
    }

    display_snapshot(&snap, profile);
    Ok(())
}

fn cmd_phase(paths: &DataPaths, date: NaiveDate, json: bool) -> Result<()> {
    let state = UserState::load(&paths.state)?;
    let profile = state.require_profile()?;

    let cycle_day = cycle_day_for_date(profile, date);
    let phase = phase_for_date(profile, date);

    if json {
        return print_json(&serde_json::json!({
            "date": date,
            "cycle_day": cycle_day,
            "phase": phase,
        }));
    }

    match (cycle_day, phase) {
        (Some(day), Some(phase)) => {
            println!(
                "{}: cycle day {}, {}",
                date,
                day,
                phase_info(phase).name
            );
        }
        _ => {
            println!(
                "{}: before your recorded period start ({})",
                date, profile.last_period_date
            );
        }
    }
    Ok(())
}

fn cmd_calendar(
    paths: &DataPaths,
    today: NaiveDate,
    year: Option<i32>,
    month: Option<u32>,
    json: bool,
) -> Result<()> {
    let state = UserState::load(&paths.state)?;
    let profile = state.require_profile()?;

    let year = year.unwrap_or_else(|| today.year());
    let month = month.unwrap_or_else(|| today.month());
    let grid = build_month_grid(profile, year, month, today);

    if json {
        return print_json(&grid);
    }

    let shown = grid
        .iter()
        .find(|cell| cell.is_current_month)
        .map_or(today, |cell| cell.date);
    println!();
    println!("  {}", shown.format("%B %Y"));
    println!();
    println!("   Su   Mo   Tu   We   Th   Fr   Sa");

    for week in grid.chunks(7) {
        let line: String = week.iter().map(format_cell).collect();
        println!("{}", line);
    }

    println!();
    println!("  M menstrual  F follicular  O ovulation  L luteal  [ ] today");
    Ok(())
}

fn phase_marker(phase: Option<CyclePhase>) -> char {
    match phase {
        Some(CyclePhase::Menstrual) => 'M',
        Some(CyclePhase::Follicular) => 'F',
        Some(CyclePhase::Ovulation) => 'O',
        Some(CyclePhase::Luteal) => 'L',
        None => '·',
    }
}

fn format_cell(cell: &CycleDayDescriptor) -> String {
    if !cell.is_current_month {
        return "     ".to_string();
    }

    let body = format!("{:>2}{}", cell.date.day(), phase_marker(cell.phase));
    if cell.is_today {
        format!("[{}]", body)
    } else {
        format!("  {}", body)
    }
}

fn cmd_profile(paths: &DataPaths, config: &Config, action: ProfileAction) -> Result<()> {
    match action {
        ProfileAction::Set {
            last_period,
            length,
        } => {
            let profile =
                CycleProfile::new(last_period, length.unwrap_or(config.cycle.default_length));
            UserState::update(&paths.state, |state| state.set_profile(profile.clone()))?;
            println!(
                "✓ Profile saved: period started {}, {}-day cycle",
                profile.last_period_date, profile.cycle_length
            );
        }

        ProfileAction::Show => {
            let state = UserState::load(&paths.state)?;
            match &state.profile {
                Some(profile) => {
                    println!("Last period start: {}", profile.last_period_date);
                    println!("Cycle length:      {} days", profile.cycle_length);
                }
                None => println!("No profile saved yet."),
            }
        }

        ProfileAction::Import { path } => {
            let Some(profile) = load_external_profile(&path, config.cycle.default_length)? else {
                return Err(Error::Profile(format!(
                    "could not read a profile from {}",
                    path.display()
                )));
            };
            UserState::update(&paths.state, |state| state.set_profile(profile.clone()))?;
            println!(
                "✓ Profile imported: period started {}, {}-day cycle",
                profile.last_period_date, profile.cycle_length
            );
        }
    }
    Ok(())
}

fn cmd_cycle(
    paths: &DataPaths,
    config: &Config,
    today: NaiveDate,
    action: CycleAction,
) -> Result<()> {
    let mut store = RecordStore::new(&paths.journal);
    let user_id = config.user.id.as_str();

    match action {
        CycleAction::Add {
            start_date,
            phase,
            day,
            notes,
        } => {
            let start_date = start_date.unwrap_or(today);
            let (phase, day) = match (phase, day) {
                (Some(phase), Some(day)) => (phase, day),
                (phase, day) => {
                    let state = UserState::load(&paths.state)?;
                    let profile = state.require_profile()?;
                    let calculated_day = cycle_day_for_date(profile, start_date).unwrap_or(1);
                    (
                        phase.unwrap_or_else(|| current_phase(profile, start_date).to_string()),
                        day.unwrap_or(i64::from(calculated_day)),
                    )
                }
            };

            let record = store.create(
                NewCycleRecord {
                    user_id: user_id.to_string(),
                    start_date,
                    current_phase: phase,
                    day_of_cycle: day,
                    notes,
                },
                Utc::now(),
            )?;
            println!("✓ Cycle record logged: {}", record.id);
            display_record(&record);
        }

        CycleAction::Update {
            id,
            start_date,
            phase,
            day,
            notes,
        } => {
            let patch = CycleRecordPatch {
                start_date,
                current_phase: phase,
                day_of_cycle: day,
                notes,
            };
            if patch.is_empty() {
                println!("Nothing to update.");
                return Ok(());
            }
            let record = store.update(id, &patch)?;
            println!("✓ Cycle record updated");
            display_record(&record);
        }

        CycleAction::Delete { id } => {
            store.delete(id, Utc::now())?;
            println!("✓ Cycle record {} deleted", id);
        }

        CycleAction::Current { json } => {
            let current = store.current_for_user(user_id)?;
            if json {
                return print_json(&current);
            }
            match current {
                Some(record) => display_record(&record),
                None => println!("No cycle records yet."),
            }
        }

        CycleAction::List { json } => {
            let records = store.list_for_user(user_id)?;
            if json {
                return print_json(&records);
            }
            if records.is_empty() {
                println!("No cycle records yet.");
            }
            for record in &records {
                println!(
                    "{}  {}  day {:>2}  {:<10}  {}",
                    record.id,
                    record.start_date,
                    record.day_of_cycle,
                    record.current_phase,
                    record.notes.as_deref().unwrap_or("")
                );
            }
        }

        CycleAction::Export { out } => {
            let csv_path = out.unwrap_or_else(|| paths.csv.clone());
            let count = cycle_core::export::export_records_csv(&paths.journal, &csv_path)?;
            println!("✓ Exported {} cycle records", count);
            println!("  CSV: {}", csv_path.display());
        }

        CycleAction::Compact { cleanup } => {
            if !paths.journal.exists() {
                println!("No journal found - nothing to compact.");
                return Ok(());
            }
            let count = cycle_core::export::compact_journal(&paths.journal)?;
            println!("✓ Compacted journal to {} records", count);

            if cleanup {
                let cleaned = cycle_core::export::cleanup_processed_journals(&paths.journal_dir)?;
                if cleaned > 0 {
                    println!("✓ Cleaned up {} archived journals", cleaned);
                }
            }
        }
    }
    Ok(())
}

fn cmd_done(paths: &DataPaths, config: &Config, today: NaiveDate, kind: &str) -> Result<()> {
    let kind: ActivityKind = kind.parse()?;

    let (phase, award) = UserState::update(&paths.state, |state| {
        let phase = current_phase(state.require_profile()?, today);
        let award = record_activity(&mut state.rewards, kind, phase, today, config);
        Ok((phase, award))
    })?;

    if award.bonus > 0 {
        println!(
            "✓ +{} points ({} + {} {} bonus)",
            award.points + award.bonus,
            award.points,
            award.bonus,
            phase
        );
    } else {
        println!("✓ +{} points", award.points);
    }
    if award.leveled_up {
        println!("★ Level up! You're now level {}", award.level);
    }
    println!(
        "  Level {} · {} points · {}-day streak",
        award.level, award.total_points, award.streak_days
    );
    Ok(())
}

fn cmd_points(paths: &DataPaths, config: &Config) -> Result<()> {
    let state = UserState::load(&paths.state)?;
    let rewards = &state.rewards;
    let per_level = config.rewards.points_per_level.max(1);
    let next_level_at = rewards.level * per_level;

    println!("Level:  {}", rewards.level);
    println!(
        "Points: {} ({} to level {})",
        rewards.points,
        next_level_at.saturating_sub(rewards.points),
        rewards.level + 1
    );
    println!("Streak: {} days", rewards.streak_days);

    if !rewards.history.is_empty() {
        println!();
        println!("Recent:");
        for entry in rewards.history.iter().rev().take(5) {
            println!(
                "  {}  {:?} during {} (+{})",
                entry.on, entry.kind, entry.phase, entry.points
            );
        }
    }
    Ok(())
}

fn display_snapshot(snap: &PhaseSnapshot, profile: &CycleProfile) {
    let info = snap.info;

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", info.name.to_uppercase());
    println!("╰─────────────────────────────────────────╯");
    println!();

    match snap.cycle_day {
        Some(day) => println!(
            "  Cycle day {} of {} · day {} of this phase",
            day, profile.cycle_length, snap.days_in_phase
        ),
        None => println!(
            "  Your recorded period starts {}; showing {} guidance",
            profile.last_period_date, snap.phase
        ),
    }
    if let Some(days) = snap.days_until_next_period {
        println!("  Next period in about {} days", days);
    }

    println!();
    println!("  {}", info.message);
    println!();
    println!("  → Workout:   {}", info.workout);
    println!("  → Nutrition: {}", info.nutrition);
    println!("  → Recovery:  {}", info.recovery);
    println!();
}

fn display_record(record: &CycleRecord) {
    println!("  Start date: {}", record.start_date);
    println!(
        "  Phase:      {} (day {})",
        record.current_phase, record.day_of_cycle
    );
    if let Some(notes) = &record.notes {
        println!("  Notes:      {}", notes);
    }
}
