use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use stride_core::*;

#[derive(Parser)]
#[command(name = "stride")]
#[command(about = "Step ledger and statistics for a step-counter sensor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample the step sensor and update the ledger
    Sample {
        /// Raw "steps since boot" reading, overriding the sensor source
        #[arg(long)]
        steps: Option<u64>,
    },

    /// Show today's step count (default)
    Today,

    /// Show weekly, monthly, yearly and all-time statistics
    Stats,

    /// Show the most recent day entries
    History {
        /// Number of days to show
        #[arg(long, default_value_t = 7)]
        num: usize,
    },

    /// Export the ledger to a CSV backup file
    Export {
        /// Backup file to write
        #[arg(long)]
        file: PathBuf,
    },

    /// Import day entries from a CSV backup file
    Import {
        /// Backup file to read
        #[arg(long)]
        file: PathBuf,
    },

    /// Mark a device reboot, resetting the sensor baseline
    Boot,
}

fn main() -> Result<()> {
    // Initialize logging
    stride_core::logging::init();

    let cli = Cli::parse();

    // Determine data directory
    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    tracing::debug!("Using data directory {:?}", data_dir);

    let ledger = Ledger::open(&data_dir)?;
    let dates = SystemDate;

    match cli.command {
        Some(Commands::Sample { steps }) => cmd_sample(&ledger, &dates, &config, steps),
        Some(Commands::Stats) => cmd_stats(&ledger, &dates),
        Some(Commands::History { num }) => cmd_history(&ledger, num),
        Some(Commands::Export { file }) => cmd_export(&ledger, &file),
        Some(Commands::Import { file }) => cmd_import(&ledger, &file),
        Some(Commands::Boot) => cmd_boot(&ledger),
        Some(Commands::Today) | None => cmd_today(&ledger, &dates, &config),
    }
}

fn cmd_sample(
    ledger: &Ledger,
    dates: &SystemDate,
    config: &Config,
    steps_override: Option<u64>,
) -> Result<()> {
    let raw = match steps_override {
        Some(raw) => raw,
        None => read_sensor(config)?,
    };

    let steps_today = update_steps_since_boot(ledger, dates, raw)?;

    println!("✓ Sampled sensor: {} steps since boot", raw);
    println!("  Steps today: {}", steps_today);
    Ok(())
}

fn read_sensor(config: &Config) -> Result<u64> {
    let Some(source_path) = config.sensor.source.as_ref() else {
        eprintln!("No step sensor configured. Set [sensor] source in the config or pass --steps.");
        return Err(Error::Sensor("no step sensor available".into()));
    };

    let mut source = FileStepSource::new(source_path);
    match source.read()? {
        Some(raw) => Ok(raw),
        None => {
            eprintln!("Step sensor not available at {}", source_path.display());
            Err(Error::Sensor("no step sensor available".into()))
        }
    }
}

fn cmd_today(ledger: &Ledger, dates: &SystemDate, config: &Config) -> Result<()> {
    let steps = steps_today(ledger, dates)?;
    let goal = i64::from(config.goal.daily_steps);

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  TODAY");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  {} / {} steps", steps, goal);

    if let Some((distance, unit)) = stats::distance_for_steps(steps, config) {
        println!("  {:.2} {}", distance, unit);
    }

    if steps >= goal {
        println!();
        println!("  ✓ Daily goal reached!");
    }

    println!();
    Ok(())
}

fn cmd_stats(ledger: &Ledger, dates: &SystemDate) -> Result<()> {
    let report = generate_stats(ledger, dates)?;

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  STATISTICS");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!(
        "  Record:     {} steps on {}",
        report.record.display_steps(),
        format_day(report.record.day)
    );
    println!("  Today:      {} steps", report.steps_today);
    println!();
    println!(
        "  Last 7 days:  {:>10} total  {:>8} avg/day",
        report.total_last_7_days, report.average_last_7_days
    );
    println!(
        "  This month:   {:>10} total  {:>8} avg/day",
        report.total_this_month, report.average_this_month
    );
    println!(
        "  This year:    {:>10} total  {:>8} avg/day",
        report.total_this_year, report.average_this_year
    );
    println!(
        "  All time:     {:>10} total  {:>8} avg/day",
        report.total_all_time, report.average_all_time
    );
    println!();
    Ok(())
}

fn cmd_history(ledger: &Ledger, num: usize) -> Result<()> {
    let entries = ledger.last_entries(num)?;

    if entries.is_empty() {
        println!("No days recorded yet.");
        return Ok(());
    }

    println!();
    for entry in &entries {
        println!("  {}  {:>8} steps", format_day(entry.day), entry.display_steps());
    }
    println!();
    Ok(())
}

fn cmd_export(ledger: &Ledger, file: &Path) -> Result<()> {
    let count = export_csv(ledger, file)?;

    println!("✓ Exported {} days to {}", count, file.display());
    Ok(())
}

fn cmd_import(ledger: &Ledger, file: &Path) -> Result<()> {
    let summary = import_csv(ledger, file)?;

    println!("✓ Imported {} entries", summary.imported());
    if summary.overwritten > 0 {
        println!("  {} existing days overwritten", summary.overwritten);
    }
    if summary.ignored > 0 {
        println!("  {} lines ignored", summary.ignored);
    }
    Ok(())
}

fn cmd_boot(ledger: &Ledger) -> Result<()> {
    mark_reboot(ledger)?;

    println!("✓ Reboot marked, sensor baseline reset");
    Ok(())
}

fn format_day(day: i64) -> String {
    match date::day_to_date(day) {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => format!("day {}", day),
    }
}
