//! burnline-report - sprint burndown and objective progress from the command line
//!
//! Reads the burnline database and prints reconstructed analytics.

use burnline_core::analytics::{AnalyticsService, ObjectiveProgress, SprintAnalytics};
use burnline_core::{Config, Database};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "burnline-report")]
#[command(about = "Sprint burndown and objective progress reports")]
#[command(version)]
struct Args {
    /// Database file (default: from config, then the XDG data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text, global = true)]
    format: Format,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Overview, story breakdown, burndown and team allocation for a sprint
    Sprint {
        /// Sprint id
        id: String,
    },
    /// Daily progress of an objective over a trailing window
    Objective {
        /// Objective id
        id: String,

        /// Window length in days (default: analytics.objective_window_days)
        #[arg(long)]
        days: Option<u32>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard = burnline_core::logging::init(&config.logging).ok();
    tracing::debug!(command = ?args.command, "burnline-report starting");

    let db_path = args
        .db
        .clone()
        .unwrap_or_else(|| config.resolved_database_path());
    let db = Database::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    db.migrate().context("failed to run migrations")?;

    let service = AnalyticsService::new(Arc::new(db), config.analytics.clone());

    match args.command {
        Command::Sprint { id } => {
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            ctrlc::set_handler(move || {
                eprintln!("\nCancelling...");
                on_interrupt.cancel();
            })
            .context("failed to set Ctrl+C handler")?;

            let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
            let analytics = runtime.block_on(service.compute_analytics(&id, &cancel));
            let analytics =
                analytics.with_context(|| format!("failed to compute analytics for sprint {}", id))?;

            match args.format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&analytics)?),
                Format::Text => print_sprint(&analytics),
            }
        }
        Command::Objective { id, days } => {
            let progress = match days {
                Some(days) => service.compute_progress_chart(&id, days),
                None => service.compute_default_progress_chart(&id),
            }
            .with_context(|| format!("failed to compute progress for objective {}", id))?;

            match args.format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&progress)?),
                Format::Text => print_objective(&progress),
            }
        }
    }

    Ok(())
}

fn print_sprint(analytics: &SprintAnalytics) {
    let sprint = &analytics.sprint;
    let overview = &analytics.overview;

    println!();
    println!("{}", sprint.name);
    println!(
        "{} - {}",
        sprint.start_date.format("%Y-%m-%d"),
        sprint.end_date.format("%Y-%m-%d")
    );
    println!("{}", "─".repeat(40));
    println!(
        "   Status:    {:<12} Complete: {}%",
        overview.status, overview.completion_pct
    );
    println!(
        "   Elapsed:   {:<12} Remaining: {} of {} days",
        format!("{} days", overview.days_elapsed),
        overview.days_remaining,
        overview.total_days
    );
    println!();

    let b = &analytics.breakdown;
    println!("STORIES ({})", b.total);
    println!(
        "   backlog {}  unstarted {}  started {}  paused {}  completed {}  cancelled {}",
        b.backlog, b.unstarted, b.started, b.paused, b.completed, b.cancelled
    );
    if b.unresolved > 0 {
        println!("   {} with an unknown status", b.unresolved);
    }
    println!();

    println!("BURNDOWN");
    println!("   {:<12} {:>9} {:>7}", "date", "remaining", "ideal");
    for point in &analytics.burndown.points {
        println!(
            "   {:<12} {:>9} {:>7}",
            point.date.format("%Y-%m-%d"),
            point.remaining,
            point.ideal
        );
    }
    print_quality_note(&analytics.burndown.data_quality);
    println!();

    if !analytics.team_allocation.is_empty() {
        println!("TEAMS");
        for team in &analytics.team_allocation {
            println!(
                "   {:<20} {:>4} stories ({:>3}%)  {} done, {} in progress",
                team.team_name,
                team.story_count,
                team.share_pct,
                team.completed_count,
                team.in_progress_count
            );
        }
        println!();
    }
}

fn print_objective(progress: &ObjectiveProgress) {
    println!();
    println!("{} (last {} days)", progress.objective.name, progress.window_days);
    println!("{}", "─".repeat(40));
    println!(
        "   {:<12} {:>9} {:>11} {:>6}",
        "date", "completed", "in progress", "total"
    );
    for point in &progress.points {
        println!(
            "   {:<12} {:>9} {:>11} {:>6}",
            point.date.format("%Y-%m-%d"),
            point.completed,
            point.in_progress,
            point.total
        );
    }
    print_quality_note(&progress.data_quality);
    println!();
}

fn print_quality_note(quality: &burnline_core::analytics::DataQuality) {
    if quality.is_clean() {
        return;
    }
    println!(
        "   note: {} unresolved status change(s), {} clamped value(s); details in {}",
        quality.unresolved_count(),
        quality.clamp_events,
        burnline_core::logging::log_file_path().display()
    );
}
