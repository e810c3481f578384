//! gradelog — Demo CLI
//!
//! Simulates one grading session against a working directory, then lets you
//! replay what the log recorded: the checked questions, the most recent
//! result per question, and the restored environment snapshot.
//!
//! Usage:
//!   cargo run -p demo -- simulate
//!   cargo run -p demo -- questions
//!   cargo run -p demo -- results q2
//!   cargo run -p demo -- restore q2

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use gradelog_contracts::env::{EnvValue, Environment};
use gradelog_contracts::error::GradeLogResult;
use gradelog_contracts::event::{EventKind, RecordedFailure};
use gradelog_core::EventLog;
use gradelog_shelf::ShelfLocation;

/// File name of the persisted log inside the working directory.
const LOG_FILE: &str = ".gradelog";

// ── CLI definition ────────────────────────────────────────────────────────────

/// gradelog — grading event log demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "gradelog demo: record a grading session, then replay it",
    long_about = "Simulates a grading session (init, checks, snapshot capture,\n\
                  export, submit) and replays the recorded log: questions,\n\
                  latest results, and restored environment snapshots."
)]
struct Cli {
    /// Working directory holding the log and snapshot files.
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a scripted grading session and persist the log.
    Simulate,
    /// Print the distinct questions checked in the persisted log.
    Questions,
    /// Print the most recent result for one question.
    Results {
        /// The question name to look up.
        question: String,
    },
    /// Restore the snapshot captured for one question and print its keys.
    Restore {
        /// The question name whose snapshot to restore.
        question: String,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    // Initialize structured logging.  Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let location = ShelfLocation::legacy(&cli.dir);
    let log_path = cli.dir.join(LOG_FILE);

    let result = match cli.command {
        Command::Simulate => simulate(&log_path, location),
        Command::Questions => questions(&log_path, location),
        Command::Results { question } => results(&log_path, location, &question),
        Command::Restore { question } => restore(&log_path, location, &question),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("demo error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// Run a scripted session: init, three checks (one failing), a snapshot per
/// passing question, an export pass, and a submission.
fn simulate(log_path: &std::path::Path, location: ShelfLocation) -> GradeLogResult<()> {
    let mut log = EventLog::new(location);

    log.add_entry(EventKind::Init, None, true, None, vec![]);
    log.add_entry(EventKind::Auth, None, true, None, vec![]);
    log.add_entry(EventKind::BeginCheckAll, None, true, None, vec![]);

    log.add_entry(
        EventKind::Check,
        Some("q1"),
        true,
        None,
        vec![json!({ "score": 1.0, "cases": 4 })],
    );
    log.add_entry(
        EventKind::Check,
        Some("q2"),
        true,
        None,
        vec![json!({ "score": 0.5, "cases": 2 })],
    );
    log.add_entry(
        EventKind::Check,
        Some("q3"),
        false,
        Some(RecordedFailure::new("cell raised NameError: 'totl'")),
        vec![json!({ "score": 0.0, "cases": 0 })],
    );

    log.add_entry(EventKind::EndCheckAll, None, true, None, vec![]);

    for question in ["q1", "q2"] {
        let unshelved = log.capture_snapshot(question, &session_env(question))?;
        for key in &unshelved {
            println!("warning: could not capture '{}' for {}", key, question);
        }
    }

    log.add_entry(EventKind::BeginExport, None, true, None, vec![]);
    log.add_entry(EventKind::ToPdf, None, true, None, vec![]);
    log.add_entry(EventKind::EndExport, None, true, None, vec![]);
    log.add_entry(EventKind::Submit, None, true, None, vec![]);

    log.persist(log_path)?;
    println!(
        "session recorded: {} entries, {} snapshot(s), log at {}",
        log.entries().len(),
        log.captured_questions().len(),
        log_path.display()
    );
    Ok(())
}

fn questions(log_path: &std::path::Path, location: ShelfLocation) -> GradeLogResult<()> {
    let log = EventLog::load(log_path, location)?;
    for question in log.get_questions() {
        let captured = if log.captured_questions().contains(&question) {
            " [snapshot]"
        } else {
            ""
        };
        println!("{}{}", question, captured);
    }
    Ok(())
}

fn results(
    log_path: &std::path::Path,
    location: ShelfLocation,
    question: &str,
) -> GradeLogResult<()> {
    let mut log = EventLog::load(log_path, location)?;
    let entry = log.get_question_entry(question)?;
    entry.raise_if_error()?;
    let result = log.get_results(question)?;
    println!("{}", serde_json::to_string_pretty(result).unwrap_or_default());
    Ok(())
}

fn restore(
    log_path: &std::path::Path,
    location: ShelfLocation,
    question: &str,
) -> GradeLogResult<()> {
    let log = EventLog::load(log_path, location)?;
    let bundle = log.load_bundle(question)?;
    let shelf = log.restore_snapshot(question)?;

    println!("restored {} key(s) for {}:", shelf.len(), question);
    for key in shelf.keys() {
        match shelf.get(key)? {
            Some(value) => println!("  {} = {:?}", key, value),
            None => println!("  {} = <missing>", key),
        }
    }
    for key in &bundle.unshelved {
        println!("  {} <was never captured>", key);
    }
    Ok(())
}

// ── Fixtures ──────────────────────────────────────────────────────────────────

/// The runtime state a notebook session might hold after checking a
/// question. One value is deliberately opaque to show unshelving.
fn session_env(question: &str) -> Environment {
    let mut env = Environment::new();
    env.insert("question".to_string(), EnvValue::from(question));
    env.insert("attempts".to_string(), EnvValue::Int(2));
    env.insert("total_points".to_string(), EnvValue::Float(7.5));
    env.insert(
        "results_cache".to_string(),
        EnvValue::Json(json!({ "passed": [1, 2], "failed": [] })),
    );
    env.insert(
        "db_handle".to_string(),
        EnvValue::Opaque {
            type_name: "sqlite3.Connection".to_string(),
        },
    );
    env
}
